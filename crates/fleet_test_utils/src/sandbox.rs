//! A small self-contained world: ship table, orchestrator and the kinematic
//! model, advanced together one tick at a time.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use fleet_ai::config::AiConfig;
use fleet_ai::controller::AgentController;
use fleet_ai::formation::FormationShape;
use fleet_ai::orchestrator::{ControllerId, Orchestrator, TickReport};
use fleet_ai::profile::BehaviorProfile;
use fleet_ai::ships::{ShipDirectory, ShipId, ShipRecord, ShipTable};
use fleet_ai::states::{formation_slot, StateKind};

use crate::determinism::compute_hash;
use crate::kinematics::{buffered_drivers, integrate, intent_buffer, IntentBuffer, KinematicParams};

/// Final or intermediate state of one ship, for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipSnapshot {
    /// Ship id.
    pub id: ShipId,
    /// Position.
    pub x: f32,
    /// Position.
    pub y: f32,
    /// Hull rotation.
    pub rotation: f32,
    /// Destroyed flag.
    pub destroyed: bool,
    /// Controller state, `None` for uncontrolled ships.
    pub state: Option<StateKind>,
    /// Controller target.
    pub target: Option<ShipId>,
    /// Frames spent firing primaries.
    pub shots: u64,
}

/// Ships, controllers and kinematics advanced in lockstep.
#[derive(Debug)]
pub struct Sandbox {
    /// Every ship, controlled or not.
    pub ships: ShipTable,
    /// Controllers.
    pub orchestrator: Orchestrator,
    buffer: IntentBuffer,
    params: KinematicParams,
    shots: BTreeMap<ShipId, u64>,
    tick: u64,
}

impl Sandbox {
    /// Empty sandbox.
    #[must_use]
    pub fn new(config: AiConfig) -> Self {
        Self::with_params(config, KinematicParams::default())
    }

    /// Empty sandbox with custom kinematics.
    #[must_use]
    pub fn with_params(config: AiConfig, params: KinematicParams) -> Self {
        Self {
            ships: ShipTable::new(),
            orchestrator: Orchestrator::new(config),
            buffer: intent_buffer(),
            params,
            shots: BTreeMap::new(),
            tick: 0,
        }
    }

    /// Ticks advanced so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Controller wired to this sandbox's kinematics.
    #[must_use]
    pub fn controller(&self, ship: ShipId, profile: BehaviorProfile) -> AgentController {
        let (movement, weapons, utility) = buffered_drivers(&self.buffer);
        AgentController::new(ship, profile, movement, weapons, utility)
    }

    /// Add an AI-controlled ship.
    pub fn spawn(&mut self, ship: ShipRecord, profile: BehaviorProfile, hunter: bool) -> ControllerId {
        let mut controller = self.controller(ship.id, profile);
        controller.set_hunter(hunter);
        self.ships.insert(ship);
        self.orchestrator.add_controller(controller)
    }

    /// Add the player's ship (uncontrolled).
    pub fn spawn_player(&mut self, ship: ShipRecord) {
        self.ships.insert_player(ship);
    }

    /// Add an uncontrolled ship.
    pub fn spawn_inert(&mut self, ship: ShipRecord) {
        self.ships.insert(ship);
    }

    /// Add a leader and followers laid out in `shape`, all flying `profile`.
    pub fn spawn_formation(
        &mut self,
        formation_id: &str,
        shape: FormationShape,
        spacing: f32,
        leader: ShipRecord,
        followers: Vec<ShipRecord>,
        profile: BehaviorProfile,
    ) -> Vec<ControllerId> {
        self.spawn_formation_with(
            formation_id,
            shape,
            spacing,
            (leader, profile),
            followers.into_iter().map(|ship| (ship, profile)).collect(),
        )
    }

    /// Add a leader and followers laid out in `shape`, each with its own
    /// profile.
    ///
    /// Followers are placed on their slots. Followers beyond the shape's
    /// capacity are spawned but get no slot, so they drop out on their
    /// first transition check. Returns the leader's controller id followed
    /// by the followers'.
    pub fn spawn_formation_with(
        &mut self,
        formation_id: &str,
        shape: FormationShape,
        spacing: f32,
        leader: (ShipRecord, BehaviorProfile),
        followers: Vec<(ShipRecord, BehaviorProfile)>,
    ) -> Vec<ControllerId> {
        let (leader, leader_profile) = leader;
        let follower_ids: Vec<ShipId> = followers.iter().map(|(s, _)| s.id).collect();
        let formation = shape.build(formation_id, leader.id, &follower_ids, spacing);

        let leader_controller = self.controller(leader.id, leader_profile);
        let follower_controllers = followers
            .iter()
            .map(|(ship, profile)| self.controller(ship.id, *profile))
            .collect();

        let slots = formation.members.iter().map(Some).chain(std::iter::repeat(None));
        for ((mut follower, _), member) in followers.into_iter().zip(slots) {
            if let Some(member) = member {
                follower.transform.position = formation_slot(&leader, member.offset);
                follower.transform.rotation = leader.transform.rotation;
            }
            self.ships.insert(follower);
        }
        self.ships.insert(leader);

        self.orchestrator
            .enlist_formation(formation, leader_controller, follower_controllers)
    }

    /// Flag a ship as destroyed without despawning it.
    pub fn destroy(&mut self, ship: ShipId) {
        if let Some(record) = self.ships.ship_mut(ship) {
            record.destroyed = true;
            tracing::debug!(ship, tick = self.tick, "Ship destroyed");
        }
    }

    /// Remove a ship entirely.
    pub fn despawn(&mut self, ship: ShipId) {
        self.ships.remove(ship);
    }

    /// One orchestrator tick followed by kinematic integration.
    pub fn step(&mut self, dt: f32, active: Option<&HashSet<ShipId>>) -> TickReport {
        let report = self.orchestrator.update(dt, &self.ships, active);

        let intents = std::mem::take(&mut *self.buffer.borrow_mut());
        let ids: Vec<ShipId> = self.ships.iter().map(|s| s.id).collect();

        for id in &ids {
            let Some(ship) = self.ships.ship(*id) else {
                continue;
            };
            if ship.destroyed {
                continue;
            }
            let next = match intents.get(id) {
                Some(intent) => {
                    if intent.weapons.fire_primary {
                        *self.shots.entry(*id).or_default() += 1;
                    }
                    integrate(ship, &intent.movement, dt, &self.params)
                }
                None => {
                    let mut coast = ship.transform;
                    coast.position = coast.position + coast.velocity.scale(dt);
                    coast
                }
            };
            self.ships.set_transform(*id, next);
        }

        for id in &ids {
            let colliding = self.ships.ship(*id).is_some_and(|ship| {
                self.ships
                    .ships_in_radius(ship.position(), self.params.contact_radius)
                    .iter()
                    .any(|other| other.id != ship.id && !other.destroyed)
            });
            if let Some(ship) = self.ships.ship_mut(*id) {
                ship.colliding = colliding;
            }
        }

        self.tick += 1;
        report
    }

    /// Run `ticks` steps with no active set.
    pub fn run(&mut self, ticks: u64, dt: f32) {
        for _ in 0..ticks {
            self.step(dt, None);
        }
    }

    /// Snapshot of every ship, in id order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ShipSnapshot> {
        self.ships
            .iter()
            .map(|ship| {
                let controller = self.orchestrator.controller_for_ship(ship.id);
                ShipSnapshot {
                    id: ship.id,
                    x: ship.transform.position.x,
                    y: ship.transform.position.y,
                    rotation: ship.transform.rotation,
                    destroyed: ship.destroyed,
                    state: controller.map(AgentController::state_kind),
                    target: controller.and_then(AgentController::state_target),
                    shots: self.shots.get(&ship.id).copied().unwrap_or(0),
                }
            })
            .collect()
    }

    /// Hash of every ship's transform and every controller's state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let ships: Vec<_> = self
            .ships
            .iter()
            .map(|ship| {
                let t = &ship.transform;
                let bits = [t.position.x, t.position.y, t.velocity.x, t.velocity.y, t.rotation]
                    .map(f32::to_bits);
                (ship.id, bits, ship.destroyed)
            })
            .collect();
        let controllers: Vec<_> = self
            .orchestrator
            .iter()
            .map(|(id, controller)| (id, controller.summary()))
            .collect();
        compute_hash(&(self.tick, ships, controllers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{enemy_at, player_ship_at, PLAYER_ID};

    #[test]
    fn test_fighter_closes_and_attacks_player() {
        let mut sandbox = Sandbox::new(AiConfig::default());
        sandbox.spawn_player(player_ship_at(PLAYER_ID, 2500.0, 0.0));
        sandbox.spawn(enemy_at(1, 0.0, 0.0), BehaviorProfile::fighter(), false);

        sandbox.run(1, 0.05);
        assert_eq!(
            sandbox.orchestrator.controller_for_ship(1).map(AgentController::state_kind),
            Some(StateKind::SeekTarget)
        );

        let mut engaged_at = None;
        for _ in 0..2400 {
            sandbox.step(0.05, None);
            let state = sandbox
                .orchestrator
                .controller_for_ship(1)
                .map(AgentController::state_kind);
            if state == Some(StateKind::Attack) {
                engaged_at = Some(sandbox.ships.ship(1).unwrap().position());
                break;
            }
        }
        let me = engaged_at.expect("fighter never engaged");
        assert!(me.distance(fleet_ai::math::Vec2::new(2500.0, 0.0)) <= 1250.0);
    }

    #[test]
    fn test_formation_spawns_on_slots() {
        let mut sandbox = Sandbox::new(AiConfig::default());
        let ids = sandbox.spawn_formation(
            "wing",
            FormationShape::SmallWedge,
            200.0,
            enemy_at(1, 0.0, 0.0),
            vec![enemy_at(2, 0.0, 0.0), enemy_at(3, 0.0, 0.0)],
            BehaviorProfile::fighter(),
        );
        assert_eq!(ids.len(), 3);

        let left = sandbox.ships.ship(2).unwrap().position();
        assert!((left.x + 173.2).abs() < 0.1);
        assert!((left.y - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_hash_tracks_state() {
        let mut a = Sandbox::new(AiConfig::default());
        a.spawn(enemy_at(1, 0.0, 0.0), BehaviorProfile::fighter(), false);
        let before = a.state_hash();
        a.run(10, 0.05);
        assert_ne!(before, a.state_hash());
    }
}
