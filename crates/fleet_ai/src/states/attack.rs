//! Attack states: mobile (orbit or ram) and stationary.

use serde::{Deserialize, Serialize};

use crate::intent::{MovementIntent, ShipIntent, UtilityIntent, WeaponIntent};
use crate::math::within_range;
use crate::profile::AttackStyle;
use crate::ships::ShipId;
use crate::steering::{approach_target, lead_target, orbit_target};

use super::formation::leader_lost_fallback;
use super::{AgentContext, BehaviorState, Transition};

/// Where a rammer is in its charge cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Charging with shields up.
    #[default]
    Ramming,
    /// Backing off after a hit.
    Orbiting,
}

/// Mobile attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackState {
    /// Ship under attack.
    pub target: ShipId,
    phase: AttackPhase,
    phase_timer: f32,
}

impl AttackState {
    /// Attack `target`, starting with a charge.
    #[must_use]
    pub fn new(target: ShipId) -> Self {
        Self {
            target,
            phase: AttackPhase::Ramming,
            phase_timer: 0.0,
        }
    }

    /// Current ram phase. Orbit-style attackers stay in `Ramming`.
    #[must_use]
    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    pub(crate) fn update(&mut self, dt: f32, ctx: &AgentContext<'_>) -> ShipIntent {
        let Some(target) = ctx.live_ship(self.target) else {
            return ShipIntent::inert(ctx.ship.position());
        };

        let ship = ctx.ship;
        let velocity = ship.transform.velocity;
        let target_pos = target.position();

        match ctx.profile.attack {
            AttackStyle::Orbit => ShipIntent::new(
                orbit_target(ship, velocity, target_pos, ctx.config.orbit_radius),
                WeaponIntent::fire(lead_target(
                    ship.position(),
                    target_pos,
                    target.transform.velocity,
                    ctx.config.projectile_speed,
                )),
                UtilityIntent::IDLE,
            ),
            AttackStyle::Ram => {
                self.advance_ram_phase(dt, ship.colliding, ctx.config.ram_orbit_secs);
                match self.phase {
                    AttackPhase::Ramming => ShipIntent::new(
                        approach_target(ship, target_pos, velocity),
                        WeaponIntent::hold(target_pos),
                        UtilityIntent::SHIELDS,
                    ),
                    AttackPhase::Orbiting => ShipIntent::new(
                        orbit_target(ship, velocity, target_pos, ctx.config.orbit_radius),
                        WeaponIntent::hold(target_pos),
                        UtilityIntent::IDLE,
                    ),
                }
            }
        }
    }

    fn advance_ram_phase(&mut self, dt: f32, colliding: bool, orbit_secs: f32) {
        match self.phase {
            AttackPhase::Ramming if colliding => {
                self.phase = AttackPhase::Orbiting;
                self.phase_timer = 0.0;
            }
            AttackPhase::Ramming => {}
            AttackPhase::Orbiting => {
                self.phase_timer += dt;
                if self.phase_timer >= orbit_secs {
                    self.phase = AttackPhase::Ramming;
                    self.phase_timer = 0.0;
                }
            }
        }
    }

    pub(crate) fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        let Some(target) = ctx.live_ship(self.target) else {
            return Some(Transition::to(ctx.fallback_state()));
        };

        if let Some(fallback) = leader_lost_fallback(ctx) {
            return Some(fallback);
        }

        if !within_range(
            ctx.ship.position(),
            target.position(),
            ctx.config.attack_disengage_range,
        ) {
            return Some(Transition::to(BehaviorState::seek(self.target)));
        }

        None
    }
}

/// Stationary attack: never moves, always fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationAttackState {
    /// Ship under attack.
    pub target: ShipId,
}

impl StationAttackState {
    /// Attack `target` from where the ship stands.
    #[must_use]
    pub fn new(target: ShipId) -> Self {
        Self { target }
    }

    pub(crate) fn update(&self, ctx: &AgentContext<'_>) -> ShipIntent {
        let Some(target) = ctx.live_ship(self.target) else {
            return ShipIntent::inert(ctx.ship.position());
        };

        ShipIntent::new(
            MovementIntent::INERT,
            WeaponIntent::fire(lead_target(
                ctx.ship.position(),
                target.position(),
                target.transform.velocity,
                ctx.config.projectile_speed,
            )),
            UtilityIntent::IDLE,
        )
    }

    pub(crate) fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        let in_range = ctx.live_ship(self.target).is_some_and(|target| {
            within_range(
                ctx.ship.position(),
                target.position(),
                ctx.config.station_attack_range,
            )
        });

        if in_range {
            None
        } else {
            Some(Transition::to(BehaviorState::idle()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::math::Vec2;
    use crate::profile::BehaviorProfile;
    use crate::ships::{Faction, ShipRecord};

    fn harness_with_target(x: f32) -> Harness {
        Harness::new().with_ship(
            ShipRecord::new(2, Faction::Player, Vec2::new(x, 0.0))
                .with_velocity(Vec2::new(0.0, 50.0)),
        )
    }

    #[test]
    fn test_orbit_attack_fires_at_lead_point() {
        let mut harness = harness_with_target(600.0);
        let mut state = AttackState::new(2);
        let intent = state.update(0.1, &harness.ctx());

        assert!(intent.weapons.fire_primary);
        assert!(intent.weapons.aim_at.y > 0.0);
        assert!(!intent.utility.toggle_shields);
    }

    #[test]
    fn test_ram_cycle() {
        let mut harness = harness_with_target(600.0);
        harness.profile = BehaviorProfile::rammer();
        let mut state = AttackState::new(2);

        let charging = state.update(0.5, &harness.ctx());
        assert!(charging.utility.toggle_shields);
        assert!(!charging.weapons.fire_primary);
        assert_eq!(state.phase(), AttackPhase::Ramming);

        harness.ships.ship_mut(1).unwrap().colliding = true;
        let backing_off = state.update(0.5, &harness.ctx());
        assert_eq!(state.phase(), AttackPhase::Orbiting);
        assert!(!backing_off.utility.toggle_shields);
        assert!(!backing_off.weapons.fire_primary);

        harness.ships.ship_mut(1).unwrap().colliding = false;
        for _ in 0..19 {
            state.update(0.5, &harness.ctx());
            assert_eq!(state.phase(), AttackPhase::Orbiting);
        }
        state.update(0.5, &harness.ctx());
        assert_eq!(state.phase(), AttackPhase::Ramming);
    }

    #[test]
    fn test_disengages_to_seek_beyond_range() {
        let mut harness = harness_with_target(1401.0);
        let next = AttackState::new(2)
            .transition_if_needed(&harness.ctx())
            .unwrap();
        assert_eq!(next.next, BehaviorState::seek(2));

        let mut close = harness_with_target(1400.0);
        assert!(AttackState::new(2)
            .transition_if_needed(&close.ctx())
            .is_none());
    }

    #[test]
    fn test_station_attack_never_moves() {
        let mut harness = harness_with_target(1000.0);
        let intent = StationAttackState::new(2).update(&harness.ctx());
        assert_eq!(intent.movement, MovementIntent::INERT);
        assert!(intent.weapons.fire_primary);
    }

    #[test]
    fn test_station_attack_idles_when_out_of_range_or_gone() {
        let mut far = harness_with_target(1700.0);
        let next = StationAttackState::new(2)
            .transition_if_needed(&far.ctx())
            .unwrap();
        assert_eq!(next.next, BehaviorState::idle());

        let mut empty = Harness::new();
        assert!(StationAttackState::new(2)
            .transition_if_needed(&empty.ctx())
            .is_some());
    }
}
