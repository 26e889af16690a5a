//! Formation follower states.
//!
//! Followers hold a slot at `leader position + offset rotated by leader
//! heading` and mirror the leader's combat state. The link to the leader is
//! re-resolved every frame; if any part of it has gone away the follower
//! abandons the formation and patrols on its own.

use crate::controller::FormationRole;
use crate::intent::{MovementIntent, ShipIntent, UtilityIntent, WeaponIntent};
use crate::math::{offset_to_world, within_range, Vec2};
use crate::ships::{ShipId, ShipRecord};
use crate::steering::{approach_target, lead_target};

use super::{AgentContext, BehaviorState, StateSummary, Transition};

/// World position of a formation slot.
#[must_use]
pub fn formation_slot(leader: &ShipRecord, offset: Vec2) -> Vec2 {
    offset_to_world(leader.position(), leader.transform.rotation, offset)
}

/// A live link from a follower to its leader.
pub(crate) struct LeaderLink<'a> {
    pub leader: &'a ShipRecord,
    pub leader_state: StateSummary,
    pub offset: Option<Vec2>,
}

impl LeaderLink<'_> {
    fn slot(&self) -> Option<Vec2> {
        self.offset.map(|offset| formation_slot(self.leader, offset))
    }
}

/// Resolve the follower's link, or `None` if the registry, the formation,
/// the leader's controller or the leader's ship is gone.
pub(crate) fn resolve_link<'a>(ctx: &AgentContext<'a>) -> Option<LeaderLink<'a>> {
    let formation = ctx.formation?;
    let offset = {
        let registry = formation.registry()?;
        let registry = registry.borrow();
        registry.get_formation(&formation.formation_id)?;
        registry.offset_for_ship(ctx.ship.id)
    };

    let leader_state = *ctx.roster.get(&formation.leader)?;
    let leader = ctx.live_ship(formation.leader)?;

    Some(LeaderLink {
        leader,
        leader_state,
        offset,
    })
}

/// For followers fighting outside the formation states: rejoin if the leader
/// is gone but our slot is still registered, otherwise give up on the group.
pub(crate) fn leader_lost_fallback(ctx: &AgentContext<'_>) -> Option<Transition> {
    let formation = ctx.formation.filter(|f| f.role == FormationRole::Follower)?;

    let leader_alive = ctx.roster.contains_key(&formation.leader)
        && ctx.live_ship(formation.leader).is_some();
    if leader_alive {
        return None;
    }

    let still_member = formation
        .registry()
        .is_some_and(|registry| registry.borrow().offset_for_ship(ctx.ship.id).is_some());
    Some(if still_member {
        Transition::to(BehaviorState::formation())
    } else {
        Transition::abandon_formation()
    })
}

/// Hold position while the link can't be resolved.
fn hold_intent(ctx: &AgentContext<'_>) -> ShipIntent {
    ShipIntent::braking(ctx.ship.position())
}

fn hold_slot(ctx: &AgentContext<'_>, slot: Vec2) -> MovementIntent {
    approach_target(ctx.ship, slot, ctx.ship.transform.velocity)
}

/// Keep station on the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormationState;

impl FormationState {
    pub(crate) fn update(&self, ctx: &AgentContext<'_>) -> ShipIntent {
        let Some(link) = resolve_link(ctx) else {
            return hold_intent(ctx);
        };
        let Some(slot) = link.slot() else {
            return hold_intent(ctx);
        };

        let mut intent = ShipIntent::inert(link.leader.position());
        intent.movement = hold_slot(ctx, slot);
        intent
    }

    pub(crate) fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        let Some(link) = resolve_link(ctx) else {
            return Some(Transition::abandon_formation());
        };
        if link.offset.is_none() {
            return Some(Transition::abandon_formation());
        }

        let StateSummary { kind, target } = link.leader_state;
        let target = target?;
        if kind.is_seeking() {
            Some(Transition::to(BehaviorState::formation_seek(target)))
        } else if kind.is_attacking() {
            Some(Transition::to(BehaviorState::formation_attack(target)))
        } else {
            None
        }
    }
}

/// Keep station while the leader closes on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormationSeekState {
    /// The leader's target.
    pub target: ShipId,
}

impl FormationSeekState {
    /// Track `target` from the slot.
    #[must_use]
    pub fn new(target: ShipId) -> Self {
        Self { target }
    }

    pub(crate) fn update(&self, ctx: &AgentContext<'_>) -> ShipIntent {
        let Some(slot) = resolve_link(ctx).and_then(|link| link.slot()) else {
            return hold_intent(ctx);
        };
        let aim = ctx
            .live_ship(self.target)
            .map_or(slot, ShipRecord::position);

        let mut intent = ShipIntent::inert(aim);
        intent.movement = hold_slot(ctx, slot);
        intent
    }

    pub(crate) fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        if resolve_link(ctx).is_none() {
            return Some(Transition::abandon_formation());
        }

        let Some(target) = ctx.live_ship(self.target) else {
            return Some(Transition::to(BehaviorState::formation()));
        };

        if within_range(
            ctx.ship.position(),
            target.position(),
            ctx.config.engagement_range,
        ) {
            return Some(Transition::to(BehaviorState::formation_attack(self.target)));
        }

        None
    }
}

/// Keep station, shields up, firing on the leader's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormationAttackState {
    /// The leader's target.
    pub target: ShipId,
}

impl FormationAttackState {
    /// Fire on `target` from the slot.
    #[must_use]
    pub fn new(target: ShipId) -> Self {
        Self { target }
    }

    pub(crate) fn update(&self, ctx: &AgentContext<'_>) -> ShipIntent {
        let Some(slot) = resolve_link(ctx).and_then(|link| link.slot()) else {
            return hold_intent(ctx);
        };
        let Some(target) = ctx.live_ship(self.target) else {
            return hold_intent(ctx);
        };

        let aim = lead_target(
            ctx.ship.position(),
            target.position(),
            target.transform.velocity,
            ctx.config.projectile_speed,
        );
        ShipIntent::new(hold_slot(ctx, slot), WeaponIntent::fire(aim), UtilityIntent::SHIELDS)
    }

    pub(crate) fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        if resolve_link(ctx).is_none() {
            return Some(Transition::abandon_formation());
        }

        let Some(target) = ctx.live_ship(self.target) else {
            return Some(Transition::to(BehaviorState::formation()));
        };

        if !within_range(
            ctx.ship.position(),
            target.position(),
            ctx.config.formation_disengage_range,
        ) {
            return Some(Transition::to(BehaviorState::formation_seek(self.target)));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::f32::consts::{FRAC_PI_2, PI};
    use std::rc::Rc;

    use super::super::test_support::Harness;
    use super::*;
    use crate::controller::FormationContext;
    use crate::formation::{FormationRegistry, FormationShape};
    use crate::ships::Faction;
    use crate::states::StateKind;

    const LEADER: ShipId = 10;

    /// Ship 1 follows leader 10 at offset (-100, 50).
    fn follower_harness(registry: &Rc<RefCell<FormationRegistry>>) -> Harness {
        let mut formation = FormationShape::SmallWedge.build("wing", LEADER, &[1], 100.0);
        formation.members[0].offset = Vec2::new(-100.0, 50.0);
        registry.borrow_mut().register_formation(formation);

        let mut harness = Harness::new()
            .with_ship(ShipRecord::new(LEADER, Faction::Enemy, Vec2::new(1000.0, 1000.0)));
        harness.formation = Some(FormationContext::follower(
            "wing",
            Rc::downgrade(registry),
            LEADER,
        ));
        harness.roster.insert(LEADER, BehaviorState::patrol().summary());
        harness
    }

    #[test]
    fn test_slot_rotates_with_leader() {
        let offset = Vec2::new(-100.0, 50.0);
        let leader = |rotation| {
            ShipRecord::new(LEADER, Faction::Enemy, Vec2::new(1000.0, 1000.0)).with_rotation(rotation)
        };

        let at_zero = formation_slot(&leader(0.0), offset);
        assert!(at_zero.distance(Vec2::new(900.0, 1050.0)) < 1e-3);

        let at_quarter = formation_slot(&leader(FRAC_PI_2), offset);
        assert!(at_quarter.distance(Vec2::new(950.0, 900.0)) < 1e-3);

        let at_half = formation_slot(&leader(PI), offset);
        assert!(at_half.distance(Vec2::new(1100.0, 950.0)) < 1e-3);
    }

    #[test]
    fn test_formation_update_heads_for_slot_and_aims_at_leader() {
        let registry = Rc::new(RefCell::new(FormationRegistry::new()));
        let mut harness = follower_harness(&registry);

        let intent = FormationState.update(&harness.ctx());
        assert_eq!(intent.weapons.aim_at, Vec2::new(1000.0, 1000.0));
        assert!(!intent.weapons.fire_primary);
        assert!(FormationState.transition_if_needed(&harness.ctx()).is_none());
    }

    #[test]
    fn test_mirrors_leader_combat_states() {
        let registry = Rc::new(RefCell::new(FormationRegistry::new()));
        let mut harness = follower_harness(&registry);

        harness.roster.insert(LEADER, BehaviorState::seek(77).summary());
        let next = FormationState.transition_if_needed(&harness.ctx()).unwrap();
        assert_eq!(next.next, BehaviorState::formation_seek(77));

        harness.roster.insert(LEADER, BehaviorState::attack(77).summary());
        let next = FormationState.transition_if_needed(&harness.ctx()).unwrap();
        assert_eq!(next.next, BehaviorState::formation_attack(77));
    }

    #[test]
    fn test_destroyed_leader_abandons_formation() {
        let registry = Rc::new(RefCell::new(FormationRegistry::new()));
        let mut harness = follower_harness(&registry);
        harness.ships.ship_mut(LEADER).unwrap().destroyed = true;

        let next = FormationState.transition_if_needed(&harness.ctx()).unwrap();
        assert_eq!(next, Transition::abandon_formation());
        assert_eq!(next.next.kind(), StateKind::Patrol);

        let intent = FormationState.update(&harness.ctx());
        assert!(intent.movement.is_braking_only());
    }

    #[test]
    fn test_dropped_registry_abandons_formation() {
        let registry = Rc::new(RefCell::new(FormationRegistry::new()));
        let mut harness = follower_harness(&registry);
        drop(registry);

        assert_eq!(
            FormationAttackState::new(5).transition_if_needed(&harness.ctx()),
            Some(Transition::abandon_formation())
        );
    }

    #[test]
    fn test_formation_seek_escalates_and_attack_falls_back() {
        let registry = Rc::new(RefCell::new(FormationRegistry::new()));
        let mut harness = follower_harness(&registry)
            .with_ship(ShipRecord::new(5, Faction::Player, Vec2::new(1100.0, 0.0)));

        let next = FormationSeekState::new(5)
            .transition_if_needed(&harness.ctx())
            .unwrap();
        assert_eq!(next.next, BehaviorState::formation_attack(5));

        harness.ships.set_transform(5, crate::ships::Transform::at(Vec2::new(1900.0, 0.0)));
        let next = FormationAttackState::new(5)
            .transition_if_needed(&harness.ctx())
            .unwrap();
        assert_eq!(next.next, BehaviorState::formation_seek(5));

        let next = FormationAttackState::new(99)
            .transition_if_needed(&harness.ctx())
            .unwrap();
        assert_eq!(next.next, BehaviorState::formation());
    }

    #[test]
    fn test_formation_attack_fires_with_shields() {
        let registry = Rc::new(RefCell::new(FormationRegistry::new()));
        let mut harness = follower_harness(&registry)
            .with_ship(ShipRecord::new(5, Faction::Player, Vec2::new(800.0, 0.0)));

        let intent = FormationAttackState::new(5).update(&harness.ctx());
        assert!(intent.weapons.fire_primary);
        assert!(intent.utility.toggle_shields);
    }

    #[test]
    fn test_seek_follower_rejoins_or_patrols_when_leader_lost() {
        let registry = Rc::new(RefCell::new(FormationRegistry::new()));
        let mut harness = follower_harness(&registry);
        harness.roster.remove(&LEADER);

        let next = leader_lost_fallback(&harness.ctx()).unwrap();
        assert_eq!(next.next, BehaviorState::formation());

        registry.borrow_mut().remove_formation("wing");
        let next = leader_lost_fallback(&harness.ctx()).unwrap();
        assert_eq!(next, Transition::abandon_formation());
    }
}
