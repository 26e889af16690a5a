//! Idle: sit still until something hostile comes close.

use crate::intent::ShipIntent;
use crate::math::Vec2;
use crate::ships::find_nearest_hostile;

use super::formation::resolve_link;
use super::{should_force_seek_player, AgentContext, BehaviorState, Transition};

/// Idle state. A custom wake radius turns it into an ambush.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IdleState {
    wake_radius: Option<f32>,
}

impl IdleState {
    /// Idle with a fixed wake radius instead of the configured one.
    #[must_use]
    pub fn with_wake_radius(radius: f32) -> Self {
        Self {
            wake_radius: Some(radius),
        }
    }

    /// Effective wake radius.
    #[must_use]
    pub fn wake_radius(&self, ctx: &AgentContext<'_>) -> f32 {
        self.wake_radius.unwrap_or(ctx.config.idle_wake_radius)
    }

    pub(crate) fn update(&self, _ctx: &AgentContext<'_>) -> ShipIntent {
        ShipIntent::inert(Vec2::ZERO)
    }

    pub(crate) fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        if let Some(player) = should_force_seek_player(ctx) {
            return Some(Transition::to(BehaviorState::seek(player)));
        }

        if let Some(target) = find_nearest_hostile(ctx.ship, ctx.ships, self.wake_radius(ctx)) {
            let next = if ctx.profile.is_stationary() {
                BehaviorState::station_attack(target.id)
            } else {
                BehaviorState::seek(target.id)
            };
            return Some(Transition::to(next));
        }

        let follower = ctx.formation.is_some_and(|f| f.is_follower());
        if follower && resolve_link(ctx).is_some() {
            return Some(Transition::to(BehaviorState::formation()));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::profile::BehaviorProfile;
    use crate::ships::{Faction, ShipRecord};
    use crate::states::StateKind;

    fn idle_transition(harness: &mut Harness, state: IdleState) -> Option<Transition> {
        state.transition_if_needed(&harness.ctx())
    }

    #[test]
    fn test_idle_emits_inert_intent() {
        let mut harness = Harness::new();
        let intent = IdleState::default().update(&harness.ctx());
        assert_eq!(intent, ShipIntent::inert(Vec2::ZERO));
    }

    #[test]
    fn test_wakes_on_nearest_hostile() {
        let mut harness = Harness::new()
            .with_ship(ShipRecord::new(2, Faction::Player, Vec2::new(1500.0, 0.0)))
            .with_ship(ShipRecord::new(3, Faction::Player, Vec2::new(0.0, 900.0)));

        let next = idle_transition(&mut harness, IdleState::default()).unwrap();
        assert_eq!(next.next, BehaviorState::seek(3));
        assert!(!next.remember_as_initial);
    }

    #[test]
    fn test_stays_idle_outside_wake_radius() {
        let mut harness =
            Harness::new().with_ship(ShipRecord::new(2, Faction::Player, Vec2::new(1601.0, 0.0)));
        assert!(idle_transition(&mut harness, IdleState::default()).is_none());
    }

    #[test]
    fn test_stationary_profile_attacks_in_place() {
        let mut harness =
            Harness::new().with_ship(ShipRecord::new(2, Faction::Player, Vec2::new(800.0, 0.0)));
        harness.profile = BehaviorProfile::turret();

        let next = idle_transition(&mut harness, IdleState::default()).unwrap();
        assert_eq!(next.next.kind(), StateKind::StationAttack);
        assert_eq!(next.next.target(), Some(2));
    }

    #[test]
    fn test_ambush_radius_overrides_config() {
        let mut harness =
            Harness::new().with_ship(ShipRecord::new(2, Faction::Player, Vec2::new(2000.0, 0.0)));
        assert!(idle_transition(&mut harness, IdleState::default()).is_none());
        assert!(idle_transition(&mut harness, IdleState::with_wake_radius(2400.0)).is_some());
    }

    #[test]
    fn test_hunter_seeks_player_at_any_range() {
        let mut harness = Harness::new().with_player_at(Vec2::new(25_000.0, 0.0));
        harness.hunter = true;

        let next = idle_transition(&mut harness, IdleState::default()).unwrap();
        assert_eq!(next.next, BehaviorState::seek(100));
    }
}
