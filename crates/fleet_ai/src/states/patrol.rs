//! Patrol: wander between random points, pausing at each.

use rand::Rng;

use crate::intent::ShipIntent;
use crate::math::{within_range, Vec2};
use crate::ships::find_nearest_hostile;
use crate::steering::approach_target;

use super::{should_force_seek_player, AgentContext, BehaviorState, Transition};

/// Patrol state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PatrolState {
    target: Option<Vec2>,
    dwell_elapsed: Option<f32>,
}

impl PatrolState {
    /// Patrol starting toward a known point.
    #[must_use]
    pub fn with_target(target: Vec2) -> Self {
        Self {
            target: Some(target),
            dwell_elapsed: None,
        }
    }

    /// Current wander point, once one has been picked.
    #[must_use]
    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    /// Seconds spent dwelling at the current point, if dwelling.
    #[must_use]
    pub fn dwell_elapsed(&self) -> Option<f32> {
        self.dwell_elapsed
    }

    /// Random point within the patrol radius, clamped inside the world margin.
    fn pick_target(ctx: &mut AgentContext<'_>) -> Vec2 {
        let origin = ctx.ship.position();
        let angle = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = ctx.rng.gen::<f32>() * ctx.config.patrol_radius;

        let raw = origin + Vec2::new(angle.cos(), angle.sin()).scale(radius);
        ctx.config
            .world
            .clamp_inside(raw, ctx.config.patrol_edge_margin)
    }

    pub(crate) fn update(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> ShipIntent {
        let target = match self.target {
            Some(target) => target,
            None => {
                let picked = Self::pick_target(ctx);
                self.target = Some(picked);
                picked
            }
        };

        let position = ctx.ship.position();
        if self.dwell_elapsed.is_none()
            && within_range(position, target, ctx.config.patrol_arrival_radius)
        {
            self.dwell_elapsed = Some(0.0);
        }

        if let Some(elapsed) = self.dwell_elapsed {
            // Half a tick of slack so summed f32 steps stop on the nearest tick.
            if elapsed + dt * 0.5 < ctx.config.patrol_dwell_secs {
                self.dwell_elapsed = Some(elapsed + dt);
                return ShipIntent::braking(target);
            }

            let next = Self::pick_target(ctx);
            tracing::trace!(ship = ctx.ship.id, x = next.x, y = next.y, "New patrol point");
            self.target = Some(next);
            self.dwell_elapsed = None;
            return Self::travel(ctx, next);
        }

        Self::travel(ctx, target)
    }

    fn travel(ctx: &AgentContext<'_>, target: Vec2) -> ShipIntent {
        let mut intent = ShipIntent::inert(target);
        intent.movement = approach_target(ctx.ship, target, ctx.ship.transform.velocity);
        intent
    }

    pub(crate) fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        if let Some(player) = should_force_seek_player(ctx) {
            return Some(Transition::remembered(BehaviorState::seek(player)));
        }

        find_nearest_hostile(ctx.ship, ctx.ships, ctx.config.patrol_wake_radius)
            .map(|target| Transition::to(BehaviorState::seek(target.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::ships::{Faction, ShipRecord};

    #[test]
    fn test_picks_target_inside_bounds() {
        let mut harness = Harness::new();
        harness.ships.set_transform(
            1,
            crate::ships::Transform::at(Vec2::new(18_500.0, -18_500.0)),
        );

        for _ in 0..50 {
            let mut state = PatrolState::default();
            state.update(0.1, &mut harness.ctx());
            let target = state.target().unwrap();
            assert!(harness.config.world.contains_with_margin(target, 1000.0));
            assert!(target.distance(Vec2::new(18_500.0, -18_500.0)) <= 6000.0 + 1.0);
        }
    }

    fn braking_ticks(dt: f32) -> usize {
        let mut harness = Harness::new();
        let mut state = PatrolState::with_target(Vec2::new(40.0, 0.0));
        (0..)
            .take_while(|_| state.update(dt, &mut harness.ctx()).movement.is_braking_only())
            .count()
    }

    #[test]
    fn test_dwell_tick_count_matches_duration() {
        assert_eq!(braking_ticks(0.5), 8);
        assert_eq!(braking_ticks(0.1), 40);
        assert_eq!(braking_ticks(1.0 / 60.0), 240);
        assert_eq!(braking_ticks(0.016), 250);
    }

    #[test]
    fn test_dwells_then_repicks() {
        let mut harness = Harness::new();
        let mut state = PatrolState::with_target(Vec2::new(40.0, 0.0));

        let mut braking_time = 0.0;
        for _ in 0..8 {
            let intent = state.update(0.5, &mut harness.ctx());
            assert!(intent.movement.is_braking_only());
            braking_time += 0.5;
        }
        assert!((braking_time - 4.0f32).abs() < f32::EPSILON);
        assert_eq!(state.target(), Some(Vec2::new(40.0, 0.0)));

        let intent = state.update(0.5, &mut harness.ctx());
        assert!(!intent.movement.is_braking_only());
        assert_ne!(state.target(), Some(Vec2::new(40.0, 0.0)));
        assert!(state.dwell_elapsed().is_none());
    }

    #[test]
    fn test_travels_toward_far_point() {
        let mut harness = Harness::new();
        let mut state = PatrolState::with_target(Vec2::new(3000.0, 0.0));
        let intent = state.update(0.1, &mut harness.ctx());
        assert!(intent.movement.thrust_forward);
        assert!(!intent.weapons.fire_primary);
        assert_eq!(intent.weapons.aim_at, Vec2::new(3000.0, 0.0));
    }

    #[test]
    fn test_hunter_seeks_distant_player_and_remembers() {
        let mut harness = Harness::new().with_player_at(Vec2::new(30_000.0, 30_000.0));
        harness.hunter = true;

        let next = PatrolState::default()
            .transition_if_needed(&harness.ctx())
            .unwrap();
        assert_eq!(next.next, BehaviorState::seek(100));
        assert!(next.remember_as_initial);
    }

    #[test]
    fn test_wakes_within_patrol_radius() {
        let mut harness =
            Harness::new().with_ship(ShipRecord::new(2, Faction::Player, Vec2::new(3500.0, 0.0)));
        let next = PatrolState::default()
            .transition_if_needed(&harness.ctx())
            .unwrap();
        assert_eq!(next.next, BehaviorState::seek(2));

        let mut quiet =
            Harness::new().with_ship(ShipRecord::new(2, Faction::Player, Vec2::new(3700.0, 0.0)));
        assert!(PatrolState::default()
            .transition_if_needed(&quiet.ctx())
            .is_none());
    }
}
