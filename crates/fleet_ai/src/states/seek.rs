//! Seek: close on a target until it is in engagement range.

use crate::intent::ShipIntent;
use crate::math::within_range;
use crate::ships::ShipId;
use crate::steering::{approach_target, face_target};

use super::formation::leader_lost_fallback;
use super::{AgentContext, BehaviorState, Transition};

/// Seek state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekState {
    /// Ship being chased.
    pub target: ShipId,
}

impl SeekState {
    /// Seek `target`.
    #[must_use]
    pub fn new(target: ShipId) -> Self {
        Self { target }
    }

    pub(crate) fn update(&self, ctx: &AgentContext<'_>) -> ShipIntent {
        let Some(target) = ctx.live_ship(self.target) else {
            return ShipIntent::inert(ctx.ship.position());
        };
        let aim = target.position();

        let mut intent = ShipIntent::inert(aim);
        intent.movement = if ctx.profile.is_stationary() {
            face_target(ctx.ship, aim)
        } else {
            approach_target(ctx.ship, aim, ctx.ship.transform.velocity)
        };
        intent
    }

    pub(crate) fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        let Some(target) = ctx.live_ship(self.target) else {
            return Some(Transition::to(ctx.fallback_state()));
        };

        if let Some(fallback) = leader_lost_fallback(ctx) {
            return Some(fallback);
        }

        let position = ctx.ship.position();
        if within_range(position, target.position(), ctx.config.engagement_range) {
            let next = if ctx.profile.is_stationary() {
                BehaviorState::station_attack(self.target)
            } else {
                BehaviorState::attack(self.target)
            };
            return Some(Transition::to(next));
        }

        if !ctx.hunter {
            if let Some(player) = ctx.live_player() {
                if !within_range(position, player.position(), ctx.config.seek_leash_range) {
                    return Some(Transition::to(ctx.fallback_state()));
                }
            }
        }

        None
    }
}
