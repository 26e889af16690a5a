//! Per-frame intents produced by behavior states.
//!
//! Intents are pure data. The controller hands them to the external
//! movement/weapon/utility drivers, which decide what a "thrust forward" or
//! "fire primary" actually does to the ship.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Movement flags for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovementIntent {
    /// Fire engines along the net thrust direction.
    pub thrust_forward: bool,
    /// Apply braking thrust against current velocity.
    pub brake: bool,
    /// Turn toward decreasing rotation (counter-clockwise on a y-down screen).
    pub rotate_left: bool,
    /// Turn toward increasing rotation.
    pub rotate_right: bool,
    /// Strafe left.
    pub strafe_left: bool,
    /// Strafe right.
    pub strafe_right: bool,
}

impl MovementIntent {
    /// No thrust, no rotation.
    pub const INERT: Self = Self {
        thrust_forward: false,
        brake: false,
        rotate_left: false,
        rotate_right: false,
        strafe_left: false,
        strafe_right: false,
    };

    /// Brake only.
    pub const BRAKE: Self = Self {
        brake: true,
        ..Self::INERT
    };

    /// True when the only active flag is `brake`.
    #[must_use]
    pub fn is_braking_only(&self) -> bool {
        *self == Self::BRAKE
    }
}

/// Weapon commands for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeaponIntent {
    /// Fire primary weapons.
    pub fire_primary: bool,
    /// Fire secondary weapons.
    pub fire_secondary: bool,
    /// World-space aim point.
    pub aim_at: Vec2,
}

impl WeaponIntent {
    /// Hold fire while tracking a point.
    #[must_use]
    pub fn hold(aim_at: Vec2) -> Self {
        Self {
            fire_primary: false,
            fire_secondary: false,
            aim_at,
        }
    }

    /// Fire primaries at a point.
    #[must_use]
    pub fn fire(aim_at: Vec2) -> Self {
        Self {
            fire_primary: true,
            fire_secondary: false,
            aim_at,
        }
    }
}

/// Utility (shield etc.) commands for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UtilityIntent {
    /// Raise shields.
    pub toggle_shields: bool,
}

impl UtilityIntent {
    /// Shields down.
    pub const IDLE: Self = Self {
        toggle_shields: false,
    };

    /// Shields up.
    pub const SHIELDS: Self = Self {
        toggle_shields: true,
    };
}

/// Everything a state wants the ship to do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShipIntent {
    /// Movement flags.
    pub movement: MovementIntent,
    /// Weapon commands.
    pub weapons: WeaponIntent,
    /// Utility commands.
    pub utility: UtilityIntent,
}

impl ShipIntent {
    /// Assemble an intent from its parts.
    #[must_use]
    pub fn new(movement: MovementIntent, weapons: WeaponIntent, utility: UtilityIntent) -> Self {
        Self {
            movement,
            weapons,
            utility,
        }
    }

    /// No movement, no fire, aiming at `aim_at`.
    #[must_use]
    pub fn inert(aim_at: Vec2) -> Self {
        Self::new(
            MovementIntent::INERT,
            WeaponIntent::hold(aim_at),
            UtilityIntent::IDLE,
        )
    }

    /// Brake in place, no fire, aiming at `aim_at`.
    #[must_use]
    pub fn braking(aim_at: Vec2) -> Self {
        Self::new(
            MovementIntent::BRAKE,
            WeaponIntent::hold(aim_at),
            UtilityIntent::IDLE,
        )
    }
}
