//! Tunables for the agent layer.
//!
//! Defaults reproduce the shipped behavior. A RON file may override any
//! subset of fields; missing fields keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::math::Vec2;

/// Play-area dimensions, centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Total width in world units.
    pub width: f32,
    /// Total height in world units.
    pub height: f32,
}

impl WorldBounds {
    /// Clamp a point to the world shrunk by `margin` on every side.
    #[must_use]
    pub fn clamp_inside(&self, point: Vec2, margin: f32) -> Vec2 {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        Vec2::new(
            point.x.clamp(-half_w + margin, half_w - margin),
            point.y.clamp(-half_h + margin, half_h - margin),
        )
    }

    /// Whether a point lies inside the world shrunk by `margin`.
    #[must_use]
    pub fn contains_with_margin(&self, point: Vec2, margin: f32) -> bool {
        let half_w = self.width / 2.0 - margin;
        let half_h = self.height / 2.0 - margin;
        point.x >= -half_w && point.x <= half_w && point.y >= -half_h && point.y <= half_h
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: 40_000.0,
            height: 40_000.0,
        }
    }
}

/// Which controllers the orchestrator updates each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SchedulingPolicy {
    /// Every registered controller, every tick. The active set is ignored.
    #[default]
    UpdateAll,
    /// Only controllers whose ship is in the active set, plus hunters and
    /// controllers that asked to be exempt from culling.
    ActiveSetOnly,
}

/// Agent tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Play area.
    pub world: WorldBounds,
    /// Idle ships notice hostiles inside this radius.
    pub idle_wake_radius: f32,
    /// Patrolling ships notice hostiles inside this radius.
    pub patrol_wake_radius: f32,
    /// Maximum distance of a new wander point from the ship.
    pub patrol_radius: f32,
    /// Wander points stay this far inside the world edge.
    pub patrol_edge_margin: f32,
    /// Distance at which a wander point counts as reached.
    pub patrol_arrival_radius: f32,
    /// Seconds spent braking at a wander point before picking another.
    pub patrol_dwell_secs: f32,
    /// Seek switches to attack at or inside this distance.
    pub engagement_range: f32,
    /// Non-hunters give up the chase beyond this distance from the player.
    pub seek_leash_range: f32,
    /// Mobile attackers fall back to seeking beyond this distance.
    pub attack_disengage_range: f32,
    /// Stationary attackers go idle beyond this distance.
    pub station_attack_range: f32,
    /// Formation attackers fall back to formation seeking beyond this.
    pub formation_disengage_range: f32,
    /// Orbit radius for orbit-style attacks.
    pub orbit_radius: f32,
    /// Seconds a rammer orbits after a hit before ramming again.
    pub ram_orbit_secs: f32,
    /// Projectile speed used for lead prediction.
    pub projectile_speed: f32,
    /// Scheduling policy for the active-set signal.
    pub scheduling: SchedulingPolicy,
    /// Seed for patrol wander points.
    pub seed: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            world: WorldBounds::default(),
            idle_wake_radius: 1600.0,
            patrol_wake_radius: 3600.0,
            patrol_radius: 6000.0,
            patrol_edge_margin: 1000.0,
            patrol_arrival_radius: 100.0,
            patrol_dwell_secs: 4.0,
            engagement_range: 1200.0,
            seek_leash_range: 4000.0,
            attack_disengage_range: 1400.0,
            station_attack_range: 1600.0,
            formation_disengage_range: 1800.0,
            orbit_radius: 300.0,
            ram_orbit_secs: 10.0,
            projectile_speed: 400.0,
            scheduling: SchedulingPolicy::UpdateAll,
            seed: 0x5EED,
        }
    }
}

impl AiConfig {
    /// Load a config from a RON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Parse a config from a RON string and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: AiConfig = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the state machine.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("idle_wake_radius", self.idle_wake_radius),
            ("patrol_wake_radius", self.patrol_wake_radius),
            ("patrol_radius", self.patrol_radius),
            ("patrol_arrival_radius", self.patrol_arrival_radius),
            ("engagement_range", self.engagement_range),
            ("seek_leash_range", self.seek_leash_range),
            ("attack_disengage_range", self.attack_disengage_range),
            ("station_attack_range", self.station_attack_range),
            ("formation_disengage_range", self.formation_disengage_range),
            ("orbit_radius", self.orbit_radius),
            ("projectile_speed", self.projectile_speed),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AiError::InvalidConfig {
                    field,
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }

        if self.patrol_dwell_secs < 0.0 || self.ram_orbit_secs < 0.0 {
            return Err(AiError::InvalidConfig {
                field: "patrol_dwell_secs",
                reason: "timers cannot be negative".to_string(),
            });
        }

        // Equal radii would let an attacker flip between seek and attack every frame.
        if self.attack_disengage_range <= self.engagement_range {
            return Err(AiError::InvalidConfig {
                field: "attack_disengage_range",
                reason: format!(
                    "must exceed engagement_range ({} <= {})",
                    self.attack_disengage_range, self.engagement_range
                ),
            });
        }
        if self.formation_disengage_range <= self.engagement_range {
            return Err(AiError::InvalidConfig {
                field: "formation_disengage_range",
                reason: format!(
                    "must exceed engagement_range ({} <= {})",
                    self.formation_disengage_range, self.engagement_range
                ),
            });
        }

        let min_extent = self.world.width.min(self.world.height);
        if min_extent <= 2.0 * self.patrol_edge_margin {
            return Err(AiError::InvalidConfig {
                field: "world",
                reason: format!(
                    "world extent {min_extent} leaves no room inside a {} margin",
                    self.patrol_edge_margin
                ),
            });
        }

        Ok(())
    }
}
