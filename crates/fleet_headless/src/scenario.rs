//! Scenario loading and validation.
//!
//! A scenario lists the ships present at tick zero, which of them fly in
//! formation, and scripted events such as a ship being destroyed at a given
//! tick.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleet_ai::config::AiConfig;
use fleet_ai::error::AiError;
use fleet_ai::formation::FormationShape;
use fleet_ai::math::Vec2;
use fleet_ai::profile::BehaviorProfile;
use fleet_ai::ships::{Faction, ShipId, ShipRecord};
use fleet_test_utils::kinematics::KinematicParams;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Scenario content is inconsistent.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
    /// Config or profile rejected by the agent core.
    #[error(transparent)]
    Ai(#[from] AiError),
}

/// A complete scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Agent tuning.
    pub config: AiConfig,
    /// Movement model.
    pub kinematics: KinematicParams,
    /// Named profiles, checked before the built-in presets.
    pub profiles: BTreeMap<String, BehaviorProfile>,
    /// Ships present at tick zero.
    pub ships: Vec<ShipSetup>,
    /// Formations among those ships.
    pub formations: Vec<FormationSetup>,
    /// Scripted events.
    pub events: Vec<ScriptedEvent>,
    /// When set, only ships within this distance of the player count as on
    /// screen each tick.
    pub view_radius: Option<f32>,
}

/// One ship at tick zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipSetup {
    /// Ship id, unique within the scenario.
    pub id: ShipId,
    /// Side.
    #[serde(default)]
    pub faction: Faction,
    /// Position.
    pub position: (f32, f32),
    /// Heading in radians.
    #[serde(default)]
    pub rotation: f32,
    /// Initial velocity.
    #[serde(default)]
    pub velocity: (f32, f32),
    /// Profile name. Ships without one drift uncontrolled.
    #[serde(default)]
    pub profile: Option<String>,
    /// Always chase the player.
    #[serde(default)]
    pub hunter: bool,
    /// This is the player's ship.
    #[serde(default)]
    pub player: bool,
    /// Cannot be targeted.
    #[serde(default)]
    pub invulnerable: bool,
}

impl ShipSetup {
    /// Build the ship record.
    #[must_use]
    pub fn record(&self) -> ShipRecord {
        let faction = if self.player {
            Faction::Player
        } else {
            self.faction
        };
        let mut ship = ShipRecord::new(self.id, faction, Vec2::new(self.position.0, self.position.1))
            .with_rotation(self.rotation)
            .with_velocity(Vec2::new(self.velocity.0, self.velocity.1));
        if self.invulnerable {
            ship = ship.invulnerable();
        }
        ship
    }
}

fn default_spacing() -> f32 {
    200.0
}

/// A formation among the scenario's ships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationSetup {
    /// Formation id.
    pub id: String,
    /// Layout.
    pub shape: FormationShape,
    /// Slot spacing in world units.
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    /// Leader ship id.
    pub leader: ShipId,
    /// Follower ship ids, in slot order.
    pub followers: Vec<ShipId>,
}

/// Something that happens to a ship at a fixed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptedEvent {
    /// Flag the ship destroyed; its controller keeps running on the wreck.
    Destroy {
        /// Ship.
        ship: ShipId,
        /// Tick before which the event applies.
        tick: u64,
    },
    /// Remove the ship; its controller is pruned on its next update.
    Despawn {
        /// Ship.
        ship: ShipId,
        /// Tick before which the event applies.
        tick: u64,
    },
}

impl ScriptedEvent {
    /// Tick the event fires at.
    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            ScriptedEvent::Destroy { tick, .. } | ScriptedEvent::Despawn { tick, .. } => *tick,
        }
    }

    /// Ship the event targets.
    #[must_use]
    pub fn ship(&self) -> ShipId {
        match self {
            ScriptedEvent::Destroy { ship, .. } | ScriptedEvent::Despawn { ship, .. } => *ship,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Resolve a profile name against custom profiles, then presets.
    pub fn profile(&self, name: &str) -> Result<BehaviorProfile, ScenarioError> {
        match self.profiles.get(name) {
            Some(profile) => Ok(*profile),
            None => Ok(BehaviorProfile::preset(name)?),
        }
    }

    /// Ship setup by id.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&ShipSetup> {
        self.ships.iter().find(|s| s.id == id)
    }

    /// Ids of every ship that flies in a formation.
    #[must_use]
    pub fn formation_members(&self) -> BTreeSet<ShipId> {
        self.formations
            .iter()
            .flat_map(|f| std::iter::once(f.leader).chain(f.followers.iter().copied()))
            .collect()
    }

    /// Check ids, profiles and formation membership.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()?;

        let mut ids = BTreeSet::new();
        for ship in &self.ships {
            if !ids.insert(ship.id) {
                return Err(ScenarioError::Invalid(format!("duplicate ship id {}", ship.id)));
            }
            if let Some(name) = &ship.profile {
                self.profile(name)?;
            }
        }

        if self.ships.iter().filter(|s| s.player).count() > 1 {
            return Err(ScenarioError::Invalid("more than one player ship".to_string()));
        }

        let mut seen = BTreeSet::new();
        for formation in &self.formations {
            for id in std::iter::once(formation.leader).chain(formation.followers.iter().copied()) {
                let Some(ship) = self.ship(id) else {
                    return Err(ScenarioError::Invalid(format!(
                        "formation '{}' references unknown ship {id}",
                        formation.id
                    )));
                };
                if ship.player || ship.profile.is_none() {
                    return Err(ScenarioError::Invalid(format!(
                        "formation '{}' member {id} is not AI-controlled",
                        formation.id
                    )));
                }
                if !seen.insert(id) {
                    return Err(ScenarioError::Invalid(format!(
                        "ship {id} belongs to more than one formation"
                    )));
                }
            }
        }

        for event in &self.events {
            if !ids.contains(&event.ship()) {
                return Err(ScenarioError::Invalid(format!(
                    "event references unknown ship {}",
                    event.ship()
                )));
            }
        }

        Ok(())
    }
}
