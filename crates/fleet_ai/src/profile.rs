//! Behavior profiles: how a ship fights and where it starts.

use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};

/// How a mobile ship attacks once in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttackStyle {
    /// Circle the target and fire at the lead point.
    #[default]
    Orbit,
    /// Charge with shields up, then back off and circle before charging again.
    Ram,
}

/// How a ship closes on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeekStyle {
    /// Fly toward the target.
    #[default]
    Pursue,
    /// Never moves; attacks from where it stands.
    Stationary,
}

/// State a controller starts in (and falls back to).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum InitialState {
    /// Sit still until something comes within the configured wake radius.
    Idle,
    /// Wander around the map.
    #[default]
    Patrol,
    /// Sit still with a custom wake radius.
    Ambush {
        /// Radius at which the ambusher wakes.
        wake_radius: f32,
    },
}

/// Per-ship behavior configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorProfile {
    /// Attack style for mobile attacks.
    pub attack: AttackStyle,
    /// Seek style.
    pub seek: SeekStyle,
    /// Starting state; `None` picks from the seek style.
    pub initial_state: Option<InitialState>,
}

impl BehaviorProfile {
    /// Orbiting gunship that patrols.
    #[must_use]
    pub fn fighter() -> Self {
        Self {
            attack: AttackStyle::Orbit,
            seek: SeekStyle::Pursue,
            initial_state: Some(InitialState::Patrol),
        }
    }

    /// Shielded rammer that patrols.
    #[must_use]
    pub fn rammer() -> Self {
        Self {
            attack: AttackStyle::Ram,
            seek: SeekStyle::Pursue,
            initial_state: Some(InitialState::Patrol),
        }
    }

    /// Fixed emplacement.
    #[must_use]
    pub fn turret() -> Self {
        Self {
            attack: AttackStyle::Orbit,
            seek: SeekStyle::Stationary,
            initial_state: Some(InitialState::Idle),
        }
    }

    /// Waits silently, then chases whatever gets close.
    #[must_use]
    pub fn ambusher() -> Self {
        Self {
            attack: AttackStyle::Orbit,
            seek: SeekStyle::Pursue,
            initial_state: Some(InitialState::Ambush { wake_radius: 2400.0 }),
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "fighter" => Ok(Self::fighter()),
            "rammer" => Ok(Self::rammer()),
            "turret" => Ok(Self::turret()),
            "ambusher" => Ok(Self::ambusher()),
            other => Err(AiError::UnknownProfile(other.to_string())),
        }
    }

    /// Whether the ship never moves.
    #[must_use]
    pub fn is_stationary(&self) -> bool {
        self.seek == SeekStyle::Stationary
    }

    /// Starting state, defaulting stationary ships to idle and everything else
    /// to patrol.
    #[must_use]
    pub fn resolved_initial_state(&self) -> InitialState {
        self.initial_state.unwrap_or(if self.is_stationary() {
            InitialState::Idle
        } else {
            InitialState::Patrol
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_resolve() {
        assert_eq!(BehaviorProfile::preset("rammer").unwrap().attack, AttackStyle::Ram);
        assert!(BehaviorProfile::preset("turret").unwrap().is_stationary());
        assert!(matches!(
            BehaviorProfile::preset("kamikaze"),
            Err(AiError::UnknownProfile(name)) if name == "kamikaze"
        ));
    }

    #[test]
    fn test_initial_state_defaults_from_seek_style() {
        let mobile = BehaviorProfile::default();
        assert_eq!(mobile.resolved_initial_state(), InitialState::Patrol);

        let stationary = BehaviorProfile {
            seek: SeekStyle::Stationary,
            ..BehaviorProfile::default()
        };
        assert_eq!(stationary.resolved_initial_state(), InitialState::Idle);
    }

    #[test]
    fn test_profile_from_ron() {
        let profile: BehaviorProfile =
            ron::from_str("(attack: Ram, initial_state: Some(Ambush(wake_radius: 500.0)))").unwrap();
        assert_eq!(profile.attack, AttackStyle::Ram);
        assert_eq!(profile.seek, SeekStyle::Pursue);
        assert_eq!(
            profile.initial_state,
            Some(InitialState::Ambush { wake_radius: 500.0 })
        );
    }
}
