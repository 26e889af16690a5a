//! Error types for the agent core.

use thiserror::Error;

use crate::ships::ShipId;

/// Result type alias using [`AiError`].
pub type Result<T> = std::result::Result<T, AiError>;

/// Top-level error type for the agent core.
///
/// None of these are fatal to the scheduler. Driver failures surface as
/// [`crate::controller::UpdateOutcome::TransientError`] and only cost the
/// offending controller one frame.
#[derive(Debug, Error)]
pub enum AiError {
    /// A movement, weapon or utility driver failed to advance.
    #[error("{driver} driver failed for ship {ship}: {message}")]
    DriverFailed {
        /// Which driver failed ("movement", "weapon", "utility").
        driver: &'static str,
        /// Ship the driver was advancing.
        ship: ShipId,
        /// Driver-supplied reason.
        message: String,
    },

    /// Referenced controller does not exist.
    #[error("Controller not found: {0}")]
    ControllerNotFound(u64),

    /// Failed to read a configuration file.
    #[error("Failed to read config file: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Failed to parse a RON configuration.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// A configuration value is out of its allowed range.
    #[error("Invalid config value '{field}': {reason}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Unknown behavior profile preset name.
    #[error("Unknown behavior profile: {0}")]
    UnknownProfile(String),
}

impl AiError {
    /// Convenience constructor for driver failures.
    pub fn driver(driver: &'static str, ship: ShipId, message: impl Into<String>) -> Self {
        Self::DriverFailed {
            driver,
            ship,
            message: message.into(),
        }
    }
}
