//! Headless fleet runner for scenario playback and CI verification.
//!
//! Loads a RON scenario, builds a kinematic sandbox around the agent core,
//! runs it for a fixed number of ticks and reports the outcome as JSON.
//!
//! - **stdout**: the JSON report
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Run a scenario for 60 seconds of game time
//! cargo run -p fleet_headless -- run --scenario scenarios/skirmish.ron --ticks 3600
//!
//! # Verify determinism
//! cargo run -p fleet_headless -- verify --scenario scenarios/escort.ron --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod runner;
pub mod scenario;

pub use runner::{verify_scenario, RunReport, ScenarioRunner};
pub use scenario::{FormationSetup, Scenario, ScenarioError, ScriptedEvent, ShipSetup};
