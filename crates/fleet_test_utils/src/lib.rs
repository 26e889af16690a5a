//! # Fleet Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Ship and controller fixtures, recording and failing drivers
//! - A kinematic sandbox standing in for the external movement system
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod kinematics;
pub mod sandbox;

/// Re-export proptest for convenience.
pub use proptest;
