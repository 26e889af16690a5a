//! # Fleet AI
//!
//! Autonomous ship-agent core for a real-time spaceship combat simulation.
//!
//! This crate contains **only** the agent layer:
//! - No rendering
//! - No physics integration (intents are handed to external drivers)
//! - No spawning decisions
//! - Seeded randomness only (patrol wandering)
//!
//! Every frame the [`orchestrator::Orchestrator`] walks its controllers in a
//! fixed order. Each [`controller::AgentController`] asks its active
//! [`states::BehaviorState`] for a [`intent::ShipIntent`], pushes it into the
//! movement/weapon/utility drivers, and then lets the state propose a
//! transition.
//!
//! ## Crate Structure
//!
//! - [`math`] - 2D vector and angle helpers
//! - [`steering`] - Face/approach/orbit steering and lead prediction
//! - [`ships`] - Ship boundary types, directory trait and spatial grid
//! - [`formation`] - Formation registry and prefab layouts
//! - [`states`] - Behavior state machine
//! - [`controller`] - Per-ship agent controller
//! - [`orchestrator`] - Scheduler that owns every controller
//! - [`config`] - Tunables loaded from RON

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod controller;
pub mod error;
pub mod formation;
pub mod intent;
pub mod math;
pub mod orchestrator;
pub mod profile;
pub mod ships;
pub mod states;
pub mod steering;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AiConfig, SchedulingPolicy, WorldBounds};
    pub use crate::controller::{
        AgentController, CullingDelegate, FormationContext, FormationRole, MovementDriver,
        UpdateOutcome, UtilityDriver, WeaponDriver, WorldView,
    };
    pub use crate::error::{AiError, Result};
    pub use crate::formation::{
        Formation, FormationId, FormationMember, FormationRegistry, FormationShape,
    };
    pub use crate::intent::{MovementIntent, ShipIntent, UtilityIntent, WeaponIntent};
    pub use crate::math::Vec2;
    pub use crate::orchestrator::{ControllerId, Orchestrator, TickReport};
    pub use crate::profile::{AttackStyle, BehaviorProfile, InitialState, SeekStyle};
    pub use crate::ships::{
        EngineBlock, Faction, ShipAffixes, ShipDirectory, ShipId, ShipRecord, ShipTable,
        Transform,
    };
    pub use crate::states::{
        AttackPhase, AttackState, BehaviorState, FormationAttackState, FormationSeekState,
        FormationState, IdleState, PatrolState, SeekState, StateKind, StateSummary,
        StationAttackState, Transition,
    };
    pub use crate::steering::{approach_target, face_target, lead_target, orbit_target};
}
