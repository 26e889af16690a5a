//! Scheduler owning every agent controller.
//!
//! The orchestrator is an explicit context object: create one per
//! simulation, register controllers with it, and call
//! [`Orchestrator::update`] once per frame. Controllers run in ascending
//! [`ControllerId`] order so a run with the same seed and inputs is
//! reproducible.
//!
//! # Failure isolation
//!
//! - Ships that vanished or became structurally invalid are removed after
//!   the pass, so every other controller still runs this tick.
//! - Driver errors are logged and cost only the failing controller's frame.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, SchedulingPolicy};
use crate::controller::{AgentController, FormationContext, UpdateOutcome, WorldView};
use crate::error::{AiError, Result};
use crate::formation::{Formation, FormationRegistry};
use crate::ships::{ShipDirectory, ShipId};
use crate::states::{BehaviorState, Roster};

/// Handle for a registered controller. Assigned in increasing order.
pub type ControllerId = u64;

/// A controller whose drivers failed this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerError {
    /// Failing controller.
    pub controller: ControllerId,
    /// Its ship.
    pub ship: ShipId,
    /// Error text.
    pub message: String,
}

/// What happened during one [`Orchestrator::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Controllers that completed their frame.
    pub updated: usize,
    /// Controllers left out by the scheduling policy.
    pub skipped: usize,
    /// Ships whose controllers were removed after the pass.
    pub removed: Vec<ShipId>,
    /// Controllers that hit a transient error.
    pub errors: Vec<ControllerError>,
}

/// Owns and drives every [`AgentController`].
#[derive(Debug)]
pub struct Orchestrator {
    controllers: BTreeMap<ControllerId, AgentController>,
    next_id: ControllerId,
    registry: Rc<RefCell<FormationRegistry>>,
    config: AiConfig,
    rng: ChaCha8Rng,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(AiConfig::default())
    }
}

impl Orchestrator {
    /// Create an orchestrator with an empty formation registry.
    #[must_use]
    pub fn new(config: AiConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            controllers: BTreeMap::new(),
            next_id: 1,
            registry: Rc::new(RefCell::new(FormationRegistry::new())),
            config,
            rng,
        }
    }

    /// Tunables in use.
    #[must_use]
    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Shared formation registry.
    #[must_use]
    pub fn formation_registry(&self) -> &Rc<RefCell<FormationRegistry>> {
        &self.registry
    }

    // ------------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------------

    /// Register a controller.
    pub fn add_controller(&mut self, controller: AgentController) -> ControllerId {
        let id = self.next_id;
        self.next_id += 1;
        tracing::debug!(
            controller = id,
            ship = controller.ship_id(),
            state = controller.state_name(),
            "Added controller"
        );
        self.controllers.insert(id, controller);
        id
    }

    /// Unregister a controller.
    ///
    /// # Errors
    /// [`AiError::ControllerNotFound`] if `id` is not registered.
    pub fn remove_controller(&mut self, id: ControllerId) -> Result<AgentController> {
        self.controllers
            .remove(&id)
            .ok_or(AiError::ControllerNotFound(id))
    }

    /// Unregister every controller driving `ship`. Returns how many were removed.
    pub fn remove_controllers_for_ship(&mut self, ship: ShipId) -> usize {
        let before = self.controllers.len();
        self.controllers.retain(|_, c| c.ship_id() != ship);
        let removed = before - self.controllers.len();
        if removed > 0 {
            tracing::debug!(ship, removed, "Removed controllers for ship");
        }
        removed
    }

    /// Number of registered controllers.
    #[must_use]
    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Drop every controller. Formations stay registered.
    pub fn clear(&mut self) {
        self.controllers.clear();
    }

    /// Controller by id.
    #[must_use]
    pub fn controller(&self, id: ControllerId) -> Option<&AgentController> {
        self.controllers.get(&id)
    }

    /// Mutable controller by id.
    pub fn controller_mut(&mut self, id: ControllerId) -> Option<&mut AgentController> {
        self.controllers.get_mut(&id)
    }

    /// First controller (by id) driving `ship`.
    #[must_use]
    pub fn controller_for_ship(&self, ship: ShipId) -> Option<&AgentController> {
        self.controllers.values().find(|c| c.ship_id() == ship)
    }

    /// The controller driving the leader of `id`'s formation.
    #[must_use]
    pub fn formation_leader_controller(&self, id: ControllerId) -> Option<&AgentController> {
        let leader = self.controllers.get(&id)?.formation_leader_id()?;
        self.controller_for_ship(leader)
    }

    /// Iterate controllers in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ControllerId, &AgentController)> {
        self.controllers.iter().map(|(&id, c)| (id, c))
    }

    /// Register a formation and its controllers in one step.
    ///
    /// The formation is registered before any follower is added, so no
    /// follower ever looks up a formation that isn't there yet. Followers get
    /// a follower link and start (and fall back) in the formation state.
    /// Returns the leader's id followed by the followers' ids.
    pub fn enlist_formation(
        &mut self,
        formation: Formation,
        mut leader: AgentController,
        followers: Vec<AgentController>,
    ) -> Vec<ControllerId> {
        let formation_id = formation.formation_id.clone();
        let leader_ship = formation.leader_id;
        self.registry.borrow_mut().register_formation(formation);

        let weak = Rc::downgrade(&self.registry);
        leader.set_formation_context(FormationContext::leader(
            formation_id.clone(),
            weak.clone(),
            leader_ship,
        ));

        let mut ids = Vec::with_capacity(followers.len() + 1);
        ids.push(self.add_controller(leader));

        for mut follower in followers {
            follower.set_formation_context(FormationContext::follower(
                formation_id.clone(),
                weak.clone(),
                leader_ship,
            ));
            follower.set_initial_state(BehaviorState::formation());
            ids.push(self.add_controller(follower));
        }

        ids
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    fn is_scheduled(
        policy: SchedulingPolicy,
        controller: &AgentController,
        active: Option<&HashSet<ShipId>>,
    ) -> bool {
        match (policy, active) {
            (SchedulingPolicy::UpdateAll, _) | (SchedulingPolicy::ActiveSetOnly, None) => true,
            (SchedulingPolicy::ActiveSetOnly, Some(active)) => {
                controller.is_hunter()
                    || controller.is_uncullable()
                    || active.contains(&controller.ship_id())
            }
        }
    }

    /// Advance every scheduled controller by `dt` seconds.
    ///
    /// `active` is the externally computed set of on-screen ships; how it is
    /// used depends on [`AiConfig::scheduling`].
    pub fn update(
        &mut self,
        dt: f32,
        ships: &dyn ShipDirectory,
        active: Option<&HashSet<ShipId>>,
    ) -> TickReport {
        let mut report = TickReport::default();
        let mut stale = Vec::new();

        let mut roster: Roster = self
            .controllers
            .values()
            .map(|c| (c.ship_id(), c.summary()))
            .collect();

        let policy = self.config.scheduling;
        for (&id, controller) in &mut self.controllers {
            if !Self::is_scheduled(policy, controller, active) {
                report.skipped += 1;
                continue;
            }

            let world = WorldView {
                ships,
                roster: &roster,
                config: &self.config,
            };

            match controller.update(dt, &world, &mut self.rng) {
                UpdateOutcome::Ok => report.updated += 1,
                UpdateOutcome::InvalidEntity => {
                    tracing::warn!(
                        controller = id,
                        ship = controller.ship_id(),
                        "Ship missing or invalid, removing controller"
                    );
                    stale.push(id);
                }
                UpdateOutcome::TransientError(err) => {
                    tracing::warn!(
                        controller = id,
                        ship = controller.ship_id(),
                        error = %err,
                        "Controller update failed"
                    );
                    report.errors.push(ControllerError {
                        controller: id,
                        ship: controller.ship_id(),
                        message: err.to_string(),
                    });
                }
            }

            roster.insert(controller.ship_id(), controller.summary());
        }

        for id in stale {
            if let Some(controller) = self.controllers.remove(&id) {
                report.removed.push(controller.ship_id());
            }
        }

        tracing::trace!(
            updated = report.updated,
            skipped = report.skipped,
            removed = report.removed.len(),
            errors = report.errors.len(),
            "Orchestrator tick"
        );

        report
    }
}
