//! Per-ship agent controller.
//!
//! One controller drives one ship. It owns the active [`BehaviorState`],
//! turns the state's intent into driver calls, and applies whatever
//! transition the state proposes. The ship itself is looked up by id every
//! frame, so a controller never outlives its ship by more than one tick.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use rand_chacha::ChaCha8Rng;

use crate::config::AiConfig;
use crate::error::{AiError, Result};
use crate::formation::{FormationId, FormationRegistry};
use crate::intent::{MovementIntent, ShipIntent, UtilityIntent, WeaponIntent};
use crate::profile::BehaviorProfile;
use crate::ships::{ShipDirectory, ShipId, ShipRecord, Transform};
use crate::states::{AgentContext, BehaviorState, Roster, StateKind, StateSummary, Transition};

// ============================================================================
// External collaborators
// ============================================================================

/// Consumes movement intents and applies them to the ship.
pub trait MovementDriver {
    /// Replace the intent applied on the next [`MovementDriver::update`].
    fn set_intent(&mut self, intent: MovementIntent);

    /// Advance one frame.
    ///
    /// # Errors
    /// Any error skips the rest of this controller's frame; the controller
    /// is kept and retried next tick.
    fn update(&mut self, dt: f32, ship: &ShipRecord, transform: Transform) -> Result<()>;
}

/// Consumes weapon intents.
pub trait WeaponDriver {
    /// Replace the intent applied on the next [`WeaponDriver::update`].
    fn set_intent(&mut self, intent: WeaponIntent);

    /// Advance one frame.
    ///
    /// # Errors
    /// See [`MovementDriver::update`].
    fn update(&mut self, dt: f32, ship: &ShipRecord, transform: Transform) -> Result<()>;
}

/// Consumes utility intents.
pub trait UtilityDriver {
    /// Replace the intent applied on the next [`UtilityDriver::update`].
    fn set_intent(&mut self, intent: UtilityIntent);

    /// Advance one frame.
    ///
    /// # Errors
    /// See [`MovementDriver::update`].
    fn update(&mut self, dt: f32, ship: &ShipRecord, transform: Transform) -> Result<()>;
}

/// Viewport culling hook. Combat states ask to stay updated off-screen.
pub trait CullingDelegate {
    /// Exempt `ship` from culling.
    fn make_uncullable(&mut self, ship: ShipId);
}

// ============================================================================
// Formation link
// ============================================================================

/// Role within a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormationRole {
    /// Sets the course; runs ordinary states.
    Leader,
    /// Holds a slot relative to the leader.
    Follower,
}

/// A controller's membership in a formation.
///
/// The registry is held weakly; once the owner drops it, followers abandon
/// the formation on their next transition check.
#[derive(Debug, Clone)]
pub struct FormationContext {
    /// Formation id in the registry.
    pub formation_id: FormationId,
    /// Leader or follower.
    pub role: FormationRole,
    /// Shared registry.
    pub registry: Weak<RefCell<FormationRegistry>>,
    /// Leader ship; resolved through the roster every tick.
    pub leader: ShipId,
}

impl FormationContext {
    /// Context for the formation's leader.
    #[must_use]
    pub fn leader(
        formation_id: impl Into<FormationId>,
        registry: Weak<RefCell<FormationRegistry>>,
        leader: ShipId,
    ) -> Self {
        Self {
            formation_id: formation_id.into(),
            role: FormationRole::Leader,
            registry,
            leader,
        }
    }

    /// Context for a follower of `leader`.
    #[must_use]
    pub fn follower(
        formation_id: impl Into<FormationId>,
        registry: Weak<RefCell<FormationRegistry>>,
        leader: ShipId,
    ) -> Self {
        Self {
            formation_id: formation_id.into(),
            role: FormationRole::Follower,
            registry,
            leader,
        }
    }

    /// The registry, if it is still alive.
    #[must_use]
    pub fn registry(&self) -> Option<Rc<RefCell<FormationRegistry>>> {
        self.registry.upgrade()
    }

    /// Whether this is a follower link.
    #[must_use]
    pub fn is_follower(&self) -> bool {
        self.role == FormationRole::Follower
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Result of one controller frame.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Frame ran; a transition may have been applied.
    Ok,
    /// Ship is gone or structurally invalid. The controller should be removed.
    InvalidEntity,
    /// A driver failed. The transition was skipped; retry next tick.
    TransientError(AiError),
}

impl UpdateOutcome {
    /// Whether the frame completed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, UpdateOutcome::Ok)
    }
}

/// Read-only world view for one controller frame.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    /// Ship lookup.
    pub ships: &'a dyn ShipDirectory,
    /// Other controllers' states.
    pub roster: &'a Roster,
    /// Tunables.
    pub config: &'a AiConfig,
}

/// Drives one ship's behavior.
pub struct AgentController {
    ship_id: ShipId,
    movement: Box<dyn MovementDriver>,
    weapons: Box<dyn WeaponDriver>,
    utility: Box<dyn UtilityDriver>,
    profile: BehaviorProfile,
    current_state: BehaviorState,
    initial_state: BehaviorState,
    formation: Option<FormationContext>,
    hunter: bool,
    uncullable: bool,
    culling: Option<Box<dyn CullingDelegate>>,
    last_intent: ShipIntent,
}

impl fmt::Debug for AgentController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentController")
            .field("ship_id", &self.ship_id)
            .field("profile", &self.profile)
            .field("current_state", &self.current_state)
            .field("initial_state", &self.initial_state)
            .field("formation", &self.formation)
            .field("hunter", &self.hunter)
            .field("uncullable", &self.uncullable)
            .finish_non_exhaustive()
    }
}

impl AgentController {
    /// Create a controller starting in the profile's initial state.
    #[must_use]
    pub fn new(
        ship_id: ShipId,
        profile: BehaviorProfile,
        movement: Box<dyn MovementDriver>,
        weapons: Box<dyn WeaponDriver>,
        utility: Box<dyn UtilityDriver>,
    ) -> Self {
        let initial = BehaviorState::from_initial(profile.resolved_initial_state());
        Self {
            ship_id,
            movement,
            weapons,
            utility,
            profile,
            current_state: initial.clone(),
            initial_state: initial,
            formation: None,
            hunter: false,
            uncullable: false,
            culling: None,
            last_intent: ShipIntent::default(),
        }
    }

    /// Attach a culling delegate.
    #[must_use]
    pub fn with_culling_delegate(mut self, delegate: Box<dyn CullingDelegate>) -> Self {
        self.culling = Some(delegate);
        self
    }

    /// Ship this controller drives.
    #[must_use]
    pub fn ship_id(&self) -> ShipId {
        self.ship_id
    }

    /// Behavior profile.
    #[must_use]
    pub fn profile(&self) -> &BehaviorProfile {
        &self.profile
    }

    /// Active state.
    #[must_use]
    pub fn state(&self) -> &BehaviorState {
        &self.current_state
    }

    /// Active state's display name.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        self.current_state.name()
    }

    /// Active state's kind.
    #[must_use]
    pub fn state_kind(&self) -> StateKind {
        self.current_state.kind()
    }

    /// Active state's target, if it has one.
    #[must_use]
    pub fn state_target(&self) -> Option<ShipId> {
        self.current_state.target()
    }

    /// Kind plus target.
    #[must_use]
    pub fn summary(&self) -> StateSummary {
        self.current_state.summary()
    }

    /// Intent produced on the last completed frame.
    #[must_use]
    pub fn last_intent(&self) -> &ShipIntent {
        &self.last_intent
    }

    // ------------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------------

    /// Run one frame.
    ///
    /// Never panics. A missing or hollow ship reports
    /// [`UpdateOutcome::InvalidEntity`]; a driver failure reports
    /// [`UpdateOutcome::TransientError`] and leaves the state untouched.
    pub fn update(&mut self, dt: f32, world: &WorldView<'_>, rng: &mut ChaCha8Rng) -> UpdateOutcome {
        let Some(ship) = world.ships.ship(self.ship_id) else {
            return UpdateOutcome::InvalidEntity;
        };
        if !ship.is_structurally_valid() {
            return UpdateOutcome::InvalidEntity;
        }

        let intent = {
            let mut ctx = AgentContext {
                ship,
                ships: world.ships,
                roster: world.roster,
                profile: &self.profile,
                formation: self.formation.as_ref(),
                hunter: self.hunter,
                initial_state: &self.initial_state,
                config: world.config,
                rng: &mut *rng,
            };
            self.current_state.update(dt, &mut ctx)
        };
        self.last_intent = intent;

        if let Err(err) = self.drive(dt, ship, intent) {
            return UpdateOutcome::TransientError(err);
        }

        let transition = {
            let ctx = AgentContext {
                ship,
                ships: world.ships,
                roster: world.roster,
                profile: &self.profile,
                formation: self.formation.as_ref(),
                hunter: self.hunter,
                initial_state: &self.initial_state,
                config: world.config,
                rng,
            };
            self.current_state.transition_if_needed(&ctx)
        };

        if let Some(transition) = transition {
            self.apply_transition(transition);
        }

        UpdateOutcome::Ok
    }

    fn drive(&mut self, dt: f32, ship: &ShipRecord, intent: ShipIntent) -> Result<()> {
        let transform = ship.transform;

        self.movement.set_intent(intent.movement);
        self.weapons.set_intent(intent.weapons);
        self.utility.set_intent(intent.utility);

        self.movement.update(dt, ship, transform)?;
        self.weapons.update(dt, ship, transform)?;
        self.utility.update(dt, ship, transform)?;
        Ok(())
    }

    fn apply_transition(&mut self, transition: Transition) {
        let Transition {
            next,
            remember_as_initial,
            abandon_formation,
        } = transition;

        if abandon_formation {
            self.abandon_formation();
        }
        if remember_as_initial {
            self.initial_state = next.clone();
        }

        tracing::debug!(
            ship = self.ship_id,
            from = self.current_state.name(),
            to = next.name(),
            target = ?next.target(),
            "State transition"
        );

        self.current_state = next;
        self.on_enter();
    }

    fn on_enter(&mut self) {
        if self.current_state.kind().requests_culling_exemption() {
            self.make_uncullable();
        }
    }

    /// Exempt this ship from culling, notifying the delegate if one is set.
    pub fn make_uncullable(&mut self) {
        self.uncullable = true;
        if let Some(delegate) = self.culling.as_mut() {
            delegate.make_uncullable(self.ship_id);
        }
    }

    /// Whether this ship asked to be updated even when off-screen.
    #[must_use]
    pub fn is_uncullable(&self) -> bool {
        self.uncullable
    }

    /// Drop the formation: remove it from the registry and clear the link.
    fn abandon_formation(&mut self) {
        let Some(context) = self.formation.take() else {
            return;
        };
        if let Some(registry) = context.registry() {
            registry.borrow_mut().remove_formation(&context.formation_id);
        }
        tracing::debug!(
            ship = self.ship_id,
            formation = %context.formation_id,
            "Abandoned formation"
        );
    }

    // ------------------------------------------------------------------------
    // Initial state
    // ------------------------------------------------------------------------

    /// Record `state` as the fallback and switch to it now.
    pub fn set_initial_state(&mut self, state: BehaviorState) {
        self.initial_state = state.clone();
        self.current_state = state;
        self.on_enter();
    }

    /// Fallback state used when a chase ends.
    #[must_use]
    pub fn initial_state(&self) -> &BehaviorState {
        &self.initial_state
    }

    // ------------------------------------------------------------------------
    // Hunter
    // ------------------------------------------------------------------------

    /// Mark or unmark as a hunter.
    pub fn set_hunter(&mut self, hunter: bool) {
        self.hunter = hunter;
    }

    /// Whether this ship always hunts the player.
    #[must_use]
    pub fn is_hunter(&self) -> bool {
        self.hunter
    }

    // ------------------------------------------------------------------------
    // Formation
    // ------------------------------------------------------------------------

    /// Join a formation.
    pub fn set_formation_context(&mut self, context: FormationContext) {
        self.formation = Some(context);
    }

    /// Leave the formation without touching the registry.
    pub fn clear_formation_context(&mut self) {
        self.formation = None;
    }

    /// Current formation link.
    #[must_use]
    pub fn formation_context(&self) -> Option<&FormationContext> {
        self.formation.as_ref()
    }

    /// Whether this ship leads a formation.
    #[must_use]
    pub fn is_formation_leader(&self) -> bool {
        self.formation
            .as_ref()
            .is_some_and(|f| f.role == FormationRole::Leader)
    }

    /// Whether this ship follows a formation leader.
    #[must_use]
    pub fn is_formation_follower(&self) -> bool {
        self.formation.as_ref().is_some_and(FormationContext::is_follower)
    }

    /// Formation id, if in one.
    #[must_use]
    pub fn formation_id(&self) -> Option<&str> {
        self.formation.as_ref().map(|f| f.formation_id.as_str())
    }

    /// Shared registry, if in a formation and the registry is still alive.
    #[must_use]
    pub fn formation_registry(&self) -> Option<Rc<RefCell<FormationRegistry>>> {
        self.formation.as_ref().and_then(FormationContext::registry)
    }

    /// Leader ship id, if in a formation.
    #[must_use]
    pub fn formation_leader_id(&self) -> Option<ShipId> {
        self.formation.as_ref().map(|f| f.leader)
    }

    /// The leader controller's state this tick, if its controller is still
    /// registered.
    #[must_use]
    pub fn formation_leader_controller(&self, roster: &Roster) -> Option<StateSummary> {
        self.formation_leader_id()
            .and_then(|leader| roster.get(&leader).copied())
    }
}
