//! Behavior state machine.
//!
//! A controller owns exactly one [`BehaviorState`]. Every frame the state
//! produces a [`ShipIntent`] and may propose a [`Transition`]; the controller
//! applies it wholesale. States never touch the controller directly: anything
//! they need (their ship, the world, the formation link, the fallback state)
//! arrives through an [`AgentContext`].

use std::collections::HashMap;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::controller::FormationContext;
use crate::intent::ShipIntent;
use crate::profile::{BehaviorProfile, InitialState};
use crate::ships::{ShipDirectory, ShipId, ShipRecord};

pub mod attack;
pub mod formation;
pub mod idle;
pub mod patrol;
pub mod seek;

pub use attack::{AttackPhase, AttackState, StationAttackState};
pub use formation::{formation_slot, FormationAttackState, FormationSeekState, FormationState};
pub use idle::IdleState;
pub use patrol::PatrolState;
pub use seek::SeekState;

/// Per-tick view of every controller's state, keyed by ship.
///
/// Followers read their leader's entry to mirror it.
pub type Roster = HashMap<ShipId, StateSummary>;

/// Which variant a state is, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    /// Waiting for something to come close.
    Idle,
    /// Wandering between random points.
    Patrol,
    /// Closing on a target.
    SeekTarget,
    /// Mobile attack.
    Attack,
    /// Stationary attack.
    StationAttack,
    /// Holding a formation slot.
    Formation,
    /// Holding a slot while the leader closes on a target.
    FormationSeekTarget,
    /// Holding a slot and firing while the leader attacks.
    FormationAttack,
}

impl StateKind {
    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            StateKind::Idle => "Idle",
            StateKind::Patrol => "Patrol",
            StateKind::SeekTarget => "SeekTarget",
            StateKind::Attack => "Attack",
            StateKind::StationAttack => "StationAttack",
            StateKind::Formation => "Formation",
            StateKind::FormationSeekTarget => "FormationSeekTarget",
            StateKind::FormationAttack => "FormationAttack",
        }
    }

    /// Closing on a target, in or out of formation.
    #[must_use]
    pub fn is_seeking(self) -> bool {
        matches!(self, StateKind::SeekTarget | StateKind::FormationSeekTarget)
    }

    /// Any state that fires on a target.
    #[must_use]
    pub fn is_attacking(self) -> bool {
        matches!(
            self,
            StateKind::Attack | StateKind::StationAttack | StateKind::FormationAttack
        )
    }

    /// Combat states ask to keep updating while off-screen.
    #[must_use]
    pub fn requests_culling_exemption(self) -> bool {
        self.is_attacking() || self == StateKind::FormationSeekTarget
    }
}

/// Kind plus target, cheap enough to copy into the roster every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateSummary {
    /// Variant.
    pub kind: StateKind,
    /// Target ship for combat states.
    pub target: Option<ShipId>,
}

/// The active behavior of one controller.
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorState {
    /// See [`IdleState`].
    Idle(IdleState),
    /// See [`PatrolState`].
    Patrol(PatrolState),
    /// See [`SeekState`].
    SeekTarget(SeekState),
    /// See [`AttackState`].
    Attack(AttackState),
    /// See [`StationAttackState`].
    StationAttack(StationAttackState),
    /// See [`FormationState`].
    Formation(FormationState),
    /// See [`FormationSeekState`].
    FormationSeekTarget(FormationSeekState),
    /// See [`FormationAttackState`].
    FormationAttack(FormationAttackState),
}

impl BehaviorState {
    /// Idle with the configured wake radius.
    #[must_use]
    pub fn idle() -> Self {
        BehaviorState::Idle(IdleState::default())
    }

    /// Fresh patrol; picks a wander point on its first update.
    #[must_use]
    pub fn patrol() -> Self {
        BehaviorState::Patrol(PatrolState::default())
    }

    /// Seek `target`.
    #[must_use]
    pub fn seek(target: ShipId) -> Self {
        BehaviorState::SeekTarget(SeekState::new(target))
    }

    /// Mobile attack on `target`.
    #[must_use]
    pub fn attack(target: ShipId) -> Self {
        BehaviorState::Attack(AttackState::new(target))
    }

    /// Stationary attack on `target`.
    #[must_use]
    pub fn station_attack(target: ShipId) -> Self {
        BehaviorState::StationAttack(StationAttackState::new(target))
    }

    /// Hold formation slot.
    #[must_use]
    pub fn formation() -> Self {
        BehaviorState::Formation(FormationState)
    }

    /// Hold slot while the leader seeks `target`.
    #[must_use]
    pub fn formation_seek(target: ShipId) -> Self {
        BehaviorState::FormationSeekTarget(FormationSeekState::new(target))
    }

    /// Hold slot and fire at `target`.
    #[must_use]
    pub fn formation_attack(target: ShipId) -> Self {
        BehaviorState::FormationAttack(FormationAttackState::new(target))
    }

    /// Build the state a profile starts in.
    #[must_use]
    pub fn from_initial(initial: InitialState) -> Self {
        match initial {
            InitialState::Idle => Self::idle(),
            InitialState::Patrol => Self::patrol(),
            InitialState::Ambush { wake_radius } => {
                BehaviorState::Idle(IdleState::with_wake_radius(wake_radius))
            }
        }
    }

    /// Variant tag.
    #[must_use]
    pub fn kind(&self) -> StateKind {
        match self {
            BehaviorState::Idle(_) => StateKind::Idle,
            BehaviorState::Patrol(_) => StateKind::Patrol,
            BehaviorState::SeekTarget(_) => StateKind::SeekTarget,
            BehaviorState::Attack(_) => StateKind::Attack,
            BehaviorState::StationAttack(_) => StateKind::StationAttack,
            BehaviorState::Formation(_) => StateKind::Formation,
            BehaviorState::FormationSeekTarget(_) => StateKind::FormationSeekTarget,
            BehaviorState::FormationAttack(_) => StateKind::FormationAttack,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Target ship, for combat states.
    #[must_use]
    pub fn target(&self) -> Option<ShipId> {
        match self {
            BehaviorState::SeekTarget(s) => Some(s.target),
            BehaviorState::Attack(s) => Some(s.target),
            BehaviorState::StationAttack(s) => Some(s.target),
            BehaviorState::FormationSeekTarget(s) => Some(s.target),
            BehaviorState::FormationAttack(s) => Some(s.target),
            BehaviorState::Idle(_) | BehaviorState::Patrol(_) | BehaviorState::Formation(_) => {
                None
            }
        }
    }

    /// Kind plus target.
    #[must_use]
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            kind: self.kind(),
            target: self.target(),
        }
    }

    /// Produce this frame's intent. May advance internal timers.
    pub fn update(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> ShipIntent {
        match self {
            BehaviorState::Idle(s) => s.update(ctx),
            BehaviorState::Patrol(s) => s.update(dt, ctx),
            BehaviorState::SeekTarget(s) => s.update(ctx),
            BehaviorState::Attack(s) => s.update(dt, ctx),
            BehaviorState::StationAttack(s) => s.update(ctx),
            BehaviorState::Formation(s) => s.update(ctx),
            BehaviorState::FormationSeekTarget(s) => s.update(ctx),
            BehaviorState::FormationAttack(s) => s.update(ctx),
        }
    }

    /// Propose the next state, or `None` to stay.
    #[must_use]
    pub fn transition_if_needed(&self, ctx: &AgentContext<'_>) -> Option<Transition> {
        match self {
            BehaviorState::Idle(s) => s.transition_if_needed(ctx),
            BehaviorState::Patrol(s) => s.transition_if_needed(ctx),
            BehaviorState::SeekTarget(s) => s.transition_if_needed(ctx),
            BehaviorState::Attack(s) => s.transition_if_needed(ctx),
            BehaviorState::StationAttack(s) => s.transition_if_needed(ctx),
            BehaviorState::Formation(s) => s.transition_if_needed(ctx),
            BehaviorState::FormationSeekTarget(s) => s.transition_if_needed(ctx),
            BehaviorState::FormationAttack(s) => s.transition_if_needed(ctx),
        }
    }
}

/// A state change proposed by [`BehaviorState::transition_if_needed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State to switch to.
    pub next: BehaviorState,
    /// Also record `next` as the controller's fallback state.
    pub remember_as_initial: bool,
    /// Tear down the formation before switching.
    pub abandon_formation: bool,
}

impl Transition {
    /// Plain switch.
    #[must_use]
    pub fn to(next: BehaviorState) -> Self {
        Self {
            next,
            remember_as_initial: false,
            abandon_formation: false,
        }
    }

    /// Switch and remember `next` as the fallback.
    #[must_use]
    pub fn remembered(next: BehaviorState) -> Self {
        Self {
            next,
            remember_as_initial: true,
            abandon_formation: false,
        }
    }

    /// Remove the formation, clear the link and patrol from now on.
    #[must_use]
    pub fn abandon_formation() -> Self {
        Self {
            next: BehaviorState::patrol(),
            remember_as_initial: true,
            abandon_formation: true,
        }
    }
}

/// Everything a state may read (and the RNG it may draw from) for one frame.
pub struct AgentContext<'a> {
    /// The controller's ship, already validated.
    pub ship: &'a ShipRecord,
    /// Every other ship.
    pub ships: &'a dyn ShipDirectory,
    /// Other controllers' states this tick.
    pub roster: &'a Roster,
    /// Behavior profile.
    pub profile: &'a BehaviorProfile,
    /// Formation link, if any.
    pub formation: Option<&'a FormationContext>,
    /// Whether this ship always hunts the player.
    pub hunter: bool,
    /// Fallback state.
    pub initial_state: &'a BehaviorState,
    /// Tunables.
    pub config: &'a AiConfig,
    /// Shared seeded RNG.
    pub rng: &'a mut ChaCha8Rng,
}

impl<'a> AgentContext<'a> {
    /// A ship that can still be chased: present and not destroyed.
    #[must_use]
    pub fn live_ship(&self, id: ShipId) -> Option<&'a ShipRecord> {
        self.ships.ship(id).filter(|ship| !ship.destroyed)
    }

    /// The player's ship, if present and not destroyed.
    #[must_use]
    pub fn live_player(&self) -> Option<&'a ShipRecord> {
        self.ships
            .player_ship()
            .filter(|ship| !ship.destroyed && ship.id != self.ship.id)
    }

    /// State to return to when a target is lost.
    ///
    /// Normally the remembered initial state. When that is itself chasing a
    /// ship that no longer exists, the profile's starting state is used
    /// instead so the controller doesn't bounce between dead targets.
    #[must_use]
    pub fn fallback_state(&self) -> BehaviorState {
        match self.initial_state.target() {
            Some(target) if self.live_ship(target).is_none() => {
                BehaviorState::from_initial(self.profile.resolved_initial_state())
            }
            _ => self.initial_state.clone(),
        }
    }
}

/// Hunters skip every wake radius and go straight for the player.
///
/// Returns the player's id when this ship is a hunter and a live player
/// exists. Every state that can start a chase consults this before its own
/// proximity checks.
#[must_use]
pub fn should_force_seek_player(ctx: &AgentContext<'_>) -> Option<ShipId> {
    if !ctx.hunter {
        return None;
    }
    ctx.live_player().map(|player| player.id)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Context scaffolding shared by the state unit tests.

    use rand::SeedableRng;

    use super::*;
    use crate::math::Vec2;
    use crate::ships::{Faction, ShipTable};

    pub struct Harness {
        pub ships: ShipTable,
        pub roster: Roster,
        pub profile: BehaviorProfile,
        pub formation: Option<FormationContext>,
        pub hunter: bool,
        pub initial: BehaviorState,
        pub config: AiConfig,
        pub rng: ChaCha8Rng,
        pub me: ShipId,
    }

    impl Harness {
        /// Enemy ship 1 at the origin facing +x.
        pub fn new() -> Self {
            let mut ships = ShipTable::new();
            ships.insert(
                ShipRecord::new(1, Faction::Enemy, Vec2::ZERO)
                    .with_rotation(std::f32::consts::FRAC_PI_2),
            );
            Self {
                ships,
                roster: Roster::new(),
                profile: BehaviorProfile::fighter(),
                formation: None,
                hunter: false,
                initial: BehaviorState::patrol(),
                config: AiConfig::default(),
                rng: ChaCha8Rng::seed_from_u64(7),
                me: 1,
            }
        }

        pub fn with_player_at(mut self, position: Vec2) -> Self {
            self.ships
                .insert_player(ShipRecord::new(100, Faction::Player, position));
            self
        }

        pub fn with_ship(mut self, ship: ShipRecord) -> Self {
            self.ships.insert(ship);
            self
        }

        pub fn ctx(&mut self) -> AgentContext<'_> {
            AgentContext {
                ship: self.ships.ship(self.me).expect("harness ship"),
                ships: &self.ships,
                roster: &self.roster,
                profile: &self.profile,
                formation: self.formation.as_ref(),
                hunter: self.hunter,
                initial_state: &self.initial,
                config: &self.config,
                rng: &mut self.rng,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use crate::math::Vec2;

    #[test]
    fn test_force_seek_requires_hunter_and_player() {
        let mut harness = Harness::new().with_player_at(Vec2::new(30_000.0, 0.0));
        assert_eq!(should_force_seek_player(&harness.ctx()), None);

        harness.hunter = true;
        assert_eq!(should_force_seek_player(&harness.ctx()), Some(100));

        let mut lonely = Harness::new();
        lonely.hunter = true;
        assert_eq!(should_force_seek_player(&lonely.ctx()), None);
    }

    #[test]
    fn test_fallback_skips_dead_remembered_target() {
        let mut harness = Harness::new();
        harness.initial = BehaviorState::seek(55);
        assert_eq!(harness.ctx().fallback_state().kind(), StateKind::Patrol);

        harness.initial = BehaviorState::idle();
        assert_eq!(harness.ctx().fallback_state(), BehaviorState::idle());
    }

    #[test]
    fn test_summary_carries_target() {
        let summary = BehaviorState::formation_attack(9).summary();
        assert_eq!(summary.kind, StateKind::FormationAttack);
        assert_eq!(summary.target, Some(9));
        assert!(summary.kind.requests_culling_exemption());
        assert!(!StateKind::Patrol.requests_culling_exemption());
    }

    #[test]
    fn test_from_initial_ambush_keeps_radius() {
        let state = BehaviorState::from_initial(InitialState::Ambush { wake_radius: 250.0 });
        assert_eq!(
            state,
            BehaviorState::Idle(IdleState::with_wake_radius(250.0))
        );
    }
}
