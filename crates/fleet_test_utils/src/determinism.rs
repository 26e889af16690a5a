//! Determinism testing utilities.
//!
//! Replays must be exact: the same seed and the same world produce the same
//! state sequence. Sources of drift are kept out of the agent core:
//!
//! - **Iteration order**: controllers, ships and formations are stored in
//!   ordered maps and visited in ascending id order.
//! - **Randomness**: every random draw goes through the orchestrator's
//!   seeded `ChaCha8Rng`.
//! - **Floating point**: `f32` math is deterministic for a fixed binary on a
//!   fixed target, which is all a replay needs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::sandbox::Sandbox;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Distinct hashes (1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run ended in the same state.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Fleet simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and compare final hashes.
///
/// # Example
///
/// ```ignore
/// let result = verify_determinism(
///     3,
///     200,
///     || build_skirmish(),
///     |sandbox| { sandbox.step(0.05, None); },
///     Sandbox::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Two sandboxes from the same setup, stepped in lockstep at `dt`.
///
/// Returns `None` if they never diverge, otherwise the first tick at which
/// their hashes differ (0 means the setups already differ).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt: f32) -> Option<u64>
where
    F: Fn() -> Sandbox,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.step(dt, None);
        b.step(dt, None);
        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for fleet scenarios.
pub mod strategies {
    use proptest::prelude::*;

    use fleet_ai::config::AiConfig;
    use fleet_ai::formation::FormationShape;
    use fleet_ai::math::Vec2;
    use fleet_ai::profile::BehaviorProfile;
    use fleet_ai::ships::{Faction, ShipRecord};

    use crate::fixtures::{player_ship_at, PLAYER_ID};
    use crate::sandbox::Sandbox;

    /// Coordinate inside the default world.
    pub fn arb_coordinate() -> impl Strategy<Value = f32> {
        (-8000i32..8000i32).prop_map(|v| v as f32)
    }

    /// Position inside the default world.
    pub fn arb_position() -> impl Strategy<Value = Vec2> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// Heading in radians.
    pub fn arb_rotation() -> impl Strategy<Value = f32> {
        (0i32..628i32).prop_map(|v| v as f32 / 100.0)
    }

    /// One of the preset profiles.
    pub fn arb_profile() -> impl Strategy<Value = BehaviorProfile> {
        prop_oneof![
            Just(BehaviorProfile::fighter()),
            Just(BehaviorProfile::rammer()),
            Just(BehaviorProfile::turret()),
            Just(BehaviorProfile::ambusher()),
        ]
    }

    /// Any formation layout.
    pub fn arb_shape() -> impl Strategy<Value = FormationShape> {
        prop_oneof![
            Just(FormationShape::SmallWedge),
            Just(FormationShape::MediumWedge),
            Just(FormationShape::LargeWedge),
            Just(FormationShape::Line),
            Just(FormationShape::Box),
            Just(FormationShape::Diamond),
            Just(FormationShape::ArrowHead),
            Just(FormationShape::Convoy),
            Just(FormationShape::X),
            Just(FormationShape::HourGlass),
            Just(FormationShape::Phalanx),
            Just(FormationShape::WingedColumn),
        ]
    }

    /// Parameters for spawning one AI ship.
    #[derive(Debug, Clone)]
    pub struct AgentParams {
        /// Position.
        pub position: Vec2,
        /// Heading.
        pub rotation: f32,
        /// Behavior.
        pub profile: BehaviorProfile,
        /// Always chases the player.
        pub hunter: bool,
    }

    /// Parameters for one AI ship.
    pub fn arb_agent() -> impl Strategy<Value = AgentParams> {
        (arb_position(), arb_rotation(), arb_profile(), any::<bool>()).prop_map(
            |(position, rotation, profile, hunter)| AgentParams {
                position,
                rotation,
                profile,
                hunter,
            },
        )
    }

    /// A list of AI ships.
    pub fn arb_agent_list(max_agents: usize) -> impl Strategy<Value = Vec<AgentParams>> {
        proptest::collection::vec(arb_agent(), 1..max_agents)
    }

    /// Build a sandbox with a player at `player` and the given agents.
    ///
    /// Agents get ids starting at 1 in list order.
    #[must_use]
    pub fn build_sandbox(seed: u64, player: Vec2, agents: &[AgentParams]) -> Sandbox {
        let config = AiConfig {
            seed,
            ..AiConfig::default()
        };
        let mut sandbox = Sandbox::new(config);
        sandbox.spawn_player(player_ship_at(PLAYER_ID, player.x, player.y));
        for (id, agent) in (1..).zip(agents) {
            let ship = ShipRecord::new(id, Faction::Enemy, agent.position).with_rotation(agent.rotation);
            sandbox.spawn(ship, agent.profile, agent.hunter);
        }
        sandbox
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use proptest::prelude::*;

    use fleet_ai::config::AiConfig;
    use fleet_ai::formation::FormationShape;
    use fleet_ai::math::Vec2;
    use fleet_ai::profile::BehaviorProfile;

    use crate::fixtures::{enemy_at, player_ship_at, PLAYER_ID};

    fn skirmish() -> Sandbox {
        let mut sandbox = Sandbox::new(AiConfig::default());
        sandbox.spawn_player(player_ship_at(PLAYER_ID, 0.0, 0.0));
        sandbox.spawn(enemy_at(1, 3000.0, 0.0), BehaviorProfile::fighter(), false);
        sandbox.spawn(enemy_at(2, -2000.0, 500.0), BehaviorProfile::rammer(), true);
        sandbox.spawn(enemy_at(3, 9000.0, 9000.0), BehaviorProfile::fighter(), false);
        sandbox.spawn_formation(
            "wing",
            FormationShape::Diamond,
            250.0,
            enemy_at(10, 5000.0, -4000.0),
            vec![enemy_at(11, 0.0, 0.0), enemy_at(12, 0.0, 0.0), enemy_at(13, 0.0, 0.0)],
            BehaviorProfile::fighter(),
        );
        sandbox
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_skirmish_is_deterministic() {
        let result = verify_determinism(
            3,
            400,
            skirmish,
            |sandbox| {
                sandbox.step(0.05, None);
            },
            Sandbox::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_skirmish_never_diverges() {
        assert_eq!(find_first_divergence(skirmish, 200, 0.05), None);
    }

    #[test]
    fn test_seed_changes_patrol_paths() {
        let agents = [AgentParams {
            position: Vec2::new(-9000.0, -9000.0),
            rotation: 0.0,
            profile: BehaviorProfile::fighter(),
            hunter: false,
        }];
        let mut a = build_sandbox(1, Vec2::new(9000.0, 9000.0), &agents);
        let mut b = build_sandbox(2, Vec2::new(9000.0, 9000.0), &agents);
        a.run(100, 0.05);
        b.run(100, 0.05);
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u64, "wing")), compute_hash(&(1u64, "wing")));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_random_fleets_are_deterministic(
            seed in any::<u64>(),
            player in arb_position(),
            agents in arb_agent_list(8),
        ) {
            let result = verify_determinism(
                2,
                60,
                || build_sandbox(seed, player, &agents),
                |sandbox| {
                    sandbox.step(0.05, None);
                },
                Sandbox::state_hash,
            );
            prop_assert!(result.is_deterministic);
        }
    }
}
