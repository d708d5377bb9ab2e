//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A match replayed from the same seed and the same command list must
//! end in the same state, bit for bit. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`lanewar_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units, buildings and effects live in vectors processed in order.
//!
//! - **System randomness**: Turret targeting and cooldown jitter draw from
//!   an injected, seeded source.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, combat, etc.)
//! 2. **Property tests**: Random command lists must still replay identically
//! 3. **Integration tests**: Full battle scenarios are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::thread;

use lanewar_core::command::Command;
use lanewar_core::factions::FactionId;
use lanewar_core::rng::RandomSource;
use lanewar_core::simulation::Simulation;
use tracing::warn;

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
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
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

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// A command issued for a faction just before a given tick runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedCommand {
    /// Tick counter value when the command is submitted.
    pub tick: u64,
    /// Commanded faction.
    pub faction: FactionId,
    /// The order.
    pub command: Command,
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use lanewar_test_utils::determinism::verify_determinism;
/// use lanewar_test_utils::fixtures::battle_scenario;
///
/// let result = verify_determinism(
///     3,   // Run 3 times
///     100, // 100 ticks each
///     || battle_scenario(42),
///     |sim| { sim.step(); },
///     |sim| sim.state_hash(),
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

/// Run a match twice from the same setup and compare final hashes.
pub fn verify_simulation_determinism<R, F>(setup_fn: F, num_ticks: u64) -> bool
where
    R: RandomSource,
    F: Fn() -> Simulation<R>,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.step();
        },
        |sim| sim.state_hash(),
    );
    result.is_deterministic
}

/// Play `commands` against a fresh match for `num_ticks` ticks and return
/// the final state hash.
///
/// Each command is submitted when the tick counter equals its `tick`,
/// before that tick's step runs. Rejected commands are ignored, as they
/// would be from a player.
pub fn replay_commands<R, F>(setup_fn: F, commands: &[TimedCommand], num_ticks: u64) -> u64
where
    R: RandomSource,
    F: Fn() -> Simulation<R>,
{
    let mut sim = setup_fn();
    let mut ordered: Vec<&TimedCommand> = commands.iter().collect();
    ordered.sort_by_key(|c| c.tick);
    let mut pending = ordered.into_iter().peekable();

    for _ in 0..num_ticks {
        while let Some(next) = pending.next_if(|c| c.tick <= sim.tick()) {
            sim.submit(next.faction, &next.command);
        }
        sim.step();
    }
    sim.state_hash()
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Arguments
///
/// * `setup_fn` - Function that creates and configures a simulation
/// * `num_sims` - Number of parallel simulations to run
/// * `num_ticks` - Number of ticks to run each simulation
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<R, F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    R: RandomSource,
    F: Fn() -> Simulation<R> + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.step();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// simulations start to differ.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<R, F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    R: RandomSource,
    F: Fn() -> Simulation<R>,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        warn!(tick = 0, "Simulations differ before the first tick");
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.step();
        sim2.step();

        if sim1.state_hash() != sim2.state_hash() {
            warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for command-driven testing.
///
/// These strategies generate random but reproducible command lists. Many
/// generated commands are invalid on purpose (unknown buildings, techs
/// out of order, unaffordable items) so the rejection paths get exercised.
pub mod strategies {
    use lanewar_core::command::Command;
    use lanewar_core::data::{BuildingKind, TechCategory, TechId, UnitKind, MAX_TECH_LEVEL};
    use lanewar_core::economy::ResourceKind;
    use lanewar_core::factions::FactionId;
    use lanewar_core::production::BuildingId;
    use lanewar_core::stance::{LaneSelector, Stance};
    use proptest::prelude::*;

    use super::TimedCommand;

    /// Any stance.
    pub fn arb_stance() -> impl Strategy<Value = Stance> {
        proptest::sample::select(Stance::ALL.to_vec())
    }

    /// All lanes, or one lane index (including some out of range).
    pub fn arb_lane_selector() -> impl Strategy<Value = LaneSelector> {
        prop_oneof![Just(LaneSelector::All), (0u8..6).prop_map(LaneSelector::Lane)]
    }

    /// Any resource.
    pub fn arb_resource() -> impl Strategy<Value = ResourceKind> {
        proptest::sample::select(ResourceKind::ALL.to_vec())
    }

    /// Any unit type.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        proptest::sample::select(UnitKind::ALL.to_vec())
    }

    /// Any building type.
    pub fn arb_building_kind() -> impl Strategy<Value = BuildingKind> {
        proptest::sample::select(BuildingKind::ALL.to_vec())
    }

    /// Any tech of any level.
    pub fn arb_tech() -> impl Strategy<Value = TechId> {
        (proptest::sample::select(TechCategory::ALL.to_vec()), 1..=MAX_TECH_LEVEL)
            .prop_filter_map("valid tech level", |(category, level)| TechId::new(category, level))
    }

    /// Building ids a short match is likely to use, plus some that never exist.
    pub fn arb_building_id() -> impl Strategy<Value = BuildingId> {
        (1u32..8).prop_map(BuildingId)
    }

    /// Any command.
    pub fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            (arb_lane_selector(), arb_stance())
                .prop_map(|(lane, stance)| Command::SetStance { lane, stance }),
            (arb_resource(), -2i32..=2)
                .prop_map(|(resource, delta)| Command::ReassignWorker { resource, delta }),
            (arb_building_id(), arb_unit_kind())
                .prop_map(|(building, unit)| Command::EnqueueUnit { building, unit }),
            (arb_building_id(), arb_tech())
                .prop_map(|(building, tech)| Command::EnqueueTech { building, tech }),
            arb_building_kind().prop_map(|building| Command::EnqueueConstruction { building }),
            Just(Command::GrantResources),
            any::<bool>().prop_map(Command::SetInstantBuild),
        ]
    }

    /// Either faction.
    pub fn arb_faction() -> impl Strategy<Value = FactionId> {
        prop_oneof![Just(FactionId::Player), Just(FactionId::Enemy)]
    }

    /// A list of commands spread over the first `max_tick` ticks.
    pub fn arb_command_sequence(max_len: usize, max_tick: u64) -> impl Strategy<Value = Vec<TimedCommand>> {
        proptest::collection::vec(
            (0..max_tick, arb_faction(), arb_command())
                .prop_map(|(tick, faction, command)| TimedCommand { tick, faction, command }),
            0..max_len,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{battle_scenario, mirrored_infantry, scripted_sim};
    use lanewar_core::data::BuildingKind;
    use lanewar_core::simulation::{MatchConfig, Simulation};
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_match_determinism() {
        assert!(verify_simulation_determinism(
            || Simulation::new(MatchConfig::default()),
            300
        ));
    }

    #[test]
    fn test_battle_determinism() {
        assert!(verify_simulation_determinism(|| battle_scenario(11), 600));
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        assert_eq!(find_first_divergence(|| mirrored_infantry(4), 400), None);
    }

    #[test]
    fn test_different_seeds_can_diverge_only_through_randomness() {
        // Without units nothing draws randomness, so the seed cannot matter.
        let a = replay_commands(
            || Simulation::new(MatchConfig { seed: 1, ..MatchConfig::default() }),
            &[],
            100,
        );
        let b = replay_commands(
            || Simulation::new(MatchConfig { seed: 2, ..MatchConfig::default() }),
            &[],
            100,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_replay_applies_commands() {
        let commands = vec![
            TimedCommand {
                tick: 0,
                faction: FactionId::Player,
                command: Command::GrantResources,
            },
            TimedCommand {
                tick: 5,
                faction: FactionId::Player,
                command: Command::EnqueueConstruction {
                    building: BuildingKind::House,
                },
            },
        ];
        let with = replay_commands(scripted_sim, &commands, 20);
        let without = replay_commands(scripted_sim, &[], 20);
        assert_ne!(with, without);
        assert_eq!(with, replay_commands(scripted_sim, &commands, 20));
    }

    #[test]
    fn test_parallel_battle_simulations() {
        let result = run_parallel_simulations(|| battle_scenario(3), 4, 300);
        result.assert_deterministic();
        assert_eq!(result.num_sims, 4);
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        /// Random command lists replay to the same final state.
        #[test]
        fn prop_command_sequences_are_replayable(
            commands in strategies::arb_command_sequence(30, 200),
            seed in any::<u64>(),
        ) {
            let setup = move || Simulation::new(MatchConfig { seed, ..MatchConfig::default() });
            let first = replay_commands(setup, &commands, 250);
            let second = replay_commands(setup, &commands, 250);
            prop_assert_eq!(first, second);
        }

        /// Battles from any seed are reproducible.
        #[test]
        fn prop_battles_are_deterministic(seed in any::<u64>()) {
            let result = verify_determinism(
                2,
                200,
                || battle_scenario(seed),
                |s| { s.step(); },
                |s| s.state_hash(),
            );
            prop_assert!(result.is_deterministic);
        }
    }

    // =========================================================================
    // Stress tests (only run explicitly with --ignored)
    // =========================================================================

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_parallel_many_simulations() {
        let result = run_parallel_simulations(|| battle_scenario(99), 16, 5000);
        result.assert_deterministic();
    }
}
