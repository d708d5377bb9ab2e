//! Headless match runner for scripted play and CI verification.
//!
//! This crate plays a lane battle with no rendering. A RON scenario fixes
//! the difficulty, the seed and a list of timed orders; the runner replays
//! them and prints JSON lines. This enables:
//!
//! - **Scripted testing**: Play fixed openings and inspect the state
//! - **CI verification**: Check that repeated runs hash identically
//! - **Balance checks**: Read per-faction metrics from the summary line
//!
//! # Output
//!
//! - **stdout**: JSON lines (ready, snapshots, summary). See [`protocol`].
//! - **stderr**: Logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Play a scenario, snapshot every 50 ticks
//! cargo run -p lanewar_headless -- run --scenario scenarios/opening.ron --every 50
//!
//! # Verify determinism
//! cargo run -p lanewar_headless -- verify --ticks 3000 --runs 5
//! ```

pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use metrics::{FactionMetrics, MetricsCollector};
pub use protocol::{MatchSummary, OutputLine, VerifyReport};
pub use runner::{verify_scenario, HeadlessRunner, RunConfig, RunError, ScriptedController};
pub use scenario::{Scenario, ScenarioError, TimedOrder};
