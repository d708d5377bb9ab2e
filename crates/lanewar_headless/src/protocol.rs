//! JSON lines written to stdout by the headless runner.
//!
//! Every line is one JSON object tagged by `type`:
//!
//! ```text
//! {"type":"ready","scenario":"Opening","difficulty":"medium","seed":0,"max_ticks":1200}
//! {"type":"snapshot","tick":100,"outcome":null,"player":{...},"enemy":{...}}
//! {"type":"summary","scenario":"Opening","ticks":1200,"outcome":null,...}
//! ```
//!
//! Logs never go to stdout, so the stream can be piped straight into a
//! JSON-lines consumer.

use lanewar_core::data::Difficulty;
use lanewar_core::simulation::MatchOutcome;
use lanewar_core::snapshot::MatchSnapshot;
use serde::Serialize;

use crate::metrics::FactionMetrics;

/// One line of runner output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputLine {
    /// The match is set up and about to run.
    Ready {
        /// Scenario name.
        scenario: String,
        /// Difficulty preset.
        difficulty: Difficulty,
        /// Seed.
        seed: u64,
        /// Tick limit.
        max_ticks: u64,
    },
    /// Periodic match state.
    Snapshot(MatchSnapshot),
    /// Final line of a run.
    Summary(MatchSummary),
    /// Result of a determinism check.
    Verify(VerifyReport),
}

impl OutputLine {
    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

/// How a run ended and what each side did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    /// Scenario name.
    pub scenario: String,
    /// Difficulty preset.
    pub difficulty: Difficulty,
    /// Seed.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Result, or `None` if the tick limit was reached first.
    pub outcome: Option<MatchOutcome>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
    /// Scripted orders the command surface turned down.
    pub orders_rejected: u32,
    /// Player metrics.
    pub player: FactionMetrics,
    /// Enemy metrics.
    pub enemy: FactionMetrics,
}

/// Final hashes of repeated runs of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Runs performed.
    pub runs: u32,
    /// Ticks each run simulated.
    pub ticks: u64,
    /// Final state hash of each run, in run order.
    pub hashes: Vec<u64>,
    /// All hashes agree.
    pub deterministic: bool,
}

impl VerifyReport {
    /// Build a report, deciding determinism from the hashes.
    #[must_use]
    pub fn new(scenario: impl Into<String>, ticks: u64, hashes: Vec<u64>) -> Self {
        let deterministic = hashes.windows(2).all(|pair| pair[0] == pair[1]);
        Self {
            scenario: scenario.into(),
            runs: hashes.len() as u32,
            ticks,
            hashes,
            deterministic,
        }
    }
}
