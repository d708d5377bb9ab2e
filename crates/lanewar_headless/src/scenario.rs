//! Scenario loading and configuration.
//!
//! A scenario fixes everything a headless match needs up front: the
//! difficulty, the seed, how long to run, which factions play on autopilot
//! and a list of timed orders to replay.

use std::path::Path;

use lanewar_core::command::Command;
use lanewar_core::data::{Difficulty, MatchRules};
use lanewar_core::error::GameError;
use lanewar_core::factions::FactionId;
use lanewar_core::simulation::MatchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ticks a scenario runs when the file does not say.
pub const DEFAULT_MAX_TICKS: u64 = 6_000;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Rule overrides the simulation cannot run with.
    #[error("Invalid scenario rules: {0}")]
    InvalidRules(#[from] GameError),
}

const fn default_max_ticks() -> u64 {
    DEFAULT_MAX_TICKS
}

const fn default_faction() -> FactionId {
    FactionId::Player
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Opponent preset and tick pacing.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Seed for turret targeting and cooldown jitter.
    #[serde(default)]
    pub seed: u64,
    /// Stop after this many ticks if nobody has won.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Hand the player to the scripted controller.
    #[serde(default)]
    pub player_autopilot: bool,
    /// Hand the enemy to the scripted controller.
    #[serde(default)]
    pub enemy_autopilot: bool,
    /// Rule overrides. Missing fields keep their defaults.
    #[serde(default)]
    pub rules: MatchRules,
    /// Orders to replay.
    #[serde(default)]
    pub orders: Vec<TimedOrder>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Default Skirmish".to_string(),
            difficulty: Difficulty::default(),
            seed: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            player_autopilot: false,
            enemy_autopilot: false,
            rules: MatchRules::default(),
            orders: Vec::new(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.rules.validate()?;
        Ok(scenario)
    }

    /// A short opening for smoke runs: the player builds a barracks and
    /// sends a spearman, the enemy holds.
    #[must_use]
    pub fn opening() -> Self {
        use lanewar_core::data::{BuildingKind, UnitKind};
        use lanewar_core::production::BuildingId;
        use lanewar_core::stance::{LaneSelector, Stance};

        Self {
            name: "Opening".to_string(),
            max_ticks: 1_200,
            orders: vec![
                TimedOrder::new(0, FactionId::Enemy, Command::SetStance {
                    lane: LaneSelector::All,
                    stance: Stance::Hold,
                }),
                TimedOrder::new(0, FactionId::Player, Command::EnqueueConstruction {
                    building: BuildingKind::Barracks,
                }),
                TimedOrder::new(400, FactionId::Player, Command::EnqueueUnit {
                    building: BuildingId(3),
                    unit: UnitKind::Spearman,
                }),
            ],
            ..Self::default()
        }
    }

    /// Match configuration for this scenario.
    #[must_use]
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            difficulty: self.difficulty,
            seed: self.seed,
            rules: self.rules.clone(),
        }
    }

    /// Orders sorted by tick, stable for orders sharing a tick.
    #[must_use]
    pub fn ordered(&self) -> Vec<TimedOrder> {
        let mut orders = self.orders.clone();
        orders.sort_by_key(|order| order.tick);
        orders
    }
}

/// An order submitted once the match clock reaches `tick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedOrder {
    /// Tick counter value at which to submit, before that tick runs.
    pub tick: u64,
    /// Issuing faction.
    #[serde(default = "default_faction")]
    pub faction: FactionId,
    /// The order.
    pub command: Command,
}

impl TimedOrder {
    /// Create a timed order.
    #[must_use]
    pub fn new(tick: u64, faction: FactionId, command: Command) -> Self {
        Self {
            tick,
            faction,
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanewar_core::stance::{LaneSelector, Stance};

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.difficulty, Difficulty::Medium);
        assert_eq!(scenario.max_ticks, DEFAULT_MAX_TICKS);
        assert!(scenario.orders.is_empty());
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                difficulty: hard,
                seed: 7,
                enemy_autopilot: true,
                orders: [
                    TimedOrder(tick: 0, command: grant_resources),
                    TimedOrder(tick: 3, faction: enemy, command: set_instant_build(true)),
                    TimedOrder(tick: 5, command: set_stance(lane: all, stance: hold)),
                ],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.difficulty, Difficulty::Hard);
        assert_eq!(scenario.max_ticks, DEFAULT_MAX_TICKS);
        assert!(scenario.enemy_autopilot);
        assert!(!scenario.player_autopilot);
        assert_eq!(scenario.orders[0].faction, FactionId::Player);
        assert_eq!(scenario.orders[1].faction, FactionId::Enemy);
        assert_eq!(
            scenario.orders[2].command,
            Command::SetStance {
                lane: LaneSelector::All,
                stance: Stance::Hold,
            }
        );
    }

    #[test]
    fn test_opening_round_trips() {
        let scenario = Scenario::opening();
        let text = ron::to_string(&scenario).unwrap();
        assert_eq!(Scenario::from_ron_str(&text).unwrap(), scenario);
    }

    #[test]
    fn test_ordered_is_stable() {
        let mut scenario = Scenario::default();
        scenario.orders = vec![
            TimedOrder::new(9, FactionId::Player, Command::GrantResources),
            TimedOrder::new(2, FactionId::Player, Command::SetAutopilot(true)),
            TimedOrder::new(2, FactionId::Enemy, Command::SetAutopilot(false)),
        ];
        let ticks: Vec<_> = scenario.ordered().iter().map(|o| (o.tick, o.faction)).collect();
        assert_eq!(
            ticks,
            vec![(2, FactionId::Player), (2, FactionId::Enemy), (9, FactionId::Player)]
        );
    }

    #[test]
    fn test_bundled_opening_parses() {
        let scenario = Scenario::from_ron_str(include_str!("../../../scenarios/opening.ron")).unwrap();
        assert_eq!(scenario.rules.base_hp, 1500);
        assert_eq!(scenario.rules.max_queue_size, MatchRules::default().max_queue_size);
        assert_eq!(
            scenario.orders.last().map(|o| &o.command),
            Some(&Command::SetStance {
                lane: LaneSelector::Lane(0),
                stance: Stance::Advance,
            })
        );
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/nonexistent/scenario.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let err = Scenario::from_ron_str("Scenario(name: 3)").unwrap_err();
        assert!(matches!(err, ScenarioError::ParseError(_)));
    }

    #[test]
    fn test_unplayable_rules_rejected() {
        let err = Scenario::from_ron_str(r#"Scenario(name: "Frozen", rules: (ticks_per_second: 0))"#)
            .unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidRules(_)));

        let err = Scenario::from_ron_str(r#"Scenario(name: "Fortress", rules: (base_hp: 3000000000))"#)
            .unwrap_err();
        assert!(err.to_string().contains("base_hp"));
    }
}
