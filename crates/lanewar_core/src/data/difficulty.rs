//! Difficulty presets.
//!
//! A preset sets the opponent's starting workers, the worker ceiling its
//! policy should respect, and how long one tick lasts on the wall clock.
//! Logical time per tick is the same at every difficulty; only pacing
//! changes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Static numbers behind a [`Difficulty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyPreset {
    /// Display label.
    pub label: &'static str,
    /// Workers the enemy starts with, all on food.
    pub starting_workers: u32,
    /// Worker ceiling for the opponent policy.
    pub max_workers: u32,
    /// Wall-clock milliseconds per tick.
    pub tick_ms: u64,
}

/// Match difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// 1 worker, 150 ms ticks.
    VeryEasy,
    /// 4 workers, 100 ms ticks.
    Easy,
    /// 6 workers, 100 ms ticks.
    #[default]
    Medium,
    /// 9 workers, 75 ms ticks.
    Hard,
    /// 13 workers, 75 ms ticks.
    VeryHard,
    /// 18 workers, 75 ms ticks.
    Expert,
    /// 25 workers, 50 ms ticks.
    Insane,
    /// 37 workers, 35 ms ticks.
    Inferno,
}

impl Difficulty {
    /// Every preset from easiest to hardest.
    pub const ALL: [Self; 8] = [
        Self::VeryEasy,
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::VeryHard,
        Self::Expert,
        Self::Insane,
        Self::Inferno,
    ];

    /// Preset numbers.
    #[must_use]
    pub const fn preset(self) -> DifficultyPreset {
        let (label, starting_workers, max_workers, tick_ms) = match self {
            Self::VeryEasy => ("Very Easy", 1, 10, 150),
            Self::Easy => ("Easy", 4, 30, 100),
            Self::Medium => ("Medium", 6, 50, 100),
            Self::Hard => ("Hard", 9, 70, 75),
            Self::VeryHard => ("Very Hard", 13, 80, 75),
            Self::Expert => ("Expert", 18, 85, 75),
            Self::Insane => ("Insane", 25, 90, 50),
            Self::Inferno => ("Inferno", 37, 95, 35),
        };
        DifficultyPreset {
            label,
            starting_workers,
            max_workers,
            tick_ms,
        }
    }

    /// Wall-clock duration of one tick.
    #[must_use]
    pub const fn tick_duration(self) -> Duration {
        Duration::from_millis(self.preset().tick_ms)
    }

    /// Snake-case identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::VeryEasy => "very_easy",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::VeryHard => "very_hard",
            Self::Expert => "expert",
            Self::Insane => "insane",
            Self::Inferno => "inferno",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preset().label)
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|d| d.id() == wanted)
            .ok_or_else(|| GameError::UnknownDifficulty(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_get_harder() {
        let workers: Vec<u32> = Difficulty::ALL
            .iter()
            .map(|d| d.preset().starting_workers)
            .collect();
        assert!(workers.windows(2).all(|w| w[0] < w[1]));

        let ticks: Vec<u64> = Difficulty::ALL.iter().map(|d| d.preset().tick_ms).collect();
        assert!(ticks.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_inferno_preset() {
        let preset = Difficulty::Inferno.preset();
        assert_eq!(preset.starting_workers, 37);
        assert_eq!(preset.max_workers, 95);
        assert_eq!(Difficulty::Inferno.tick_duration(), Duration::from_millis(35));
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("very-hard".parse::<Difficulty>().unwrap(), Difficulty::VeryHard);
        assert_eq!("Medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert!("nightmare".parse::<Difficulty>().is_err());
    }
}
