//! Configuration tables.
//!
//! Unit, building, and tech stats are closed enums with static stat
//! blocks; behavior never branches on type strings. [`MatchRules`] holds
//! the tunable match-wide numbers and is the only table that can be
//! loaded from RON.
//!
//! **Note:** This module contains no IO - it only defines data types.

mod building_data;
mod difficulty;
mod rules;
mod tech_data;
mod unit_data;

pub use building_data::{BuildingKind, BuildingStats};
pub use difficulty::{Difficulty, DifficultyPreset};
pub use rules::{MatchRules, LANE_COUNT};
pub use tech_data::{TechCategory, TechId, MAX_TECH_LEVEL, TECH_RESEARCH_TIME};
pub use unit_data::{
    bonus_damage, AttackType, BonusRule, SiegeProfile, UnitKind, UnitStats, UnitTags,
};
