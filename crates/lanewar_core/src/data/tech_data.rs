//! Blacksmith technology lines.
//!
//! Four independent lines, three levels each. A tech is identified by
//! its line and level and is written `tech_<line>_<level>`, e.g.
//! `tech_atk_m_2`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::AttackType;
use crate::economy::Cost;
use crate::error::GameError;

/// Highest level of any tech line.
pub const MAX_TECH_LEVEL: u8 = 3;

/// Research time of every tech, in ticks.
pub const TECH_RESEARCH_TIME: u32 = 600;

/// One of the four upgrade lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TechCategory {
    /// Melee attack (`atk_m`).
    MeleeAttack,
    /// Melee defense (`def_m`).
    MeleeDefense,
    /// Ranged attack (`atk_r`).
    RangedAttack,
    /// Ranged defense (`def_r`).
    RangedDefense,
}

impl TechCategory {
    /// All lines in canonical order.
    pub const ALL: [Self; 4] = [
        Self::MeleeAttack,
        Self::MeleeDefense,
        Self::RangedAttack,
        Self::RangedDefense,
    ];

    /// Short key used in tech ids.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::MeleeAttack => "atk_m",
            Self::MeleeDefense => "def_m",
            Self::RangedAttack => "atk_r",
            Self::RangedDefense => "def_r",
        }
    }

    /// Attack type of the units this line buffs.
    #[must_use]
    pub const fn affects(self) -> AttackType {
        match self {
            Self::MeleeAttack | Self::MeleeDefense => AttackType::Melee,
            Self::RangedAttack | Self::RangedDefense => AttackType::Ranged,
        }
    }

    /// Index into per-line arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::MeleeAttack => 0,
            Self::MeleeDefense => 1,
            Self::RangedAttack => 2,
            Self::RangedDefense => 3,
        }
    }
}

/// A single researchable tech.
///
/// Serializes as its string id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TechId {
    /// Upgrade line.
    pub category: TechCategory,
    /// Level reached on completion, `1..=3`.
    pub level: u8,
}

impl TechId {
    /// Create a tech id. Returns `None` for levels outside `1..=3`.
    #[must_use]
    pub const fn new(category: TechCategory, level: u8) -> Option<Self> {
        if level == 0 || level > MAX_TECH_LEVEL {
            return None;
        }
        Some(Self { category, level })
    }

    /// Research price. Melee lines cost food, ranged lines cost wood,
    /// both also cost gold.
    #[must_use]
    pub const fn cost(self) -> Cost {
        let (primary, gold) = match self.level {
            1 => (50, 125),
            2 => (100, 250),
            _ => (150, 300),
        };
        match self.category.affects() {
            AttackType::Melee => Cost::new(primary, 0, gold, 0),
            AttackType::Ranged => Cost::new(0, primary, gold, 0),
        }
    }

    /// Research time in ticks.
    #[must_use]
    pub const fn research_time(self) -> u32 {
        TECH_RESEARCH_TIME
    }
}

impl fmt::Display for TechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tech_{}_{}", self.category.key(), self.level)
    }
}

impl FromStr for TechId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || GameError::UnknownTech(s.to_string());
        let rest = s.strip_prefix("tech_").ok_or_else(unknown)?;
        let (key, level) = rest.rsplit_once('_').ok_or_else(unknown)?;
        let category = TechCategory::ALL
            .into_iter()
            .find(|c| c.key() == key)
            .ok_or_else(unknown)?;
        let level: u8 = level.parse().map_err(|_| unknown())?;
        Self::new(category, level).ok_or_else(unknown)
    }
}

impl TryFrom<String> for TechId {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TechId> for String {
    fn from(tech: TechId) -> Self {
        tech.to_string()
    }
}
