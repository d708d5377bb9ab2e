//! Building types, construction costs, and production menus.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::UnitKind;
use crate::economy::Cost;
use crate::error::GameError;

/// Immutable stats of one building type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingStats {
    /// Identifier used in commands and snapshots.
    pub id: &'static str,
    /// Construction price.
    pub cost: Cost,
    /// Construction time in ticks.
    pub build_time: u32,
    /// Population capacity granted on completion.
    pub pop_bonus: u32,
    /// Unit types this building trains.
    pub trains: &'static [UnitKind],
    /// Whether this building researches techs.
    pub researches: bool,
}

/// Every constructible building type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Trains workers, raises population cap.
    TownCenter,
    /// Raises population cap.
    House,
    /// Trains infantry.
    Barracks,
    /// Trains archers.
    ArcheryRange,
    /// Trains cavalry.
    Stable,
    /// Researches techs.
    Blacksmith,
    /// Builds siege engines.
    SiegeWorkshop,
}

impl BuildingKind {
    /// All building types.
    pub const ALL: [Self; 7] = [
        Self::TownCenter,
        Self::House,
        Self::Barracks,
        Self::ArcheryRange,
        Self::Stable,
        Self::Blacksmith,
        Self::SiegeWorkshop,
    ];

    /// Static stat block for this type.
    #[must_use]
    pub const fn stats(self) -> BuildingStats {
        match self {
            Self::TownCenter => BuildingStats {
                id: "towncenter",
                cost: Cost::new(0, 400, 0, 350),
                build_time: 1200,
                pop_bonus: 10,
                trains: &[UnitKind::Worker],
                researches: false,
            },
            Self::House => BuildingStats {
                id: "house",
                cost: Cost::new(0, 50, 0, 0),
                build_time: 150,
                pop_bonus: 10,
                trains: &[],
                researches: false,
            },
            Self::Barracks => BuildingStats {
                id: "barracks",
                cost: Cost::new(0, 150, 0, 0),
                build_time: 300,
                pop_bonus: 0,
                trains: &[UnitKind::Spearman, UnitKind::ManAtArms],
                researches: false,
            },
            Self::ArcheryRange => BuildingStats {
                id: "archery_range",
                cost: Cost::new(0, 150, 0, 0),
                build_time: 300,
                pop_bonus: 0,
                trains: &[UnitKind::Longbowman, UnitKind::Crossbowman],
                researches: false,
            },
            Self::Stable => BuildingStats {
                id: "stable",
                cost: Cost::new(0, 150, 0, 0),
                build_time: 300,
                pop_bonus: 0,
                trains: &[UnitKind::Horseman, UnitKind::Knight],
                researches: false,
            },
            Self::Blacksmith => BuildingStats {
                id: "blacksmith",
                cost: Cost::new(0, 150, 0, 0),
                build_time: 250,
                pop_bonus: 0,
                trains: &[],
                researches: true,
            },
            Self::SiegeWorkshop => BuildingStats {
                id: "siege_workshop",
                cost: Cost::new(0, 250, 0, 0),
                build_time: 450,
                pop_bonus: 0,
                trains: &[UnitKind::Mangonel],
                researches: false,
            },
        }
    }

    /// String identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        self.stats().id
    }

    /// Whether `unit` is on this building's menu.
    #[must_use]
    pub fn trains(self, unit: UnitKind) -> bool {
        self.stats().trains.contains(&unit)
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BuildingKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| GameError::UnknownBuildingType(s.to_string()))
    }
}
