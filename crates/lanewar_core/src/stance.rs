//! Stances: per-lane directives for movement and engagement.
//!
//! The engine never changes a stance on its own. Player input or an
//! opponent policy sets them through the command surface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::LANE_COUNT;
use crate::error::GameError;

/// Movement and engagement directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Fall back; stationary attackers disengage.
    Retreat,
    /// Fall back, fighting whatever comes in range.
    Defend,
    /// Stand still and fight.
    Hold,
    /// Push forward, stopping to fight.
    #[default]
    Attack,
    /// Push forward; stationary attackers do not stop to fight.
    Advance,
}

/// Which way a stance moves units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    /// Toward the enemy base.
    Forward,
    /// Toward the home base.
    Backward,
    /// Not at all.
    Stay,
}

impl Stance {
    /// All stances, most defensive first.
    pub const ALL: [Self; 5] = [
        Self::Retreat,
        Self::Defend,
        Self::Hold,
        Self::Attack,
        Self::Advance,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Retreat => "retreat",
            Self::Defend => "defend",
            Self::Hold => "hold",
            Self::Attack => "attack",
            Self::Advance => "advance",
        }
    }

    /// Movement direction.
    #[must_use]
    pub const fn heading(self) -> Heading {
        match self {
            Self::Attack | Self::Advance => Heading::Forward,
            Self::Defend | Self::Retreat => Heading::Backward,
            Self::Hold => Heading::Stay,
        }
    }

    /// Units that cannot attack while moving skip targeting entirely.
    #[must_use]
    pub const fn forces_disengage(self) -> bool {
        matches!(self, Self::Advance | Self::Retreat)
    }

    /// Frontmost units are processed first.
    #[must_use]
    pub const fn front_first(self) -> bool {
        matches!(self.heading(), Heading::Forward)
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stance {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stance| stance.name() == s)
            .ok_or_else(|| GameError::UnknownStance(s.to_string()))
    }
}

/// Target of a stance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneSelector {
    /// Every lane at once.
    All,
    /// One lane by index.
    Lane(u8),
}

/// One stance per lane plus the global stance shown when lanes agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StanceBoard {
    lanes: [Stance; LANE_COUNT],
    global: Stance,
}

impl Default for StanceBoard {
    fn default() -> Self {
        Self::uniform(Stance::default())
    }
}

impl StanceBoard {
    /// Every lane on the same stance.
    #[must_use]
    pub const fn uniform(stance: Stance) -> Self {
        Self {
            lanes: [stance; LANE_COUNT],
            global: stance,
        }
    }

    /// Stance of one lane. Out-of-range lanes read the global stance.
    #[must_use]
    pub fn lane(&self, lane: u8) -> Stance {
        self.lanes
            .get(usize::from(lane))
            .copied()
            .unwrap_or(self.global)
    }

    /// Last stance applied to every lane.
    ///
    /// Stays unchanged while lanes disagree.
    #[must_use]
    pub const fn global(&self) -> Stance {
        self.global
    }

    /// All lane stances in lane order.
    #[must_use]
    pub const fn lanes(&self) -> [Stance; LANE_COUNT] {
        self.lanes
    }

    /// `Some` when every lane holds the same stance.
    #[must_use]
    pub fn unified(&self) -> Option<Stance> {
        let first = self.lanes[0];
        self.lanes.iter().all(|s| *s == first).then_some(first)
    }

    /// Apply a stance. Returns `false` for a lane index out of range.
    pub fn set(&mut self, selector: LaneSelector, stance: Stance) -> bool {
        match selector {
            LaneSelector::All => {
                self.lanes = [stance; LANE_COUNT];
                self.global = stance;
            }
            LaneSelector::Lane(lane) => {
                let Some(slot) = self.lanes.get_mut(usize::from(lane)) else {
                    return false;
                };
                *slot = stance;
                if let Some(shared) = self.unified() {
                    self.global = shared;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stance_parse() {
        for stance in Stance::ALL {
            assert_eq!(stance.name().parse::<Stance>().unwrap(), stance);
        }
        assert!("move".parse::<Stance>().is_err());
    }

    #[test]
    fn test_stance_behavior_table() {
        assert_eq!(Stance::Advance.heading(), Heading::Forward);
        assert_eq!(Stance::Attack.heading(), Heading::Forward);
        assert_eq!(Stance::Hold.heading(), Heading::Stay);
        assert_eq!(Stance::Defend.heading(), Heading::Backward);
        assert_eq!(Stance::Retreat.heading(), Heading::Backward);

        assert!(Stance::Advance.forces_disengage());
        assert!(Stance::Retreat.forces_disengage());
        assert!(!Stance::Attack.forces_disengage());
        assert!(!Stance::Defend.forces_disengage());
        assert!(!Stance::Hold.forces_disengage());
    }

    #[test]
    fn test_set_all_updates_global() {
        let mut board = StanceBoard::default();
        assert!(board.set(LaneSelector::All, Stance::Defend));
        assert_eq!(board.global(), Stance::Defend);
        assert_eq!(board.lanes(), [Stance::Defend; LANE_COUNT]);
    }

    #[test]
    fn test_single_lane_mirrors_global_only_when_uniform() {
        let mut board = StanceBoard::default();
        board.set(LaneSelector::Lane(1), Stance::Hold);
        assert_eq!(board.lane(1), Stance::Hold);
        assert_eq!(board.lane(0), Stance::Attack);
        assert_eq!(board.global(), Stance::Attack);
        assert_eq!(board.unified(), None);

        for lane in [0, 2, 3] {
            board.set(LaneSelector::Lane(lane), Stance::Hold);
        }
        assert_eq!(board.unified(), Some(Stance::Hold));
        assert_eq!(board.global(), Stance::Hold);
    }

    #[test]
    fn test_out_of_range_lane_rejected() {
        let mut board = StanceBoard::default();
        assert!(!board.set(LaneSelector::Lane(9), Stance::Retreat));
        assert_eq!(board, StanceBoard::default());
    }
}
