//! Read-only views of a match for rendering, UI and logs.
//!
//! Snapshots copy everything a front end needs out of the simulation, so
//! the caller can hold one while the simulation keeps stepping. Numbers
//! are serialized as plain decimals.

use serde::{Deserialize, Serialize};

use crate::components::{AttackTarget, Unit, UnitId, UnitState};
use crate::data::{BuildingKind, MatchRules, UnitKind};
use crate::economy::{ResourceKind, WorkerPool};
use crate::factions::{FactionId, FactionState, TechLevels};
use crate::math::{fixed_decimal, interpolate, Fixed};
use crate::production::{Building, BuildingId, Construction, QueueItem, QueueItemKind};
use crate::simulation::MatchOutcome;
use crate::stance::StanceBoard;

/// State of the whole match after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Tick the snapshot was taken after.
    pub tick: u64,
    /// Result, once the match is over.
    pub outcome: Option<MatchOutcome>,
    /// Left side.
    pub player: FactionSnapshot,
    /// Right side.
    pub enemy: FactionSnapshot,
}

impl MatchSnapshot {
    /// View of one side.
    #[must_use]
    pub fn faction(&self, id: FactionId) -> &FactionSnapshot {
        match id {
            FactionId::Player => &self.player,
            FactionId::Enemy => &self.enemy,
        }
    }
}

/// Resource counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceView {
    /// Food.
    #[serde(with = "fixed_decimal")]
    pub food: Fixed,
    /// Wood.
    #[serde(with = "fixed_decimal")]
    pub wood: Fixed,
    /// Gold.
    #[serde(with = "fixed_decimal")]
    pub gold: Fixed,
    /// Stone.
    #[serde(with = "fixed_decimal")]
    pub stone: Fixed,
}

/// Everything visible about one faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionSnapshot {
    /// Which side.
    pub faction: FactionId,
    /// Stockpile.
    pub resources: ResourceView,
    /// Worker assignment.
    pub workers: WorkerPool,
    /// Workers plus army.
    pub population: u32,
    /// Population cap.
    pub pop_cap: u32,
    /// Living combat units.
    pub army_count: u32,
    /// Base health.
    #[serde(with = "fixed_decimal")]
    pub base_hp: Fixed,
    /// Base health at match start.
    #[serde(with = "fixed_decimal")]
    pub base_max_hp: Fixed,
    /// Researched levels.
    pub tech: TechLevels,
    /// Lane stances.
    pub stances: StanceBoard,
    /// Finished buildings and their queues.
    pub buildings: Vec<BuildingView>,
    /// Buildings under construction.
    pub constructions: Vec<ConstructionView>,
    /// Units on the lanes.
    pub units: Vec<UnitView>,
}

impl FactionSnapshot {
    /// Copy out the visible state of `faction`.
    #[must_use]
    pub fn capture(faction: &FactionState, rules: &MatchRules) -> Self {
        let stockpile = &faction.stockpile;
        Self {
            faction: faction.id,
            resources: ResourceView {
                food: stockpile.get(ResourceKind::Food),
                wood: stockpile.get(ResourceKind::Wood),
                gold: stockpile.get(ResourceKind::Gold),
                stone: stockpile.get(ResourceKind::Stone),
            },
            workers: faction.workers,
            population: faction.current_pop(),
            pop_cap: faction.pop_cap,
            army_count: faction.army_count,
            base_hp: faction.base_hp,
            base_max_hp: faction.base_max_hp,
            tech: faction.tech,
            stances: faction.stances,
            buildings: faction
                .buildings
                .iter()
                .map(|b| BuildingView::capture(b, rules))
                .collect(),
            constructions: faction.constructions.iter().map(ConstructionView::from).collect(),
            units: faction.units.iter().map(UnitView::from).collect(),
        }
    }

    /// Units in one lane.
    pub fn lane_units(&self, lane: u8) -> impl Iterator<Item = &UnitView> {
        self.units.iter().filter(move |u| u.lane == lane)
    }
}

/// A finished building and its queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingView {
    /// Identity.
    pub id: BuildingId,
    /// Type.
    pub kind: BuildingKind,
    /// Queue, head first.
    pub queue: Vec<QueueItemView>,
}

impl BuildingView {
    fn capture(building: &Building, rules: &MatchRules) -> Self {
        Self {
            id: building.id,
            kind: building.kind,
            queue: building
                .queue
                .iter()
                .map(|item| QueueItemView::capture(item, rules.stalled_threshold))
                .collect(),
        }
    }
}

/// One queue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItemView {
    /// What is being produced.
    pub item: QueueItemKind,
    /// Ticks left.
    #[serde(with = "fixed_decimal")]
    pub remaining: Fixed,
    /// Full production time.
    pub total: u32,
    /// Progress, 0-100.
    pub percent: u32,
    /// Finished but waiting on a blocked spawn.
    pub stalled: bool,
}

impl QueueItemView {
    fn capture(item: &QueueItem, stalled_threshold: Fixed) -> Self {
        Self {
            item: item.kind,
            remaining: item.remaining,
            total: item.total,
            percent: item.percentage(),
            stalled: item.is_stalled(stalled_threshold),
        }
    }
}

/// A building under construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionView {
    /// Id the finished building will take.
    pub id: BuildingId,
    /// Type.
    pub kind: BuildingKind,
    /// Ticks left.
    #[serde(with = "fixed_decimal")]
    pub remaining: Fixed,
    /// Full build time.
    pub total: u32,
    /// Progress, 0-100.
    pub percent: u32,
}

impl From<&Construction> for ConstructionView {
    fn from(construction: &Construction) -> Self {
        Self {
            id: construction.id,
            kind: construction.kind,
            remaining: construction.remaining,
            total: construction.total,
            percent: construction.percentage(),
        }
    }
}

/// A unit as a renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    /// Identity.
    pub id: UnitId,
    /// Type.
    pub kind: UnitKind,
    /// Lane index.
    pub lane: u8,
    /// Position before the last tick.
    #[serde(with = "fixed_decimal")]
    pub previous_position: Fixed,
    /// Position after the last tick.
    #[serde(with = "fixed_decimal")]
    pub position: Fixed,
    /// Health.
    #[serde(with = "fixed_decimal")]
    pub hp: Fixed,
    /// Health at full strength.
    #[serde(with = "fixed_decimal")]
    pub max_hp: Fixed,
    /// Current activity.
    pub state: UnitState,
    /// What it last attacked.
    pub target: Option<AttackTarget>,
    /// Ticks of the attack animation left.
    pub attack_anim: u32,
    /// Has left its own base.
    pub deployed: bool,
}

impl UnitView {
    /// Position to draw at, `alpha` of the way through the next tick.
    #[must_use]
    pub fn render_position(&self, alpha: Fixed) -> Fixed {
        interpolate(self.previous_position, self.position, alpha)
    }
}

impl From<&Unit> for UnitView {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            kind: unit.kind,
            lane: unit.lane,
            previous_position: unit.previous_position,
            position: unit.position,
            hp: unit.hp,
            max_hp: unit.max_hp,
            state: unit.state,
            target: unit.target,
            attack_anim: unit.attack_anim,
            deployed: unit.deployed,
        }
    }
}
