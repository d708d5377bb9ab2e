//! Production queues, constructions, and the production resolver.
//!
//! Each building owns a bounded FIFO queue; only the head item counts
//! down. A finished head resolves into a worker, a tech level, or a unit
//! on the lane, unless the population cap or a unit standing on the spawn
//! point blocks it. Blocked heads stay at the front with a small remaining
//! time so the building retries every tick without losing the slot.
//!
//! Constructions are tracked per faction and are never blocked.
//!
//! All calculations use fixed-point math for deterministic simulation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::components::{Unit, UnitId};
use crate::data::{BuildingKind, MatchRules, TechId, UnitKind};
use crate::error::CommandError;
use crate::factions::{FactionId, FactionState};
use crate::math::{distance, fixed_serde, whole, Fixed};
use crate::rng::RandomSource;

/// Unique identifier for a building within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

/// What a queue item produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemKind {
    /// A worker or a combat unit.
    Unit(UnitKind),
    /// A tech level.
    Tech(TechId),
}

impl QueueItemKind {
    /// Production time in ticks.
    #[must_use]
    pub fn production_time(self) -> u32 {
        match self {
            Self::Unit(kind) => kind.stats().train_time,
            Self::Tech(tech) => tech.research_time(),
        }
    }

    /// Whether this item counts against the population cap.
    #[must_use]
    pub const fn is_unit(self) -> bool {
        matches!(self, Self::Unit(_))
    }
}

impl std::fmt::Display for QueueItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit(kind) => kind.fmt(f),
            Self::Tech(tech) => tech.fmt(f),
        }
    }
}

/// An item waiting in a building queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// What is being produced.
    pub kind: QueueItemKind,
    /// Ticks left. Fractional only after a blocked completion.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
    /// Full production time in ticks.
    pub total: u32,
}

impl QueueItem {
    /// Create a fresh item with its full production time.
    #[must_use]
    pub fn new(kind: QueueItemKind) -> Self {
        let total = kind.production_time();
        Self {
            kind,
            remaining: Fixed::from_num(total),
            total,
        }
    }

    /// Count down one tick, or finish outright under instant build.
    pub fn advance(&mut self, instant: bool) {
        if instant {
            self.remaining = Fixed::ZERO;
        } else {
            self.remaining -= Fixed::ONE;
        }
    }

    /// Remaining time has run out.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining <= Fixed::ZERO
    }

    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        progress_percent(self.remaining, self.total)
    }

    /// Nearly done but waiting on a blocked spawn.
    #[must_use]
    pub fn is_stalled(&self, threshold: Fixed) -> bool {
        self.remaining > Fixed::ZERO && self.remaining <= threshold
    }
}

/// Bounded FIFO production queue owned by a building.
///
/// Only the front item is actively counting down.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductionQueue {
    /// Queued items, head first.
    pub queue: VecDeque<QueueItem>,
    /// Maximum number of items allowed in the queue.
    pub max_queue_size: usize,
}

impl ProductionQueue {
    /// Create a production queue with a specific max size.
    #[must_use]
    pub fn with_max_size(max_queue_size: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_queue_size,
        }
    }

    /// Check if the queue is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.max_queue_size
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get the number of items in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Append an item. Fails when the queue is full.
    pub fn add(&mut self, kind: QueueItemKind) -> Result<(), CommandError> {
        if self.is_full() {
            return Err(CommandError::QueueFull {
                max: self.max_queue_size,
            });
        }
        self.queue.push_back(QueueItem::new(kind));
        Ok(())
    }

    /// Get the currently producing item.
    #[must_use]
    pub fn current(&self) -> Option<&QueueItem> {
        self.queue.front()
    }

    /// Get the currently producing item mutably.
    pub fn current_mut(&mut self) -> Option<&mut QueueItem> {
        self.queue.front_mut()
    }

    /// Remove the head if it has finished.
    pub fn complete(&mut self) -> Option<QueueItem> {
        if self.queue.front().is_some_and(QueueItem::is_complete) {
            self.queue.pop_front()
        } else {
            None
        }
    }

    /// Whether a tech is anywhere in this queue.
    #[must_use]
    pub fn contains_tech(&self, tech: TechId) -> bool {
        self.queue
            .iter()
            .any(|item| item.kind == QueueItemKind::Tech(tech))
    }

    /// Iterate items head first.
    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.queue.iter()
    }
}

/// A finished building sitting at its faction's base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Identity.
    pub id: BuildingId,
    /// Type; decides the production menu.
    pub kind: BuildingKind,
    /// Production queue.
    pub queue: ProductionQueue,
}

impl Building {
    /// Create an idle building.
    #[must_use]
    pub fn new(id: BuildingId, kind: BuildingKind, max_queue_size: usize) -> Self {
        Self {
            id,
            kind,
            queue: ProductionQueue::with_max_size(max_queue_size),
        }
    }
}

/// A building being put up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Construction {
    /// Id the finished building will take.
    pub id: BuildingId,
    /// Type under construction.
    pub kind: BuildingKind,
    /// Ticks left.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
    /// Full build time in ticks.
    pub total: u32,
}

impl Construction {
    /// Start a construction with its full build time.
    #[must_use]
    pub fn new(id: BuildingId, kind: BuildingKind) -> Self {
        let total = kind.stats().build_time;
        Self {
            id,
            kind,
            remaining: Fixed::from_num(total),
            total,
        }
    }

    /// Count down one tick, or finish outright under instant build.
    pub fn advance(&mut self, instant: bool) {
        if instant {
            self.remaining = Fixed::ZERO;
        } else {
            self.remaining -= Fixed::ONE;
        }
    }

    /// Build time has run out.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining <= Fixed::ZERO
    }

    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        progress_percent(self.remaining, self.total)
    }
}

fn progress_percent(remaining: Fixed, total: u32) -> u32 {
    if total == 0 {
        return 100;
    }
    let total = Fixed::from_num(total);
    let done = (total - remaining.max(Fixed::ZERO)).max(Fixed::ZERO);
    (done * whole(100) / total).to_num::<u32>().min(100)
}

/// Why a finished queue head could not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Population is at the cap.
    PopulationCap,
    /// A unit stands on the spawn point of the lane.
    SpawnOccupied,
}

/// Events emitted by the production resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionEvent {
    /// A combat unit entered its lane.
    UnitSpawned {
        /// Owner.
        faction: FactionId,
        /// Producing building.
        building: BuildingId,
        /// New unit.
        unit: UnitId,
        /// Its type.
        kind: UnitKind,
    },
    /// A worker joined the idle pool.
    WorkerTrained {
        /// Owner.
        faction: FactionId,
        /// Producing building.
        building: BuildingId,
    },
    /// A tech level was reached.
    TechResearched {
        /// Owner.
        faction: FactionId,
        /// Completed tech.
        tech: TechId,
    },
    /// A finished head is waiting.
    SpawnBlocked {
        /// Owner.
        faction: FactionId,
        /// Building holding the item.
        building: BuildingId,
        /// Blocked item.
        item: QueueItemKind,
        /// Cause.
        reason: BlockReason,
    },
    /// A construction turned into a building.
    ConstructionCompleted {
        /// Owner.
        faction: FactionId,
        /// New building.
        building: BuildingId,
        /// Its type.
        kind: BuildingKind,
    },
}

/// Shared state the resolver needs to create units.
pub struct SpawnContext<'a> {
    /// Match rules.
    pub rules: &'a MatchRules,
    /// Next unit id to hand out; advanced on every spawn.
    pub next_unit_id: &'a mut u64,
    /// Source of the initial cooldown jitter.
    pub rng: &'a mut dyn RandomSource,
}

impl SpawnContext<'_> {
    fn allocate_unit_id(&mut self) -> UnitId {
        let id = UnitId(*self.next_unit_id);
        *self.next_unit_id += 1;
        id
    }
}

/// Advance every building queue of `faction` by one tick.
///
/// `opponent_units` is read for spawn collisions: a unit of either side
/// standing on the spawn point blocks a new unit in that lane.
pub fn production_system(
    faction: &mut FactionState,
    opponent_units: &[Unit],
    ctx: &mut SpawnContext<'_>,
) -> Vec<ProductionEvent> {
    let mut events = Vec::new();
    let instant = faction.instant_build;

    for index in 0..faction.buildings.len() {
        let building_id = faction.buildings[index].id;
        let Some(item) = faction.buildings[index].queue.current_mut() else {
            continue;
        };
        item.advance(instant);
        if !item.is_complete() {
            continue;
        }
        let kind = item.kind;

        if let Some(reason) = blocking_reason(faction, opponent_units, kind, ctx.rules) {
            if let Some(item) = faction.buildings[index].queue.current_mut() {
                item.remaining = ctx.rules.blocked_retry;
            }
            trace!(faction = %faction.id, building = building_id.0, item = %kind, ?reason, "Spawn blocked");
            events.push(ProductionEvent::SpawnBlocked {
                faction: faction.id,
                building: building_id,
                item: kind,
                reason,
            });
            continue;
        }

        if faction.buildings[index].queue.complete().is_some() {
            events.push(resolve_production(faction, building_id, kind, ctx));
        }
    }

    events
}

/// Check whether a finished item must wait.
fn blocking_reason(
    faction: &FactionState,
    opponent_units: &[Unit],
    kind: QueueItemKind,
    rules: &MatchRules,
) -> Option<BlockReason> {
    let QueueItemKind::Unit(unit_kind) = kind else {
        return None;
    };
    if faction.is_at_pop_cap() {
        return Some(BlockReason::PopulationCap);
    }
    if unit_kind.is_worker() {
        return None;
    }

    let lane = unit_kind.stats().lane;
    let spawn = faction.id.base_center(rules);
    let occupied = faction
        .units
        .iter()
        .chain(opponent_units)
        .filter(|u| u.lane == lane)
        .any(|u| distance(u.position, spawn) < u.width / whole(2) + rules.spawn_clearance);
    occupied.then_some(BlockReason::SpawnOccupied)
}

/// Turn a finished queue item into its effect.
pub fn resolve_production(
    faction: &mut FactionState,
    building: BuildingId,
    kind: QueueItemKind,
    ctx: &mut SpawnContext<'_>,
) -> ProductionEvent {
    match kind {
        QueueItemKind::Tech(tech) => {
            let gained = faction.tech.complete(tech);
            if gained > 0 {
                let amount = Fixed::from_num(gained);
                for unit in &mut faction.units {
                    unit.apply_tech(tech.category, amount);
                }
            }
            info!(faction = %faction.id, %tech, "Tech researched");
            ProductionEvent::TechResearched {
                faction: faction.id,
                tech,
            }
        }
        QueueItemKind::Unit(unit_kind) if unit_kind.is_worker() => {
            faction.workers.add_trained();
            debug!(faction = %faction.id, workers = faction.workers.total(), "Worker trained");
            ProductionEvent::WorkerTrained {
                faction: faction.id,
                building,
            }
        }
        QueueItemKind::Unit(unit_kind) => {
            let id = ctx.allocate_unit_id();
            let cooldown = ctx.rng.below(ctx.rules.initial_cooldown_jitter);
            let spawn = faction.id.base_center(ctx.rules);
            let unit = Unit::spawn(
                id,
                unit_kind,
                faction.id,
                spawn,
                ctx.rules,
                cooldown,
                &faction.tech,
            );
            faction.units.push(unit);
            faction.army_count += 1;
            debug!(faction = %faction.id, unit = id.0, kind = %unit_kind, "Unit spawned");
            ProductionEvent::UnitSpawned {
                faction: faction.id,
                building,
                unit: id,
                kind: unit_kind,
            }
        }
    }
}

/// Advance every construction of `faction` by one tick and turn finished
/// ones into buildings.
pub fn construction_system(faction: &mut FactionState, rules: &MatchRules) -> Vec<ProductionEvent> {
    let instant = faction.instant_build;
    for construction in &mut faction.constructions {
        construction.advance(instant);
    }

    let (finished, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut faction.constructions)
        .into_iter()
        .partition(Construction::is_complete);
    faction.constructions = pending;

    let mut events = Vec::with_capacity(finished.len());
    for construction in finished {
        faction.buildings.push(Building::new(
            construction.id,
            construction.kind,
            rules.max_queue_size,
        ));
        let pop_bonus = construction.kind.stats().pop_bonus;
        if pop_bonus > 0 {
            faction.raise_pop_cap(pop_bonus, rules.max_pop_cap);
        }
        info!(
            faction = %faction.id,
            building = construction.id.0,
            kind = %construction.kind,
            pop_cap = faction.pop_cap,
            "Construction completed"
        );
        events.push(ProductionEvent::ConstructionCompleted {
            faction: faction.id,
            building: construction.id,
            kind: construction.kind,
        });
    }
    events
}

/// Queue a unit at a building.
///
/// Validates the menu, queue bound, population cap (combat units only) and
/// cost, then deducts the cost.
pub fn queue_unit(
    faction: &mut FactionState,
    building: BuildingId,
    unit: UnitKind,
) -> Result<(), CommandError> {
    let current_pop = faction.current_pop();
    let pop_cap = faction.pop_cap;
    let target = faction
        .buildings
        .iter_mut()
        .find(|b| b.id == building)
        .ok_or(CommandError::UnknownBuilding(building.0))?;

    if !target.kind.trains(unit) {
        return Err(CommandError::NotProducible {
            building: target.kind.id(),
            item: unit.id().to_string(),
        });
    }
    if target.queue.is_full() {
        return Err(CommandError::QueueFull {
            max: target.queue.max_queue_size,
        });
    }
    if !unit.is_worker() && current_pop >= pop_cap {
        return Err(CommandError::PopulationCapReached {
            current: current_pop,
            cap: pop_cap,
        });
    }

    faction.stockpile.check(&unit.stats().cost)?;
    target.queue.add(QueueItemKind::Unit(unit))?;
    faction.stockpile.spend(&unit.stats().cost)
}

/// Queue a tech at a building.
///
/// The building must research techs, the tech must be the next level of
/// its line, and it must not already be queued anywhere.
pub fn queue_tech(
    faction: &mut FactionState,
    building: BuildingId,
    tech: TechId,
) -> Result<(), CommandError> {
    let kind = faction
        .building(building)
        .ok_or(CommandError::UnknownBuilding(building.0))?
        .kind;
    if !kind.stats().researches {
        return Err(CommandError::NotProducible {
            building: kind.id(),
            item: tech.to_string(),
        });
    }
    if faction.tech.next(tech.category) != Some(tech) || faction.is_tech_queued(tech) {
        return Err(CommandError::TechUnavailable(tech.to_string()));
    }

    faction.stockpile.check(&tech.cost())?;
    faction
        .building_mut(building)
        .ok_or(CommandError::UnknownBuilding(building.0))?
        .queue
        .add(QueueItemKind::Tech(tech))?;
    faction.stockpile.spend(&tech.cost())
}

/// Pay for and start a construction with the given id.
pub fn start_construction(
    faction: &mut FactionState,
    id: BuildingId,
    kind: BuildingKind,
) -> Result<(), CommandError> {
    faction.stockpile.spend(&kind.stats().cost)?;
    faction.constructions.push(Construction::new(id, kind));
    debug!(faction = %faction.id, building = id.0, %kind, "Construction started");
    Ok(())
}
