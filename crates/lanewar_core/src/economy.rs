//! Resource stockpiles, worker assignment, and gathering.
//!
//! Each faction holds four resource counters and a pool of workers split
//! across the four resources plus an idle bucket. Workers are a counter
//! abstraction: gathering adds `assigned × rate` per resource on every
//! gather interval, no worker entity ever walks anywhere.
//!
//! Counters never go negative: spending is all-or-nothing and checks
//! every resource before deducting any.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, GameError};
use crate::math::{fixed_serde, Fixed};

/// The four gatherable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Food.
    Food,
    /// Wood.
    Wood,
    /// Gold.
    Gold,
    /// Stone.
    Stone,
}

impl ResourceKind {
    /// All resources in canonical order.
    pub const ALL: [Self; 4] = [Self::Food, Self::Wood, Self::Gold, Self::Stone];

    /// Index into per-resource arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Food => 0,
            Self::Wood => 1,
            Self::Gold => 2,
            Self::Stone => 3,
        }
    }

    /// Lowercase identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Wood => "wood",
            Self::Gold => "gold",
            Self::Stone => "stone",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| GameError::UnknownResource(s.to_string()))
    }
}

/// Price of a unit, building, or tech. Whole numbers only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cost {
    /// Food.
    #[serde(default)]
    pub food: u32,
    /// Wood.
    #[serde(default)]
    pub wood: u32,
    /// Gold.
    #[serde(default)]
    pub gold: u32,
    /// Stone.
    #[serde(default)]
    pub stone: u32,
}

impl Cost {
    /// Nothing to pay.
    pub const FREE: Self = Self::new(0, 0, 0, 0);

    /// Create a cost from all four amounts.
    #[must_use]
    pub const fn new(food: u32, wood: u32, gold: u32, stone: u32) -> Self {
        Self {
            food,
            wood,
            gold,
            stone,
        }
    }

    /// Amount of one resource.
    #[must_use]
    pub const fn amount(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Gold => self.gold,
            ResourceKind::Stone => self.stone,
        }
    }
}

/// A faction's resource counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stockpile {
    #[serde(with = "fixed_serde")]
    food: Fixed,
    #[serde(with = "fixed_serde")]
    wood: Fixed,
    #[serde(with = "fixed_serde")]
    gold: Fixed,
    #[serde(with = "fixed_serde")]
    stone: Fixed,
}

impl Default for Stockpile {
    fn default() -> Self {
        Self::from_cost(Cost::FREE)
    }
}

impl Stockpile {
    /// Stockpile holding exactly the given whole amounts.
    #[must_use]
    pub fn from_cost(amounts: Cost) -> Self {
        Self {
            food: Fixed::from_num(amounts.food),
            wood: Fixed::from_num(amounts.wood),
            gold: Fixed::from_num(amounts.gold),
            stone: Fixed::from_num(amounts.stone),
        }
    }

    /// Current amount of a resource.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> Fixed {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Gold => self.gold,
            ResourceKind::Stone => self.stone,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut Fixed {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Stone => &mut self.stone,
        }
    }

    /// Add to a resource. Negative amounts are ignored.
    pub fn deposit(&mut self, kind: ResourceKind, amount: Fixed) {
        if amount > Fixed::ZERO {
            *self.slot_mut(kind) += amount;
        }
    }

    /// Overwrite every resource with the same amount.
    pub fn set_all(&mut self, amount: u32) {
        let value = Fixed::from_num(amount);
        for kind in ResourceKind::ALL {
            *self.slot_mut(kind) = value;
        }
    }

    /// Check a cost against the stockpile.
    ///
    /// Reports the first resource (in canonical order) that falls short.
    pub fn check(&self, cost: &Cost) -> Result<(), CommandError> {
        for kind in ResourceKind::ALL {
            let required = cost.amount(kind);
            let available = self.get(kind);
            if available < Fixed::from_num(required) {
                return Err(CommandError::InsufficientResources {
                    resource: kind,
                    required,
                    available: available.max(Fixed::ZERO).to_num::<u32>(),
                });
            }
        }
        Ok(())
    }

    /// Whether the cost can be paid right now.
    #[must_use]
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.check(cost).is_ok()
    }

    /// Pay a cost. Nothing is deducted unless every resource suffices.
    pub fn spend(&mut self, cost: &Cost) -> Result<(), CommandError> {
        self.check(cost)?;
        for kind in ResourceKind::ALL {
            *self.slot_mut(kind) -= Fixed::from_num(cost.amount(kind));
        }
        Ok(())
    }

    /// True when every counter is non-negative.
    #[must_use]
    pub fn is_non_negative(&self) -> bool {
        ResourceKind::ALL
            .into_iter()
            .all(|kind| self.get(kind) >= Fixed::ZERO)
    }
}

/// Worker counts per resource plus idle workers.
///
/// `sum(assigned) + idle == total` holds after every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WorkerPool {
    assigned: [u32; 4],
    idle: u32,
    total: u32,
}

impl WorkerPool {
    /// A pool with every worker on food.
    #[must_use]
    pub const fn on_food(count: u32) -> Self {
        Self {
            assigned: [count, 0, 0, 0],
            idle: 0,
            total: count,
        }
    }

    /// Workers gathering one resource.
    #[must_use]
    pub const fn assigned(&self, kind: ResourceKind) -> u32 {
        self.assigned[kind.index()]
    }

    /// Workers with no assignment.
    #[must_use]
    pub const fn idle(&self) -> u32 {
        self.idle
    }

    /// All workers.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Move workers between idle and a resource.
    ///
    /// Positive `delta` assigns idle workers, negative releases assigned
    /// ones. The move is all-or-nothing.
    pub fn reassign(&mut self, kind: ResourceKind, delta: i32) -> Result<(), CommandError> {
        let count = delta.unsigned_abs();
        let slot = kind.index();
        if delta > 0 {
            if self.idle < count {
                return Err(CommandError::NoIdleWorkers);
            }
            self.idle -= count;
            self.assigned[slot] += count;
        } else if delta < 0 {
            if self.assigned[slot] < count {
                return Err(CommandError::NoAssignedWorkers(kind));
            }
            self.assigned[slot] -= count;
            self.idle += count;
        }
        Ok(())
    }

    /// A worker finished training; it starts idle.
    pub fn add_trained(&mut self) {
        self.total += 1;
        self.idle += 1;
    }

    /// A worker-tagged unit died.
    ///
    /// The food bucket loses one first. If food is already empty the
    /// loss comes from idle, then from the other resources in order.
    pub fn remove_fallen(&mut self) {
        if self.total == 0 {
            return;
        }
        self.total -= 1;
        let food = ResourceKind::Food.index();
        if self.assigned[food] > 0 {
            self.assigned[food] -= 1;
        } else if self.idle > 0 {
            self.idle -= 1;
        } else if let Some(slot) = self.assigned.iter_mut().find(|n| **n > 0) {
            *slot -= 1;
        }
    }

    /// Check the assignment invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.assigned.iter().sum::<u32>() + self.idle == self.total
    }
}

/// Add one gather interval's yield to the stockpile.
pub fn gather(stockpile: &mut Stockpile, workers: &WorkerPool, rate: Fixed) {
    for kind in ResourceKind::ALL {
        let yield_amount = Fixed::from_num(workers.assigned(kind)) * rate;
        stockpile.deposit(kind, yield_amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ratio;
    use proptest::prelude::*;

    #[test]
    fn test_gather_rate_per_worker() {
        let mut stock = Stockpile::from_cost(Cost::new(200, 200, 100, 0));
        let mut workers = WorkerPool::on_food(6);
        workers.reassign(ResourceKind::Food, -2).unwrap();
        workers.reassign(ResourceKind::Stone, 2).unwrap();

        gather(&mut stock, &workers, ratio(3, 5));

        assert_eq!(stock.get(ResourceKind::Food), Fixed::from_num(200) + ratio(3, 5) * Fixed::from_num(4));
        assert_eq!(stock.get(ResourceKind::Stone), ratio(3, 5) * Fixed::from_num(2));
        assert_eq!(stock.get(ResourceKind::Wood), Fixed::from_num(200));
    }

    #[test]
    fn test_spend_is_all_or_nothing() {
        let mut stock = Stockpile::from_cost(Cost::new(500, 10, 500, 0));
        let cost = Cost::new(100, 150, 0, 0);

        let err = stock.spend(&cost).unwrap_err();
        assert_eq!(
            err,
            CommandError::InsufficientResources {
                resource: ResourceKind::Wood,
                required: 150,
                available: 10,
            }
        );
        assert_eq!(stock.get(ResourceKind::Food), Fixed::from_num(500));

        stock.deposit(ResourceKind::Wood, Fixed::from_num(140));
        stock.spend(&cost).unwrap();
        assert_eq!(stock.get(ResourceKind::Food), Fixed::from_num(400));
        assert_eq!(stock.get(ResourceKind::Wood), Fixed::ZERO);
    }

    #[test]
    fn test_deposit_ignores_negative() {
        let mut stock = Stockpile::default();
        stock.deposit(ResourceKind::Gold, Fixed::from_num(-5));
        assert_eq!(stock.get(ResourceKind::Gold), Fixed::ZERO);
    }

    #[test]
    fn test_reassign_requires_workers() {
        let mut workers = WorkerPool::on_food(2);
        assert_eq!(
            workers.reassign(ResourceKind::Wood, 1),
            Err(CommandError::NoIdleWorkers)
        );
        assert_eq!(
            workers.reassign(ResourceKind::Wood, -1),
            Err(CommandError::NoAssignedWorkers(ResourceKind::Wood))
        );

        workers.reassign(ResourceKind::Food, -1).unwrap();
        workers.reassign(ResourceKind::Wood, 1).unwrap();
        assert_eq!(workers.assigned(ResourceKind::Wood), 1);
        assert_eq!(workers.idle(), 0);
        assert!(workers.is_consistent());
    }

    #[test]
    fn test_remove_fallen_keeps_invariant() {
        let mut workers = WorkerPool::on_food(1);
        workers.add_trained();
        workers.remove_fallen();
        assert_eq!(workers.total(), 1);
        assert_eq!(workers.assigned(ResourceKind::Food), 0);
        assert_eq!(workers.idle(), 1);

        workers.remove_fallen();
        assert_eq!(workers.total(), 0);
        assert!(workers.is_consistent());

        workers.remove_fallen();
        assert_eq!(workers.total(), 0);
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("gold".parse::<ResourceKind>().unwrap(), ResourceKind::Gold);
        assert!("mana".parse::<ResourceKind>().is_err());
        assert_eq!(ResourceKind::Stone.to_string(), "stone");
    }

    proptest! {
        #[test]
        fn prop_stockpile_never_negative(
            ops in prop::collection::vec((0u32..4, 0u32..400, any::<bool>()), 0..60),
        ) {
            let mut stock = Stockpile::from_cost(Cost::new(200, 200, 100, 0));
            for (slot, amount, is_spend) in ops {
                let kind = ResourceKind::ALL[slot as usize];
                if is_spend {
                    let mut cost = Cost::FREE;
                    match kind {
                        ResourceKind::Food => cost.food = amount,
                        ResourceKind::Wood => cost.wood = amount,
                        ResourceKind::Gold => cost.gold = amount,
                        ResourceKind::Stone => cost.stone = amount,
                    }
                    let _ = stock.spend(&cost);
                } else {
                    stock.deposit(kind, Fixed::from_num(amount) * ratio(3, 5));
                }
                prop_assert!(stock.is_non_negative());
            }
        }

        #[test]
        fn prop_worker_pool_stays_consistent(
            moves in prop::collection::vec((0u32..4, -3i32..4), 0..40),
            deaths in 0u32..10,
        ) {
            let mut workers = WorkerPool::on_food(6);
            for (slot, delta) in moves {
                let _ = workers.reassign(ResourceKind::ALL[slot as usize], delta);
                prop_assert!(workers.is_consistent());
            }
            for _ in 0..deaths {
                workers.remove_fallen();
                prop_assert!(workers.is_consistent());
            }
        }
    }
}
