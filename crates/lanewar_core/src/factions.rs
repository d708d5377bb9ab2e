//! The two factions and their per-match state.
//!
//! The player base sits near 0 and advances in the +1 direction; the
//! enemy base sits near 100 and advances in the -1 direction. Every
//! piece of lane geometry is derived from those two facts.

use serde::{Deserialize, Serialize};

use crate::components::{Unit, UnitId};
use crate::data::{BuildingKind, MatchRules, TechCategory, TechId};
use crate::economy::{Stockpile, WorkerPool};
use crate::math::{fixed_serde, Fixed};
use crate::production::{Building, BuildingId, Construction};
use crate::stance::StanceBoard;

/// Unique identifier for factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionId {
    /// Human side, base on the left.
    Player,
    /// Opponent, base on the right.
    Enemy,
}

impl FactionId {
    /// Both factions in processing order.
    pub const ALL: [Self; 2] = [Self::Player, Self::Enemy];

    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Enemy => "Enemy",
        }
    }

    /// Index into two-element arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Player => 0,
            Self::Enemy => 1,
        }
    }

    /// The other faction.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// `+1` for the player, `-1` for the enemy.
    #[must_use]
    pub fn direction(self) -> Fixed {
        match self {
            Self::Player => Fixed::ONE,
            Self::Enemy => -Fixed::ONE,
        }
    }

    /// Center of this faction's base. Units spawn here.
    #[must_use]
    pub fn base_center(self, rules: &MatchRules) -> Fixed {
        match self {
            Self::Player => rules.player_base,
            Self::Enemy => rules.enemy_base,
        }
    }

    /// Edge of this faction's base facing the battlefield (its gate).
    #[must_use]
    pub fn gate_edge(self, rules: &MatchRules) -> Fixed {
        self.base_center(rules) + self.direction() * rules.base_half_width()
    }

    /// Whether `position` lies further toward the enemy than `mark`.
    #[must_use]
    pub fn is_beyond(self, position: Fixed, mark: Fixed) -> bool {
        match self {
            Self::Player => position > mark,
            Self::Enemy => position < mark,
        }
    }
}

impl std::fmt::Display for FactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Researched level of each tech line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TechLevels([u8; 4]);

impl TechLevels {
    /// Current level of a line.
    #[must_use]
    pub const fn level(&self, category: TechCategory) -> u8 {
        self.0[category.index()]
    }

    /// Record a finished tech. Returns how many levels were gained.
    pub fn complete(&mut self, tech: TechId) -> u8 {
        let slot = &mut self.0[tech.category.index()];
        let gained = tech.level.saturating_sub(*slot);
        *slot = (*slot).max(tech.level);
        gained
    }

    /// The next tech of a line, or `None` when the line is maxed.
    #[must_use]
    pub fn next(&self, category: TechCategory) -> Option<TechId> {
        TechId::new(category, self.level(category) + 1)
    }
}

/// Everything one side owns during a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionState {
    /// Which side.
    pub id: FactionId,
    /// Resources.
    pub stockpile: Stockpile,
    /// Worker counts.
    pub workers: WorkerPool,
    /// Population cap.
    pub pop_cap: u32,
    /// Living combat units.
    pub army_count: u32,
    /// Base health.
    #[serde(with = "fixed_serde")]
    pub base_hp: Fixed,
    /// Base health at match start.
    #[serde(with = "fixed_serde")]
    pub base_max_hp: Fixed,
    /// Researched techs.
    pub tech: TechLevels,
    /// Ticks until the base turret may fire.
    pub turret_cooldown: u32,
    /// Finished buildings.
    pub buildings: Vec<Building>,
    /// Buildings under construction.
    pub constructions: Vec<Construction>,
    /// Units on the lanes.
    pub units: Vec<Unit>,
    /// Lane stances.
    pub stances: StanceBoard,
    /// Queues and constructions finish immediately.
    pub instant_build: bool,
    /// Hand this faction's commands to the policy controller.
    pub autopilot: bool,
}

impl FactionState {
    /// Starting state: resources from rules, workers on food, one town
    /// center.
    #[must_use]
    pub fn new(
        id: FactionId,
        rules: &MatchRules,
        starting_workers: u32,
        town_center: BuildingId,
    ) -> Self {
        let base_hp = Fixed::from_num(rules.base_hp);
        Self {
            id,
            stockpile: Stockpile::from_cost(rules.starting_resources),
            workers: WorkerPool::on_food(starting_workers),
            pop_cap: rules.initial_pop_cap.min(rules.max_pop_cap),
            army_count: 0,
            base_hp,
            base_max_hp: base_hp,
            tech: TechLevels::default(),
            turret_cooldown: 0,
            buildings: vec![Building::new(
                town_center,
                BuildingKind::TownCenter,
                rules.max_queue_size,
            )],
            constructions: Vec::new(),
            units: Vec::new(),
            stances: StanceBoard::default(),
            instant_build: false,
            autopilot: false,
        }
    }

    /// Workers plus army.
    #[must_use]
    pub const fn current_pop(&self) -> u32 {
        self.workers.total() + self.army_count
    }

    /// Population has reached the cap.
    #[must_use]
    pub const fn is_at_pop_cap(&self) -> bool {
        self.current_pop() >= self.pop_cap
    }

    /// Base health has run out.
    #[must_use]
    pub fn is_base_destroyed(&self) -> bool {
        self.base_hp <= Fixed::ZERO
    }

    /// Raise the population cap, clamped to the ceiling.
    pub fn raise_pop_cap(&mut self, amount: u32, ceiling: u32) {
        self.pop_cap = self.pop_cap.saturating_add(amount).min(ceiling);
    }

    /// Look up an owned building.
    #[must_use]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Look up an owned building mutably.
    pub fn building_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.iter_mut().find(|b| b.id == id)
    }

    /// Look up an owned unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Look up an owned unit mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Whether a tech is waiting in any of this faction's queues.
    #[must_use]
    pub fn is_tech_queued(&self, tech: TechId) -> bool {
        self.buildings.iter().any(|b| b.queue.contains_tech(tech))
    }

    /// Check the bookkeeping invariants: worker buckets add up and the
    /// army count matches the non-worker units on the lanes.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let lane_army = self
            .units
            .iter()
            .filter(|u| !u.kind.is_worker())
            .count() as u32;
        self.workers.is_consistent() && lane_army == self.army_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::whole;

    #[test]
    fn test_faction_geometry() {
        let rules = MatchRules::default();
        assert_eq!(FactionId::Player.base_center(&rules), whole(4));
        assert_eq!(FactionId::Enemy.base_center(&rules), whole(96));
        assert_eq!(FactionId::Player.gate_edge(&rules), whole(6));
        assert_eq!(FactionId::Enemy.gate_edge(&rules), whole(94));
        assert!(FactionId::Player.is_beyond(whole(7), whole(6)));
        assert!(FactionId::Enemy.is_beyond(whole(93), whole(94)));
        assert_eq!(FactionId::Player.opponent(), FactionId::Enemy);
    }

    #[test]
    fn test_new_faction() {
        let rules = MatchRules::default();
        let faction = FactionState::new(FactionId::Player, &rules, 6, BuildingId(1));
        assert_eq!(faction.current_pop(), 6);
        assert_eq!(faction.pop_cap, 10);
        assert_eq!(faction.base_hp, whole(2000));
        assert_eq!(faction.buildings.len(), 1);
        assert_eq!(faction.buildings[0].kind, BuildingKind::TownCenter);
        assert!(faction.is_consistent());
    }

    #[test]
    fn test_pop_cap_clamped_to_ceiling() {
        let rules = MatchRules::default();
        let mut faction = FactionState::new(FactionId::Enemy, &rules, 7, BuildingId(2));
        faction.pop_cap = 195;
        faction.raise_pop_cap(10, rules.max_pop_cap);
        assert_eq!(faction.pop_cap, 200);
    }

    #[test]
    fn test_tech_levels_next_and_complete() {
        let mut tech = TechLevels::default();
        let first = tech.next(TechCategory::RangedAttack).unwrap();
        assert_eq!(first.level, 1);
        assert_eq!(tech.complete(first), 1);
        assert_eq!(tech.level(TechCategory::RangedAttack), 1);
        assert_eq!(tech.complete(first), 0);

        for level in 2..=3 {
            tech.complete(TechId::new(TechCategory::RangedAttack, level).unwrap());
        }
        assert_eq!(tech.next(TechCategory::RangedAttack), None);
    }
}
