//! Entity model for lane units and in-flight effects.
//!
//! A [`Unit`] copies its mutable combat numbers out of the static stat
//! block at spawn time so techs can raise them in place. Everything that
//! never changes (tags, attack type, lane) is read back through
//! [`Unit::stats`].

use serde::{Deserialize, Serialize};

use crate::data::{AttackType, MatchRules, TechCategory, UnitKind, UnitStats, UnitTags};
use crate::factions::{FactionId, TechLevels};
use crate::math::{fixed_serde, Fixed};

/// Unique identifier for units. Never reused within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// What a unit did this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    /// No target; free to move.
    #[default]
    Moving,
    /// Has a target in range.
    Attacking,
    /// Spawned but not yet processed.
    Idle,
}

/// Something a unit can attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackTarget {
    /// An enemy unit.
    Unit(UnitId),
    /// The enemy base.
    Base,
}

/// A unit on a lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Identity.
    pub id: UnitId,
    /// Type.
    pub kind: UnitKind,
    /// Owner.
    pub owner: FactionId,
    /// Lane, fixed by type.
    pub lane: u8,
    /// Position on the 0-100 axis.
    #[serde(with = "fixed_serde")]
    pub position: Fixed,
    /// Position at the start of this tick, for render interpolation.
    #[serde(with = "fixed_serde")]
    pub previous_position: Fixed,
    /// Current health.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Maximum health.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
    /// Damage per attack, including tech.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Defense against melee attacks, including tech.
    #[serde(with = "fixed_serde")]
    pub melee_defense: Fixed,
    /// Defense against ranged attacks, including tech.
    #[serde(with = "fixed_serde")]
    pub ranged_defense: Fixed,
    /// Attack reach.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Movement per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Collision footprint.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Ticks until the next attack is allowed.
    pub attack_cooldown: u32,
    /// Cooldown applied after each attack.
    pub cooldown_max: u32,
    /// Ticks left on the attack animation.
    pub attack_anim: u32,
    /// Has fully left the home gate at least once.
    pub deployed: bool,
    /// Behavior this tick.
    pub state: UnitState,
    /// Current target, if any.
    pub target: Option<AttackTarget>,
}

impl Unit {
    /// Build a unit from its type's stat block and the owner's current
    /// tech levels.
    #[must_use]
    pub fn spawn(
        id: UnitId,
        kind: UnitKind,
        owner: FactionId,
        position: Fixed,
        rules: &MatchRules,
        initial_cooldown: u32,
        tech: &TechLevels,
    ) -> Self {
        let stats = kind.stats();
        let ticks_per_second = Fixed::from_num(rules.ticks_per_second);
        let mut unit = Self {
            id,
            kind,
            owner,
            lane: stats.lane,
            position,
            previous_position: position,
            hp: stats.hp,
            max_hp: stats.hp,
            damage: stats.damage,
            melee_defense: stats.melee_defense,
            ranged_defense: stats.ranged_defense,
            range: stats.range,
            speed: stats.speed / ticks_per_second,
            width: rules.unit_width * stats.width_scale,
            attack_cooldown: initial_cooldown,
            cooldown_max: crate::math::seconds_to_ticks(
                stats.attack_seconds,
                rules.ticks_per_second,
            ),
            attack_anim: 0,
            deployed: false,
            state: UnitState::Idle,
            target: None,
        };
        for category in TechCategory::ALL {
            let level = tech.level(category);
            if level > 0 {
                unit.apply_tech(category, Fixed::from_num(level));
            }
        }
        unit
    }

    /// Static stats of this unit's type.
    #[must_use]
    pub fn stats(&self) -> &'static UnitStats {
        self.kind.stats()
    }

    /// Classification flags.
    #[must_use]
    pub fn tags(&self) -> UnitTags {
        self.stats().tags
    }

    /// Melee or ranged.
    #[must_use]
    pub fn attack_type(&self) -> AttackType {
        self.stats().attack_type
    }

    /// HP above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > Fixed::ZERO
    }

    /// The defense value an attack of `attack_type` must overcome.
    #[must_use]
    pub fn defense_against(&self, attack_type: AttackType) -> Fixed {
        match attack_type {
            AttackType::Melee => self.melee_defense,
            AttackType::Ranged => self.ranged_defense,
        }
    }

    /// Raise a stat if this unit's attack type matches the tech line.
    pub fn apply_tech(&mut self, category: TechCategory, amount: Fixed) {
        if self.attack_type() != category.affects() {
            return;
        }
        match category {
            TechCategory::MeleeAttack | TechCategory::RangedAttack => self.damage += amount,
            TechCategory::MeleeDefense => self.melee_defense += amount,
            TechCategory::RangedDefense => self.ranged_defense += amount,
        }
    }
}

/// A ranged hit in flight. Damage is resolved at fire time and applied
/// on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHit {
    /// Shooter.
    pub attacker: UnitId,
    /// Faction that owns the target.
    pub victim_faction: FactionId,
    /// Target.
    pub target: AttackTarget,
    /// Damage after defense.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Tick on which the hit lands.
    pub due_tick: u64,
}

/// A siege shell in flight.
///
/// Area damage is re-evaluated against whoever stands near the impact
/// point when it lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiegeStrike {
    /// Shooter.
    pub attacker: UnitId,
    /// Type of the shooter, for its siege profile.
    pub attacker_kind: UnitKind,
    /// Faction being shelled.
    pub victim_faction: FactionId,
    /// What was aimed at.
    pub target: AttackTarget,
    /// Impact point on the lane axis.
    #[serde(with = "fixed_serde")]
    pub impact_position: Fixed,
    /// Lane that takes the splash.
    pub impact_lane: u8,
    /// Damage dealt to the base if the target was the base, after defense.
    #[serde(with = "fixed_serde")]
    pub base_damage: Fixed,
    /// Tick on which the shell lands.
    pub due_tick: u64,
}
