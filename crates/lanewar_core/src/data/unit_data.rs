//! Unit types and their immutable stat blocks.
//!
//! [`UnitKind`] is a closed set; each variant maps to one static
//! [`UnitStats`]. Bonus damage is a small declarative rule resolved by the
//! pure function [`bonus_damage`], with "no bonus" as the default case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::economy::Cost;
use crate::error::GameError;
use crate::math::{ratio, whole, Fixed};

/// Bitflags classifying a unit for bonus-damage rules.
///
/// # Example
///
/// ```
/// use lanewar_core::data::UnitTags;
///
/// let tags = UnitTags::INFANTRY.union(UnitTags::MELEE);
/// assert!(tags.contains(UnitTags::MELEE));
/// assert!(tags.intersects(UnitTags::MELEE.union(UnitTags::SIEGE)));
/// assert!(!tags.contains(UnitTags::CAVALRY));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitTags(u16);

impl UnitTags {
    /// Foot soldier.
    pub const INFANTRY: Self = Self(1 << 0);
    /// Mounted.
    pub const CAVALRY: Self = Self(1 << 1);
    /// Bow or crossbow user.
    pub const ARCHER: Self = Self(1 << 2);
    /// Siege engine.
    pub const SIEGE: Self = Self(1 << 3);
    /// Fights in contact.
    pub const MELEE: Self = Self(1 << 4);
    /// Fights at range.
    pub const RANGED: Self = Self(1 << 5);
    /// Light armor.
    pub const LIGHT: Self = Self(1 << 6);
    /// Heavy armor.
    pub const HEAVY: Self = Self(1 << 7);
    /// Villager; death also shrinks the worker pool.
    pub const WORKER: Self = Self(1 << 8);

    /// No flags.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// At least one flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Union of flags.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

/// Which defense an attack is checked against, and which tech line buffs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    /// Subtracts melee defense.
    Melee,
    /// Subtracts ranged defense.
    Ranged,
}

/// Flat bonus damage against certain targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusRule {
    /// No bonus.
    None,
    /// Bonus when the target has any of the tags.
    AnyOf(UnitTags, Fixed),
    /// Bonus when the target has all of the tags.
    AllOf(UnitTags, Fixed),
}

impl BonusRule {
    /// Bonus against a target with `tags`.
    #[must_use]
    pub fn against(self, tags: UnitTags) -> Fixed {
        match self {
            Self::None => Fixed::ZERO,
            Self::AnyOf(wanted, bonus) if tags.intersects(wanted) => bonus,
            Self::AllOf(wanted, bonus) if tags.contains(wanted) => bonus,
            Self::AnyOf(..) | Self::AllOf(..) => Fixed::ZERO,
        }
    }
}

/// Indirect-fire profile carried by siege engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiegeProfile {
    /// Splash radius on the lane axis.
    pub area_radius: Fixed,
    /// Splash damage at the impact center.
    pub area_damage: Fixed,
    /// Extra damage added when the target is a base.
    pub bonus_vs_base: Fixed,
    /// Shell flight time in seconds.
    pub flight_seconds: Fixed,
}

/// Immutable stats of one unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    /// Identifier used in commands and snapshots.
    pub id: &'static str,
    /// Production price.
    pub cost: Cost,
    /// Training time in ticks.
    pub train_time: u32,
    /// Maximum health.
    pub hp: Fixed,
    /// Damage per attack.
    pub damage: Fixed,
    /// Defense against melee attacks.
    pub melee_defense: Fixed,
    /// Defense against ranged attacks.
    pub ranged_defense: Fixed,
    /// Attack range on the lane axis.
    pub range: Fixed,
    /// Movement per logical second.
    pub speed: Fixed,
    /// Lane the unit always occupies.
    pub lane: u8,
    /// Footprint multiplier applied to the base unit width.
    pub width_scale: Fixed,
    /// Melee or ranged.
    pub attack_type: AttackType,
    /// Seconds between attacks.
    pub attack_seconds: Fixed,
    /// Whether the unit keeps moving while it has a target.
    pub can_move_attack: bool,
    /// Classification flags.
    pub tags: UnitTags,
    /// Bonus against tagged targets.
    pub bonus: BonusRule,
    /// Present for siege engines only.
    pub siege: Option<SiegeProfile>,
}

/// Every trainable unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Villager. Trained as a counter only.
    Worker,
    /// Cheap anti-cavalry infantry.
    Spearman,
    /// Armored infantry.
    ManAtArms,
    /// Long-range archer.
    Longbowman,
    /// Armor-piercing archer.
    Crossbowman,
    /// Fast light cavalry.
    Horseman,
    /// Heavy cavalry.
    Knight,
    /// Siege catapult with splash damage.
    Mangonel,
}

const INFANTRY_MELEE_LIGHT: UnitTags = UnitTags::INFANTRY
    .union(UnitTags::MELEE)
    .union(UnitTags::LIGHT);

static WORKER: UnitStats = UnitStats {
    id: "worker",
    cost: Cost::new(50, 0, 0, 0),
    train_time: 200,
    hp: whole(10),
    damage: Fixed::ZERO,
    melee_defense: Fixed::ZERO,
    ranged_defense: Fixed::ZERO,
    range: whole(1),
    speed: Fixed::ZERO,
    lane: 0,
    width_scale: whole(1),
    attack_type: AttackType::Melee,
    attack_seconds: Fixed::ZERO,
    can_move_attack: false,
    tags: UnitTags::WORKER,
    bonus: BonusRule::None,
    siege: None,
};

static SPEARMAN: UnitStats = UnitStats {
    id: "spearman",
    cost: Cost::new(60, 20, 0, 0),
    train_time: 150,
    hp: whole(90),
    damage: whole(8),
    melee_defense: Fixed::ZERO,
    ranged_defense: Fixed::ZERO,
    range: whole(5),
    speed: ratio(125, 100),
    lane: 0,
    width_scale: whole(1),
    attack_type: AttackType::Melee,
    attack_seconds: ratio(1875, 1000),
    can_move_attack: true,
    tags: INFANTRY_MELEE_LIGHT,
    bonus: BonusRule::AnyOf(UnitTags::CAVALRY, whole(20)),
    siege: None,
};

static MAN_AT_ARMS: UnitStats = UnitStats {
    id: "man_at_arms",
    cost: Cost::new(100, 0, 20, 0),
    train_time: 150,
    hp: whole(140),
    damage: whole(11),
    melee_defense: whole(2),
    ranged_defense: whole(3),
    range: ratio(375, 100),
    speed: ratio(1125, 1000),
    lane: 0,
    width_scale: whole(1),
    attack_type: AttackType::Melee,
    attack_seconds: ratio(1375, 1000),
    can_move_attack: true,
    tags: UnitTags::INFANTRY
        .union(UnitTags::MELEE)
        .union(UnitTags::HEAVY),
    bonus: BonusRule::None,
    siege: None,
};

static LONGBOWMAN: UnitStats = UnitStats {
    id: "longbowman",
    cost: Cost::new(40, 50, 0, 0),
    train_time: 150,
    hp: whole(70),
    damage: whole(6),
    melee_defense: Fixed::ZERO,
    ranged_defense: Fixed::ZERO,
    range: whole(11),
    speed: ratio(1125, 1000),
    lane: 1,
    width_scale: ratio(1, 2),
    attack_type: AttackType::Ranged,
    attack_seconds: ratio(1625, 1000),
    can_move_attack: false,
    tags: UnitTags::INFANTRY
        .union(UnitTags::RANGED)
        .union(UnitTags::LIGHT),
    bonus: BonusRule::AllOf(INFANTRY_MELEE_LIGHT, whole(6)),
    siege: None,
};

static CROSSBOWMAN: UnitStats = UnitStats {
    id: "crossbowman",
    cost: Cost::new(80, 0, 40, 0),
    train_time: 230,
    hp: whole(80),
    damage: whole(11),
    melee_defense: Fixed::ZERO,
    ranged_defense: Fixed::ZERO,
    range: whole(10),
    speed: ratio(1125, 1000),
    lane: 1,
    width_scale: ratio(1, 2),
    attack_type: AttackType::Ranged,
    attack_seconds: ratio(2125, 1000),
    can_move_attack: false,
    tags: UnitTags::INFANTRY
        .union(UnitTags::RANGED)
        .union(UnitTags::LIGHT),
    bonus: BonusRule::AnyOf(UnitTags::HEAVY, whole(10)),
    siege: None,
};

static HORSEMAN: UnitStats = UnitStats {
    id: "horseman",
    cost: Cost::new(100, 20, 0, 0),
    train_time: 230,
    hp: whole(125),
    damage: whole(9),
    melee_defense: Fixed::ZERO,
    ranged_defense: whole(2),
    range: ratio(375, 100),
    speed: ratio(1875, 1000),
    lane: 2,
    width_scale: ratio(3, 2),
    attack_type: AttackType::Melee,
    attack_seconds: ratio(175, 100),
    can_move_attack: true,
    tags: UnitTags::CAVALRY
        .union(UnitTags::MELEE)
        .union(UnitTags::LIGHT),
    bonus: BonusRule::AnyOf(UnitTags::RANGED.union(UnitTags::SIEGE), whole(9)),
    siege: None,
};

static KNIGHT: UnitStats = UnitStats {
    id: "knight",
    cost: Cost::new(140, 0, 100, 0),
    train_time: 350,
    hp: whole(230),
    damage: whole(24),
    melee_defense: whole(4),
    ranged_defense: whole(4),
    range: ratio(375, 100),
    speed: ratio(1625, 1000),
    lane: 2,
    width_scale: ratio(3, 2),
    attack_type: AttackType::Melee,
    attack_seconds: ratio(3, 2),
    can_move_attack: true,
    tags: UnitTags::CAVALRY
        .union(UnitTags::MELEE)
        .union(UnitTags::HEAVY),
    bonus: BonusRule::None,
    siege: None,
};

static MANGONEL: UnitStats = UnitStats {
    id: "mangonel",
    cost: Cost::new(0, 400, 200, 0),
    train_time: 400,
    hp: whole(130),
    damage: whole(40),
    melee_defense: Fixed::ZERO,
    ranged_defense: Fixed::ZERO,
    range: whole(12),
    speed: ratio(3, 4),
    lane: 3,
    width_scale: ratio(18, 10),
    attack_type: AttackType::Ranged,
    attack_seconds: ratio(6875, 1000),
    can_move_attack: false,
    tags: UnitTags::SIEGE,
    bonus: BonusRule::None,
    siege: Some(SiegeProfile {
        area_radius: ratio(16, 10),
        area_damage: whole(40),
        bonus_vs_base: whole(240),
        flight_seconds: ratio(27, 10),
    }),
};

impl UnitKind {
    /// All unit types.
    pub const ALL: [Self; 8] = [
        Self::Worker,
        Self::Spearman,
        Self::ManAtArms,
        Self::Longbowman,
        Self::Crossbowman,
        Self::Horseman,
        Self::Knight,
        Self::Mangonel,
    ];

    /// Static stat block for this type.
    #[must_use]
    pub fn stats(self) -> &'static UnitStats {
        match self {
            Self::Worker => &WORKER,
            Self::Spearman => &SPEARMAN,
            Self::ManAtArms => &MAN_AT_ARMS,
            Self::Longbowman => &LONGBOWMAN,
            Self::Crossbowman => &CROSSBOWMAN,
            Self::Horseman => &HORSEMAN,
            Self::Knight => &KNIGHT,
            Self::Mangonel => &MANGONEL,
        }
    }

    /// String identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        self.stats().id
    }

    /// Workers are never spawned onto a lane.
    #[must_use]
    pub const fn is_worker(self) -> bool {
        matches!(self, Self::Worker)
    }

    /// Has an indirect-fire profile.
    #[must_use]
    pub fn is_siege(self) -> bool {
        self.stats().siege.is_some()
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for UnitKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| GameError::UnknownUnitType(s.to_string()))
    }
}

/// Bonus an attacker of `attacker` type deals to a target with `target_tags`.
#[must_use]
pub fn bonus_damage(attacker: UnitKind, target_tags: UnitTags) -> Fixed {
    attacker.stats().bonus.against(target_tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spearman_bonus_vs_cavalry() {
        let knight = UnitKind::Knight.stats().tags;
        let archer = UnitKind::Longbowman.stats().tags;
        assert_eq!(bonus_damage(UnitKind::Spearman, knight), whole(20));
        assert_eq!(bonus_damage(UnitKind::Spearman, archer), Fixed::ZERO);
    }

    #[test]
    fn test_longbow_bonus_requires_all_tags() {
        let spearman = UnitKind::Spearman.stats().tags;
        let man_at_arms = UnitKind::ManAtArms.stats().tags;
        let horseman = UnitKind::Horseman.stats().tags;
        assert_eq!(bonus_damage(UnitKind::Longbowman, spearman), whole(6));
        assert_eq!(bonus_damage(UnitKind::Longbowman, man_at_arms), Fixed::ZERO);
        assert_eq!(bonus_damage(UnitKind::Longbowman, horseman), Fixed::ZERO);
    }

    #[test]
    fn test_horseman_bonus_vs_ranged_or_siege() {
        assert_eq!(
            bonus_damage(UnitKind::Horseman, UnitKind::Crossbowman.stats().tags),
            whole(9)
        );
        assert_eq!(
            bonus_damage(UnitKind::Horseman, UnitKind::Mangonel.stats().tags),
            whole(9)
        );
        assert_eq!(
            bonus_damage(UnitKind::Horseman, UnitKind::Knight.stats().tags),
            Fixed::ZERO
        );
    }

    #[test]
    fn test_crossbow_bonus_vs_heavy() {
        assert_eq!(
            bonus_damage(UnitKind::Crossbowman, UnitKind::Knight.stats().tags),
            whole(10)
        );
        assert_eq!(
            bonus_damage(UnitKind::Knight, UnitKind::Knight.stats().tags),
            Fixed::ZERO
        );
    }

    #[test]
    fn test_lanes_partition_by_role() {
        assert_eq!(UnitKind::Spearman.stats().lane, 0);
        assert_eq!(UnitKind::ManAtArms.stats().lane, 0);
        assert_eq!(UnitKind::Longbowman.stats().lane, 1);
        assert_eq!(UnitKind::Crossbowman.stats().lane, 1);
        assert_eq!(UnitKind::Horseman.stats().lane, 2);
        assert_eq!(UnitKind::Knight.stats().lane, 2);
        assert_eq!(UnitKind::Mangonel.stats().lane, 3);
    }

    #[test]
    fn test_only_mangonel_is_siege() {
        let siege: Vec<_> = UnitKind::ALL.into_iter().filter(|k| k.is_siege()).collect();
        assert_eq!(siege, vec![UnitKind::Mangonel]);
    }

    #[test]
    fn test_parse_roundtrip_ids() {
        for kind in UnitKind::ALL {
            assert_eq!(kind.id().parse::<UnitKind>().unwrap(), kind);
        }
        assert!("samurai".parse::<UnitKind>().is_err());
    }
}
