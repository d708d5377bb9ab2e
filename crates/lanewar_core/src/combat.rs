//! Flat-defense damage model and target selection.
//!
//! This module implements the pure combat math:
//! - Flat defense subtraction matched to the attacker's attack type
//! - Per-type bonus damage against target tags
//! - Minimum damage floor of 1
//! - Quadratic splash falloff for siege weapons
//! - Target selection along the shared lane axis
//!
//! Nothing here mutates state. The combat resolver in `systems` calls
//! these functions and applies the results.

use crate::components::{AttackTarget, Unit};
use crate::data::{bonus_damage, AttackType, MatchRules, SiegeProfile, UnitKind};
use crate::math::{distance, Fixed};

/// Every hit deals at least this much.
pub const MIN_DAMAGE: Fixed = Fixed::ONE;

/// Subtract defense from raw damage, floored at [`MIN_DAMAGE`].
#[must_use]
pub fn resolve_damage(raw: Fixed, defense: Fixed) -> Fixed {
    (raw - defense).max(MIN_DAMAGE)
}

/// Base defense against an attack type.
#[must_use]
pub fn base_defense(rules: &MatchRules, attack_type: AttackType) -> Fixed {
    match attack_type {
        AttackType::Melee => rules.base_melee_defense,
        AttackType::Ranged => rules.base_ranged_defense,
    }
}

/// Damage one unit deals to another unit.
#[must_use]
pub fn unit_hit_damage(attacker: &Unit, target: &Unit) -> Fixed {
    let raw = attacker.damage + bonus_damage(attacker.kind, target.tags());
    resolve_damage(raw, target.defense_against(attacker.attack_type()))
}

/// Damage one unit deals to the enemy base.
///
/// Siege weapons add their bonus against bases.
#[must_use]
pub fn base_hit_damage(attacker: &Unit, rules: &MatchRules) -> Fixed {
    let bonus = attacker
        .stats()
        .siege
        .map_or(Fixed::ZERO, |profile| profile.bonus_vs_base);
    let attack_type = attacker.attack_type();
    resolve_damage(attacker.damage + bonus, base_defense(rules, attack_type))
}

/// Raw area damage at `offset` from the impact point, before defense.
///
/// Returns `None` outside the radius.
#[must_use]
pub fn splash_falloff(profile: &SiegeProfile, offset: Fixed) -> Option<Fixed> {
    if offset > profile.area_radius || profile.area_radius <= Fixed::ZERO {
        return None;
    }
    let remaining = Fixed::ONE - offset / profile.area_radius;
    Some(profile.area_damage * remaining * remaining)
}

/// Area damage a victim at `offset` from the impact point takes.
#[must_use]
pub fn splash_damage(profile: &SiegeProfile, offset: Fixed, ranged_defense: Fixed) -> Option<Fixed> {
    splash_falloff(profile, offset).map(|raw| resolve_damage(raw, ranged_defense))
}

/// Damage of one turret shot against `target`.
#[must_use]
pub fn turret_damage(rules: &MatchRules, target: &Unit) -> Fixed {
    let raw = UnitKind::Spearman.stats().damage * rules.turret_damage_multiplier;
    resolve_damage(raw, target.ranged_defense)
}

/// Pick what `attacker` should hit this tick.
///
/// Candidates are living enemies within range on any lane. Melee attackers
/// still short of the enemy gate cannot reach past it. The nearest
/// candidate wins, except that siege weapons prefer the farthest. Ties go
/// to the earlier unit in `enemies`. Without a unit candidate the base is
/// chosen when its gate is within range.
#[must_use]
pub fn select_target(attacker: &Unit, enemies: &[Unit], rules: &MatchRules) -> Option<AttackTarget> {
    let owner = attacker.owner;
    let gate = owner.opponent().gate_edge(rules);
    let walled_off = attacker.attack_type() == AttackType::Melee
        && owner.is_beyond(gate, attacker.position);
    let prefers_far = attacker.kind.is_siege();

    let mut best: Option<(&Unit, Fixed)> = None;
    for enemy in enemies {
        if !enemy.is_alive() {
            continue;
        }
        let gap = distance(attacker.position, enemy.position);
        if gap > attacker.range {
            continue;
        }
        if walled_off && owner.is_beyond(enemy.position, gate) {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_gap)) if prefers_far => gap > best_gap,
            Some((_, best_gap)) => gap < best_gap,
        };
        if better {
            best = Some((enemy, gap));
        }
    }

    if let Some((enemy, _)) = best {
        return Some(AttackTarget::Unit(enemy.id));
    }
    (distance(attacker.position, gate) <= attacker.range).then_some(AttackTarget::Base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitId;
    use crate::factions::{FactionId, TechLevels};
    use crate::math::{ratio, whole};
    use proptest::prelude::*;

    fn unit(id: u64, kind: UnitKind, owner: FactionId, position: Fixed) -> Unit {
        Unit::spawn(
            UnitId(id),
            kind,
            owner,
            position,
            &MatchRules::default(),
            0,
            &TechLevels::default(),
        )
    }

    #[test]
    fn test_resolve_damage_subtracts_defense() {
        assert_eq!(resolve_damage(whole(11), whole(3)), whole(8));
        assert_eq!(resolve_damage(whole(5), whole(50)), MIN_DAMAGE);
    }

    #[test]
    fn test_bonus_and_matching_defense() {
        let spear = unit(1, UnitKind::Spearman, FactionId::Player, whole(50));
        let knight = unit(2, UnitKind::Knight, FactionId::Enemy, whole(51));
        // 8 + 20 bonus - 4 melee defense
        assert_eq!(unit_hit_damage(&spear, &knight), whole(24));

        let crossbow = unit(3, UnitKind::Crossbowman, FactionId::Player, whole(40));
        let man_at_arms = unit(4, UnitKind::ManAtArms, FactionId::Enemy, whole(48));
        // 11 + 10 bonus - 3 ranged defense
        assert_eq!(unit_hit_damage(&crossbow, &man_at_arms), whole(18));
    }

    #[test]
    fn test_base_damage() {
        let rules = MatchRules::default();
        let spear = unit(1, UnitKind::Spearman, FactionId::Player, whole(90));
        let bow = unit(2, UnitKind::Longbowman, FactionId::Player, whole(85));
        let mangonel = unit(3, UnitKind::Mangonel, FactionId::Player, whole(82));
        assert_eq!(base_hit_damage(&spear, &rules), whole(6));
        assert_eq!(base_hit_damage(&bow, &rules), MIN_DAMAGE);
        assert_eq!(base_hit_damage(&mangonel, &rules), whole(230));
    }

    #[test]
    fn test_splash_falloff() {
        let profile = UnitKind::Mangonel.stats().siege.unwrap();
        assert_eq!(splash_falloff(&profile, Fixed::ZERO), Some(whole(40)));
        let halfway = splash_falloff(&profile, ratio(8, 10)).unwrap();
        assert!((halfway - whole(10)).abs() < ratio(1, 1000));
        assert_eq!(splash_falloff(&profile, profile.area_radius), Some(Fixed::ZERO));
        assert_eq!(splash_falloff(&profile, whole(2)), None);

        assert_eq!(
            splash_damage(&profile, profile.area_radius, Fixed::ZERO),
            Some(MIN_DAMAGE)
        );
        assert_eq!(splash_damage(&profile, Fixed::ZERO, whole(4)), Some(whole(36)));
    }

    #[test]
    fn test_turret_damage() {
        let rules = MatchRules::default();
        let spear = unit(1, UnitKind::Spearman, FactionId::Enemy, whole(10));
        let knight = unit(2, UnitKind::Knight, FactionId::Enemy, whole(10));
        assert_eq!(turret_damage(&rules, &spear), whole(12));
        assert_eq!(turret_damage(&rules, &knight), whole(8));
    }

    #[test]
    fn test_select_nearest() {
        let rules = MatchRules::default();
        let bow = unit(1, UnitKind::Longbowman, FactionId::Player, whole(40));
        let enemies = vec![
            unit(10, UnitKind::Spearman, FactionId::Enemy, whole(49)),
            unit(11, UnitKind::Horseman, FactionId::Enemy, whole(45)),
            unit(12, UnitKind::Knight, FactionId::Enemy, whole(60)),
        ];
        assert_eq!(
            select_target(&bow, &enemies, &rules),
            Some(AttackTarget::Unit(UnitId(11)))
        );
    }

    #[test]
    fn test_siege_prefers_farthest() {
        let rules = MatchRules::default();
        let mangonel = unit(1, UnitKind::Mangonel, FactionId::Enemy, whole(60));
        let enemies = vec![
            unit(10, UnitKind::Spearman, FactionId::Player, whole(55)),
            unit(11, UnitKind::Spearman, FactionId::Player, whole(49)),
            unit(12, UnitKind::Spearman, FactionId::Player, whole(40)),
        ];
        assert_eq!(
            select_target(&mangonel, &enemies, &rules),
            Some(AttackTarget::Unit(UnitId(11)))
        );
    }

    #[test]
    fn test_ties_go_to_first_listed() {
        let rules = MatchRules::default();
        let spear = unit(1, UnitKind::Spearman, FactionId::Player, whole(50));
        let enemies = vec![
            unit(10, UnitKind::Spearman, FactionId::Enemy, whole(52)),
            unit(11, UnitKind::Spearman, FactionId::Enemy, whole(48)),
        ];
        assert_eq!(
            select_target(&spear, &enemies, &rules),
            Some(AttackTarget::Unit(UnitId(10)))
        );
    }

    #[test]
    fn test_dead_units_are_not_targets() {
        let rules = MatchRules::default();
        let spear = unit(1, UnitKind::Spearman, FactionId::Player, whole(50));
        let mut dead = unit(10, UnitKind::Spearman, FactionId::Enemy, whole(51));
        dead.hp = Fixed::ZERO;
        assert_eq!(select_target(&spear, &[dead], &rules), None);
    }

    #[test]
    fn test_melee_cannot_reach_through_gate() {
        let rules = MatchRules::default();
        // Gate at 94; spearman range 5.
        let spear = unit(1, UnitKind::Spearman, FactionId::Player, whole(91));
        let defender = unit(10, UnitKind::Spearman, FactionId::Enemy, whole(95));
        assert_eq!(
            select_target(&spear, std::slice::from_ref(&defender), &rules),
            Some(AttackTarget::Base)
        );

        let bow = unit(2, UnitKind::Longbowman, FactionId::Player, whole(91));
        assert_eq!(
            select_target(&bow, std::slice::from_ref(&defender), &rules),
            Some(AttackTarget::Unit(UnitId(10)))
        );
    }

    #[test]
    fn test_base_out_of_range() {
        let rules = MatchRules::default();
        let spear = unit(1, UnitKind::Spearman, FactionId::Enemy, whole(20));
        assert_eq!(select_target(&spear, &[], &rules), None);
        let spear = unit(1, UnitKind::Spearman, FactionId::Enemy, whole(11));
        assert_eq!(select_target(&spear, &[], &rules), Some(AttackTarget::Base));
    }

    proptest! {
        #[test]
        fn prop_damage_floor(raw in 0i64..500, defense in 0i64..10_000) {
            let damage = resolve_damage(Fixed::from_num(raw), Fixed::from_num(defense));
            prop_assert!(damage >= MIN_DAMAGE);
        }

        #[test]
        fn prop_splash_never_exceeds_area_damage(tenths in 0i32..16) {
            let profile = UnitKind::Mangonel.stats().siege.unwrap();
            let raw = splash_falloff(&profile, ratio(tenths, 10)).unwrap();
            prop_assert!(raw <= profile.area_damage);
            prop_assert!(raw >= Fixed::ZERO);
        }
    }
}
