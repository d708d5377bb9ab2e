//! Match-wide rule constants.
//!
//! [`MatchRules::default`] is the reference configuration. Any subset of
//! fields can be overridden from RON; omitted fields keep their defaults.
//!
//! ```
//! use lanewar_core::data::MatchRules;
//!
//! let rules = MatchRules::from_ron_str("(base_hp: 500, turret_shots: 1)").unwrap();
//! assert_eq!(rules.base_hp, 500);
//! assert_eq!(rules.max_queue_size, 5);
//! ```

use serde::{Deserialize, Serialize};

use crate::economy::Cost;
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, ratio, whole, Fixed};

/// Number of parallel lanes.
pub const LANE_COUNT: usize = 4;

/// Largest accepted base HP or resource amount. Leaves headroom below the
/// fixed-point ceiling for gathering on top of a full stockpile.
pub const MAX_RULE_AMOUNT: u32 = 1_000_000_000;

/// Largest accepted tick rate.
pub const MAX_TICKS_PER_SECOND: u32 = 1_000;

/// Largest accepted flight time, in ticks.
pub const MAX_FLIGHT_TICKS: u64 = 100_000;

/// Tunable rules of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// Logical ticks per logical second. Converts per-second stats.
    pub ticks_per_second: u32,
    /// Gathering happens on ticks divisible by this.
    pub gather_interval: u64,
    /// Resource yield per assigned worker per gather.
    #[serde(with = "fixed_decimal")]
    pub gather_rate: Fixed,
    /// Resources each faction starts with.
    pub starting_resources: Cost,
    /// Workers the player starts with (the enemy's come from difficulty).
    pub player_starting_workers: u32,
    /// Population cap at match start.
    pub initial_pop_cap: u32,
    /// Population cap ceiling.
    pub max_pop_cap: u32,
    /// Queue bound per building.
    pub max_queue_size: usize,
    /// Remaining time given to a blocked queue head.
    #[serde(with = "fixed_decimal")]
    pub blocked_retry: Fixed,
    /// Heads with remaining time in `(0, stalled_threshold]` report as stalled.
    #[serde(with = "fixed_decimal")]
    pub stalled_threshold: Fixed,
    /// Base hit points.
    pub base_hp: u32,
    /// Base footprint on the lane axis.
    #[serde(with = "fixed_decimal")]
    pub base_width: Fixed,
    /// Player base center.
    #[serde(with = "fixed_decimal")]
    pub player_base: Fixed,
    /// Enemy base center.
    #[serde(with = "fixed_decimal")]
    pub enemy_base: Fixed,
    /// Base defense against melee attacks.
    #[serde(with = "fixed_decimal")]
    pub base_melee_defense: Fixed,
    /// Base defense against ranged attacks.
    #[serde(with = "fixed_decimal")]
    pub base_ranged_defense: Fixed,
    /// Footprint of a unit with width scale 1.
    #[serde(with = "fixed_decimal")]
    pub unit_width: Fixed,
    /// Extra clearance around the spawn point.
    #[serde(with = "fixed_decimal")]
    pub spawn_clearance: Fixed,
    /// Gap kept in front of the nearest enemy.
    #[serde(with = "fixed_decimal")]
    pub enemy_gap: Fixed,
    /// Flight time of ranged non-siege attacks and turret shots, in ticks.
    pub arrow_flight_ticks: u64,
    /// Attack animation length in ticks.
    pub attack_anim_ticks: u32,
    /// Spawned units start with a cooldown in `0..initial_cooldown_jitter`.
    pub initial_cooldown_jitter: u32,
    /// Turret reach from the base center.
    #[serde(with = "fixed_decimal")]
    pub turret_range: Fixed,
    /// Ticks between turret volleys.
    pub turret_cooldown: u32,
    /// Shots per volley.
    pub turret_shots: usize,
    /// Turret damage as a multiple of spearman damage.
    #[serde(with = "fixed_decimal")]
    pub turret_damage_multiplier: Fixed,
    /// Amount every resource is set to by the grant command.
    pub grant_amount: u32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            ticks_per_second: 10,
            gather_interval: 10,
            gather_rate: ratio(3, 5),
            starting_resources: Cost::new(200, 200, 100, 0),
            player_starting_workers: 6,
            initial_pop_cap: 10,
            max_pop_cap: 200,
            max_queue_size: 5,
            blocked_retry: ratio(1, 10),
            stalled_threshold: ratio(1, 2),
            base_hp: 2000,
            base_width: whole(4),
            player_base: whole(4),
            enemy_base: whole(96),
            base_melee_defense: whole(2),
            base_ranged_defense: whole(50),
            unit_width: ratio(4, 5),
            spawn_clearance: ratio(1, 2),
            enemy_gap: ratio(1, 10),
            arrow_flight_ticks: 4,
            attack_anim_ticks: 3,
            initial_cooldown_jitter: 10,
            turret_range: whole(15),
            turret_cooldown: 8,
            turret_shots: 3,
            turret_damage_multiplier: ratio(3, 2),
            grant_amount: 9999,
        }
    }
}

impl MatchRules {
    /// Parse rules from RON text and validate them.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let rules: Self = ron::from_str(text).map_err(|e| GameError::DataParseError {
            what: "match rules".to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.ticks_per_second == 0 || self.ticks_per_second > MAX_TICKS_PER_SECOND {
            return Err(invalid(format!(
                "ticks_per_second must be in 1..={MAX_TICKS_PER_SECOND}, got {}",
                self.ticks_per_second
            )));
        }
        if self.base_hp == 0 || self.base_hp > MAX_RULE_AMOUNT {
            return Err(invalid(format!(
                "base_hp must be in 1..={MAX_RULE_AMOUNT}, got {}",
                self.base_hp
            )));
        }
        if self.grant_amount > MAX_RULE_AMOUNT {
            return Err(invalid(format!(
                "grant_amount must be at most {MAX_RULE_AMOUNT}, got {}",
                self.grant_amount
            )));
        }
        let start = &self.starting_resources;
        if [start.food, start.wood, start.gold, start.stone]
            .into_iter()
            .any(|amount| amount > MAX_RULE_AMOUNT)
        {
            return Err(invalid(format!(
                "starting_resources must each be at most {MAX_RULE_AMOUNT}"
            )));
        }
        for (name, value) in [
            ("base_width", self.base_width),
            ("unit_width", self.unit_width),
            ("turret_damage_multiplier", self.turret_damage_multiplier),
        ] {
            if value <= Fixed::ZERO {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }
        for (name, value) in [
            ("gather_rate", self.gather_rate),
            ("blocked_retry", self.blocked_retry),
            ("stalled_threshold", self.stalled_threshold),
            ("spawn_clearance", self.spawn_clearance),
            ("enemy_gap", self.enemy_gap),
            ("base_melee_defense", self.base_melee_defense),
            ("base_ranged_defense", self.base_ranged_defense),
            ("turret_range", self.turret_range),
        ] {
            if value < Fixed::ZERO {
                return Err(invalid(format!("{name} must not be negative, got {value}")));
            }
        }
        if self.player_base >= self.enemy_base {
            return Err(invalid(format!(
                "player_base ({}) must lie before enemy_base ({})",
                self.player_base, self.enemy_base
            )));
        }
        if self.arrow_flight_ticks > MAX_FLIGHT_TICKS {
            return Err(invalid(format!(
                "arrow_flight_ticks must be at most {MAX_FLIGHT_TICKS}, got {}",
                self.arrow_flight_ticks
            )));
        }
        Ok(())
    }

    /// Half the base width.
    #[must_use]
    pub fn base_half_width(&self) -> Fixed {
        self.base_width / whole(2)
    }
}

fn invalid(message: String) -> GameError {
    GameError::DataParseError {
        what: "match rules".to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_match_reference() {
        let rules = MatchRules::default();
        assert_eq!(rules.max_queue_size, 5);
        assert_eq!(rules.base_hp, 2000);
        assert_eq!(rules.base_half_width(), whole(2));
        assert_eq!(rules.turret_damage_multiplier * whole(8), whole(12));
    }

    #[test]
    fn test_partial_override() {
        let rules = MatchRules::from_ron_str("(gather_rate: 1.5, max_pop_cap: 50)").unwrap();
        assert_eq!(rules.gather_rate, ratio(3, 2));
        assert_eq!(rules.max_pop_cap, 50);
        assert_eq!(rules.initial_pop_cap, 10);
    }

    #[test]
    fn test_bad_rules_text() {
        let err = MatchRules::from_ron_str("(base_hp: \"lots\")").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }

    fn rejects(text: &str, field: &str) {
        match MatchRules::from_ron_str(text) {
            Err(GameError::DataParseError { message, .. }) => {
                assert!(message.contains(field), "{text}: {message}");
            }
            other => panic!("{text} should be rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_default_rules_validate() {
        assert!(MatchRules::default().validate().is_ok());
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        rejects("(ticks_per_second: 0)", "ticks_per_second");
        rejects("(ticks_per_second: 5000)", "ticks_per_second");
    }

    #[test]
    fn test_oversized_base_hp_rejected() {
        rejects("(base_hp: 3000000000)", "base_hp");
        rejects("(base_hp: 0)", "base_hp");
        assert!(MatchRules::from_ron_str("(base_hp: 1000000000)").is_ok());
    }

    #[test]
    fn test_oversized_amounts_rejected() {
        rejects("(grant_amount: 4000000000)", "grant_amount");
        rejects("(starting_resources: (gold: 4000000000))", "starting_resources");
    }

    #[test]
    fn test_non_positive_widths_rejected() {
        rejects("(base_width: 0.0)", "base_width");
        rejects("(unit_width: -0.5)", "unit_width");
        rejects("(turret_damage_multiplier: 0.0)", "turret_damage_multiplier");
    }

    #[test]
    fn test_negative_amounts_rejected() {
        rejects("(gather_rate: -1.0)", "gather_rate");
        rejects("(enemy_gap: -0.1)", "enemy_gap");
    }

    #[test]
    fn test_swapped_bases_rejected() {
        rejects("(player_base: 96.0, enemy_base: 4.0)", "player_base");
    }

    #[test]
    fn test_long_flight_rejected() {
        rejects("(arrow_flight_ticks: 18446744073709551615)", "arrow_flight_ticks");
    }
}
