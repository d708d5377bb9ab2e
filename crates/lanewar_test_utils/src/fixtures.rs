//! Test fixtures and helpers.
//!
//! Pre-built match states and unit placements for consistent testing.
//! Units placed here bypass production but keep the army count in step,
//! so faction bookkeeping stays consistent.

use fixed::types::I32F32;
use lanewar_core::components::{Unit, UnitId};
use lanewar_core::data::UnitKind;
use lanewar_core::factions::FactionId;
use lanewar_core::rng::{RandomSource, ScriptedRandom};
use lanewar_core::simulation::{MatchConfig, Simulation};
use lanewar_core::stance::{LaneSelector, Stance};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A default match whose random source always draws 0.
///
/// New units start with no cooldown jitter and turrets always hit the
/// first unit in range.
#[must_use]
pub fn scripted_sim() -> Simulation<ScriptedRandom> {
    Simulation::with_rng(MatchConfig::default(), ScriptedRandom::zeros())
}

/// Put a unit of `kind` on its lane at `position` with no attack cooldown.
///
/// The unit gets the faction's current tech and counts toward its army.
pub fn place_unit<R: RandomSource>(
    sim: &mut Simulation<R>,
    faction: FactionId,
    kind: UnitKind,
    position: I32F32,
) -> UnitId {
    let id = sim.allocate_unit_id();
    let rules = sim.rules().clone();
    let state = sim.faction_mut(faction);
    let mut unit = Unit::spawn(id, kind, faction, position, &rules, 0, &state.tech);
    unit.previous_position = position;
    state.units.push(unit);
    state.army_count += 1;
    id
}

/// Set every lane of `faction` to `stance`.
pub fn set_all_stances<R: RandomSource>(sim: &mut Simulation<R>, faction: FactionId, stance: Stance) {
    sim.faction_mut(faction).stances.set(LaneSelector::All, stance);
}

/// A mixed battle in the middle of the map.
///
/// Both sides field infantry, archers, cavalry and a mangonel, a few
/// steps apart, all on the attack stance. Turret targeting and cooldown
/// jitter come from a ChaCha stream seeded with `seed`.
#[must_use]
pub fn battle_scenario(seed: u64) -> Simulation {
    let mut sim = Simulation::new(MatchConfig {
        seed,
        ..MatchConfig::default()
    });
    let lineup = [
        (UnitKind::Spearman, 0),
        (UnitKind::ManAtArms, 1),
        (UnitKind::Longbowman, 2),
        (UnitKind::Crossbowman, 3),
        (UnitKind::Horseman, 4),
        (UnitKind::Knight, 5),
        (UnitKind::Mangonel, 6),
    ];
    for (kind, offset) in lineup {
        place_unit(&mut sim, FactionId::Player, kind, fixed(40 - offset));
        place_unit(&mut sim, FactionId::Enemy, kind, fixed(60 + offset));
    }
    sim
}

/// Two equal infantry lines marching at each other.
#[must_use]
pub fn mirrored_infantry(count: i32) -> Simulation<ScriptedRandom> {
    let mut sim = scripted_sim();
    for i in 0..count {
        place_unit(&mut sim, FactionId::Player, UnitKind::Spearman, fixed(30 - i));
        place_unit(&mut sim, FactionId::Enemy, UnitKind::Spearman, fixed(70 + i));
    }
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_unit_keeps_bookkeeping() {
        let mut sim = scripted_sim();
        let id = place_unit(&mut sim, FactionId::Enemy, UnitKind::Knight, fixed(50));
        let enemy = sim.faction(FactionId::Enemy);
        assert_eq!(enemy.army_count, 1);
        assert!(enemy.is_consistent());
        assert_eq!(enemy.unit(id).map(|u| u.lane), Some(2));
    }

    #[test]
    fn test_battle_scenario_lineup() {
        let sim = battle_scenario(7);
        assert_eq!(sim.faction(FactionId::Player).units.len(), 7);
        assert_eq!(sim.faction(FactionId::Enemy).units.len(), 7);
        assert_eq!(sim.faction(FactionId::Player).current_pop(), 13);
    }

    #[test]
    fn test_fixed_helpers() {
        assert_eq!(fixed(3), I32F32::from_num(3));
        assert_eq!(fixed_f(0.5), I32F32::from_num(1) / I32F32::from_num(2));
    }
}
