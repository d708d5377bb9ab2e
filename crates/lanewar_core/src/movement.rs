//! Lane movement: processing order and stance-driven position updates.
//!
//! Lanes are independent collision spaces. Within a lane, units are
//! processed in an order that depends on the lane's stance so that the
//! unit a mover clamps against has already moved this tick.

use std::cmp::Ordering;

use crate::components::Unit;
use crate::data::{MatchRules, LANE_COUNT};
use crate::factions::FactionId;
use crate::math::{whole, Fixed};
use crate::stance::{Heading, StanceBoard};

/// Indices into `units` in processing order: lanes ascending, and within
/// a lane frontmost first for advancing stances, rearmost first otherwise.
///
/// Ties keep their order in `units`.
#[must_use]
pub fn processing_order(units: &[Unit], owner: FactionId, stances: &StanceBoard) -> Vec<Vec<usize>> {
    (0..LANE_COUNT as u8)
        .map(|lane| {
            let mut indices: Vec<usize> = units
                .iter()
                .enumerate()
                .filter(|(_, u)| u.lane == lane)
                .map(|(i, _)| i)
                .collect();
            let front_first = stances.lane(lane).front_first();
            indices.sort_by(|&a, &b| {
                let forward = compare_forward(owner, units[a].position, units[b].position);
                if front_first {
                    forward.reverse()
                } else {
                    forward
                }
            });
            indices
        })
        .collect()
}

/// Orders positions by how far they are toward the enemy base.
fn compare_forward(owner: FactionId, a: Fixed, b: Fixed) -> Ordering {
    match owner {
        FactionId::Player => a.cmp(&b),
        FactionId::Enemy => b.cmp(&a),
    }
}

/// The further-forward of two positions.
fn forward_most(owner: FactionId, a: Fixed, b: Fixed) -> Fixed {
    if owner.is_beyond(a, b) {
        a
    } else {
        b
    }
}

/// The further-back of two positions.
fn rear_most(owner: FactionId, a: Fixed, b: Fixed) -> Fixed {
    if owner.is_beyond(a, b) {
        b
    } else {
        a
    }
}

/// Whether the unit has fully cleared its own gate.
#[must_use]
pub fn has_cleared_gate(unit: &Unit, rules: &MatchRules) -> bool {
    let owner = unit.owner;
    let exit = owner.gate_edge(rules) + owner.direction() * (unit.width / whole(2));
    owner.is_beyond(unit.position, exit)
}

/// New position of `unit` for this tick.
///
/// `neighbor` is the position of the previous unit in this lane's
/// processing order: the friend ahead when advancing, the friend behind
/// when falling back. `enemies` is the opposing faction's unit list;
/// only same-lane units level with or ahead of the mover can stop it.
#[must_use]
pub fn next_position(
    unit: &Unit,
    heading: Heading,
    neighbor: Option<Fixed>,
    enemies: &[Unit],
    rules: &MatchRules,
) -> Fixed {
    let owner = unit.owner;
    let dir = owner.direction();
    let half_width = unit.width / whole(2);

    match heading {
        Heading::Stay => unit.position,
        Heading::Forward => {
            let mut next = unit.position + dir * unit.speed;
            if let Some(friend) = neighbor {
                next = rear_most(owner, next, friend - dir * unit.width);
            }
            let nearest_enemy = enemies
                .iter()
                .filter(|e| e.lane == unit.lane && !owner.is_beyond(unit.position, e.position))
                .min_by_key(|e| (e.position - unit.position).abs());
            if let Some(enemy) = nearest_enemy {
                next = rear_most(owner, next, enemy.position - dir * (unit.width + rules.enemy_gap));
            }
            let wall =
                owner.opponent().base_center(rules) - dir * (rules.base_half_width() + half_width);
            rear_most(owner, next, wall)
        }
        Heading::Backward => {
            let next = unit.position - dir * unit.speed;
            let home = owner.base_center(rules);
            let mut limit = if unit.deployed {
                home + dir * (rules.base_half_width() + half_width)
            } else {
                home
            };
            if let Some(friend) = neighbor {
                limit = forward_most(owner, limit, friend + dir * unit.width);
            }
            forward_most(owner, next, limit)
        }
    }
}
