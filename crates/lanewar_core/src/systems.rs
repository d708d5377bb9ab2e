//! Combat and movement resolver.
//!
//! Systems contain the logic that processes faction state once per tick.
//! Each system should do one thing well:
//!
//! - [`pending_effects_system`] lands arrows and siege shells that are due
//! - [`faction_pass`] runs targeting, attacks and movement for one side
//! - [`cleanup_system`] removes the dead and fixes the bookkeeping
//! - [`turret_system`] fires the base turret
//!
//! All systems use fixed-point math for deterministic simulation.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::combat::{
    base_hit_damage, select_target, splash_damage, turret_damage, unit_hit_damage,
};
use crate::components::{AttackTarget, PendingHit, SiegeStrike, Unit, UnitId, UnitState};
use crate::data::{AttackType, MatchRules, UnitKind, UnitTags};
use crate::factions::{FactionId, FactionState};
use crate::math::{distance, fixed_serde, seconds_to_ticks, Fixed};
use crate::movement::{has_cleared_gate, next_position, processing_order};
use crate::rng::RandomSource;
use crate::stance::Heading;

/// Who dealt damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    /// A unit's attack or shell.
    Unit(UnitId),
    /// A base turret of this faction.
    Turret(FactionId),
}

/// Who took damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageVictim {
    /// A unit.
    Unit(UnitId),
    /// The base of this faction.
    Base(FactionId),
}

/// Visual kind of a launched projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Ranged unit arrow or bolt.
    Arrow,
    /// Siege shell.
    Shell,
    /// Base turret shot.
    TurretShot,
}

/// Events emitted by the combat resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatEvent {
    /// Health was removed.
    DamageDealt {
        /// Attacker.
        source: DamageSource,
        /// Target.
        victim: DamageVictim,
        /// Damage after defense.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
        /// Where the hit landed on the lane axis.
        #[serde(with = "fixed_serde")]
        position: Fixed,
        /// Tick on which a floating indicator should appear.
        visible_at: u64,
    },
    /// A projectile left its launcher.
    ProjectileLaunched {
        /// Faction that fired.
        owner: FactionId,
        /// Visual kind.
        kind: ProjectileKind,
        /// Launch lane, or `None` for a turret.
        lane: Option<u8>,
        /// Launch point.
        #[serde(with = "fixed_serde")]
        from: Fixed,
        /// Aim point.
        #[serde(with = "fixed_serde")]
        to: Fixed,
        /// Ticks until it lands.
        flight_ticks: u64,
    },
    /// A unit was removed by cleanup.
    UnitDied {
        /// Owner.
        faction: FactionId,
        /// Dead unit.
        unit: UnitId,
        /// Its type.
        kind: UnitKind,
    },
}

/// Shared state of one combat phase.
pub struct CombatContext<'a> {
    /// Current tick.
    pub tick: u64,
    /// Match rules.
    pub rules: &'a MatchRules,
    /// Arrows in flight.
    pub pending_hits: &'a mut Vec<PendingHit>,
    /// Siege shells in flight.
    pub siege_strikes: &'a mut Vec<SiegeStrike>,
    /// Events of this tick.
    pub events: &'a mut Vec<CombatEvent>,
}

/// Land every arrow and shell due on `tick`.
///
/// Arrows aimed at a unit that no longer exists are dropped. Shells
/// re-gather their victims around the impact point and still hit the base
/// even if the shooter died in flight.
pub fn pending_effects_system(
    factions: &mut [FactionState; 2],
    pending_hits: &mut Vec<PendingHit>,
    siege_strikes: &mut Vec<SiegeStrike>,
    tick: u64,
    rules: &MatchRules,
    events: &mut Vec<CombatEvent>,
) {
    let (due_hits, waiting): (Vec<_>, Vec<_>) = std::mem::take(pending_hits)
        .into_iter()
        .partition(|hit| hit.due_tick <= tick);
    *pending_hits = waiting;

    for hit in due_hits {
        let victim = &mut factions[hit.victim_faction.index()];
        match hit.target {
            AttackTarget::Unit(id) => {
                let Some(unit) = victim.unit_mut(id) else {
                    trace!(attacker = hit.attacker.0, target = id.0, "Arrow target gone");
                    continue;
                };
                unit.hp -= hit.damage;
                events.push(CombatEvent::DamageDealt {
                    source: DamageSource::Unit(hit.attacker),
                    victim: DamageVictim::Unit(id),
                    amount: hit.damage,
                    position: unit.position,
                    visible_at: tick,
                });
            }
            AttackTarget::Base => {
                damage_base(victim, hit.damage);
                events.push(CombatEvent::DamageDealt {
                    source: DamageSource::Unit(hit.attacker),
                    victim: DamageVictim::Base(victim.id),
                    amount: hit.damage,
                    position: victim.id.gate_edge(rules),
                    visible_at: tick,
                });
            }
        }
    }

    let (due_strikes, waiting): (Vec<_>, Vec<_>) = std::mem::take(siege_strikes)
        .into_iter()
        .partition(|strike| strike.due_tick <= tick);
    *siege_strikes = waiting;

    for strike in due_strikes {
        let victim = &mut factions[strike.victim_faction.index()];
        let Some(profile) = strike.attacker_kind.stats().siege else {
            continue;
        };
        for unit in victim
            .units
            .iter_mut()
            .filter(|u| u.is_alive() && u.lane == strike.impact_lane)
        {
            let offset = distance(unit.position, strike.impact_position);
            let Some(amount) = splash_damage(&profile, offset, unit.ranged_defense) else {
                continue;
            };
            unit.hp -= amount;
            events.push(CombatEvent::DamageDealt {
                source: DamageSource::Unit(strike.attacker),
                victim: DamageVictim::Unit(unit.id),
                amount,
                position: unit.position,
                visible_at: tick,
            });
        }
        if strike.target == AttackTarget::Base {
            damage_base(victim, strike.base_damage);
            events.push(CombatEvent::DamageDealt {
                source: DamageSource::Unit(strike.attacker),
                victim: DamageVictim::Base(victim.id),
                amount: strike.base_damage,
                position: strike.impact_position,
                visible_at: tick,
            });
        }
    }
}

fn damage_base(faction: &mut FactionState, amount: Fixed) {
    faction.base_hp = (faction.base_hp - amount).max(Fixed::ZERO);
}

/// Targeting, attacks and movement for every unit of `friend`.
pub fn faction_pass(friend: &mut FactionState, enemy: &mut FactionState, ctx: &mut CombatContext<'_>) {
    for unit in &mut friend.units {
        unit.previous_position = unit.position;
    }

    let lanes = processing_order(&friend.units, friend.id, &friend.stances);
    for (lane, order) in lanes.iter().enumerate() {
        let stance = friend.stances.lane(lane as u8);
        let mut neighbor: Option<Fixed> = None;
        for &index in order {
            if friend.units[index].is_alive() {
                engage(&mut friend.units[index], enemy, stance.forces_disengage(), ctx);

                let unit = &friend.units[index];
                let pinned = unit.state == UnitState::Attacking && !unit.stats().can_move_attack;
                let heading = stance.heading();
                if heading != Heading::Stay && !pinned {
                    let deployed = unit.deployed || has_cleared_gate(unit, ctx.rules);
                    let unit = &mut friend.units[index];
                    unit.deployed = deployed;
                    unit.position = next_position(unit, heading, neighbor, &enemy.units, ctx.rules);
                }
            }
            neighbor = Some(friend.units[index].position);
        }
    }
}

/// Tick timers, pick a target and attack it if the cooldown allows.
fn engage(unit: &mut Unit, enemy: &mut FactionState, forces_disengage: bool, ctx: &mut CombatContext<'_>) {
    unit.attack_anim = unit.attack_anim.saturating_sub(1);
    unit.attack_cooldown = unit.attack_cooldown.saturating_sub(1);

    let target = if forces_disengage && !unit.stats().can_move_attack {
        None
    } else {
        select_target(unit, &enemy.units, ctx.rules)
    };
    let Some(target) = target else {
        unit.state = UnitState::Moving;
        unit.target = None;
        return;
    };

    unit.state = UnitState::Attacking;
    unit.target = Some(target);
    if unit.attack_cooldown > 0 {
        return;
    }
    unit.attack_cooldown = unit.cooldown_max;
    unit.attack_anim = ctx.rules.attack_anim_ticks;

    if let Some(profile) = unit.stats().siege {
        fire_siege(unit, enemy, target, profile.flight_seconds, ctx);
    } else if unit.attack_type() == AttackType::Ranged {
        fire_arrow(unit, enemy, target, ctx);
    } else {
        strike_melee(unit, enemy, target, ctx);
    }
}

/// Where `target` stands, and its lane. The base spans every lane.
fn target_position(enemy: &FactionState, target: AttackTarget, rules: &MatchRules) -> Option<(Fixed, Option<u8>)> {
    match target {
        AttackTarget::Unit(id) => enemy.unit(id).map(|u| (u.position, Some(u.lane))),
        AttackTarget::Base => Some((enemy.id.gate_edge(rules), None)),
    }
}

fn strike_melee(unit: &Unit, enemy: &mut FactionState, target: AttackTarget, ctx: &mut CombatContext<'_>) {
    let (amount, victim, position) = match target {
        AttackTarget::Unit(id) => {
            let Some(victim) = enemy.units.iter_mut().find(|u| u.id == id) else {
                return;
            };
            let amount = unit_hit_damage(unit, victim);
            victim.hp -= amount;
            (amount, DamageVictim::Unit(id), victim.position)
        }
        AttackTarget::Base => {
            let amount = base_hit_damage(unit, ctx.rules);
            damage_base(enemy, amount);
            (amount, DamageVictim::Base(enemy.id), enemy.id.gate_edge(ctx.rules))
        }
    };
    trace!(attacker = unit.id.0, ?victim, amount = %amount, "Melee hit");
    ctx.events.push(CombatEvent::DamageDealt {
        source: DamageSource::Unit(unit.id),
        victim,
        amount,
        position,
        visible_at: ctx.tick,
    });
}

fn fire_arrow(unit: &Unit, enemy: &FactionState, target: AttackTarget, ctx: &mut CombatContext<'_>) {
    let damage = match target {
        AttackTarget::Unit(id) => match enemy.unit(id) {
            Some(victim) => unit_hit_damage(unit, victim),
            None => return,
        },
        AttackTarget::Base => base_hit_damage(unit, ctx.rules),
    };
    let Some((to, _)) = target_position(enemy, target, ctx.rules) else {
        return;
    };
    let flight = ctx.rules.arrow_flight_ticks;
    trace!(attacker = unit.id.0, ?target, damage = %damage, "Arrow loosed");
    ctx.pending_hits.push(PendingHit {
        attacker: unit.id,
        victim_faction: enemy.id,
        target,
        damage,
        due_tick: ctx.tick + flight,
    });
    ctx.events.push(CombatEvent::ProjectileLaunched {
        owner: unit.owner,
        kind: ProjectileKind::Arrow,
        lane: Some(unit.lane),
        from: unit.position,
        to,
        flight_ticks: flight,
    });
}

fn fire_siege(
    unit: &Unit,
    enemy: &FactionState,
    target: AttackTarget,
    flight_seconds: Fixed,
    ctx: &mut CombatContext<'_>,
) {
    let Some((impact_position, target_lane)) = target_position(enemy, target, ctx.rules) else {
        return;
    };
    let impact_lane = target_lane.unwrap_or(unit.lane);
    let base_damage = match target {
        AttackTarget::Unit(_) => Fixed::ZERO,
        AttackTarget::Base => base_hit_damage(unit, ctx.rules),
    };
    let flight = u64::from(seconds_to_ticks(flight_seconds, ctx.rules.ticks_per_second));
    trace!(attacker = unit.id.0, ?target, impact = %impact_position, "Shell launched");
    ctx.siege_strikes.push(SiegeStrike {
        attacker: unit.id,
        attacker_kind: unit.kind,
        victim_faction: enemy.id,
        target,
        impact_position,
        impact_lane,
        base_damage,
        due_tick: ctx.tick + flight,
    });
    ctx.events.push(CombatEvent::ProjectileLaunched {
        owner: unit.owner,
        kind: ProjectileKind::Shell,
        lane: Some(unit.lane),
        from: unit.position,
        to: impact_position,
        flight_ticks: flight,
    });
}

/// Remove dead units and keep worker and army counts in step.
pub fn cleanup_system(faction: &mut FactionState) -> Vec<CombatEvent> {
    let (dead, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut faction.units)
        .into_iter()
        .partition(|u| !u.is_alive());
    faction.units = alive;

    dead.into_iter()
        .map(|unit| {
            if unit.tags().contains(UnitTags::WORKER) {
                faction.workers.remove_fallen();
            } else {
                faction.army_count = faction.army_count.saturating_sub(1);
            }
            trace!(faction = %faction.id, unit = unit.id.0, kind = %unit.kind, "Unit died");
            CombatEvent::UnitDied {
                faction: faction.id,
                unit: unit.id,
                kind: unit.kind,
            }
        })
        .collect()
}

/// Fire `faction`'s base turret at enemy units near the base.
///
/// Shots pick targets uniformly with replacement. Damage lands at once;
/// the indicator is deferred by the arrow flight time.
pub fn turret_system(
    faction: &mut FactionState,
    enemy: &mut FactionState,
    rules: &MatchRules,
    tick: u64,
    rng: &mut dyn RandomSource,
) -> Vec<CombatEvent> {
    if faction.turret_cooldown > 0 {
        faction.turret_cooldown -= 1;
        return Vec::new();
    }

    let center = faction.id.base_center(rules);
    let in_range: Vec<usize> = enemy
        .units
        .iter()
        .enumerate()
        .filter(|(_, u)| distance(u.position, center) <= rules.turret_range)
        .map(|(i, _)| i)
        .collect();
    if in_range.is_empty() {
        return Vec::new();
    }

    faction.turret_cooldown = rules.turret_cooldown;
    let shots = in_range.len().min(rules.turret_shots);
    let mut events = Vec::with_capacity(shots * 2);
    for _ in 0..shots {
        let target = &mut enemy.units[in_range[rng.pick(in_range.len())]];
        let amount = turret_damage(rules, target);
        target.hp -= amount;
        trace!(faction = %faction.id, target = target.id.0, amount = %amount, "Turret shot");
        events.push(CombatEvent::ProjectileLaunched {
            owner: faction.id,
            kind: ProjectileKind::TurretShot,
            lane: None,
            from: center,
            to: target.position,
            flight_ticks: rules.arrow_flight_ticks,
        });
        events.push(CombatEvent::DamageDealt {
            source: DamageSource::Turret(faction.id),
            victim: DamageVictim::Unit(target.id),
            amount,
            position: target.position,
            visible_at: tick + rules.arrow_flight_ticks,
        });
    }
    events
}
