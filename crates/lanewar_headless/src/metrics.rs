//! Match metrics collected from tick events.
//!
//! Counters are keyed by unit and building ids and kept in `BTreeMap`s so
//! the summary line is byte-identical between identical runs.

use std::collections::{BTreeMap, HashMap};

use lanewar_core::components::UnitId;
use lanewar_core::factions::FactionId;
use lanewar_core::production::ProductionEvent;
use lanewar_core::simulation::{Simulation, TickEvents};
use lanewar_core::rng::RandomSource;
use lanewar_core::systems::{CombatEvent, DamageSource, DamageVictim};
use serde::{Deserialize, Serialize};

/// Metrics for a single faction in a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactionMetrics {
    /// Faction identifier.
    pub faction: String,

    // === Production ===
    /// Combat units produced by type.
    pub units_produced: BTreeMap<String, u32>,
    /// Workers trained.
    pub workers_trained: u32,
    /// Buildings constructed by type.
    pub buildings_constructed: BTreeMap<String, u32>,
    /// Tech unlock times (tech id -> tick).
    pub tech_unlock_times: BTreeMap<String, u64>,
    /// Ticks a finished queue head had to wait.
    pub spawns_blocked: u32,

    // === Combat ===
    /// Units lost by type.
    pub units_lost: BTreeMap<String, u32>,
    /// Enemy units killed by type.
    pub units_killed: BTreeMap<String, u32>,
    /// Total damage dealt, turret included.
    pub total_damage_dealt: f64,
    /// Damage dealt to the enemy base.
    pub base_damage_dealt: f64,
    /// Arrows, shells and turret shots fired.
    pub projectiles_launched: u32,
    /// Tick of the first damage dealt.
    pub first_attack_tick: Option<u64>,
    /// Largest army seen at the end of a tick.
    pub peak_army_size: u32,
    /// Kill/death ratio.
    pub kd_ratio: f64,
}

impl FactionMetrics {
    /// Create new faction metrics.
    #[must_use]
    pub fn new(faction: FactionId) -> Self {
        Self {
            faction: faction.to_string(),
            ..Default::default()
        }
    }

    fn record_damage(&mut self, tick: u64, amount: f64, on_base: bool) {
        self.total_damage_dealt += amount;
        if on_base {
            self.base_damage_dealt += amount;
        }
        self.first_attack_tick.get_or_insert(tick);
    }

    /// Calculate final stats.
    pub fn calculate_derived_stats(&mut self) {
        let total_killed: u32 = self.units_killed.values().sum();
        let total_lost: u32 = self.units_lost.values().sum();
        self.kd_ratio = if total_lost > 0 {
            f64::from(total_killed) / f64::from(total_lost)
        } else {
            f64::from(total_killed)
        };
    }
}

fn bump(counter: &mut BTreeMap<String, u32>, key: &str) {
    *counter.entry(key.to_string()).or_default() += 1;
}

/// Folds every tick's events into per-faction metrics.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    factions: [FactionMetrics; 2],
    owners: HashMap<UnitId, FactionId>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factions: [
                FactionMetrics::new(FactionId::Player),
                FactionMetrics::new(FactionId::Enemy),
            ],
            owners: HashMap::new(),
        }
    }

    /// Learn the owners of units already on the lanes.
    pub fn observe<R: RandomSource>(&mut self, sim: &Simulation<R>) {
        for id in FactionId::ALL {
            let faction = sim.faction(id);
            for unit in &faction.units {
                self.owners.insert(unit.id, id);
            }
            let metrics = &mut self.factions[id.index()];
            metrics.peak_army_size = metrics.peak_army_size.max(faction.army_count);
        }
    }

    /// Metrics of one faction.
    #[must_use]
    pub fn faction(&self, id: FactionId) -> &FactionMetrics {
        &self.factions[id.index()]
    }

    /// Record one tick's events.
    pub fn record(&mut self, events: &TickEvents) {
        for event in &events.production {
            self.record_production(event, events.tick);
        }
        for event in &events.combat {
            self.record_combat(event, events.tick);
        }
    }

    fn record_production(&mut self, event: &ProductionEvent, tick: u64) {
        match event {
            ProductionEvent::UnitSpawned {
                faction, unit, kind, ..
            } => {
                self.owners.insert(*unit, *faction);
                bump(&mut self.factions[faction.index()].units_produced, kind.id());
            }
            ProductionEvent::WorkerTrained { faction, .. } => {
                self.factions[faction.index()].workers_trained += 1;
            }
            ProductionEvent::TechResearched { faction, tech } => {
                self.factions[faction.index()]
                    .tech_unlock_times
                    .insert(tech.to_string(), tick);
            }
            ProductionEvent::SpawnBlocked { faction, .. } => {
                self.factions[faction.index()].spawns_blocked += 1;
            }
            ProductionEvent::ConstructionCompleted { faction, kind, .. } => {
                bump(&mut self.factions[faction.index()].buildings_constructed, kind.id());
            }
        }
    }

    fn record_combat(&mut self, event: &CombatEvent, tick: u64) {
        match event {
            CombatEvent::DamageDealt {
                source,
                victim,
                amount,
                ..
            } => {
                let attacker = match source {
                    DamageSource::Turret(faction) => Some(*faction),
                    DamageSource::Unit(id) => self.owners.get(id).copied(),
                };
                let Some(attacker) = attacker else {
                    return;
                };
                let on_base = matches!(victim, DamageVictim::Base(_));
                self.factions[attacker.index()].record_damage(tick, amount.to_num::<f64>(), on_base);
            }
            CombatEvent::ProjectileLaunched { owner, .. } => {
                self.factions[owner.index()].projectiles_launched += 1;
            }
            CombatEvent::UnitDied { faction, unit, kind } => {
                self.owners.remove(unit);
                bump(&mut self.factions[faction.index()].units_lost, kind.id());
                bump(&mut self.factions[faction.opponent().index()].units_killed, kind.id());
            }
        }
    }

    /// Finish and hand back `[player, enemy]`.
    #[must_use]
    pub fn finish(mut self) -> [FactionMetrics; 2] {
        for metrics in &mut self.factions {
            metrics.calculate_derived_stats();
        }
        self.factions
    }
}
