//! Fixed-timestep match simulation.
//!
//! [`Simulation`] owns both factions, everything in flight, the random
//! source and the match outcome. One call to [`Simulation::step`] runs one
//! whole tick; nothing is ever left half-applied between calls.
//!
//! # Example
//!
//! ```
//! use lanewar_core::simulation::{MatchConfig, Simulation};
//!
//! let mut sim = Simulation::new(MatchConfig::default());
//! let events = sim.step();
//! assert_eq!(events.tick, 1);
//! assert_eq!(sim.tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::{Command, CommandContext, FactionController, IdleController};
use crate::components::{PendingHit, SiegeStrike, UnitId};
use crate::data::{Difficulty, MatchRules};
use crate::economy::{gather, ResourceKind};
use crate::error::CommandError;
use crate::factions::{FactionId, FactionState};
use crate::production::{construction_system, production_system, BuildingId, ProductionEvent, SpawnContext};
use crate::rng::RandomSource;
use crate::snapshot::{FactionSnapshot, MatchSnapshot};
use crate::systems::{
    cleanup_system, faction_pass, pending_effects_system, turret_system, CombatContext, CombatEvent,
};

/// How a match is set up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Opponent preset.
    pub difficulty: Difficulty,
    /// Seed of the default random source.
    pub seed: u64,
    /// Rule constants.
    pub rules: MatchRules,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            seed: 0,
            rules: MatchRules::default(),
        }
    }
}

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// This faction's base survived.
    Victory(FactionId),
    /// Both bases fell in the same tick.
    Draw,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick these events belong to.
    pub tick: u64,
    /// Spawns, trained workers, techs, constructions and blocked spawns.
    pub production: Vec<ProductionEvent>,
    /// Damage, projectiles and deaths.
    pub combat: Vec<CombatEvent>,
    /// Set on the tick the match ends.
    pub outcome: Option<MatchOutcome>,
}

impl TickEvents {
    /// Nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.production.is_empty() && self.combat.is_empty() && self.outcome.is_none()
    }
}

/// The match engine.
///
/// # Tick Order
///
/// Each tick runs, in this order:
/// 1. **Economy** - gathering every gather interval, then building queues
///    and constructions, player before enemy
/// 2. **Controllers** - the policy acts for factions on autopilot
/// 3. **Combat** - arrows and shells due this tick land, the player pass
///    and the enemy pass run, dead units are removed, the outcome is
///    checked, and base turrets fire while the match is still running
///
/// Once the match has an outcome, stepping does nothing.
#[derive(Debug, Clone)]
pub struct Simulation<R = ChaCha8Rng> {
    tick: u64,
    rules: MatchRules,
    difficulty: Difficulty,
    factions: [FactionState; 2],
    pending_hits: Vec<PendingHit>,
    siege_strikes: Vec<SiegeStrike>,
    next_unit_id: u64,
    next_building_id: u32,
    rng: R,
    outcome: Option<MatchOutcome>,
}

impl Simulation<ChaCha8Rng> {
    /// Start a match with the seeded default random source.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: RandomSource> Simulation<R> {
    /// Start a match drawing randomness from `rng`.
    ///
    /// The player starts with the rules' worker count, the enemy with its
    /// difficulty preset's. Each side owns one town center.
    #[must_use]
    pub fn with_rng(config: MatchConfig, rng: R) -> Self {
        let MatchConfig {
            difficulty,
            rules,
            ..
        } = config;
        let player = FactionState::new(
            FactionId::Player,
            &rules,
            rules.player_starting_workers,
            BuildingId(1),
        );
        let enemy = FactionState::new(
            FactionId::Enemy,
            &rules,
            difficulty.preset().starting_workers,
            BuildingId(2),
        );
        Self {
            tick: 0,
            rules,
            difficulty,
            factions: [player, enemy],
            pending_hits: Vec::new(),
            siege_strikes: Vec::new(),
            next_unit_id: 1,
            next_building_id: 3,
            rng,
            outcome: None,
        }
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Rule constants.
    #[must_use]
    pub const fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Difficulty preset.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Result, once the match is over.
    #[must_use]
    pub const fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// The match has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// State of one faction.
    #[must_use]
    pub fn faction(&self, id: FactionId) -> &FactionState {
        &self.factions[id.index()]
    }

    /// Mutable state of one faction, for setting up scenarios.
    ///
    /// Bypasses command validation.
    pub fn faction_mut(&mut self, id: FactionId) -> &mut FactionState {
        &mut self.factions[id.index()]
    }

    /// Arrows in flight.
    #[must_use]
    pub fn pending_hits(&self) -> &[PendingHit] {
        &self.pending_hits
    }

    /// Siege shells in flight.
    #[must_use]
    pub fn siege_strikes(&self) -> &[SiegeStrike] {
        &self.siege_strikes
    }

    /// Hand out a unit id for a unit placed outside production.
    pub fn allocate_unit_id(&mut self) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        id
    }

    /// Run one tick with no policy controller.
    ///
    /// Factions on autopilot issue no orders.
    pub fn step(&mut self) -> TickEvents {
        self.step_with_controller(&mut IdleController)
    }

    /// Run one tick, letting `controller` act for factions on autopilot.
    pub fn step_with_controller<C>(&mut self, controller: &mut C) -> TickEvents
    where
        C: FactionController + ?Sized,
    {
        if self.outcome.is_some() {
            return TickEvents {
                tick: self.tick,
                ..TickEvents::default()
            };
        }

        self.tick += 1;
        let mut events = TickEvents {
            tick: self.tick,
            ..TickEvents::default()
        };

        self.run_economy(&mut events);
        self.run_controllers(controller);
        self.run_combat(&mut events);

        #[cfg(feature = "debug-validation")]
        self.validate();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Run `ticks` ticks or until the match ends. Returns the ticks run.
    pub fn run(&mut self, ticks: u64) -> u64 {
        let mut ran = 0;
        while ran < ticks && !self.is_over() {
            self.step();
            ran += 1;
        }
        ran
    }

    fn run_economy(&mut self, events: &mut TickEvents) {
        if self.tick % self.rules.gather_interval.max(1) == 0 {
            for faction in &mut self.factions {
                gather(&mut faction.stockpile, &faction.workers, self.rules.gather_rate);
            }
        }

        for id in FactionId::ALL {
            let (faction, opponent) = split_factions(&mut self.factions, id);
            let mut ctx = SpawnContext {
                rules: &self.rules,
                next_unit_id: &mut self.next_unit_id,
                rng: &mut self.rng,
            };
            events
                .production
                .extend(production_system(faction, &opponent.units, &mut ctx));
        }

        for faction in &mut self.factions {
            events.production.extend(construction_system(faction, &self.rules));
        }
    }

    fn run_controllers<C>(&mut self, controller: &mut C)
    where
        C: FactionController + ?Sized,
    {
        for id in FactionId::ALL {
            if !self.factions[id.index()].autopilot {
                continue;
            }
            let (faction, opponent) = split_factions(&mut self.factions, id);
            let mut ctx = CommandContext::new(
                self.tick,
                faction,
                opponent,
                &self.rules,
                &mut self.next_building_id,
            );
            controller.act(id, &mut ctx);
        }
    }

    fn run_combat(&mut self, events: &mut TickEvents) {
        pending_effects_system(
            &mut self.factions,
            &mut self.pending_hits,
            &mut self.siege_strikes,
            self.tick,
            &self.rules,
            &mut events.combat,
        );

        for id in FactionId::ALL {
            let (friend, enemy) = split_factions(&mut self.factions, id);
            let mut ctx = CombatContext {
                tick: self.tick,
                rules: &self.rules,
                pending_hits: &mut self.pending_hits,
                siege_strikes: &mut self.siege_strikes,
                events: &mut events.combat,
            };
            faction_pass(friend, enemy, &mut ctx);
        }

        for faction in &mut self.factions {
            events.combat.extend(cleanup_system(faction));
        }

        if let Some(outcome) = decide_outcome(&self.factions) {
            info!(tick = self.tick, ?outcome, "Match ended");
            self.outcome = Some(outcome);
            events.outcome = Some(outcome);
            return;
        }

        for id in FactionId::ALL {
            let (faction, enemy) = split_factions(&mut self.factions, id);
            events
                .combat
                .extend(turret_system(faction, enemy, &self.rules, self.tick, &mut self.rng));
        }
    }

    /// Command surface for one faction.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MatchOver`] once the match has ended.
    pub fn commands(&mut self, faction: FactionId) -> Result<CommandContext<'_>, CommandError> {
        if self.outcome.is_some() {
            return Err(CommandError::MatchOver);
        }
        let (target, opponent) = split_factions(&mut self.factions, faction);
        Ok(CommandContext::new(
            self.tick,
            target,
            opponent,
            &self.rules,
            &mut self.next_building_id,
        ))
    }

    /// Apply a command for `faction`. Returns `false` when it was rejected.
    pub fn submit(&mut self, faction: FactionId, command: &Command) -> bool {
        match self.commands(faction) {
            Ok(mut ctx) => ctx.submit(command),
            Err(err) => {
                debug!(%faction, command = command.name(), error = %err, "Command rejected");
                false
            }
        }
    }

    /// Read-only view of both factions.
    #[must_use]
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            tick: self.tick,
            outcome: self.outcome,
            player: self.faction_snapshot(FactionId::Player),
            enemy: self.faction_snapshot(FactionId::Enemy),
        }
    }

    /// Read-only view of one faction.
    #[must_use]
    pub fn faction_snapshot(&self, faction: FactionId) -> FactionSnapshot {
        FactionSnapshot::capture(self.faction(faction), &self.rules)
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical gameplay state produce identical
    /// hashes. The random source is not included.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        self.next_unit_id.hash(&mut hasher);
        self.next_building_id.hash(&mut hasher);

        for faction in &self.factions {
            hash_faction(faction, &mut hasher);
        }

        self.pending_hits.len().hash(&mut hasher);
        for hit in &self.pending_hits {
            hit.attacker.hash(&mut hasher);
            hit.target.hash(&mut hasher);
            hit.damage.to_bits().hash(&mut hasher);
            hit.due_tick.hash(&mut hasher);
        }

        self.siege_strikes.len().hash(&mut hasher);
        for strike in &self.siege_strikes {
            strike.attacker.hash(&mut hasher);
            strike.target.hash(&mut hasher);
            strike.impact_position.to_bits().hash(&mut hasher);
            strike.impact_lane.hash(&mut hasher);
            strike.base_damage.to_bits().hash(&mut hasher);
            strike.due_tick.hash(&mut hasher);
        }

        hasher.finish()
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self) {
        for faction in &self.factions {
            let consistent = faction.is_consistent() && faction.stockpile.is_non_negative();
            if !consistent {
                tracing::error!(tick = self.tick, faction = %faction.id, "Faction bookkeeping out of step");
            }
            debug_assert!(consistent, "faction {} inconsistent at tick {}", faction.id, self.tick);
        }
    }
}

fn hash_faction(faction: &FactionState, hasher: &mut DefaultHasher) {
    faction.id.hash(hasher);
    for kind in ResourceKind::ALL {
        faction.stockpile.get(kind).to_bits().hash(hasher);
    }
    faction.workers.hash(hasher);
    faction.pop_cap.hash(hasher);
    faction.army_count.hash(hasher);
    faction.base_hp.to_bits().hash(hasher);
    faction.tech.hash(hasher);
    faction.turret_cooldown.hash(hasher);
    faction.stances.hash(hasher);

    for building in &faction.buildings {
        building.id.hash(hasher);
        for item in building.queue.iter() {
            item.kind.hash(hasher);
            item.remaining.to_bits().hash(hasher);
        }
    }
    for construction in &faction.constructions {
        construction.id.hash(hasher);
        construction.remaining.to_bits().hash(hasher);
    }

    faction.units.len().hash(hasher);
    for unit in &faction.units {
        unit.id.hash(hasher);
        unit.position.to_bits().hash(hasher);
        unit.hp.to_bits().hash(hasher);
        unit.damage.to_bits().hash(hasher);
        unit.attack_cooldown.hash(hasher);
        unit.state.hash(hasher);
        unit.deployed.hash(hasher);
    }
}

/// Both factions, with `first` mutable first.
fn split_factions(
    factions: &mut [FactionState; 2],
    first: FactionId,
) -> (&mut FactionState, &mut FactionState) {
    let [player, enemy] = factions;
    match first {
        FactionId::Player => (player, enemy),
        FactionId::Enemy => (enemy, player),
    }
}

fn decide_outcome(factions: &[FactionState; 2]) -> Option<MatchOutcome> {
    let [player, enemy] = factions;
    match (player.is_base_destroyed(), enemy.is_base_destroyed()) {
        (true, true) => Some(MatchOutcome::Draw),
        (true, false) => Some(MatchOutcome::Victory(FactionId::Enemy)),
        (false, true) => Some(MatchOutcome::Victory(FactionId::Player)),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BuildingKind, UnitKind};
    use crate::math::{whole, Fixed};
    use crate::rng::ScriptedRandom;
    use crate::stance::{LaneSelector, Stance};

    fn scripted() -> Simulation<ScriptedRandom> {
        Simulation::with_rng(MatchConfig::default(), ScriptedRandom::zeros())
    }

    #[test]
    fn test_new_match_setup() {
        let config = MatchConfig {
            difficulty: Difficulty::Hard,
            ..MatchConfig::default()
        };
        let sim = Simulation::new(config);
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.faction(FactionId::Player).workers.total(), 6);
        assert_eq!(sim.faction(FactionId::Enemy).workers.total(), 9);
        assert_eq!(sim.faction(FactionId::Player).buildings[0].id, BuildingId(1));
        assert_eq!(sim.faction(FactionId::Enemy).buildings[0].id, BuildingId(2));
        assert!(!sim.is_over());
    }

    #[test]
    fn test_gather_every_tenth_tick() {
        let mut sim = scripted();
        let start = sim.faction(FactionId::Player).stockpile.get(ResourceKind::Food);
        for _ in 0..9 {
            sim.step();
        }
        assert_eq!(sim.faction(FactionId::Player).stockpile.get(ResourceKind::Food), start);
        sim.step();
        let gained = sim.faction(FactionId::Player).stockpile.get(ResourceKind::Food) - start;
        // 6 workers at 0.6 each.
        assert_eq!(gained, Fixed::from_num(6) * sim.rules().gather_rate);
    }

    #[test]
    fn test_submit_and_match_over() {
        let mut sim = scripted();
        assert!(sim.submit(
            FactionId::Player,
            &Command::SetStance {
                lane: LaneSelector::All,
                stance: Stance::Defend,
            }
        ));
        assert_eq!(sim.faction(FactionId::Player).stances.global(), Stance::Defend);

        sim.faction_mut(FactionId::Enemy).base_hp = Fixed::ZERO;
        let events = sim.step();
        assert_eq!(events.outcome, Some(MatchOutcome::Victory(FactionId::Player)));
        assert!(!sim.submit(FactionId::Player, &Command::GrantResources));
        assert!(matches!(
            sim.commands(FactionId::Enemy),
            Err(CommandError::MatchOver)
        ));

        let tick = sim.tick();
        let events = sim.step();
        assert!(events.is_empty());
        assert_eq!(sim.tick(), tick);
    }

    #[test]
    fn test_simultaneous_destruction_is_draw() {
        let mut sim = scripted();
        sim.faction_mut(FactionId::Player).base_hp = Fixed::ZERO;
        sim.faction_mut(FactionId::Enemy).base_hp = Fixed::ZERO;
        assert_eq!(sim.step().outcome, Some(MatchOutcome::Draw));
        assert_eq!(sim.outcome(), Some(MatchOutcome::Draw));
    }

    #[test]
    fn test_instant_build_spawns_next_tick() {
        let mut sim = scripted();
        {
            let mut ctx = sim.commands(FactionId::Player).unwrap();
            ctx.grant_resources();
            ctx.set_instant_build(true);
            ctx.enqueue_construction(BuildingKind::Barracks).unwrap();
        }
        let events = sim.step();
        assert!(events
            .production
            .iter()
            .any(|e| matches!(e, ProductionEvent::ConstructionCompleted { .. })));

        assert!(sim.submit(
            FactionId::Player,
            &Command::EnqueueUnit {
                building: BuildingId(3),
                unit: UnitKind::Spearman,
            }
        ));
        let events = sim.step();
        assert!(events
            .production
            .iter()
            .any(|e| matches!(e, ProductionEvent::UnitSpawned { kind: UnitKind::Spearman, .. })));
        let player = sim.faction(FactionId::Player);
        assert_eq!(player.units.len(), 1);
        assert_eq!(player.army_count, 1);
        assert_eq!(player.current_pop(), 7);
    }

    #[test]
    fn test_controller_runs_only_on_autopilot() {
        let mut sim = scripted();
        let mut calls = Vec::new();
        let mut controller = |faction: FactionId, _ctx: &mut CommandContext<'_>| calls.push(faction);
        sim.step_with_controller(&mut controller);
        sim.submit(FactionId::Enemy, &Command::SetAutopilot(true));
        sim.step_with_controller(&mut controller);
        assert_eq!(calls, vec![FactionId::Enemy]);
    }

    #[test]
    fn test_deterministic_hash() {
        let mut a = Simulation::new(MatchConfig::default());
        let mut b = Simulation::new(MatchConfig::default());
        for sim in [&mut a, &mut b] {
            let mut ctx = sim.commands(FactionId::Enemy).unwrap();
            ctx.grant_resources();
            ctx.set_instant_build(true);
            ctx.enqueue_construction(BuildingKind::Barracks).unwrap();
        }
        for _ in 0..50 {
            a.step();
            b.step();
            assert_eq!(a.state_hash(), b.state_hash());
        }
        a.faction_mut(FactionId::Enemy).base_hp -= whole(1);
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut sim = scripted();
        sim.run(3);
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.tick, 3);
        assert_eq!(snapshot.outcome, None);
        assert_eq!(snapshot.player.faction, FactionId::Player);
        assert_eq!(snapshot.enemy.population, 6);
    }
}
