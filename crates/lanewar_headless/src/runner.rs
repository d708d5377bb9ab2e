//! Headless match runner.
//!
//! Plays one scenario with no rendering. Orders for factions under manual
//! control are submitted before each tick, the way a player's clicks would
//! be. Orders for factions on autopilot go through the
//! [`ScriptedController`] from inside the tick.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use lanewar_core::command::{Command, CommandContext, FactionController};
use lanewar_core::factions::FactionId;
use lanewar_core::rng::RandomSource;
use lanewar_core::scheduler::TickScheduler;
use lanewar_core::simulation::Simulation;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::MetricsCollector;
use crate::protocol::{MatchSummary, OutputLine, VerifyReport};
use crate::scenario::{Scenario, ScenarioError, TimedOrder};

/// Error type for headless runs.
#[derive(Error, Debug)]
pub enum RunError {
    /// The scenario could not be loaded.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// Writing output failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Replays a timed order list for one or both factions.
#[derive(Debug, Clone, Default)]
pub struct ScriptedController {
    queues: [VecDeque<TimedOrder>; 2],
    rejected: u32,
}

impl ScriptedController {
    /// Split `orders` per faction, keeping tick order.
    #[must_use]
    pub fn new(mut orders: Vec<TimedOrder>) -> Self {
        orders.sort_by_key(|order| order.tick);
        let mut queues: [VecDeque<TimedOrder>; 2] = Default::default();
        for order in orders {
            queues[order.faction.index()].push_back(order);
        }
        Self {
            queues,
            rejected: 0,
        }
    }

    /// Remove and return `faction`'s orders due at or before `tick`.
    pub fn take_due(&mut self, faction: FactionId, tick: u64) -> Vec<Command> {
        let queue = &mut self.queues[faction.index()];
        let mut due = Vec::new();
        while let Some(order) = queue.pop_front() {
            if order.tick > tick {
                queue.push_front(order);
                break;
            }
            due.push(order.command);
        }
        due
    }

    /// Orders not yet submitted.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Orders the command surface turned down so far.
    #[must_use]
    pub const fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Submit orders for factions that are not on autopilot.
    pub fn submit_manual<R: RandomSource>(&mut self, sim: &mut Simulation<R>) {
        for faction in FactionId::ALL {
            if sim.faction(faction).autopilot {
                continue;
            }
            for command in self.take_due(faction, sim.tick()) {
                if !sim.submit(faction, &command) {
                    self.rejected += 1;
                }
            }
        }
    }
}

impl FactionController for ScriptedController {
    fn act(&mut self, faction: FactionId, ctx: &mut CommandContext<'_>) {
        // The clock has already advanced; "due" means before this tick ran.
        let before = ctx.tick().saturating_sub(1);
        for command in self.take_due(faction, before) {
            if !ctx.submit(&command) {
                self.rejected += 1;
            }
        }
    }
}

/// Headless runner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Print a snapshot every this many ticks. Zero prints none.
    pub snapshot_every: u64,
    /// Pace ticks against the wall clock at the difficulty's speed.
    pub realtime: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            snapshot_every: 100,
            realtime: false,
        }
    }
}

/// Plays one scenario and writes JSON lines to `out`.
pub struct HeadlessRunner<W: Write> {
    scenario: Scenario,
    config: RunConfig,
    out: W,
}

impl<W: Write> HeadlessRunner<W> {
    /// Create a runner.
    pub fn new(scenario: Scenario, config: RunConfig, out: W) -> Self {
        Self {
            scenario,
            config,
            out,
        }
    }

    /// Run the match to its end or the tick limit.
    pub fn run(mut self) -> Result<MatchSummary, RunError> {
        let scenario = &self.scenario;
        info!(
            scenario = %scenario.name,
            difficulty = %scenario.difficulty,
            seed = scenario.seed,
            max_ticks = scenario.max_ticks,
            "Starting headless match"
        );

        let mut sim = Simulation::new(scenario.match_config());
        sim.submit(FactionId::Player, &Command::SetAutopilot(scenario.player_autopilot));
        sim.submit(FactionId::Enemy, &Command::SetAutopilot(scenario.enemy_autopilot));
        let mut controller = ScriptedController::new(scenario.ordered());
        let mut metrics = MetricsCollector::new();
        metrics.observe(&sim);

        let ready = OutputLine::Ready {
            scenario: scenario.name.clone(),
            difficulty: scenario.difficulty,
            seed: scenario.seed,
            max_ticks: scenario.max_ticks,
        };
        self.emit(&ready)?;

        if self.config.realtime {
            self.run_realtime(&mut sim, &mut controller, &mut metrics)?;
        } else {
            while !self.finished(&sim) {
                self.tick_once(&mut sim, &mut controller, &mut metrics)?;
            }
        }

        if controller.pending() > 0 {
            debug!(pending = controller.pending(), "Orders left unplayed");
        }
        let [player, enemy] = metrics.finish();
        let summary = MatchSummary {
            scenario: self.scenario.name.clone(),
            difficulty: self.scenario.difficulty,
            seed: self.scenario.seed,
            ticks: sim.tick(),
            outcome: sim.outcome(),
            final_state_hash: sim.state_hash(),
            orders_rejected: controller.rejected(),
            player,
            enemy,
        };
        info!(
            ticks = summary.ticks,
            outcome = ?summary.outcome,
            hash = %format!("{:016x}", summary.final_state_hash),
            "Match finished"
        );
        self.emit(&OutputLine::Summary(summary.clone()))?;
        Ok(summary)
    }

    fn finished<R: RandomSource>(&self, sim: &Simulation<R>) -> bool {
        sim.is_over() || sim.tick() >= self.scenario.max_ticks
    }

    fn tick_once<R: RandomSource>(
        &mut self,
        sim: &mut Simulation<R>,
        controller: &mut ScriptedController,
        metrics: &mut MetricsCollector,
    ) -> Result<(), RunError> {
        controller.submit_manual(sim);
        let events = sim.step_with_controller(controller);
        metrics.record(&events);
        metrics.observe(sim);

        let every = self.config.snapshot_every;
        if events.outcome.is_some() || (every > 0 && sim.tick() % every == 0) {
            self.emit(&OutputLine::Snapshot(sim.snapshot()))?;
        }
        Ok(())
    }

    /// Step at wall-clock speed, sleeping between frames.
    fn run_realtime<R: RandomSource>(
        &mut self,
        sim: &mut Simulation<R>,
        controller: &mut ScriptedController,
        metrics: &mut MetricsCollector,
    ) -> Result<(), RunError> {
        let mut scheduler = TickScheduler::for_difficulty(self.scenario.difficulty);
        let frame = scheduler.tick_duration() / 2;
        let mut last = Instant::now();

        while !self.finished(sim) {
            let now = Instant::now();
            let due = scheduler.advance(now.duration_since(last));
            last = now;
            for _ in 0..due {
                if self.finished(sim) {
                    break;
                }
                self.tick_once(sim, controller, metrics)?;
            }
            thread::sleep(frame.max(Duration::from_millis(1)));
        }
        Ok(())
    }

    fn emit(&mut self, line: &OutputLine) -> Result<(), RunError> {
        self.out.write_all(line.to_json_line().as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Run `scenario` `runs` times in parallel and compare final hashes.
pub fn verify_scenario(scenario: &Scenario, runs: u32) -> Result<VerifyReport, RunError> {
    let config = RunConfig {
        snapshot_every: 0,
        realtime: false,
    };
    let hashes = (0..runs.max(1))
        .into_par_iter()
        .map(|_| {
            HeadlessRunner::new(scenario.clone(), config.clone(), io::sink())
                .run()
                .map(|summary| summary.final_state_hash)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let report = VerifyReport::new(scenario.name.clone(), scenario.max_ticks, hashes);
    if !report.deterministic {
        warn!(hashes = ?report.hashes, "Runs diverged");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanewar_core::data::{BuildingKind, UnitKind};
    use lanewar_core::production::BuildingId;
    use lanewar_core::stance::{LaneSelector, Stance};

    fn lines(buffer: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(buffer)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_take_due_keeps_later_orders() {
        let mut controller = ScriptedController::new(vec![
            TimedOrder::new(5, FactionId::Player, Command::GrantResources),
            TimedOrder::new(1, FactionId::Player, Command::SetInstantBuild(true)),
            TimedOrder::new(1, FactionId::Enemy, Command::GrantResources),
        ]);
        assert_eq!(
            controller.take_due(FactionId::Player, 3),
            vec![Command::SetInstantBuild(true)]
        );
        assert_eq!(controller.pending(), 2);
        assert!(controller.take_due(FactionId::Player, 4).is_empty());
        assert_eq!(controller.take_due(FactionId::Player, 5).len(), 1);
    }

    #[test]
    fn test_manual_orders_apply_before_tick() {
        let mut sim = Simulation::new(Default::default());
        let mut controller = ScriptedController::new(vec![TimedOrder::new(
            0,
            FactionId::Enemy,
            Command::SetStance {
                lane: LaneSelector::Lane(2),
                stance: Stance::Retreat,
            },
        )]);
        controller.submit_manual(&mut sim);
        assert_eq!(sim.faction(FactionId::Enemy).stances.lane(2), Stance::Retreat);
        assert_eq!(controller.pending(), 0);
    }

    #[test]
    fn test_autopilot_orders_go_through_controller() {
        let mut sim = Simulation::new(Default::default());
        sim.submit(FactionId::Player, &Command::SetAutopilot(true));
        let mut controller = ScriptedController::new(vec![TimedOrder::new(
            0,
            FactionId::Player,
            Command::EnqueueConstruction {
                building: BuildingKind::House,
            },
        )]);

        controller.submit_manual(&mut sim);
        assert_eq!(controller.pending(), 1);
        sim.step_with_controller(&mut controller);
        assert_eq!(controller.pending(), 0);
        assert_eq!(sim.faction(FactionId::Player).constructions.len(), 1);
    }

    #[test]
    fn test_rejected_orders_are_counted() {
        let mut sim = Simulation::new(Default::default());
        let mut controller = ScriptedController::new(vec![TimedOrder::new(
            0,
            FactionId::Player,
            Command::EnqueueUnit {
                building: BuildingId(9),
                unit: UnitKind::Knight,
            },
        )]);
        controller.submit_manual(&mut sim);
        assert_eq!(controller.rejected(), 1);
    }

    #[test]
    fn test_run_writes_ready_snapshots_and_summary() {
        let scenario = Scenario {
            max_ticks: 350,
            ..Scenario::opening()
        };
        let config = RunConfig {
            snapshot_every: 100,
            realtime: false,
        };
        let mut buffer = Vec::new();
        let summary = HeadlessRunner::new(scenario, config, &mut buffer).run().unwrap();
        assert_eq!(summary.ticks, 350);
        assert_eq!(summary.outcome, None);
        assert_eq!(summary.player.buildings_constructed.get("barracks"), Some(&1));

        let output = lines(&buffer);
        assert_eq!(output.len(), 5);
        assert_eq!(output[0]["type"], "ready");
        assert_eq!(output[1]["type"], "snapshot");
        assert_eq!(output[1]["tick"], 100);
        assert_eq!(output[3]["tick"], 300);
        assert_eq!(output[4]["type"], "summary");
        assert_eq!(output[4]["ticks"], 350);
    }

    #[test]
    fn test_verify_scenario_agrees() {
        let scenario = Scenario {
            max_ticks: 300,
            seed: 11,
            ..Scenario::opening()
        };
        let report = verify_scenario(&scenario, 3).unwrap();
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 3);
    }
}
