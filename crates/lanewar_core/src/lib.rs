//! # Lanewar Core
//!
//! Deterministic simulation engine for a two-faction lane battle.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond parsing RON text handed to it
//! - No system randomness (an injectable [`rng::RandomSource`])
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless runs and scripted scenarios
//! - Bit-identical replays from a seed
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`data`] - Unit, building, tech and difficulty tables, match rules
//! - [`economy`] - Stockpiles, workers and gathering
//! - [`production`] - Building queues, constructions and spawning
//! - [`components`] - Units and effects in flight
//! - [`combat`] - Damage model and target selection
//! - [`movement`] - Lane ordering and position clamps
//! - [`systems`] - Per-tick combat, cleanup and turret systems
//! - [`stance`] - Per-lane stances
//! - [`command`] - Command surface and policy seam
//! - [`simulation`] - Core simulation loop
//! - [`scheduler`] - Wall-clock tick pacing
//! - [`snapshot`] - Read-only views for rendering and UI
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod command;
pub mod components;
pub mod data;
pub mod economy;
pub mod error;
pub mod factions;
pub mod math;
pub mod movement;
pub mod production;
pub mod rng;
pub mod scheduler;
pub mod simulation;
pub mod snapshot;
pub mod stance;
pub mod systems;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::command::{Command, CommandContext, FactionController, IdleController};
    pub use crate::components::{AttackTarget, Unit, UnitId, UnitState};
    pub use crate::data::{
        BuildingKind, Difficulty, MatchRules, TechCategory, TechId, UnitKind, LANE_COUNT,
    };
    pub use crate::economy::{Cost, ResourceKind, Stockpile, WorkerPool};
    pub use crate::error::{CommandError, GameError, Result};
    pub use crate::factions::{FactionId, FactionState, TechLevels};
    pub use crate::math::{ratio, whole, Fixed};
    pub use crate::production::{BuildingId, ProductionEvent, QueueItemKind};
    pub use crate::rng::{RandomSource, ScriptedRandom};
    pub use crate::scheduler::TickScheduler;
    pub use crate::simulation::{MatchConfig, MatchOutcome, Simulation, TickEvents};
    pub use crate::snapshot::{FactionSnapshot, MatchSnapshot, UnitView};
    pub use crate::stance::{LaneSelector, Stance};
    pub use crate::systems::CombatEvent;
}
