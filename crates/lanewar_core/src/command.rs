//! Command surface shared by human input and opponent policies.
//!
//! Everything outside the engine that wants to change a faction goes
//! through a [`CommandContext`]. Human input reaches it through
//! [`Simulation::submit`](crate::simulation::Simulation::submit); a
//! [`FactionController`] reaches it from inside the tick. Both paths run
//! the same validation, so a policy can do nothing a player could not.
//!
//! Rejections are ordinary [`CommandError`] values. A rejected command
//! leaves the faction exactly as it was.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{BuildingKind, MatchRules, TechId, UnitKind};
use crate::economy::ResourceKind;
use crate::error::CommandError;
use crate::factions::{FactionId, FactionState};
use crate::production::{queue_tech, queue_unit, start_construction, BuildingId};
use crate::stance::{LaneSelector, Stance};

/// One order for a faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Change the stance of one lane or all lanes.
    SetStance {
        /// Lanes to change.
        lane: LaneSelector,
        /// New stance.
        stance: Stance,
    },
    /// Move workers between idle and a resource.
    ReassignWorker {
        /// Resource bucket.
        resource: ResourceKind,
        /// Positive assigns idle workers, negative releases.
        delta: i32,
    },
    /// Queue a unit at a building.
    EnqueueUnit {
        /// Producing building.
        building: BuildingId,
        /// Unit to train.
        unit: UnitKind,
    },
    /// Queue a tech at a building.
    EnqueueTech {
        /// Researching building.
        building: BuildingId,
        /// Tech to research.
        tech: TechId,
    },
    /// Start constructing a building.
    EnqueueConstruction {
        /// Building to construct.
        building: BuildingKind,
    },
    /// Fill every resource counter.
    GrantResources,
    /// Toggle immediate completion of queues and constructions.
    SetInstantBuild(bool),
    /// Toggle the policy controller for this faction.
    SetAutopilot(bool),
}

impl Command {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetStance { .. } => "set_stance",
            Self::ReassignWorker { .. } => "reassign_worker",
            Self::EnqueueUnit { .. } => "enqueue_unit",
            Self::EnqueueTech { .. } => "enqueue_tech",
            Self::EnqueueConstruction { .. } => "enqueue_construction",
            Self::GrantResources => "grant_resources",
            Self::SetInstantBuild(_) => "set_instant_build",
            Self::SetAutopilot(_) => "set_autopilot",
        }
    }
}

/// Mutable access to one faction, scoped to validated operations.
///
/// The opponent is visible read-only so a policy can react to it.
pub struct CommandContext<'a> {
    tick: u64,
    faction: &'a mut FactionState,
    opponent: &'a FactionState,
    rules: &'a MatchRules,
    next_building_id: &'a mut u32,
}

impl<'a> CommandContext<'a> {
    /// Wrap a faction for command handling.
    pub fn new(
        tick: u64,
        faction: &'a mut FactionState,
        opponent: &'a FactionState,
        rules: &'a MatchRules,
        next_building_id: &'a mut u32,
    ) -> Self {
        Self {
            tick,
            faction,
            opponent,
            rules,
            next_building_id,
        }
    }

    /// Tick the command is issued on.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Faction being commanded.
    #[must_use]
    pub fn faction_id(&self) -> FactionId {
        self.faction.id
    }

    /// Read-only view of the commanded faction.
    #[must_use]
    pub fn state(&self) -> &FactionState {
        self.faction
    }

    /// Read-only view of the other faction.
    #[must_use]
    pub fn opponent(&self) -> &FactionState {
        self.opponent
    }

    /// Match rules.
    #[must_use]
    pub fn rules(&self) -> &MatchRules {
        self.rules
    }

    /// Set the stance of one lane or every lane.
    ///
    /// A lane index out of range is rejected as an invalid state.
    pub fn set_stance(&mut self, lane: LaneSelector, stance: Stance) -> Result<(), CommandError> {
        if self.faction.stances.set(lane, stance) {
            Ok(())
        } else {
            Err(CommandError::UnknownLane(match lane {
                LaneSelector::Lane(index) => index,
                LaneSelector::All => u8::MAX,
            }))
        }
    }

    /// Move `delta` workers between idle and `resource`.
    pub fn reassign_worker(&mut self, resource: ResourceKind, delta: i32) -> Result<(), CommandError> {
        self.faction.workers.reassign(resource, delta)
    }

    /// Pay for and queue a unit.
    pub fn enqueue_unit(&mut self, building: BuildingId, unit: UnitKind) -> Result<(), CommandError> {
        queue_unit(self.faction, building, unit)
    }

    /// Pay for and queue a tech.
    pub fn enqueue_tech(&mut self, building: BuildingId, tech: TechId) -> Result<(), CommandError> {
        queue_tech(self.faction, building, tech)
    }

    /// Pay for and start a construction.
    ///
    /// Returns the id the finished building will carry.
    pub fn enqueue_construction(&mut self, kind: BuildingKind) -> Result<BuildingId, CommandError> {
        let id = BuildingId(*self.next_building_id);
        start_construction(self.faction, id, kind)?;
        *self.next_building_id += 1;
        Ok(id)
    }

    /// Set every resource counter to the grant amount.
    pub fn grant_resources(&mut self) {
        self.faction.stockpile.set_all(self.rules.grant_amount);
        debug!(faction = %self.faction.id, amount = self.rules.grant_amount, "Resources granted");
    }

    /// Toggle instant build.
    pub fn set_instant_build(&mut self, enabled: bool) {
        self.faction.instant_build = enabled;
    }

    /// Toggle the policy controller.
    pub fn set_autopilot(&mut self, enabled: bool) {
        self.faction.autopilot = enabled;
    }

    /// Apply a [`Command`].
    pub fn apply(&mut self, command: &Command) -> Result<(), CommandError> {
        match *command {
            Command::SetStance { lane, stance } => self.set_stance(lane, stance),
            Command::ReassignWorker { resource, delta } => self.reassign_worker(resource, delta),
            Command::EnqueueUnit { building, unit } => self.enqueue_unit(building, unit),
            Command::EnqueueTech { building, tech } => self.enqueue_tech(building, tech),
            Command::EnqueueConstruction { building } => {
                self.enqueue_construction(building).map(|_| ())
            }
            Command::GrantResources => {
                self.grant_resources();
                Ok(())
            }
            Command::SetInstantBuild(enabled) => {
                self.set_instant_build(enabled);
                Ok(())
            }
            Command::SetAutopilot(enabled) => {
                self.set_autopilot(enabled);
                Ok(())
            }
        }
    }

    /// Apply a command and report success as a flag.
    ///
    /// Rejections are logged at debug level.
    pub fn submit(&mut self, command: &Command) -> bool {
        match self.apply(command) {
            Ok(()) => true,
            Err(err) => {
                debug!(
                    faction = %self.faction.id,
                    tick = self.tick,
                    command = command.name(),
                    error = %err,
                    "Command rejected"
                );
                false
            }
        }
    }
}

/// Decision maker for a faction on autopilot.
///
/// The simulation calls [`act`](Self::act) once per tick for every faction
/// whose autopilot flag is on, after the economy phase and before combat.
/// Controllers see the same command surface as human input and cannot
/// bypass its checks.
pub trait FactionController {
    /// Issue this tick's orders for `faction`.
    fn act(&mut self, faction: FactionId, ctx: &mut CommandContext<'_>);
}

/// Controller that never issues an order.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleController;

impl FactionController for IdleController {
    fn act(&mut self, _faction: FactionId, _ctx: &mut CommandContext<'_>) {}
}

impl<F> FactionController for F
where
    F: FnMut(FactionId, &mut CommandContext<'_>),
{
    fn act(&mut self, faction: FactionId, ctx: &mut CommandContext<'_>) {
        self(faction, ctx);
    }
}
