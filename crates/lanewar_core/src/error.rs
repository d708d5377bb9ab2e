//! Error types for the lane simulation.
//!
//! Two families live here. [`GameError`] covers malformed input handed to
//! the engine (bad RON data, unknown identifiers). [`CommandError`] covers
//! ordinary policy rejections at the command surface: they are expected
//! during play and never leave the simulation in a partial state.

use thiserror::Error;

use crate::economy::ResourceKind;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data text parsing error.
    #[error("Failed to parse {what}: {message}")]
    DataParseError {
        /// What was being parsed (rules, scenario, ...).
        what: String,
        /// Error message.
        message: String,
    },

    /// Unknown unit type name.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Unknown building type name.
    #[error("Unknown building type: {0}")]
    UnknownBuildingType(String),

    /// Unknown tech identifier.
    #[error("Unknown tech: {0}")]
    UnknownTech(String),

    /// Unknown stance name.
    #[error("Unknown stance: {0}")]
    UnknownStance(String),

    /// Unknown resource name.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Unknown difficulty preset name.
    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Faction cannot pay for the order.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource that fell short.
        resource: ResourceKind,
        /// Amount required.
        required: u32,
        /// Amount available (rounded down).
        available: u32,
    },

    /// Building queue already holds the maximum number of items.
    #[error("Production queue full (max {max})")]
    QueueFull {
        /// Configured queue bound.
        max: usize,
    },

    /// Faction is at or above its population cap.
    #[error("Population cap reached ({current}/{cap})")]
    PopulationCapReached {
        /// Current population.
        current: u32,
        /// Current cap.
        cap: u32,
    },

    /// No building with this id belongs to the faction.
    #[error("Unknown building id: {0}")]
    UnknownBuilding(u32),

    /// Building exists but does not offer this item.
    #[error("{building} cannot produce {item}")]
    NotProducible {
        /// Building type name.
        building: &'static str,
        /// Requested item name.
        item: String,
    },

    /// Tech is not the next level of its line, or is already queued.
    #[error("Tech {0} is not available")]
    TechUnavailable(String),

    /// Lane index outside the battlefield.
    #[error("Unknown lane: {0}")]
    UnknownLane(u8),

    /// No idle worker to assign.
    #[error("No idle workers")]
    NoIdleWorkers,

    /// No worker assigned to this resource to release.
    #[error("No workers assigned to {0}")]
    NoAssignedWorkers(ResourceKind),

    /// The match has ended; no further commands apply.
    #[error("Match is over")]
    MatchOver,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        let err = CommandError::InsufficientResources {
            resource: ResourceKind::Wood,
            required: 150,
            available: 20,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient resources: need 150 wood, have 20"
        );
        assert_eq!(
            CommandError::QueueFull { max: 5 }.to_string(),
            "Production queue full (max 5)"
        );
        assert_eq!(
            CommandError::PopulationCapReached { current: 10, cap: 10 }.to_string(),
            "Population cap reached (10/10)"
        );
    }

    #[test]
    fn test_game_error_display() {
        let err = GameError::UnknownStance("charge".to_string());
        assert_eq!(err.to_string(), "Unknown stance: charge");
    }
}
