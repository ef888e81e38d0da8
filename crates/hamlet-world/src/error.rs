//! Error types for the `hamlet-world` crate.

use hamlet_types::{AgentId, LocationId};

/// Errors that can occur during world operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A location was not found in the arena.
    #[error("location not found: {0}")]
    LocationNotFound(LocationId),

    /// The agent has no recorded position.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// A location with the same id already exists.
    #[error("duplicate location id: {0}")]
    DuplicateLocation(LocationId),

    /// The location has reached its maximum occupant capacity.
    #[error("location {location} is at capacity ({capacity})")]
    LocationAtCapacity {
        /// The full location.
        location: LocationId,
        /// Maximum capacity.
        capacity: u32,
    },

    /// The location is closed at the requested hour.
    #[error("location {location} is closed at hour {hour}")]
    LocationClosed {
        /// The closed location.
        location: LocationId,
        /// Hour of day the entry was attempted.
        hour: u32,
    },
}
