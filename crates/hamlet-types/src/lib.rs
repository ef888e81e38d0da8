//! Shared type definitions for the Hamlet agent simulation.
//!
//! This crate is the vocabulary shared by the world, the core drivers and
//! the engine binary. Types flow to `TypeScript` via `ts-rs` for the
//! dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Typed integer ids for agents, locations and events
//! - [`enums`] -- Time of day, season, weather, event kind/priority/status
//! - [`event`] -- [`ScheduledEvent`] and its per-kind constructors
//! - [`decision`] -- [`Decision`] returned by a decision provider
//! - [`context`] -- [`WorldContext`] handed to a decision provider

pub mod context;
pub mod decision;
pub mod enums;
pub mod event;
pub mod ids;

pub use context::{NearbyLocation, WorldContext};
pub use decision::Decision;
pub use enums::{
    EventKind, EventPriority, EventStatus, LocationKind, RunStatus, Season, TimeOfDay, Weather,
};
pub use event::ScheduledEvent;
pub use ids::{AgentId, EventId, LocationId};
