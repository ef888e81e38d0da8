//! Weather, seasons, locations and agent positions for the Hamlet simulation.
//!
//! The [`World`] is the collaborator both drivers update once per simulated
//! hour and that handlers and action executors mutate when agents move.
//!
//! # Modules
//!
//! - [`environment`] -- Season rotation, deterministic weather rolls and
//!   temperatures.
//! - [`error`] -- Error types for location and agent lookups.
//! - [`location`] -- [`Location`] rectangles with opening hours and occupancy.
//! - [`settings`] -- [`WorldSettings`] from the `world` config section.
//! - [`starting_town`] -- Default ten-location starting town.
//! - [`world`] -- The [`World`] arena: locations, positions, nearby queries
//!   and decision context assembly.

pub mod environment;
pub mod error;
pub mod location;
pub mod settings;
pub mod starting_town;
pub mod world;

pub use environment::{Environment, SeasonWeights};
pub use error::WorldError;
pub use location::Location;
pub use settings::{BaseTemperatures, WorldSettings};
pub use starting_town::{StartingTownIds, create_starting_town};
pub use world::{Position, World, WorldSummary};
