//! Error types for the `hamlet-engine` binary.

/// Top-level error for the binary.
///
/// Each variant wraps one subsystem's error so `main` can propagate
/// everything with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hamlet_core::config::ConfigError,
    },

    /// World seeding failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: hamlet_world::WorldError,
    },

    /// Adding an agent to the simulation failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: hamlet_core::simulation::SimulationError,
    },

    /// Taking the final state snapshot failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying snapshot error.
        #[from]
        source: hamlet_core::engine::SnapshotError,
    },

    /// Encoding the run record failed.
    #[error("json error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// Writing the run record failed.
    #[error("io error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
