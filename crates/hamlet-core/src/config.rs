//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `hamlet-config.yaml` at the project
//! root. Every field has a default, so an empty file (or no file at all)
//! yields a runnable configuration.

use std::path::Path;
use std::time::Duration;

use hamlet_world::WorldSettings;
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `hamlet-config.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HamletConfig {
    /// Action-driven simulation settings.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Tick engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// World settings.
    #[serde(default)]
    pub world: WorldSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Binary run settings.
    #[serde(default)]
    pub run: RunConfig,
}

impl HamletConfig {
    /// Load configuration from a YAML file.
    ///
    /// `HAMLET_LOG` overrides `logging.level` when set.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.logging.apply_env_overrides();
        Ok(config)
    }

    /// Defaults, with the `HAMLET_LOG` override applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.logging.apply_env_overrides();
        config
    }

    /// Parse configuration from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Settings for the action-driven [`Simulation`](crate::simulation::Simulation).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Upper bound on a single time-skip, in minutes.
    #[serde(default = "default_max_time_skip")]
    pub max_time_skip: u64,

    /// Per-request decision deadline in milliseconds.
    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,

    /// Duration used when a decision omits one.
    #[serde(default = "default_action_minutes")]
    pub default_action_minutes: u64,

    /// Length of the wait task synthesized on a decision timeout.
    #[serde(default = "default_timeout_wait_minutes")]
    pub timeout_wait_minutes: u64,

    /// Consecutive decision errors before an agent is parked on a backoff
    /// wait. `0` retries forever.
    #[serde(default = "default_decision_failure_limit")]
    pub decision_failure_limit: u32,

    /// Length of the backoff wait task.
    #[serde(default = "default_failure_backoff_minutes")]
    pub failure_backoff_minutes: u64,

    /// Starting day.
    #[serde(default = "default_initial_day")]
    pub initial_day: u64,

    /// Starting hour.
    #[serde(default = "default_initial_hour")]
    pub initial_hour: u64,

    /// Starting minute.
    #[serde(default)]
    pub initial_minute: u64,

    /// Stop after this many simulated minutes. `0` is unlimited.
    #[serde(default)]
    pub max_minutes: u64,

    /// Sleep between iterations while no agents exist, in milliseconds.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
}

impl SimulationConfig {
    /// Decision deadline as a [`Duration`].
    pub const fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }
}

/// Settings for the tick [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Cooperative yield between loop iterations, in milliseconds. `0`
    /// yields to the scheduler without sleeping.
    #[serde(default = "default_yield_ms")]
    pub yield_ms: u64,

    /// Stop after this many simulated minutes. `0` is unlimited.
    #[serde(default)]
    pub max_minutes: u64,

    /// Starting day.
    #[serde(default = "default_initial_day")]
    pub initial_day: u64,

    /// Starting hour.
    #[serde(default = "default_initial_hour")]
    pub initial_hour: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter
    /// directive.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl LoggingConfig {
    /// Override the level with `HAMLET_LOG` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HAMLET_LOG") {
            self.level = val;
        }
    }
}

/// Which driver the binary runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Action-driven [`Simulation`](crate::simulation::Simulation).
    #[default]
    Simulation,
    /// Tick [`Engine`](crate::engine::Engine) over scripted events.
    Engine,
}

/// Settings for the `hamlet-engine` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Driver to run.
    #[serde(default)]
    pub driver: DriverKind,

    /// Where the final state snapshot is written.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

const fn default_max_time_skip() -> u64 {
    480
}

const fn default_decision_timeout_ms() -> u64 {
    60_000
}

const fn default_action_minutes() -> u64 {
    30
}

const fn default_timeout_wait_minutes() -> u64 {
    10
}

const fn default_decision_failure_limit() -> u32 {
    3
}

const fn default_failure_backoff_minutes() -> u64 {
    10
}

const fn default_initial_day() -> u64 {
    1
}

const fn default_initial_hour() -> u64 {
    8
}

const fn default_idle_poll_ms() -> u64 {
    100
}

const fn default_yield_ms() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_snapshot_path() -> String {
    "hamlet-snapshot.json".to_owned()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_time_skip: default_max_time_skip(),
            decision_timeout_ms: default_decision_timeout_ms(),
            default_action_minutes: default_action_minutes(),
            timeout_wait_minutes: default_timeout_wait_minutes(),
            decision_failure_limit: default_decision_failure_limit(),
            failure_backoff_minutes: default_failure_backoff_minutes(),
            initial_day: default_initial_day(),
            initial_hour: default_initial_hour(),
            initial_minute: 0,
            max_minutes: 0,
            idle_poll_ms: default_idle_poll_ms(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            yield_ms: default_yield_ms(),
            max_minutes: 0,
            initial_day: default_initial_day(),
            initial_hour: default_initial_hour(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
