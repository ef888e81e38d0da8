//! Hamlet binary.
//!
//! Wires the starting town, the demo residents and one of the two drivers
//! together, runs until a bound is hit or Ctrl-C is pressed, then writes a
//! JSON run record.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hamlet-config.yaml` (or the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the world and the starting town
//! 4. Build the configured driver and add the demo residents
//! 5. Install the Ctrl-C handler
//! 6. Run the driver
//! 7. Log the result and write the run record

mod error;
mod population;
mod scripted;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hamlet_core::config::DriverKind;
use hamlet_core::control::{RunControl, log_run_end};
use hamlet_core::handler::HandlerRegistry;
use hamlet_core::{Engine, HamletConfig, RunOutcome, Simulation};
use hamlet_world::{StartingTownIds, World, create_starting_town};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::error::EngineError;
use crate::population::{populate_engine, populate_simulation};
use crate::scripted::ScriptedDecisionProvider;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "hamlet-config.yaml";

/// What a finished driver hands back for the run record.
struct RunArtifacts {
    outcome: RunOutcome,
    state: Value,
    status: Value,
}

/// JSON document written to `run.snapshot_path` when a run ends.
#[derive(Debug, Serialize)]
struct RunRecord<'a> {
    run_id: Uuid,
    saved_at: DateTime<Utc>,
    driver: &'static str,
    outcome: &'a RunOutcome,
    state: &'a Value,
    status: &'a Value,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, world seeding or writing the run
/// record fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("hamlet-engine starting");
    match &source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        world_name = %config.world.name,
        seed = config.world.seed,
        driver = driver_name(config.run.driver),
        "Configuration resolved"
    );

    // 3. Build the world.
    let mut world = World::new(config.world.clone());
    let town = create_starting_town(&mut world).map_err(EngineError::from)?;
    info!(locations = world.summary().locations, "Starting town created");

    // 4-6. Build and run the configured driver.
    let run_id = Uuid::now_v7();
    info!(run_id = %run_id, "Run starting");
    let artifacts = match config.run.driver {
        DriverKind::Simulation => run_simulation(&config, world).await?,
        DriverKind::Engine => run_engine(&config, world, &town).await?,
    };

    // 7. Log results and persist the run record.
    log_run_end(driver_name(config.run.driver), &artifacts.outcome);
    write_run_record(&config, run_id, &artifacts)?;

    info!(
        run_id = %run_id,
        end_reason = ?artifacts.outcome.end_reason,
        "hamlet-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from the path given as the first argument, or from
/// `hamlet-config.yaml` in the working directory.
///
/// Returns the path actually read, if any.
fn load_config() -> Result<(HamletConfig, Option<PathBuf>), EngineError> {
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = HamletConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((HamletConfig::from_env(), None))
    }
}

const fn driver_name(kind: DriverKind) -> &'static str {
    match kind {
        DriverKind::Simulation => "simulation",
        DriverKind::Engine => "engine",
    }
}

/// Stop the run on the first Ctrl-C.
fn install_ctrl_c(control: Arc<RunControl>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping");
                control.stop();
            }
            Err(e) => warn!(error = %e, "Ctrl-C handler unavailable"),
        }
    });
}

async fn run_simulation(config: &HamletConfig, world: World) -> Result<RunArtifacts, EngineError> {
    let provider = Arc::new(ScriptedDecisionProvider::new(config.world.seed));
    let mut sim = Simulation::new(config.simulation.clone(), world, provider);
    populate_simulation(&mut sim)?;

    sim.on_action_start(|task| {
        info!(
            agent = %task.actor_id,
            action = %task.action_name,
            start = task.start_time,
            end = task.end_time,
            "Action started"
        );
        Ok(())
    });
    sim.on_action_end(|task| {
        info!(agent = %task.actor_id, action = %task.action_name, "Action finished");
        Ok(())
    });

    install_ctrl_c(sim.control());
    let outcome = sim.run().await;

    Ok(RunArtifacts {
        outcome,
        state: sim.snapshot()?,
        status: serde_json::to_value(sim.status())?,
    })
}

async fn run_engine(
    config: &HamletConfig,
    world: World,
    town: &StartingTownIds,
) -> Result<RunArtifacts, EngineError> {
    let mut engine = Engine::new(
        config.engine.clone(),
        world,
        HandlerRegistry::with_builtin_handlers(),
    );
    populate_engine(&mut engine, town)?;

    engine.on_event_complete(|event| {
        info!(
            agent = %event.actor_id,
            kind = ?event.kind,
            at = event.scheduled_time,
            "Event completed"
        );
        Ok(())
    });

    install_ctrl_c(engine.control());
    let outcome = engine.run().await;

    Ok(RunArtifacts {
        outcome,
        state: engine.snapshot()?,
        status: serde_json::to_value(engine.status())?,
    })
}

fn write_run_record(
    config: &HamletConfig,
    run_id: Uuid,
    artifacts: &RunArtifacts,
) -> Result<(), EngineError> {
    let record = RunRecord {
        run_id,
        saved_at: Utc::now(),
        driver: driver_name(config.run.driver),
        outcome: &artifacts.outcome,
        state: &artifacts.state,
        status: &artifacts.status,
    };
    let path = Path::new(&config.run.snapshot_path);
    std::fs::write(path, serde_json::to_string_pretty(&record)?)?;
    info!(path = %path.display(), "Run record written");
    Ok(())
}
