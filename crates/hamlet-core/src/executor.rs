//! Action side effects.
//!
//! When the simulation turns a [`Decision`](hamlet_types::Decision) into an
//! [`AgentTask`], it hands the task to an [`ActionExecutor`] so the action
//! can change the world (walking somewhere, entering a building). Executor
//! errors are logged by the simulation and the task is kept; the scheduler
//! state never depends on the executor succeeding.

use hamlet_types::{AgentId, LocationId};
use hamlet_world::{World, WorldError};
use serde_json::Value;

use crate::clock::Clock;
use crate::task::AgentTask;

/// Errors raised while applying an action's side effects.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The action payload is missing a field or has the wrong shape.
    #[error("action {action} has an invalid payload: {message}")]
    InvalidPayload {
        /// Action name.
        action: String,
        /// What is wrong with it.
        message: String,
    },

    /// A world operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}

/// Applies the side effects of an agent's action.
pub trait ActionExecutor: Send + Sync {
    /// Apply `task`'s effects to the world.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] if the effects could not be applied.
    fn execute(&self, task: &AgentTask, world: &mut World) -> Result<(), ActionError>;

    /// Duration to use when a decision omits one. `None` falls back to the
    /// configured default.
    fn estimate_minutes(
        &self,
        _agent_id: AgentId,
        _action: &str,
        _payload: &Value,
        _world: &World,
    ) -> Option<u64> {
        None
    }
}

/// Executor that does nothing. Every action succeeds without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

impl ActionExecutor for NoopExecutor {
    fn execute(&self, _task: &AgentTask, _world: &mut World) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Built-in executor. Handles movement; other actions have no world effect.
///
/// A `move` payload names either a `location_id` or an `x`/`y` point. The
/// agent arrives at the start of the task and spends the rest of it there.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldActionExecutor;

/// Where a move payload points.
#[derive(Debug, Clone, Copy)]
enum Target {
    Location(LocationId),
    Point(f64, f64),
}

impl WorldActionExecutor {
    fn target(payload: &Value) -> Option<Target> {
        if let Some(raw) = payload.get("location_id").and_then(Value::as_u64) {
            return Some(Target::Location(LocationId::new(raw)));
        }
        let x = payload.get("x").and_then(Value::as_f64)?;
        let y = payload.get("y").and_then(Value::as_f64)?;
        Some(Target::Point(x, y))
    }
}

impl ActionExecutor for WorldActionExecutor {
    fn execute(&self, task: &AgentTask, world: &mut World) -> Result<(), ActionError> {
        if !is_move(&task.action_name) {
            return Ok(());
        }
        let Some(target) = Self::target(&task.action_payload) else {
            return Err(ActionError::InvalidPayload {
                action: task.action_name.clone(),
                message: "expected location_id or x and y".to_owned(),
            });
        };
        match target {
            Target::Location(id) => {
                let hour = Clock::new(task.start_time).hour();
                world.move_agent_to_location(task.actor_id, id, hour)?;
            }
            Target::Point(x, y) => world.move_agent_to_point(task.actor_id, x, y)?,
        }
        Ok(())
    }

    fn estimate_minutes(
        &self,
        agent_id: AgentId,
        action: &str,
        payload: &Value,
        world: &World,
    ) -> Option<u64> {
        if !is_move(action) {
            return None;
        }
        let (x, y) = match Self::target(payload)? {
            // Unknown locations get no estimate; `execute` rejects them.
            Target::Location(id) => world.location(id)?.center(),
            Target::Point(x, y) => (x, y),
        };
        world.movement_minutes(agent_id, x, y)
    }
}

fn is_move(action: &str) -> bool {
    matches!(action, "move" | "move_to" | "walk")
}
