//! Clock, event scheduling and simulation drivers for Hamlet.
//!
//! Two drivers share the same building blocks:
//!
//! - [`engine::Engine`] pops scheduled events in `(time, priority, id)`
//!   order and ticks the clock minute by minute between them.
//! - [`simulation::Simulation`] asks a [`decision::DecisionProvider`] what
//!   each idle agent does next and jumps the clock to the next task
//!   completion.
//!
//! # Modules
//!
//! - [`clock`] -- Minute-granularity logical clock.
//! - [`config`] -- Configuration loading from `hamlet-config.yaml`.
//! - [`control`] -- Pause gate, stop flag and run outcome.
//! - [`queue`] -- Priority event queue with lazy cancellation and
//!   per-actor conflict detection.
//! - [`handler`] -- [`EventHandler`](handler::EventHandler) trait and the
//!   kind-to-handler registry with hooks.
//! - [`builtin`] -- Built-in handlers for every event kind.
//! - [`notify`] -- Error-isolated lifecycle notifications.
//! - [`decision`] -- Decision provider contract.
//! - [`executor`] -- Action side-effect contract and the world executor.
//! - [`task`] -- In-flight agent tasks and the completion heap.
//! - [`engine`] -- Tick-driven event engine.
//! - [`simulation`] -- Action-driven driver with time-skip.

pub mod builtin;
pub mod clock;
pub mod config;
pub mod control;
pub mod decision;
pub mod engine;
pub mod executor;
pub mod handler;
pub mod notify;
pub mod queue;
pub mod simulation;
pub mod task;

pub use clock::Clock;
pub use config::HamletConfig;
pub use control::{EndReason, RunControl, RunOutcome};
pub use engine::{Engine, ScheduleError};
pub use queue::EventQueue;
pub use simulation::{Simulation, StepReport};
