//! Event handlers and the kind-to-handler registry.
//!
//! Every [`EventKind`] maps to at most one [`EventHandler`]. Executing an
//! event runs, in order: `on_start`, the kind's before hooks, `handle`,
//! then `on_complete` or `on_fail`, then the kind's after hooks with the
//! success flag. Errors never escape [`HandlerRegistry::execute`]; they end
//! up as a `Failed` status with the error text in
//! [`ScheduledEvent::failure`]. A panic in `handle` or in a hook is caught
//! and treated the same way.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use hamlet_types::{EventKind, EventStatus, ScheduledEvent};
use hamlet_world::{World, WorldError};
use tracing::{debug, warn};

use crate::clock::Clock;

/// Errors raised while executing an event.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// No handler is registered for the event's kind.
    #[error("no handler registered for {0:?}")]
    NoHandler(EventKind),

    /// The handler declined the event.
    #[error("{kind:?} rejected: {reason}")]
    Rejected {
        /// Kind of the rejected event.
        kind: EventKind,
        /// Why.
        reason: String,
    },

    /// The payload is missing a field or has the wrong shape.
    #[error("invalid payload: {message}")]
    Payload {
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

    /// A before or after hook failed.
    #[error("hook failed: {message}")]
    Hook {
        /// What went wrong.
        message: String,
    },

    /// The handler or a hook panicked.
    #[error("panicked: {message}")]
    Panicked {
        /// The panic message, if it was a string.
        message: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Rejected`].
    pub fn rejected(kind: EventKind, reason: impl Into<String>) -> Self {
        Self::Rejected {
            kind,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`HandlerError::Payload`].
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }

    /// Shorthand for [`HandlerError::Hook`].
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook {
            message: message.into(),
        }
    }
}

/// What a handler sees while executing an event.
#[derive(Debug)]
pub struct EventContext<'a> {
    /// Clock at execution time.
    pub clock: Clock,
    /// Shared world state.
    pub world: &'a mut World,
    /// Events the handler wants scheduled next. The driver adds them after
    /// execution, subject to conflict checks.
    pub follow_ups: Vec<ScheduledEvent>,
}

impl<'a> EventContext<'a> {
    /// Context with no follow-ups.
    pub const fn new(clock: Clock, world: &'a mut World) -> Self {
        Self {
            clock,
            world,
            follow_ups: Vec::new(),
        }
    }

    /// Ask the driver to schedule another event.
    pub fn schedule(&mut self, event: ScheduledEvent) {
        self.follow_ups.push(event);
    }
}

/// Executes one kind of event.
pub trait EventHandler: Send + Sync {
    /// Do the work. An `Err` fails the event.
    fn handle(
        &self,
        event: &mut ScheduledEvent,
        ctx: &mut EventContext<'_>,
    ) -> Result<(), HandlerError>;

    /// Called before the hooks and `handle`.
    fn on_start(&self, event: &mut ScheduledEvent, _ctx: &EventContext<'_>) {
        event.status = EventStatus::InProgress;
    }

    /// Called when `handle` succeeded.
    fn on_complete(&self, event: &mut ScheduledEvent, _ctx: &EventContext<'_>) {
        event.status = EventStatus::Completed;
    }

    /// Called when a before hook or `handle` failed.
    fn on_fail(&self, event: &mut ScheduledEvent, _ctx: &EventContext<'_>, error: &HandlerError) {
        event.status = EventStatus::Failed;
        event.failure = Some(error.to_string());
    }
}

/// Hook run before `handle`. An error fails the event without calling the
/// handler.
pub type BeforeHook =
    Box<dyn Fn(&ScheduledEvent, &EventContext<'_>) -> Result<(), HandlerError> + Send + Sync>;

/// Hook run after the handler, receiving the success flag.
pub type AfterHook =
    Box<dyn Fn(&ScheduledEvent, &EventContext<'_>, bool) -> Result<(), HandlerError> + Send + Sync>;

/// Kind-to-handler map plus ordered hook lists per kind.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<EventKind, Box<dyn EventHandler>>,
    before_hooks: BTreeMap<EventKind, Vec<BeforeHook>>,
    after_hooks: BTreeMap<EventKind, Vec<AfterHook>>,
}

impl HandlerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing and returning any previous one.
    pub fn register<H>(&mut self, kind: EventKind, handler: H) -> Option<Box<dyn EventHandler>>
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(kind, Box::new(handler))
    }

    /// Remove the handler for a kind. Returns `true` if one was registered.
    pub fn unregister(&mut self, kind: EventKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    /// Whether a handler is registered for a kind.
    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Append a before hook for a kind.
    pub fn add_before_hook<F>(&mut self, kind: EventKind, hook: F)
    where
        F: Fn(&ScheduledEvent, &EventContext<'_>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.before_hooks.entry(kind).or_default().push(Box::new(hook));
    }

    /// Append an after hook for a kind.
    pub fn add_after_hook<F>(&mut self, kind: EventKind, hook: F)
    where
        F: Fn(&ScheduledEvent, &EventContext<'_>, bool) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.after_hooks.entry(kind).or_default().push(Box::new(hook));
    }

    /// Execute an event. Returns whether it completed.
    ///
    /// A missing handler fails the event. A failing before hook fails the
    /// event and skips the handler, but after hooks still run with
    /// `success = false`. A failing after hook marks the event `Failed`.
    pub fn execute(&self, event: &mut ScheduledEvent, ctx: &mut EventContext<'_>) -> bool {
        let Some(handler) = self.handlers.get(&event.kind) else {
            let error = HandlerError::NoHandler(event.kind);
            warn!(kind = ?event.kind, actor = %event.actor_id, "No handler registered");
            event.status = EventStatus::Failed;
            event.failure = Some(error.to_string());
            return false;
        };

        handler.on_start(event, ctx);

        let outcome = guarded(|| {
            self.run_before_hooks(event, ctx)?;
            handler.handle(event, ctx)
        });

        let mut success = match outcome {
            Ok(()) => {
                handler.on_complete(event, ctx);
                true
            }
            Err(error) => {
                warn!(
                    kind = ?event.kind,
                    actor = %event.actor_id,
                    error = %error,
                    "Event failed"
                );
                handler.on_fail(event, ctx, &error);
                false
            }
        };

        if let Some(hooks) = self.after_hooks.get(&event.kind) {
            let flag = success;
            for hook in hooks {
                if let Err(error) = guarded(|| hook(event, ctx, flag)) {
                    warn!(kind = ?event.kind, error = %error, "After hook failed");
                    event.status = EventStatus::Failed;
                    event.failure = Some(error.to_string());
                    success = false;
                }
            }
        }

        debug!(
            kind = ?event.kind,
            actor = %event.actor_id,
            status = ?event.status,
            "Event executed"
        );
        success
    }

    fn run_before_hooks(
        &self,
        event: &ScheduledEvent,
        ctx: &EventContext<'_>,
    ) -> Result<(), HandlerError> {
        if let Some(hooks) = self.before_hooks.get(&event.kind) {
            for hook in hooks {
                hook(event, ctx)?;
            }
        }
        Ok(())
    }
}

/// Run `f`, turning a panic into [`HandlerError::Panicked`].
///
/// The event and world may be left half-updated by the panicking code; the
/// event is marked `Failed` either way.
fn guarded<F>(f: F) -> Result<(), HandlerError>
where
    F: FnOnce() -> Result<(), HandlerError>,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(HandlerError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

impl core::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("before_hooks", &self.before_hooks.len())
            .field("after_hooks", &self.after_hooks.len())
            .finish()
    }
}
