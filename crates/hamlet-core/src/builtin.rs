//! Built-in handlers for every [`EventKind`].
//!
//! Personal and collective activities succeed and leave a short summary in
//! the payload. Movement and encounters go through the [`World`]. Emergency
//! notices record what the actor should do about them.
//!
//! [`World`]: hamlet_world::World

use hamlet_types::{EventKind, LocationId, ScheduledEvent};
use serde_json::{Map, Value};

use crate::handler::{EventContext, EventHandler, HandlerError, HandlerRegistry};

/// Key under which handlers record what happened.
pub const SUMMARY_KEY: &str = "summary";

/// Insert a key into an event payload, turning a non-object payload into an
/// object first.
fn record(payload: &mut Value, key: &str, value: Value) {
    if !payload.is_object() {
        *payload = Value::Object(Map::new());
    }
    if let Value::Object(map) = payload {
        map.insert(key.to_owned(), value);
    }
}

/// Activity that only needs bookkeeping: wait, sleep, work, phone, photo.
#[derive(Debug, Clone, Copy)]
pub struct ActivityHandler {
    verb: &'static str,
}

impl ActivityHandler {
    /// Handler that records `"<verb> for N minutes"`.
    pub const fn new(verb: &'static str) -> Self {
        Self { verb }
    }
}

impl EventHandler for ActivityHandler {
    fn handle(
        &self,
        event: &mut ScheduledEvent,
        _ctx: &mut EventContext<'_>,
    ) -> Result<(), HandlerError> {
        let summary = format!("{} for {} minutes", self.verb, event.duration);
        record(&mut event.payload, SUMMARY_KEY, Value::String(summary));
        Ok(())
    }
}

/// Publishes a post. Rejects empty content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostHandler;

impl EventHandler for PostHandler {
    fn handle(
        &self,
        event: &mut ScheduledEvent,
        _ctx: &mut EventContext<'_>,
    ) -> Result<(), HandlerError> {
        let content = event
            .payload
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_owned();
        if content.is_empty() {
            return Err(HandlerError::rejected(event.kind, "post has no content"));
        }
        record(
            &mut event.payload,
            SUMMARY_KEY,
            Value::String(format!("posted {} characters", content.chars().count())),
        );
        Ok(())
    }
}

/// Conversation between the actor and its participants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatHandler;

impl EventHandler for ChatHandler {
    fn handle(
        &self,
        event: &mut ScheduledEvent,
        _ctx: &mut EventContext<'_>,
    ) -> Result<(), HandlerError> {
        if event.participants.is_empty() {
            return Err(HandlerError::rejected(event.kind, "chat without participants"));
        }
        if event.participants.contains(&event.actor_id) {
            return Err(HandlerError::rejected(event.kind, "actor cannot chat with itself"));
        }
        let summary = format!(
            "chatted with {} agent(s) for {} minutes",
            event.participants.len(),
            event.duration
        );
        record(&mut event.payload, SUMMARY_KEY, Value::String(summary));
        Ok(())
    }
}

/// Relocates the actor to `location_id`, or to `x`/`y` when no location is
/// given.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveHandler;

impl EventHandler for MoveHandler {
    fn handle(
        &self,
        event: &mut ScheduledEvent,
        ctx: &mut EventContext<'_>,
    ) -> Result<(), HandlerError> {
        let location = event.payload.get("location_id").and_then(Value::as_u64);
        if let Some(raw) = location {
            let id = LocationId::new(raw);
            ctx.world
                .move_agent_to_location(event.actor_id, id, ctx.clock.hour())?;
        } else {
            let x = event.payload.get("x").and_then(Value::as_f64);
            let y = event.payload.get("y").and_then(Value::as_f64);
            let (Some(x), Some(y)) = (x, y) else {
                return Err(HandlerError::payload(
                    "move needs either location_id or x and y",
                ));
            };
            ctx.world.move_agent_to_point(event.actor_id, x, y)?;
        }

        let arrived = ctx
            .world
            .position(event.actor_id)
            .and_then(|pos| pos.location_id);
        record(
            &mut event.payload,
            "arrived_at",
            arrived.map_or(Value::Null, |id| Value::from(id.into_inner())),
        );
        Ok(())
    }
}

/// Two agents running into each other. Both must be within the world's
/// encounter radius at execution time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncounterHandler;

impl EventHandler for EncounterHandler {
    fn handle(
        &self,
        event: &mut ScheduledEvent,
        ctx: &mut EventContext<'_>,
    ) -> Result<(), HandlerError> {
        let Some(other) = event.participants.first().copied() else {
            return Err(HandlerError::payload("encounter without another agent"));
        };
        if !ctx.world.within_encounter_radius(event.actor_id, other) {
            return Err(HandlerError::rejected(
                event.kind,
                format!("agent {other} is out of range"),
            ));
        }
        record(&mut event.payload, "met", Value::Bool(true));
        Ok(())
    }
}

/// Fatigue notice. Records the suggested action as acknowledged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FatigueWarningHandler;

impl EventHandler for FatigueWarningHandler {
    fn handle(
        &self,
        event: &mut ScheduledEvent,
        _ctx: &mut EventContext<'_>,
    ) -> Result<(), HandlerError> {
        let suggested = event
            .payload
            .get("suggested_action")
            .and_then(Value::as_str)
            .unwrap_or("rest")
            .to_owned();
        record(&mut event.payload, "acknowledged_action", Value::String(suggested));
        Ok(())
    }
}

/// Something seen or heard. Records which agents were close enough to
/// notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptionHandler;

impl EventHandler for PerceptionHandler {
    fn handle(
        &self,
        event: &mut ScheduledEvent,
        ctx: &mut EventContext<'_>,
    ) -> Result<(), HandlerError> {
        let radius = ctx.world.settings().nearby_radius;
        let witnesses: Vec<Value> = ctx
            .world
            .check_encounter(event.actor_id, radius)
            .into_iter()
            .map(|id| Value::from(id.into_inner()))
            .collect();
        record(&mut event.payload, "noticed_by", Value::Array(witnesses));
        Ok(())
    }
}

impl HandlerRegistry {
    /// Registry with a handler for every event kind.
    pub fn with_builtin_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(EventKind::Wait, ActivityHandler::new("waited"));
        registry.register(EventKind::Sleep, ActivityHandler::new("slept"));
        registry.register(EventKind::Work, ActivityHandler::new("worked"));
        registry.register(EventKind::UsePhone, ActivityHandler::new("used the phone"));
        registry.register(EventKind::TakePhoto, ActivityHandler::new("took a photo"));
        registry.register(EventKind::PostContent, PostHandler);
        registry.register(EventKind::Move, MoveHandler);
        registry.register(EventKind::OfflineChat, ChatHandler);
        registry.register(EventKind::OnlineGroupChat, ChatHandler);
        registry.register(EventKind::OnlinePrivateChat, ChatHandler);
        registry.register(EventKind::Encounter, EncounterHandler);
        registry.register(EventKind::FatigueWarning, FatigueWarningHandler);
        registry.register(EventKind::VisualEvent, PerceptionHandler);
        registry.register(EventKind::AudioEvent, PerceptionHandler);
        registry
    }
}
