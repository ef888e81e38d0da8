//! Scheduled events: personal, collective and emergency.
//!
//! A [`ScheduledEvent`] is a unit of work pinned to a point on the logical
//! clock. Events are created `Pending` by one of the constructors below and
//! handed to an event queue, which assigns the [`EventId`]. The constructors
//! carry the default duration and priority for each kind.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use ts_rs::TS;

use crate::enums::{EventKind, EventPriority, EventStatus};
use crate::ids::{AgentId, EventId, LocationId};

/// Default sleep length in minutes (8 hours).
pub const DEFAULT_SLEEP_MINUTES: u64 = 480;

/// Default phone session length in minutes.
pub const DEFAULT_PHONE_MINUTES: u64 = 30;

/// Default length of an offline or group chat in minutes.
pub const DEFAULT_CHAT_MINUTES: u64 = 30;

/// Default length of a private online chat in minutes.
pub const DEFAULT_PRIVATE_CHAT_MINUTES: u64 = 15;

/// Default number of turns in a conversation.
pub const DEFAULT_MAX_CHAT_TURNS: u32 = 10;

/// Fatigue level under which the warning suggests resting instead of
/// slowing down.
const FATIGUE_REST_THRESHOLD: u32 = 20;

/// An event scheduled on the logical clock for one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScheduledEvent {
    /// Sequence id assigned by the queue. `None` until the event is queued.
    pub id: Option<EventId>,
    /// What the event is. Selects the handler.
    pub kind: EventKind,
    /// The agent performing (or initiating) the event.
    pub actor_id: AgentId,
    /// Start time in minutes since the start of day 1.
    pub scheduled_time: u64,
    /// Length in minutes. Zero for instantaneous events.
    pub duration: u64,
    /// Urgency. Breaks ties between events at the same time.
    pub priority: EventPriority,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Other agents taking part in a collective event.
    #[serde(default)]
    pub participants: Vec<AgentId>,
    /// Whether an emergency event may interrupt the actor's current action.
    #[serde(default)]
    pub can_interrupt: bool,
    /// Opaque kind-specific data.
    #[serde(default)]
    pub payload: Value,
    /// Error captured when the event failed.
    #[serde(default)]
    pub failure: Option<String>,
}

impl ScheduledEvent {
    /// Create a pending event with an empty payload.
    pub fn new(kind: EventKind, actor_id: AgentId, scheduled_time: u64, duration: u64) -> Self {
        Self {
            id: None,
            kind,
            actor_id,
            scheduled_time,
            duration,
            priority: EventPriority::Normal,
            status: EventStatus::Pending,
            participants: Vec::new(),
            can_interrupt: false,
            payload: Value::Null,
            failure: None,
        }
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the participants of a collective event.
    #[must_use]
    pub fn with_participants(mut self, participants: Vec<AgentId>) -> Self {
        self.participants = participants;
        self
    }

    /// End of the half-open interval `[scheduled_time, end_time)`.
    pub const fn end_time(&self) -> u64 {
        self.scheduled_time.saturating_add(self.duration)
    }

    /// Whether the two events occupy overlapping time.
    ///
    /// Intervals are half-open, so `[10, 40)` and `[40, 70)` do not overlap.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.scheduled_time < other.end_time() && other.scheduled_time < self.end_time()
    }

    /// Whether the event is still waiting to run.
    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }

    // -----------------------------------------------------------------------
    // Personal events
    // -----------------------------------------------------------------------

    /// Work shift of the given type.
    pub fn work(actor_id: AgentId, at: u64, duration: u64, work_type: &str) -> Self {
        Self::new(EventKind::Work, actor_id, at, duration)
            .with_payload(json!({ "work_type": work_type }))
    }

    /// Wait in place.
    pub fn wait(actor_id: AgentId, at: u64, duration: u64) -> Self {
        Self::new(EventKind::Wait, actor_id, at, duration)
    }

    /// Sleep. Flags that the day should be summarized.
    pub fn sleep(actor_id: AgentId, at: u64, duration: u64) -> Self {
        Self::new(EventKind::Sleep, actor_id, at, duration)
            .with_priority(EventPriority::High)
            .with_payload(json!({ "need_summary": true }))
    }

    /// Take a photo. Always five minutes.
    pub fn take_photo(actor_id: AgentId, at: u64, is_selfie: bool, direction: &str) -> Self {
        Self::new(EventKind::TakePhoto, actor_id, at, 5)
            .with_payload(json!({ "is_selfie": is_selfie, "direction": direction }))
    }

    /// Publish a post. Always three minutes.
    pub fn post_content(actor_id: AgentId, at: u64, content: &str) -> Self {
        Self::new(EventKind::PostContent, actor_id, at, 3)
            .with_payload(json!({ "content": content }))
    }

    /// Look at the phone. Low priority.
    pub fn use_phone(actor_id: AgentId, at: u64, duration: u64, activities: &[&str]) -> Self {
        let activities: Vec<&str> = if activities.is_empty() {
            vec!["browse_posts"]
        } else {
            activities.to_vec()
        };
        Self::new(EventKind::UsePhone, actor_id, at, duration)
            .with_priority(EventPriority::Low)
            .with_payload(json!({ "activities": activities, "posts_viewed": 0 }))
    }

    /// Walk to a point, optionally a known location.
    ///
    /// Duration is supplied by the caller, typically from the world's
    /// travel-time estimate.
    pub fn move_to(
        actor_id: AgentId,
        at: u64,
        duration: u64,
        target: (f64, f64),
        location_id: Option<LocationId>,
    ) -> Self {
        Self::new(EventKind::Move, actor_id, at, duration).with_payload(json!({
            "x": target.0,
            "y": target.1,
            "location_id": location_id,
        }))
    }

    // -----------------------------------------------------------------------
    // Collective events
    // -----------------------------------------------------------------------

    /// Face-to-face conversation at a location.
    pub fn offline_chat(
        initiator: AgentId,
        participants: Vec<AgentId>,
        at: u64,
        duration: u64,
        location_id: Option<LocationId>,
    ) -> Self {
        Self::new(EventKind::OfflineChat, initiator, at, duration)
            .with_participants(participants)
            .with_payload(json!({
                "location_id": location_id,
                "max_turns": DEFAULT_MAX_CHAT_TURNS,
                "chat_history": [],
            }))
    }

    /// Private chat with one other agent.
    pub fn online_private_chat(sender: AgentId, receiver: AgentId, at: u64, duration: u64) -> Self {
        Self::new(EventKind::OnlinePrivateChat, sender, at, duration)
            .with_participants(vec![receiver])
            .with_payload(json!({ "max_turns": DEFAULT_MAX_CHAT_TURNS, "chat_history": [] }))
    }

    /// Group chat in a named group.
    pub fn online_group_chat(
        initiator: AgentId,
        group_id: u64,
        participants: Vec<AgentId>,
        at: u64,
        duration: u64,
    ) -> Self {
        Self::new(EventKind::OnlineGroupChat, initiator, at, duration)
            .with_participants(participants)
            .with_payload(json!({
                "group_id": group_id,
                "max_turns": DEFAULT_MAX_CHAT_TURNS,
                "chat_history": [],
            }))
    }

    // -----------------------------------------------------------------------
    // Emergency events
    // -----------------------------------------------------------------------

    /// Two agents meet at a location. One minute, may interrupt.
    pub fn encounter(actor_id: AgentId, other: AgentId, at: u64, location_id: LocationId) -> Self {
        let mut event = Self::new(EventKind::Encounter, actor_id, at, 1)
            .with_priority(EventPriority::Emergency)
            .with_participants(vec![other])
            .with_payload(json!({
                "other_agent_id": other,
                "location_id": location_id,
                "interaction_chosen": false,
            }));
        event.can_interrupt = true;
        event
    }

    /// Fatigue reminder. Instantaneous and never interrupts.
    pub fn fatigue_warning(actor_id: AgentId, at: u64, fatigue_level: u32) -> Self {
        let suggested = if fatigue_level < FATIGUE_REST_THRESHOLD {
            "rest"
        } else {
            "slow_down"
        };
        Self::new(EventKind::FatigueWarning, actor_id, at, 0)
            .with_priority(EventPriority::High)
            .with_payload(json!({
                "fatigue_level": fatigue_level,
                "suggested_action": suggested,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_open_intervals() {
        let actor = AgentId::new(1);
        let a = ScheduledEvent::wait(actor, 10, 30);
        let b = ScheduledEvent::wait(actor, 30, 30);
        let c = ScheduledEvent::wait(actor, 40, 30);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
        assert_eq!(a.end_time(), 40);
    }

    #[test]
    fn constructors_carry_defaults() {
        let actor = AgentId::new(1);
        let sleep = ScheduledEvent::sleep(actor, 0, DEFAULT_SLEEP_MINUTES);
        assert_eq!(sleep.priority, EventPriority::High);
        assert_eq!(sleep.duration, 480);

        let encounter = ScheduledEvent::encounter(actor, AgentId::new(2), 5, LocationId::new(9));
        assert!(encounter.can_interrupt);
        assert_eq!(encounter.priority, EventPriority::Emergency);
        assert_eq!(encounter.participants, vec![AgentId::new(2)]);

        let warning = ScheduledEvent::fatigue_warning(actor, 0, 10);
        assert_eq!(warning.payload["suggested_action"], "rest");
        assert!(!warning.can_interrupt);

        let phone = ScheduledEvent::use_phone(actor, 0, DEFAULT_PHONE_MINUTES, &[]);
        assert_eq!(phone.payload["activities"][0], "browse_posts");
        assert_eq!(phone.priority, EventPriority::Low);
    }

    #[test]
    fn new_events_are_pending_and_unqueued() {
        let event = ScheduledEvent::post_content(AgentId::new(3), 100, "hello");
        assert!(event.is_pending());
        assert!(event.id.is_none());
        assert_eq!(event.duration, 3);
    }
}
