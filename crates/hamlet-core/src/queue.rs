//! Priority-ordered event queue with lazy cancellation.
//!
//! Events are ordered by `(scheduled_time, priority, id)`. The id is a
//! strictly increasing sequence number assigned at insertion, so events
//! with the same time and priority pop in insertion order and the order is
//! identical across runs.
//!
//! Cancellation is lazy: a cancelled event stays in the heap and is
//! discarded the next time it reaches the top. [`EventQueue::peek`] and
//! [`EventQueue::pop`] never return a cancelled event.
//!
//! # Conflicts
//!
//! Two events conflict when they belong to the same actor and their
//! half-open intervals `[scheduled_time, end_time)` overlap. Touching
//! endpoints do not conflict.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use hamlet_types::{AgentId, EventId, EventStatus, ScheduledEvent};
use tracing::debug;

/// Heap key. Field order gives the pop order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    time: u64,
    priority: u8,
    id: EventId,
}

impl QueueKey {
    const fn of(event: &ScheduledEvent, id: EventId) -> Self {
        Self {
            time: event.scheduled_time,
            priority: event.priority.value(),
            id,
        }
    }
}

/// Sort key for listing events.
const fn listing_key(event: &ScheduledEvent) -> (u64, u8, u64) {
    let id = match event.id {
        Some(id) => id.into_inner(),
        None => 0,
    };
    (event.scheduled_time, event.priority.value(), id)
}

/// Min-heap of scheduled events keyed by `(time, priority, id)`.
#[derive(Debug, Clone)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueueKey>>,
    /// Pending events, plus cancelled ones not yet discarded from the heap.
    events: BTreeMap<EventId, ScheduledEvent>,
    cancelled: BTreeSet<EventId>,
    next_id: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Empty queue. The first assigned id is 1.
    pub const fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            events: BTreeMap::new(),
            cancelled: BTreeSet::new(),
            next_id: 1,
        }
    }

    /// Insert an event. Assigns a fresh id and resets the status to
    /// `Pending`, whatever the event carried before.
    pub fn add(&mut self, mut event: ScheduledEvent) -> EventId {
        let id = EventId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        event.id = Some(id);
        event.status = EventStatus::Pending;
        self.insert(id, event);
        id
    }

    /// Insert an event keeping the id it already carries, as when restoring
    /// a snapshot. Later ids continue above it. Falls back to [`add`] when
    /// the event has no id or the id is taken.
    ///
    /// [`add`]: Self::add
    pub fn restore(&mut self, mut event: ScheduledEvent) -> EventId {
        match event.id {
            Some(id) if !self.events.contains_key(&id) && id.into_inner() > 0 => {
                self.next_id = self.next_id.max(id.into_inner().saturating_add(1));
                event.status = EventStatus::Pending;
                self.insert(id, event);
                id
            }
            _ => self.add(event),
        }
    }

    fn insert(&mut self, id: EventId, event: ScheduledEvent) {
        self.heap.push(Reverse(QueueKey::of(&event, id)));
        self.events.insert(id, event);
    }

    /// Cancel a pending event. Returns `true` only if the event existed and
    /// was still pending.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let Some(event) = self.events.get_mut(&id) else {
            return false;
        };
        if event.status != EventStatus::Pending {
            return false;
        }
        event.status = EventStatus::Cancelled;
        self.cancelled.insert(id);
        debug!(event_id = %id, "Event cancelled");
        true
    }

    /// Discard stale entries from the top of the heap: cancelled events and
    /// entries whose event has been retired by a reschedule.
    fn discard_stale(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek().copied() {
            let live = self.events.contains_key(&top.id) && !self.cancelled.contains(&top.id);
            if live {
                break;
            }
            self.heap.pop();
            if self.cancelled.remove(&top.id) {
                self.events.remove(&top.id);
            }
        }
    }

    /// Earliest pending event, without removing it.
    pub fn peek(&mut self) -> Option<&ScheduledEvent> {
        self.discard_stale();
        let Reverse(top) = self.heap.peek()?;
        self.events.get(&top.id)
    }

    /// Remove and return the earliest pending event.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.discard_stale();
        let Reverse(top) = self.heap.pop()?;
        self.events.remove(&top.id)
    }

    /// Scheduled time of the earliest pending event.
    pub fn next_time(&mut self) -> Option<u64> {
        self.peek().map(|event| event.scheduled_time)
    }

    /// Look up a pending event by id.
    pub fn get(&self, id: EventId) -> Option<&ScheduledEvent> {
        self.events.get(&id).filter(|event| event.is_pending())
    }

    fn pending(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.events.values().filter(|event| event.is_pending())
    }

    fn sorted(mut events: Vec<&ScheduledEvent>) -> Vec<&ScheduledEvent> {
        events.sort_by_key(|event| listing_key(event));
        events
    }

    /// Pending events of the same actor whose interval overlaps the
    /// candidate's. The candidate itself is never reported.
    pub fn check_conflict(&self, candidate: &ScheduledEvent) -> Vec<&ScheduledEvent> {
        let conflicts = self
            .pending()
            .filter(|event| event.actor_id == candidate.actor_id)
            .filter(|event| event.id != candidate.id)
            .filter(|event| event.overlaps(candidate))
            .collect();
        Self::sorted(conflicts)
    }

    /// Whether the event could be added without a conflict.
    pub fn can_schedule(&self, event: &ScheduledEvent) -> bool {
        self.check_conflict(event).is_empty()
    }

    /// Pending events of one actor, optionally restricted to
    /// `start <= scheduled_time < end`, sorted by `(time, priority, id)`.
    pub fn get_character_events(
        &self,
        actor: AgentId,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Vec<&ScheduledEvent> {
        let events = self
            .pending()
            .filter(|event| event.actor_id == actor)
            .filter(|event| start.is_none_or(|s| event.scheduled_time >= s))
            .filter(|event| end.is_none_or(|e| event.scheduled_time < e))
            .collect();
        Self::sorted(events)
    }

    /// Pending events with `start <= scheduled_time < end`, sorted.
    pub fn events_in_range(&self, start: u64, end: u64) -> Vec<&ScheduledEvent> {
        let events = self
            .pending()
            .filter(|event| start <= event.scheduled_time && event.scheduled_time < end)
            .collect();
        Self::sorted(events)
    }

    /// Up to `count` pending events at or after `from`, in pop order.
    pub fn next_events(&self, from: u64, count: usize) -> Vec<&ScheduledEvent> {
        let mut events = self.events_in_range(from, u64::MAX);
        events.truncate(count);
        events
    }

    /// Move a pending event to a new time.
    ///
    /// On a conflict at the new time the event is left untouched and `None`
    /// is returned. On success the old id is retired and the event is
    /// re-inserted under a fresh id, which is returned.
    pub fn reschedule(&mut self, id: EventId, new_time: u64) -> Option<EventId> {
        let event = self.get(id)?;
        let mut moved = event.clone();
        moved.scheduled_time = new_time;
        if !self.can_schedule(&moved) {
            debug!(event_id = %id, new_time, "Reschedule refused: conflict");
            return None;
        }
        self.events.remove(&id);
        let new_id = self.add(moved);
        debug!(old_id = %id, new_id = %new_id, new_time, "Event rescheduled");
        Some(new_id)
    }

    /// All pending events, sorted by `(time, priority, id)`.
    pub fn to_vec(&self) -> Vec<ScheduledEvent> {
        Self::sorted(self.pending().collect())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of pending, non-cancelled events.
    pub fn len(&self) -> usize {
        self.events.len().saturating_sub(self.cancelled.len())
    }

    /// Whether no pending event remains.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every event. Ids are never reused, so the sequence continues.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.events.clear();
        self.cancelled.clear();
    }

    /// Id the next inserted event will receive.
    pub const fn next_id(&self) -> EventId {
        EventId::new(self.next_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hamlet_types::EventPriority;

    use super::*;

    fn wait(actor: u64, at: u64, duration: u64) -> ScheduledEvent {
        ScheduledEvent::wait(AgentId::new(actor), at, duration)
    }

    #[test]
    fn pops_by_time_then_priority() {
        let mut queue = EventQueue::new();
        let a = queue.add(wait(1, 100, 10));
        let b = queue.add(wait(2, 50, 10).with_priority(EventPriority::High));
        let c = queue.add(wait(3, 50, 10));

        assert_eq!(queue.pop().unwrap().id, Some(b));
        assert_eq!(queue.pop().unwrap().id, Some(c));
        assert_eq!(queue.pop().unwrap().id, Some(a));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn exact_ties_pop_in_insertion_order() {
        let mut queue = EventQueue::new();
        let ids: Vec<EventId> = (0..5).map(|n| queue.add(wait(n, 10, 1))).collect();
        let popped: Vec<EventId> = std::iter::from_fn(|| queue.pop()).filter_map(|e| e.id).collect();
        assert_eq!(popped, ids);
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut queue = EventQueue::new();
        assert_eq!(queue.add(wait(1, 0, 1)), EventId::new(1));
        assert_eq!(queue.add(wait(1, 5, 1)), EventId::new(2));
        queue.clear();
        assert_eq!(queue.add(wait(1, 0, 1)), EventId::new(3));
    }

    #[test]
    fn cancel_then_peek_is_empty() {
        let mut queue = EventQueue::new();
        let id = queue.add(wait(1, 10, 5));
        assert!(queue.cancel(id));
        assert!(queue.peek().is_none());
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_only_succeeds_once() {
        let mut queue = EventQueue::new();
        let id = queue.add(wait(1, 10, 5));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(!queue.cancel(EventId::new(99)));
    }

    #[test]
    fn cancelled_event_is_skipped() {
        let mut queue = EventQueue::new();
        let first = queue.add(wait(1, 10, 5));
        let second = queue.add(wait(2, 20, 5));
        queue.cancel(first);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek().and_then(|e| e.id), Some(second));
        assert_eq!(queue.pop().and_then(|e| e.id), Some(second));
    }

    #[test]
    fn half_open_conflicts() {
        let mut queue = EventQueue::new();
        queue.add(wait(1, 10, 30));

        assert_eq!(queue.check_conflict(&wait(1, 30, 30)).len(), 1);
        assert!(queue.check_conflict(&wait(1, 40, 30)).is_empty());
        assert!(queue.check_conflict(&wait(2, 30, 30)).is_empty());
        assert!(queue.can_schedule(&wait(1, 0, 10)));
    }

    #[test]
    fn cancelled_events_do_not_conflict() {
        let mut queue = EventQueue::new();
        let id = queue.add(wait(1, 10, 30));
        queue.cancel(id);
        assert!(queue.can_schedule(&wait(1, 20, 5)));
    }

    #[test]
    fn character_events_are_filtered_and_sorted() {
        let mut queue = EventQueue::new();
        queue.add(wait(1, 300, 10));
        queue.add(wait(1, 100, 10));
        queue.add(wait(2, 150, 10));
        queue.add(wait(1, 200, 10));

        let times: Vec<u64> = queue
            .get_character_events(AgentId::new(1), None, None)
            .iter()
            .map(|e| e.scheduled_time)
            .collect();
        assert_eq!(times, vec![100, 200, 300]);

        let windowed = queue.get_character_events(AgentId::new(1), Some(150), Some(300));
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed.first().map(|e| e.scheduled_time), Some(200));
    }

    #[test]
    fn reschedule_moves_event_under_new_id() {
        let mut queue = EventQueue::new();
        let id = queue.add(wait(1, 10, 30));
        let new_id = queue.reschedule(id, 100).unwrap();
        assert_ne!(id, new_id);
        assert!(queue.get(id).is_none());
        assert_eq!(queue.get(new_id).map(|e| e.scheduled_time), Some(100));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().and_then(|e| e.id), Some(new_id));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn reschedule_into_conflict_leaves_original() {
        let mut queue = EventQueue::new();
        let keep = queue.add(wait(1, 10, 30));
        queue.add(wait(1, 100, 30));

        assert!(queue.reschedule(keep, 90).is_none());
        let original = queue.get(keep).unwrap();
        assert_eq!(original.scheduled_time, 10);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn reschedule_does_not_conflict_with_itself() {
        let mut queue = EventQueue::new();
        let id = queue.add(wait(1, 10, 30));
        assert!(queue.reschedule(id, 20).is_some());
    }

    #[test]
    fn range_and_next_events() {
        let mut queue = EventQueue::new();
        for t in [10, 20, 30, 40] {
            queue.add(wait(t, t, 1));
        }
        let in_range: Vec<u64> = queue
            .events_in_range(20, 40)
            .iter()
            .map(|e| e.scheduled_time)
            .collect();
        assert_eq!(in_range, vec![20, 30]);

        let next: Vec<u64> = queue.next_events(15, 2).iter().map(|e| e.scheduled_time).collect();
        assert_eq!(next, vec![20, 30]);
        assert_eq!(queue.to_vec().len(), 4);
    }

    #[test]
    fn restore_keeps_ids_and_advances_sequence() {
        let mut queue = EventQueue::new();
        let mut event = wait(1, 10, 5);
        event.id = Some(EventId::new(41));
        assert_eq!(queue.restore(event), EventId::new(41));
        assert_eq!(queue.next_id(), EventId::new(42));
        assert_eq!(queue.add(wait(1, 20, 5)), EventId::new(42));
    }
}
