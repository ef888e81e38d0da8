//! Property tests for the event queue: cancelled events never leak under
//! any interleaving of add, cancel, peek, pop and reschedule, and pop order
//! follows `(scheduled_time, priority, insertion)`.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::{BTreeMap, BTreeSet};

use hamlet_core::EventQueue;
use hamlet_types::{AgentId, EventId, EventPriority, EventStatus, ScheduledEvent};
use proptest::prelude::*;

fn priority() -> impl Strategy<Value = EventPriority> {
    prop::sample::select(vec![
        EventPriority::Critical,
        EventPriority::Emergency,
        EventPriority::High,
        EventPriority::Normal,
        EventPriority::Low,
        EventPriority::Background,
    ])
}

/// `(actor, time, duration, priority, cancel)`
fn plan() -> impl Strategy<Value = Vec<(u64, u64, u64, EventPriority, bool)>> {
    prop::collection::vec(
        (0_u64..5, 0_u64..500, 0_u64..60, priority(), any::<bool>()),
        0..64,
    )
}

fn fill(queue: &mut EventQueue, plan: &[(u64, u64, u64, EventPriority, bool)]) -> BTreeSet<EventId> {
    let mut cancelled = BTreeSet::new();
    let mut ids = Vec::new();
    for (actor, time, duration, priority, _) in plan {
        let event =
            ScheduledEvent::wait(AgentId::new(*actor), *time, *duration).with_priority(*priority);
        ids.push(queue.add(event));
    }
    for (id, (.., cancel)) in ids.into_iter().zip(plan) {
        if *cancel {
            assert!(queue.cancel(id));
            assert!(!queue.cancel(id));
            cancelled.insert(id);
        }
    }
    cancelled
}

/// One step of an interleaved queue workload. Indices pick among every id
/// issued so far, live or not.
#[derive(Debug, Clone)]
enum Op {
    Add { actor: u64, time: u64, duration: u64, priority: EventPriority },
    Cancel(usize),
    Peek,
    Pop,
    Reschedule(usize, u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0_u64..4, 0_u64..300, 0_u64..40, priority()).prop_map(
            |(actor, time, duration, priority)| Op::Add { actor, time, duration, priority }
        ),
        2 => any::<usize>().prop_map(Op::Cancel),
        1 => Just(Op::Peek),
        2 => Just(Op::Pop),
        1 => (any::<usize>(), 0_u64..300).prop_map(|(pick, time)| Op::Reschedule(pick, time)),
    ]
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    actor: u64,
    time: u64,
    duration: u64,
    priority: EventPriority,
    live: bool,
}

/// Reference model: what the queue should hold after each step.
#[derive(Debug, Default)]
struct Model {
    entries: BTreeMap<EventId, Entry>,
    issued: Vec<EventId>,
    cancelled: BTreeSet<EventId>,
}

impl Model {
    fn insert(&mut self, id: EventId, entry: Entry) {
        self.entries.insert(id, entry);
        self.issued.push(id);
    }

    fn pick(&self, pick: usize) -> Option<EventId> {
        if self.issued.is_empty() {
            return None;
        }
        self.issued.get(pick % self.issued.len()).copied()
    }

    fn is_live(&self, id: EventId) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.live)
    }

    fn retire(&mut self, id: EventId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.live = false;
        }
    }

    fn live_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.live).count()
    }

    fn next(&self) -> Option<EventId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.live)
            .min_by_key(|(id, entry)| (entry.time, entry.priority.value(), **id))
            .map(|(id, _)| *id)
    }

    /// Whether a live event could move to `time` without overlapping
    /// another live event of the same actor.
    fn can_move(&self, id: EventId, time: u64) -> bool {
        let Some(moving) = self.entries.get(&id).filter(|entry| entry.live) else {
            return false;
        };
        let end = time + moving.duration;
        !self.entries.iter().any(|(other_id, other)| {
            *other_id != id
                && other.live
                && other.actor == moving.actor
                && other.time < end
                && time < other.time + other.duration
        })
    }
}

proptest! {
    #[test]
    fn cancelled_events_never_leak(ops in prop::collection::vec(op(), 0..96)) {
        let mut queue = EventQueue::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Add { actor, time, duration, priority } => {
                    let event = ScheduledEvent::wait(AgentId::new(actor), time, duration)
                        .with_priority(priority);
                    let id = queue.add(event);
                    prop_assert!(!model.entries.contains_key(&id));
                    model.insert(id, Entry { actor, time, duration, priority, live: true });
                }
                Op::Cancel(pick) => {
                    let Some(id) = model.pick(pick) else { continue };
                    let expected = model.is_live(id);
                    prop_assert_eq!(queue.cancel(id), expected);
                    if expected {
                        model.retire(id);
                        model.cancelled.insert(id);
                    }
                }
                Op::Peek => {
                    let peeked = queue.peek().map(|event| (event.id.unwrap(), event.status));
                    let expected = model.next();
                    prop_assert_eq!(peeked.map(|(id, _)| id), expected);
                    if let Some((id, status)) = peeked {
                        prop_assert_eq!(status, EventStatus::Pending);
                        prop_assert!(!model.cancelled.contains(&id));
                    }
                }
                Op::Pop => {
                    let popped = queue.pop();
                    let expected = model.next();
                    prop_assert_eq!(popped.as_ref().and_then(|event| event.id), expected);
                    if let Some(event) = popped {
                        let id = event.id.unwrap();
                        prop_assert_eq!(event.status, EventStatus::Pending);
                        prop_assert!(!model.cancelled.contains(&id));
                        prop_assert!(queue.get(id).is_none());
                        model.retire(id);
                    }
                }
                Op::Reschedule(pick, time) => {
                    let Some(id) = model.pick(pick) else { continue };
                    let expected = model.can_move(id, time);
                    let moved = queue.reschedule(id, time);
                    prop_assert_eq!(moved.is_some(), expected);
                    if let Some(new_id) = moved {
                        let entry = model.entries.get(&id).copied().unwrap();
                        model.retire(id);
                        model.insert(new_id, Entry { time, live: true, ..entry });
                        prop_assert!(queue.get(id).is_none());
                    } else if model.is_live(id) {
                        prop_assert_eq!(
                            queue.get(id).map(|event| event.scheduled_time),
                            model.entries.get(&id).map(|entry| entry.time)
                        );
                    }
                }
            }
            prop_assert_eq!(queue.len(), model.live_count());
            prop_assert_eq!(queue.is_empty(), model.live_count() == 0);
        }

        while let Some(event) = queue.pop() {
            let id = event.id.unwrap();
            prop_assert!(!model.cancelled.contains(&id));
            prop_assert_eq!(Some(id), model.next());
            model.retire(id);
        }
        prop_assert_eq!(model.live_count(), 0);
        prop_assert!(queue.peek().is_none());
    }

    #[test]
    fn pop_order_is_time_priority_then_insertion(plan in plan()) {
        let mut queue = EventQueue::new();
        fill(&mut queue, &plan);

        let mut previous: Option<(u64, u8, EventId)> = None;
        while let Some(event) = queue.pop() {
            let key = (event.scheduled_time, event.priority.value(), event.id.unwrap());
            if let Some(prev) = previous {
                prop_assert!(prev < key, "{:?} popped before {:?}", prev, key);
            }
            previous = Some(key);
        }
    }

    #[test]
    fn listing_matches_pop_order(plan in plan()) {
        let mut queue = EventQueue::new();
        fill(&mut queue, &plan);

        let listed: Vec<Option<EventId>> = queue.to_vec().into_iter().map(|e| e.id).collect();
        let mut popped = Vec::new();
        while let Some(event) = queue.pop() {
            popped.push(event.id);
        }
        prop_assert_eq!(listed, popped);
    }

    #[test]
    fn conflicts_are_same_actor_overlaps(plan in plan(), time in 0_u64..500, duration in 1_u64..60) {
        let mut queue = EventQueue::new();
        fill(&mut queue, &plan);
        let candidate = ScheduledEvent::wait(AgentId::new(0), time, duration);

        for event in queue.check_conflict(&candidate) {
            prop_assert_eq!(event.actor_id, AgentId::new(0));
            prop_assert!(event.scheduled_time < candidate.end_time());
            prop_assert!(time < event.end_time());
        }
    }
}
