//! In-flight agent actions and the completion heap.
//!
//! Every busy agent owns exactly one [`AgentTask`]. The [`TaskHeap`] orders
//! tasks by `end_time` with ties broken by insertion sequence. Entries are
//! never removed eagerly: when a task is replaced or its agent removed, the
//! heap entry goes stale and is discarded the next time it reaches the top.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use hamlet_types::AgentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The action an agent is currently performing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTask {
    /// Agent performing the action.
    pub actor_id: AgentId,
    /// Action name from the decision.
    pub action_name: String,
    /// Action payload from the decision.
    pub action_payload: Value,
    /// Clock minute the action started.
    pub start_time: u64,
    /// Clock minute the action ends (exclusive).
    pub end_time: u64,
    /// Insertion sequence. Breaks `end_time` ties and identifies the heap
    /// entry that belongs to this task.
    pub sequence: u64,
}

impl AgentTask {
    /// Build a task.
    pub fn new(
        actor_id: AgentId,
        action_name: impl Into<String>,
        action_payload: Value,
        start_time: u64,
        end_time: u64,
        sequence: u64,
    ) -> Self {
        Self {
            actor_id,
            action_name: action_name.into(),
            action_payload,
            start_time,
            end_time,
            sequence,
        }
    }

    /// Length of the task in minutes.
    pub const fn duration(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Whether the task is over at `now`.
    pub const fn is_due(&self, now: u64) -> bool {
        self.end_time <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TaskKey {
    end_time: u64,
    sequence: u64,
    actor_id: AgentId,
}

/// Min-heap of task completions with lazy deletion.
#[derive(Debug, Default)]
pub struct TaskHeap {
    heap: BinaryHeap<Reverse<TaskKey>>,
    next_sequence: u64,
}

impl TaskHeap {
    /// Empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next insertion sequence.
    pub const fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        sequence
    }

    /// Push a task's completion.
    pub fn push(&mut self, task: &AgentTask) {
        if task.sequence >= self.next_sequence {
            self.next_sequence = task.sequence.saturating_add(1);
        }
        self.heap.push(Reverse(TaskKey {
            end_time: task.end_time,
            sequence: task.sequence,
            actor_id: task.actor_id,
        }));
    }

    /// Drop stale entries from the top. An entry is live while its agent
    /// still owns the task with the same sequence.
    fn discard_stale(&mut self, tasks: &BTreeMap<AgentId, AgentTask>) {
        while let Some(Reverse(top)) = self.heap.peek() {
            let live = tasks
                .get(&top.actor_id)
                .is_some_and(|task| task.sequence == top.sequence);
            if live {
                break;
            }
            self.heap.pop();
        }
    }

    /// End time of the earliest live task.
    pub fn next_end(&mut self, tasks: &BTreeMap<AgentId, AgentTask>) -> Option<u64> {
        self.discard_stale(tasks);
        self.heap.peek().map(|Reverse(key)| key.end_time)
    }

    /// Pop the earliest live task if it ends at or before `now`.
    pub fn pop_due(&mut self, now: u64, tasks: &BTreeMap<AgentId, AgentTask>) -> Option<AgentId> {
        self.discard_stale(tasks);
        match self.heap.peek() {
            Some(Reverse(key)) if key.end_time <= now => {
                let actor = key.actor_id;
                self.heap.pop();
                Some(actor)
            }
            _ => None,
        }
    }

    /// Number of entries, stale ones included.
    pub fn raw_len(&self) -> usize {
        self.heap.len()
    }

    /// Remove every entry. Sequences keep counting.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
