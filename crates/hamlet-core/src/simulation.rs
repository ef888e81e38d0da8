//! Action-driven simulation driver.
//!
//! Every agent is either idle or busy with exactly one [`AgentTask`]. Each
//! iteration asks the [`DecisionProvider`] what every idle agent does next,
//! concurrently and under a per-request deadline. Once every agent is busy
//! the clock jumps straight to the earliest task completion instead of
//! ticking minute by minute, bounded by `max_time_skip` and by the next
//! scripted event.
//!
//! Decision outcomes:
//!
//! - success: a task `[now, now + duration)` is created, its side effects
//!   go through the [`ActionExecutor`] and action-start fires;
//! - timeout: the agent waits for `timeout_wait_minutes`, no side effects;
//! - error: the agent stays idle and is asked again. After
//!   `decision_failure_limit` errors in a row it waits for
//!   `failure_backoff_minutes` so the clock can move on.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use hamlet_types::{AgentId, EventId, LocationId, RunStatus, ScheduledEvent};
use hamlet_world::{World, WorldError, WorldSummary};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::control::{EndReason, RunControl, RunOutcome};
use crate::decision::{DecisionError, DecisionProvider};
use crate::engine::{ScheduleError, SnapshotError};
use crate::executor::{ActionExecutor, WorldActionExecutor};
use crate::handler::{EventContext, HandlerRegistry};
use crate::notify::{CallbackError, DayChange, Subscribers, TimeAdvance};
use crate::queue::EventQueue;
pub use crate::task::AgentTask;
use crate::task::TaskHeap;

/// Errors from agent management.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// An agent with this id already exists.
    #[error("agent {0} already exists")]
    DuplicateAgent(AgentId),

    /// The world refused the agent's placement.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}

/// Where a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// The decision provider chose it.
    Decision,
    /// The provider missed its deadline; the agent waits.
    Timeout,
    /// The provider failed too often in a row; the agent waits.
    Backoff,
}

/// One task created during a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionTaken {
    /// Agent that took the action.
    pub agent_id: AgentId,
    /// Action name.
    pub action: String,
    /// Duration in minutes.
    pub duration: u64,
    /// Where the task came from.
    pub source: TaskSource,
}

/// What a single [`Simulation::step`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Clock before the step.
    pub time_before: Clock,
    /// Clock after the step.
    pub time_after: Clock,
    /// Tasks created.
    pub actions: Vec<ActionTaken>,
    /// Agents whose decision failed and who stay idle.
    pub decision_failures: Vec<AgentId>,
    /// Minutes skipped.
    pub minutes_skipped: u64,
    /// Agents whose task completed.
    pub completed: Vec<AgentId>,
    /// Scripted events executed.
    pub scripted_events: usize,
    /// Every agent was busy but no task remained.
    pub exhausted: bool,
}

impl StepReport {
    const fn new(time_before: Clock) -> Self {
        Self {
            time_before,
            time_after: time_before,
            actions: Vec::new(),
            decision_failures: Vec::new(),
            minutes_skipped: 0,
            completed: Vec::new(),
            scripted_events: 0,
            exhausted: false,
        }
    }
}

/// Result of [`Simulation::advance_to_next_task_end`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Minutes skipped.
    pub skipped: u64,
    /// Agents whose task completed.
    pub completed: Vec<AgentId>,
    /// Scripted events executed.
    pub scripted_events: usize,
    /// No task remained on the heap.
    pub exhausted: bool,
}

/// Per-agent status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStatus {
    /// Agent id.
    pub agent_id: AgentId,
    /// Display name.
    pub name: String,
    /// Whether the agent owns a task.
    pub busy: bool,
    /// Current action, if busy.
    pub current_action: Option<String>,
    /// Clock minute the current action ends, if busy.
    pub ends_at: Option<u64>,
}

/// Status summary for operators.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationStatus {
    /// Run status.
    pub status: RunStatus,
    /// Current clock.
    pub clock: Clock,
    /// Clock formatted as `Day D, HH:MM`.
    pub time: String,
    /// Per-agent status.
    pub agents: Vec<AgentStatus>,
    /// Tasks in flight.
    pub pending_tasks: usize,
    /// Scripted events still pending.
    pub scripted_events: usize,
    /// World summary.
    pub world: WorldSummary,
}

/// Serializable simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Clock at snapshot time.
    pub clock: Clock,
    /// Tasks in flight, ordered by agent.
    pub tasks: Vec<AgentTask>,
    /// Pending scripted events in pop order.
    pub pending_events: Vec<ScheduledEvent>,
}

#[derive(Debug, Clone)]
struct AgentRecord {
    name: String,
    consecutive_failures: u32,
}

/// Action-driven driver with time-skip.
pub struct Simulation {
    config: SimulationConfig,
    clock: Clock,
    world: World,
    provider: Arc<dyn DecisionProvider>,
    executor: Box<dyn ActionExecutor>,
    registry: HandlerRegistry,
    events: EventQueue,
    agents: BTreeMap<AgentId, AgentRecord>,
    tasks: BTreeMap<AgentId, AgentTask>,
    heap: TaskHeap,
    control: Arc<RunControl>,
    action_start: Subscribers<AgentTask>,
    action_end: Subscribers<AgentTask>,
    time_advance: Subscribers<TimeAdvance>,
    day_change: Subscribers<DayChange>,
}

impl Simulation {
    /// Build a simulation with the built-in executor and handlers.
    pub fn new(
        config: SimulationConfig,
        mut world: World,
        provider: Arc<dyn DecisionProvider>,
    ) -> Self {
        let clock = Clock::from_day_hour_minute(
            config.initial_day,
            config.initial_hour,
            config.initial_minute,
        );
        world.update(clock.hour(), clock.day());
        Self {
            config,
            clock,
            world,
            provider,
            executor: Box::new(WorldActionExecutor),
            registry: HandlerRegistry::with_builtin_handlers(),
            events: EventQueue::new(),
            agents: BTreeMap::new(),
            tasks: BTreeMap::new(),
            heap: TaskHeap::new(),
            control: Arc::new(RunControl::new()),
            action_start: Subscribers::new("action_start"),
            action_end: Subscribers::new("action_end"),
            time_advance: Subscribers::new("time_advance"),
            day_change: Subscribers::new("day_change"),
        }
    }

    /// Replace the action executor.
    #[must_use]
    pub fn with_executor<E>(mut self, executor: E) -> Self
    where
        E: ActionExecutor + 'static,
    {
        self.executor = Box::new(executor);
        self
    }

    /// Replace the handler registry used for scripted events.
    #[must_use]
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Current clock.
    pub const fn clock(&self) -> Clock {
        self.clock
    }

    /// Shared world state.
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world state, for seeding.
    pub const fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Handle for pausing, resuming and stopping from another task.
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// The agent's current task.
    pub fn task(&self, agent_id: AgentId) -> Option<&AgentTask> {
        self.tasks.get(&agent_id)
    }

    /// Whether the agent owns a task.
    pub fn is_busy(&self, agent_id: AgentId) -> bool {
        self.tasks.contains_key(&agent_id)
    }

    /// Number of agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Subscribe to task creation.
    pub fn on_action_start<F>(&mut self, subscriber: F)
    where
        F: FnMut(&AgentTask) -> Result<(), CallbackError> + Send + 'static,
    {
        self.action_start.subscribe(subscriber);
    }

    /// Subscribe to task completion.
    pub fn on_action_end<F>(&mut self, subscriber: F)
    where
        F: FnMut(&AgentTask) -> Result<(), CallbackError> + Send + 'static,
    {
        self.action_end.subscribe(subscriber);
    }

    /// Subscribe to time-skips.
    pub fn on_time_advance<F>(&mut self, subscriber: F)
    where
        F: FnMut(&TimeAdvance) -> Result<(), CallbackError> + Send + 'static,
    {
        self.time_advance.subscribe(subscriber);
    }

    /// Subscribe to day boundaries crossed by a time-skip.
    pub fn on_day_change<F>(&mut self, subscriber: F)
    where
        F: FnMut(&DayChange) -> Result<(), CallbackError> + Send + 'static,
    {
        self.day_change.subscribe(subscriber);
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    /// Add an idle agent at a point, optionally inside a location.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::DuplicateAgent`] if the id is taken, or a
    /// world error if the location does not exist.
    pub fn add_agent(
        &mut self,
        agent_id: AgentId,
        name: impl Into<String>,
        x: f64,
        y: f64,
        location: Option<LocationId>,
    ) -> Result<(), SimulationError> {
        if self.agents.contains_key(&agent_id) {
            return Err(SimulationError::DuplicateAgent(agent_id));
        }
        self.world.place_agent(agent_id, x, y, location)?;
        let name = name.into();
        info!(agent = %agent_id, name = %name, x, y, "Agent added");
        self.agents.insert(
            agent_id,
            AgentRecord {
                name,
                consecutive_failures: 0,
            },
        );
        Ok(())
    }

    /// Remove an agent along with its task. Returns `false` if unknown.
    pub fn remove_agent(&mut self, agent_id: AgentId) -> bool {
        if self.agents.remove(&agent_id).is_none() {
            return false;
        }
        // The heap entry goes stale with the task.
        self.tasks.remove(&agent_id);
        self.world.remove_agent(agent_id);
        info!(agent = %agent_id, "Agent removed");
        true
    }

    /// Agents without a task, in id order.
    pub fn idle_agents(&self) -> Vec<AgentId> {
        self.agents
            .keys()
            .filter(|id| !self.tasks.contains_key(id))
            .copied()
            .collect()
    }

    /// Whether there is at least one agent and every agent is busy.
    pub fn all_busy(&self) -> bool {
        !self.agents.is_empty() && self.agents.keys().all(|id| self.tasks.contains_key(id))
    }

    // -----------------------------------------------------------------------
    // Scripted events
    // -----------------------------------------------------------------------

    /// Queue a scripted event. Time-skips never jump past it.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Conflict`] if the actor already has an
    /// overlapping scripted event.
    pub fn schedule_event(&mut self, event: ScheduledEvent) -> Result<EventId, ScheduleError> {
        let conflicts: Vec<EventId> = self
            .events
            .check_conflict(&event)
            .iter()
            .filter_map(|e| e.id)
            .collect();
        if !conflicts.is_empty() {
            return Err(ScheduleError::Conflict {
                actor_id: event.actor_id,
                conflicts,
            });
        }
        Ok(self.events.add(event))
    }

    /// Cancel a scripted event.
    pub fn cancel_event(&mut self, id: EventId) -> bool {
        self.events.cancel(id)
    }

    fn run_due_events(&mut self) -> usize {
        let mut executed: usize = 0;
        loop {
            let now = self.clock.total_minutes();
            if !self.events.next_time().is_some_and(|t| t <= now) {
                break;
            }
            let Some(mut event) = self.events.pop() else {
                break;
            };
            let follow_ups = {
                let mut ctx = EventContext::new(self.clock, &mut self.world);
                self.registry.execute(&mut event, &mut ctx);
                ctx.follow_ups
            };
            for follow_up in follow_ups {
                if self.events.can_schedule(&follow_up) {
                    self.events.add(follow_up);
                } else {
                    warn!(actor = %follow_up.actor_id, "Follow-up event dropped: conflict");
                }
            }
            executed = executed.saturating_add(1);
        }
        executed
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    fn start_task(
        &mut self,
        agent_id: AgentId,
        action: String,
        payload: Value,
        duration: u64,
        source: TaskSource,
    ) -> ActionTaken {
        let now = self.clock.total_minutes();
        // Zero-length tasks would let the loop spin without time moving.
        let duration = duration.max(1);
        let sequence = self.heap.next_sequence();
        let task = AgentTask::new(
            agent_id,
            action,
            payload,
            now,
            now.saturating_add(duration),
            sequence,
        );

        if source == TaskSource::Decision {
            if let Err(error) = self.executor.execute(&task, &mut self.world) {
                warn!(
                    agent = %agent_id,
                    action = %task.action_name,
                    error = %error,
                    "Action side effects failed"
                );
            }
        }

        debug!(
            agent = %agent_id,
            action = %task.action_name,
            start = task.start_time,
            end = task.end_time,
            ?source,
            "Task started"
        );
        self.heap.push(&task);
        self.action_start.emit(&task);
        let taken = ActionTaken {
            agent_id,
            action: task.action_name.clone(),
            duration,
            source,
        };
        self.tasks.insert(agent_id, task);
        taken
    }

    /// Ask the provider for every idle agent's next action and turn the
    /// answers into tasks.
    ///
    /// Requests run concurrently, each under the decision timeout, and are
    /// all joined before this returns. Returns the tasks created and the
    /// agents left idle by a failed decision.
    pub async fn dispatch_decisions(&mut self) -> (Vec<ActionTaken>, Vec<AgentId>) {
        let idle = self.idle_agents();
        if idle.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let timeout = self.config.decision_timeout();
        let deadline_ms = self.config.decision_timeout_ms;
        let requests: Vec<_> = idle
            .iter()
            .map(|&agent_id| {
                let context = self.world.context_for(
                    agent_id,
                    self.clock.day(),
                    self.clock.hour(),
                    self.clock.minute(),
                );
                let provider = Arc::clone(&self.provider);
                async move {
                    let outcome = tokio::time::timeout(timeout, provider.decide(agent_id, context))
                        .await
                        .unwrap_or_else(|_| {
                            Err(DecisionError::Timeout {
                                agent_id,
                                deadline_ms,
                            })
                        });
                    (agent_id, outcome)
                }
            })
            .collect();

        debug!(agents = requests.len(), clock = %self.clock, "Dispatching decisions");
        let results = join_all(requests).await;

        let mut actions = Vec::new();
        let mut failures = Vec::new();
        for (agent_id, outcome) in results {
            match outcome {
                Ok(decision) => {
                    if let Some(record) = self.agents.get_mut(&agent_id) {
                        record.consecutive_failures = 0;
                    }
                    let duration = decision
                        .duration
                        .or_else(|| {
                            self.executor.estimate_minutes(
                                agent_id,
                                &decision.action,
                                &decision.payload,
                                &self.world,
                            )
                        })
                        .unwrap_or(self.config.default_action_minutes);
                    actions.push(self.start_task(
                        agent_id,
                        decision.action,
                        decision.payload,
                        duration,
                        TaskSource::Decision,
                    ));
                }
                Err(DecisionError::Timeout { .. }) => {
                    warn!(agent = %agent_id, deadline_ms, "Decision timed out, agent waits");
                    actions.push(self.start_task(
                        agent_id,
                        "wait".to_owned(),
                        json!({ "reason": "decision_timeout" }),
                        self.config.timeout_wait_minutes,
                        TaskSource::Timeout,
                    ));
                }
                Err(error) => {
                    if let Some(action) = self.record_failure(agent_id, &error) {
                        actions.push(action);
                    } else {
                        failures.push(agent_id);
                    }
                }
            }
        }
        (actions, failures)
    }

    fn record_failure(&mut self, agent_id: AgentId, error: &DecisionError) -> Option<ActionTaken> {
        let limit = self.config.decision_failure_limit;
        let record = self.agents.get_mut(&agent_id)?;
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        let failures = record.consecutive_failures;
        warn!(agent = %agent_id, error = %error, failures, "Decision failed");

        if limit == 0 || failures < limit {
            return None;
        }
        record.consecutive_failures = 0;
        warn!(
            agent = %agent_id,
            backoff_minutes = self.config.failure_backoff_minutes,
            "Decision failure limit reached, agent backs off"
        );
        Some(self.start_task(
            agent_id,
            "wait".to_owned(),
            json!({ "reason": "decision_backoff" }),
            self.config.failure_backoff_minutes,
            TaskSource::Backoff,
        ))
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    fn complete_due_tasks(&mut self) -> Vec<AgentId> {
        let now = self.clock.total_minutes();
        let mut completed = Vec::new();
        while let Some(agent_id) = self.heap.pop_due(now, &self.tasks) {
            if let Some(task) = self.tasks.remove(&agent_id) {
                debug!(agent = %agent_id, action = %task.action_name, "Task completed");
                self.action_end.emit(&task);
                completed.push(agent_id);
            }
        }
        completed
    }

    fn advance_clock(&mut self, minutes: u64) {
        let before = self.clock;
        self.clock.advance(minutes);

        let mut day = before.day();
        while day < self.clock.day() {
            let next = day.saturating_add(1);
            info!(day = next, "New day");
            self.day_change.emit(&DayChange {
                previous_day: day,
                new_day: next,
            });
            day = next;
        }

        self.world.update(self.clock.hour(), self.clock.day());
        self.time_advance.emit(&TimeAdvance {
            clock: self.clock,
            skipped: minutes,
        });
    }

    /// Jump the clock to the earliest task completion.
    ///
    /// Tasks and scripted events already due run first. The skip is capped by
    /// `max_time_skip` and by the next scripted event; a capped task stays
    /// in flight. After the skip, due scripted events run and every task
    /// with `end_time <= now` completes.
    pub fn advance_to_next_task_end(&mut self) -> AdvanceReport {
        let mut report = AdvanceReport {
            completed: self.complete_due_tasks(),
            ..AdvanceReport::default()
        };
        // Events already due run at the current time, before any skip.
        report.scripted_events = self.run_due_events();

        let Some(next_end) = self.heap.next_end(&self.tasks) else {
            report.exhausted = report.completed.is_empty();
            return report;
        };

        let now = self.clock.total_minutes();
        let mut skip = next_end
            .saturating_sub(now)
            .min(self.config.max_time_skip.max(1));
        if let Some(event_time) = self.events.next_time().filter(|t| *t > now) {
            skip = skip.min(event_time.saturating_sub(now));
        }

        self.advance_clock(skip);
        report.skipped = skip;
        report.scripted_events = report
            .scripted_events
            .saturating_add(self.run_due_events());
        report.completed.extend(self.complete_due_tasks());

        debug!(
            skipped = skip,
            clock = %self.clock,
            completed = report.completed.len(),
            "Time advanced"
        );
        report
    }

    /// Run one loop iteration: decisions for idle agents, then a time-skip
    /// if everyone is busy.
    pub async fn step(&mut self) -> StepReport {
        let mut report = StepReport::new(self.clock);
        if self.agents.is_empty() {
            return report;
        }

        let (actions, failures) = self.dispatch_decisions().await;
        report.actions = actions;
        report.decision_failures = failures;

        if self.all_busy() {
            let advance = self.advance_to_next_task_end();
            report.minutes_skipped = advance.skipped;
            report.completed = advance.completed;
            report.scripted_events = advance.scripted_events;
            report.exhausted = advance.exhausted;
        }

        report.time_after = self.clock;
        report
    }

    fn max_minutes_reached(&self, start: Clock) -> bool {
        self.config.max_minutes > 0
            && self.clock.total_minutes().saturating_sub(start.total_minutes())
                >= self.config.max_minutes
    }

    /// Run until stopped, the `max_minutes` bound is reached or no task
    /// remains.
    pub async fn run(&mut self) -> RunOutcome {
        let start = self.clock;
        let mut iterations: u64 = 0;
        self.control.start();

        info!(
            clock = %self.clock,
            agents = self.agents.len(),
            max_time_skip = self.config.max_time_skip,
            decision_timeout_ms = self.config.decision_timeout_ms,
            max_minutes = self.config.max_minutes,
            "Simulation starting"
        );

        let end_reason = loop {
            if self.control.is_paused() {
                info!("Simulation paused, waiting for resume...");
                self.control.wait_if_paused().await;
                info!("Simulation resumed");
            }
            if self.control.is_stop_requested() {
                break EndReason::Stopped;
            }
            if self.max_minutes_reached(start) {
                break EndReason::MaxMinutesReached;
            }

            if self.agents.is_empty() {
                tokio::time::sleep(Duration::from_millis(self.config.idle_poll_ms)).await;
                continue;
            }

            let report = self.step().await;
            iterations = iterations.saturating_add(1);
            if report.exhausted {
                break EndReason::Exhausted;
            }
            tokio::task::yield_now().await;
        };

        self.control.finish();
        RunOutcome {
            end_reason,
            final_clock: self.clock,
            minutes_elapsed: self.clock.total_minutes().saturating_sub(start.total_minutes()),
            iterations,
        }
    }

    /// Pause at the next gate check.
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Release the pause gate.
    pub fn resume(&self) {
        self.control.resume();
    }

    /// Request a stop. Outstanding decisions finish or time out first.
    pub fn stop(&self) {
        self.control.stop();
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    /// Status summary.
    pub fn status(&self) -> SimulationStatus {
        let agents = self
            .agents
            .iter()
            .map(|(id, record)| {
                let task = self.tasks.get(id);
                AgentStatus {
                    agent_id: *id,
                    name: record.name.clone(),
                    busy: task.is_some(),
                    current_action: task.map(|t| t.action_name.clone()),
                    ends_at: task.map(|t| t.end_time),
                }
            })
            .collect();
        SimulationStatus {
            status: self.control.status(),
            clock: self.clock,
            time: self.clock.to_string(),
            agents,
            pending_tasks: self.tasks.len(),
            scripted_events: self.events.len(),
            world: self.world.summary(),
        }
    }

    /// Snapshot of clock, tasks in flight and pending scripted events.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if serialization fails.
    pub fn snapshot(&self) -> Result<Value, SnapshotError> {
        let snapshot = SimulationSnapshot {
            clock: self.clock,
            tasks: self.tasks.values().cloned().collect(),
            pending_events: self.events.to_vec(),
        };
        Ok(serde_json::to_value(snapshot)?)
    }

    /// Restore clock, tasks and scripted events from a snapshot.
    ///
    /// Agents must already be added; tasks of unknown agents are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the value is not a valid snapshot. The
    /// simulation is unchanged in that case.
    pub fn restore(&mut self, value: Value) -> Result<(), SnapshotError> {
        let snapshot: SimulationSnapshot = serde_json::from_value(value)?;
        self.clock = snapshot.clock;
        self.tasks.clear();
        self.heap.clear();
        for task in snapshot.tasks {
            if !self.agents.contains_key(&task.actor_id) {
                warn!(agent = %task.actor_id, "Skipping task of unknown agent");
                continue;
            }
            self.heap.push(&task);
            self.tasks.insert(task.actor_id, task);
        }
        self.events.clear();
        for event in snapshot.pending_events {
            self.events.restore(event);
        }
        self.world.update(self.clock.hour(), self.clock.day());
        info!(clock = %self.clock, tasks = self.tasks.len(), "Simulation restored");
        Ok(())
    }
}

impl core::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Simulation")
            .field("clock", &self.clock)
            .field("agents", &self.agents.len())
            .field("tasks", &self.tasks.len())
            .field("scripted_events", &self.events.len())
            .field("status", &self.control.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::future::BoxFuture;
    use hamlet_types::{Decision, EventStatus, WorldContext};

    use super::*;
    use crate::decision::FixedDecisionProvider;

    fn config() -> SimulationConfig {
        SimulationConfig {
            initial_hour: 0,
            decision_timeout_ms: 1_000,
            ..SimulationConfig::default()
        }
    }

    fn simulation(provider: impl DecisionProvider + 'static) -> Simulation {
        Simulation::new(config(), World::default(), Arc::new(provider))
    }

    fn add(sim: &mut Simulation, raw: u64) -> AgentId {
        let id = AgentId::new(raw);
        sim.add_agent(id, format!("agent-{raw}"), 10.0, 10.0, None)
            .unwrap();
        id
    }

    struct Failing {
        calls: Arc<AtomicU32>,
    }

    impl DecisionProvider for Failing {
        fn decide(
            &self,
            _agent_id: AgentId,
            _context: WorldContext,
        ) -> BoxFuture<'_, Result<Decision, DecisionError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(DecisionError::provider("offline")) })
        }
    }

    struct Slow;

    impl DecisionProvider for Slow {
        fn decide(
            &self,
            _agent_id: AgentId,
            _context: WorldContext,
        ) -> BoxFuture<'_, Result<Decision, DecisionError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Decision::new("work"))
            })
        }
    }

    #[tokio::test]
    async fn missing_duration_uses_default() {
        let mut sim = simulation(FixedDecisionProvider::new(Decision::new("read")));
        let agent = add(&mut sim, 1);

        let (actions, failures) = sim.dispatch_decisions().await;
        assert!(failures.is_empty());
        assert_eq!(actions.first().unwrap().duration, 30);
        assert_eq!(sim.task(agent).unwrap().end_time, 30);
    }

    #[tokio::test]
    async fn zero_duration_is_clamped() {
        let mut sim = simulation(FixedDecisionProvider::new(
            Decision::new("glance").with_duration(0),
        ));
        let agent = add(&mut sim, 1);
        sim.dispatch_decisions().await;
        assert_eq!(sim.task(agent).unwrap().duration(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_wait_task() {
        let mut sim = simulation(Slow);
        let agent = add(&mut sim, 1);

        let (actions, _) = sim.dispatch_decisions().await;
        let taken = actions.first().unwrap();
        assert_eq!(taken.source, TaskSource::Timeout);
        assert_eq!(taken.action, "wait");
        assert_eq!(sim.task(agent).unwrap().end_time, 10);
    }

    #[tokio::test]
    async fn provider_error_leaves_agent_idle_then_backs_off() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut sim = simulation(Failing {
            calls: Arc::clone(&calls),
        });
        let agent = add(&mut sim, 1);

        for _ in 0..2 {
            let report = sim.step().await;
            assert_eq!(report.decision_failures, vec![agent]);
            assert!(!sim.is_busy(agent));
            assert_eq!(report.minutes_skipped, 0);
        }

        let report = sim.step().await;
        assert!(report.decision_failures.is_empty());
        assert_eq!(report.actions.first().unwrap().source, TaskSource::Backoff);
        assert_eq!(report.minutes_skipped, 10);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failure_limit_zero_retries_forever() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut sim = Simulation::new(
            SimulationConfig {
                decision_failure_limit: 0,
                ..config()
            },
            World::default(),
            Arc::new(Failing {
                calls: Arc::clone(&calls),
            }),
        );
        let agent = add(&mut sim, 1);
        for _ in 0..10 {
            sim.step().await;
        }
        assert!(!sim.is_busy(agent));
        assert_eq!(sim.clock().total_minutes(), 0);
    }

    #[tokio::test]
    async fn one_agent_failing_does_not_block_another() {
        struct Mixed;
        impl DecisionProvider for Mixed {
            fn decide(
                &self,
                agent_id: AgentId,
                _context: WorldContext,
            ) -> BoxFuture<'_, Result<Decision, DecisionError>> {
                Box::pin(async move {
                    if agent_id == AgentId::new(1) {
                        Err(DecisionError::provider("nope"))
                    } else {
                        Ok(Decision::new("work").with_duration(45))
                    }
                })
            }
        }

        let mut sim = simulation(Mixed);
        let a = add(&mut sim, 1);
        let b = add(&mut sim, 2);

        let (actions, failures) = sim.dispatch_decisions().await;
        assert_eq!(failures, vec![a]);
        assert_eq!(actions.len(), 1);
        assert!(sim.is_busy(b));
        assert!(!sim.all_busy());
    }

    #[tokio::test]
    async fn removing_an_agent_drops_its_task() {
        let mut sim = simulation(FixedDecisionProvider::new(
            Decision::new("work").with_duration(20),
        ));
        let a = add(&mut sim, 1);
        let b = add(&mut sim, 2);
        sim.dispatch_decisions().await;

        assert!(sim.remove_agent(a));
        assert!(!sim.remove_agent(a));
        assert!(sim.task(a).is_none());
        assert!(sim.world().position(a).is_none());

        let report = sim.advance_to_next_task_end();
        assert_eq!(report.completed, vec![b]);
    }

    #[test]
    fn duplicate_agent_is_rejected() {
        let mut sim = simulation(FixedDecisionProvider::default());
        add(&mut sim, 1);
        let result = sim.add_agent(AgentId::new(1), "again", 0.0, 0.0, None);
        assert!(matches!(result, Err(SimulationError::DuplicateAgent(_))));
    }

    #[test]
    fn empty_heap_is_exhausted() {
        let mut sim = simulation(FixedDecisionProvider::default());
        let report = sim.advance_to_next_task_end();
        assert!(report.exhausted);
        assert_eq!(sim.clock().total_minutes(), 0);
    }

    #[tokio::test]
    async fn skip_stops_at_scripted_event() {
        let mut sim = simulation(FixedDecisionProvider::new(
            Decision::new("work").with_duration(120),
        ));
        let agent = add(&mut sim, 1);
        let id = sim
            .schedule_event(ScheduledEvent::fatigue_warning(agent, 45, 10))
            .unwrap();

        let report = sim.step().await;
        assert_eq!(report.minutes_skipped, 45);
        assert_eq!(report.scripted_events, 1);
        assert!(report.completed.is_empty());
        assert!(sim.is_busy(agent));
        assert!(sim.events.get(id).is_none());

        let report = sim.step().await;
        assert_eq!(report.minutes_skipped, 75);
        assert_eq!(report.completed, vec![agent]);
    }

    #[tokio::test]
    async fn due_scripted_event_runs_before_the_skip() {
        let mut sim = simulation(FixedDecisionProvider::new(
            Decision::new("work").with_duration(300),
        ));
        let agent = add(&mut sim, 1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sim.registry
            .add_before_hook(hamlet_types::EventKind::FatigueWarning, move |_, ctx| {
                sink.lock().unwrap().push(ctx.clock.total_minutes());
                Ok(())
            });
        sim.schedule_event(ScheduledEvent::fatigue_warning(agent, 0, 10))
            .unwrap();

        let report = sim.step().await;
        assert_eq!(report.scripted_events, 1);
        assert_eq!(*seen.lock().unwrap(), vec![0]);
        assert_eq!(report.minutes_skipped, 300);
    }

    #[tokio::test]
    async fn notifications_fire_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sim = simulation(FixedDecisionProvider::new(
            Decision::new("nap").with_duration(15),
        ));
        add(&mut sim, 1);

        let l = Arc::clone(&log);
        sim.on_action_start(move |task| {
            l.lock().unwrap().push(format!("start {}", task.action_name));
            Ok(())
        });
        let l = Arc::clone(&log);
        sim.on_time_advance(move |advance| {
            l.lock().unwrap().push(format!("advance {}", advance.skipped));
            Ok(())
        });
        let l = Arc::clone(&log);
        sim.on_action_end(move |task| {
            l.lock().unwrap().push(format!("end {}", task.action_name));
            Ok(())
        });
        sim.on_action_end(|_| Err(CallbackError::new("ignored")));

        sim.step().await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start nap", "advance 15", "end nap"]
        );
    }

    #[tokio::test]
    async fn long_skip_crosses_days() {
        let days = Arc::new(Mutex::new(Vec::new()));
        let mut sim = Simulation::new(
            SimulationConfig {
                max_time_skip: 5_000,
                ..config()
            },
            World::default(),
            Arc::new(FixedDecisionProvider::new(
                Decision::new("hibernate").with_duration(3_000),
            )),
        );
        add(&mut sim, 1);
        let d = Arc::clone(&days);
        sim.on_day_change(move |change| {
            d.lock().unwrap().push(change.new_day);
            Ok(())
        });

        sim.step().await;
        assert_eq!(*days.lock().unwrap(), vec![2, 3]);
        assert_eq!(sim.world().environment().day, 3);
    }

    #[tokio::test]
    async fn snapshot_round_trip_keeps_tasks() {
        let mut sim = simulation(FixedDecisionProvider::new(
            Decision::new("work").with_duration(90),
        ));
        let agent = add(&mut sim, 1);
        sim.dispatch_decisions().await;
        sim.schedule_event(ScheduledEvent::wait(agent, 500, 5))
            .unwrap();
        let snapshot = sim.snapshot().unwrap();

        let mut restored = simulation(FixedDecisionProvider::default());
        add(&mut restored, 1);
        restored.restore(snapshot).unwrap();
        assert_eq!(restored.task(agent).unwrap().end_time, 90);
        assert_eq!(restored.status().scripted_events, 1);

        let report = restored.advance_to_next_task_end();
        assert_eq!(report.completed, vec![agent]);
    }

    #[tokio::test]
    async fn bounded_run_reports_max_minutes() {
        let mut sim = Simulation::new(
            SimulationConfig {
                max_minutes: 100,
                ..config()
            },
            World::default(),
            Arc::new(FixedDecisionProvider::new(
                Decision::new("work").with_duration(30),
            )),
        );
        add(&mut sim, 1);

        let outcome = sim.run().await;
        assert_eq!(outcome.end_reason, EndReason::MaxMinutesReached);
        assert_eq!(outcome.minutes_elapsed, 120);
        assert_eq!(outcome.iterations, 4);
        assert_eq!(sim.status().status, RunStatus::Stopped);
    }

    #[tokio::test]
    async fn scripted_event_failure_does_not_stop_the_loop() {
        let mut sim = simulation(FixedDecisionProvider::new(
            Decision::new("work").with_duration(60),
        ));
        let agent = add(&mut sim, 1);
        sim.schedule_event(ScheduledEvent::offline_chat(agent, Vec::new(), 10, 5, None))
            .unwrap();

        let first = sim.step().await;
        assert_eq!(first.scripted_events, 1);
        let second = sim.step().await;
        assert_eq!(second.completed, vec![agent]);
        assert_eq!(sim.clock().total_minutes(), 60);
        assert!(
            sim.events
                .to_vec()
                .iter()
                .all(|event| event.status == EventStatus::Pending)
        );
    }
}
