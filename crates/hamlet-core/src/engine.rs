//! Tick-driven event engine.
//!
//! The [`Engine`] pulls the earliest event from its [`EventQueue`], advances
//! the clock minute by minute up to the event's start, executes it through
//! the [`HandlerRegistry`] and, on success, advances through the event's
//! duration. With an empty queue it idles forward one minute per iteration.
//!
//! Time advancement fires the tick notification every minute and the
//! day-change notification once per day boundary, and refreshes the world
//! environment on every hour boundary.

use std::sync::Arc;
use std::time::Duration;

use hamlet_types::{AgentId, EventId, RunStatus, ScheduledEvent};
use hamlet_world::{World, WorldSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::control::{EndReason, RunControl, RunOutcome};
use crate::handler::{EventContext, HandlerRegistry};
use crate::notify::{CallbackError, DayChange, Subscribers};
use crate::queue::EventQueue;

/// Errors returned by the event registration API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The actor already has a pending event overlapping this one.
    #[error("agent {actor_id} is already booked: conflicts with {conflicts:?}")]
    Conflict {
        /// Actor of the rejected event.
        actor_id: AgentId,
        /// Ids of the overlapping pending events.
        conflicts: Vec<EventId>,
    },
}

/// Errors from snapshot and restore.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot could not be encoded or decoded.
    #[error("snapshot serialization failed: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// Serializable engine state: clock, counters and pending events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Clock at snapshot time.
    pub clock: Clock,
    /// Events executed so far.
    pub events_processed: u64,
    /// Events that failed so far.
    pub events_failed: u64,
    /// Pending events in pop order.
    pub pending: Vec<ScheduledEvent>,
}

/// Status summary for operators.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    /// Run status.
    pub status: RunStatus,
    /// Current clock.
    pub clock: Clock,
    /// Clock formatted as `Day D, HH:MM`.
    pub time: String,
    /// Pending events.
    pub pending_events: usize,
    /// Events executed so far.
    pub events_processed: u64,
    /// Events that failed so far.
    pub events_failed: u64,
    /// World summary.
    pub world: WorldSummary,
}

/// Single-threaded, cooperative scheduled-event driver.
pub struct Engine {
    clock: Clock,
    queue: EventQueue,
    registry: HandlerRegistry,
    world: World,
    control: Arc<RunControl>,
    config: EngineConfig,
    events_processed: u64,
    events_failed: u64,
    tick: Subscribers<Clock>,
    day_change: Subscribers<DayChange>,
    event_complete: Subscribers<ScheduledEvent>,
}

impl Engine {
    /// Build an engine starting at the configured day and hour.
    pub fn new(config: EngineConfig, mut world: World, registry: HandlerRegistry) -> Self {
        let clock = Clock::from_day_hour_minute(config.initial_day, config.initial_hour, 0);
        world.update(clock.hour(), clock.day());
        Self {
            clock,
            queue: EventQueue::new(),
            registry,
            world,
            control: Arc::new(RunControl::new()),
            config,
            events_processed: 0,
            events_failed: 0,
            tick: Subscribers::new("tick"),
            day_change: Subscribers::new("day_change"),
            event_complete: Subscribers::new("event_complete"),
        }
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

    /// The event queue.
    pub const fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// The handler registry, for registering handlers and hooks.
    pub const fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Handle for pausing, resuming and stopping from another task.
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// Events executed so far, successful or not.
    pub const fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Events that failed so far.
    pub const fn events_failed(&self) -> u64 {
        self.events_failed
    }

    /// Subscribe to the per-minute tick.
    pub fn on_tick<F>(&mut self, subscriber: F)
    where
        F: FnMut(&Clock) -> Result<(), CallbackError> + Send + 'static,
    {
        self.tick.subscribe(subscriber);
    }

    /// Subscribe to day boundaries.
    pub fn on_day_change<F>(&mut self, subscriber: F)
    where
        F: FnMut(&DayChange) -> Result<(), CallbackError> + Send + 'static,
    {
        self.day_change.subscribe(subscriber);
    }

    /// Subscribe to successfully completed events.
    pub fn on_event_complete<F>(&mut self, subscriber: F)
    where
        F: FnMut(&ScheduledEvent) -> Result<(), CallbackError> + Send + 'static,
    {
        self.event_complete.subscribe(subscriber);
    }

    // -----------------------------------------------------------------------
    // Event registration API
    // -----------------------------------------------------------------------

    /// Queue an event.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Conflict`] if the actor already has a
    /// pending event overlapping this one. Nothing is queued in that case.
    pub fn schedule(&mut self, event: ScheduledEvent) -> Result<EventId, ScheduleError> {
        let conflicts: Vec<EventId> = self
            .queue
            .check_conflict(&event)
            .iter()
            .filter_map(|e| e.id)
            .collect();
        if !conflicts.is_empty() {
            debug!(actor = %event.actor_id, ?conflicts, "Schedule refused: conflict");
            return Err(ScheduleError::Conflict {
                actor_id: event.actor_id,
                conflicts,
            });
        }
        let id = self.queue.add(event);
        debug!(event_id = %id, "Event scheduled");
        Ok(id)
    }

    /// Cancel a pending event.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.queue.cancel(id)
    }

    /// Move a pending event. Returns the new id, or `None` on conflict or
    /// unknown id.
    pub fn reschedule(&mut self, id: EventId, new_time: u64) -> Option<EventId> {
        self.queue.reschedule(id, new_time)
    }

    /// Pending events of one actor in `[start, end)`. `start` defaults to
    /// now; no `end` means unbounded.
    pub fn get_schedule(
        &self,
        actor: AgentId,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Vec<ScheduledEvent> {
        let start = start.unwrap_or_else(|| self.clock.total_minutes());
        self.queue
            .get_character_events(actor, Some(start), end)
            .into_iter()
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Advance the clock one minute at a time.
    pub fn advance_time(&mut self, minutes: u64) {
        for _ in 0..minutes {
            let before = self.clock;
            self.clock.advance(1);
            self.tick.emit(&self.clock);

            if self.clock.day() != before.day() {
                let change = DayChange {
                    previous_day: before.day(),
                    new_day: self.clock.day(),
                };
                info!(day = change.new_day, "New day");
                self.day_change.emit(&change);
            }
            if self.clock.hour() != before.hour() {
                self.world.update(self.clock.hour(), self.clock.day());
            }
        }
    }

    /// One loop body: idle a minute, or run the next event.
    ///
    /// Returns the executed event, if any.
    pub fn run_once(&mut self) -> Option<ScheduledEvent> {
        let Some(next_time) = self.queue.next_time() else {
            self.advance_time(1);
            return None;
        };

        self.advance_time(next_time.saturating_sub(self.clock.total_minutes()));
        let mut event = self.queue.pop()?;

        let (success, follow_ups) = {
            let mut ctx = EventContext::new(self.clock, &mut self.world);
            let success = self.registry.execute(&mut event, &mut ctx);
            (success, ctx.follow_ups)
        };
        self.events_processed = self.events_processed.saturating_add(1);

        for follow_up in follow_ups {
            if let Err(error) = self.schedule(follow_up) {
                warn!(error = %error, "Follow-up event dropped");
            }
        }

        if success {
            self.advance_time(event.duration);
            self.event_complete.emit(&event);
        } else {
            self.events_failed = self.events_failed.saturating_add(1);
        }
        Some(event)
    }

    fn max_minutes_reached(&self, start: Clock) -> bool {
        self.config.max_minutes > 0
            && self.clock.total_minutes().saturating_sub(start.total_minutes())
                >= self.config.max_minutes
    }

    /// Run until stopped or the `max_minutes` bound is reached.
    ///
    /// The bound is checked between iterations, so a long event may carry
    /// the clock past it.
    pub async fn run(&mut self) -> RunOutcome {
        let start = self.clock;
        let mut iterations: u64 = 0;
        self.control.start();

        info!(
            clock = %self.clock,
            pending = self.queue.len(),
            max_minutes = self.config.max_minutes,
            yield_ms = self.config.yield_ms,
            "Engine starting"
        );

        let end_reason = loop {
            if self.control.is_paused() {
                info!("Engine paused, waiting for resume...");
                self.control.wait_if_paused().await;
                info!("Engine resumed");
            }
            if self.control.is_stop_requested() {
                break EndReason::Stopped;
            }
            if self.max_minutes_reached(start) {
                break EndReason::MaxMinutesReached;
            }

            self.run_once();
            iterations = iterations.saturating_add(1);

            if self.config.yield_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.yield_ms)).await;
            } else {
                tokio::task::yield_now().await;
            }
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

    /// Request a stop.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Status summary.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            status: self.control.status(),
            clock: self.clock,
            time: self.clock.to_string(),
            pending_events: self.queue.len(),
            events_processed: self.events_processed,
            events_failed: self.events_failed,
            world: self.world.summary(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Snapshot clock, counters and pending events.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if serialization fails.
    pub fn snapshot(&self) -> Result<Value, SnapshotError> {
        let snapshot = EngineSnapshot {
            clock: self.clock,
            events_processed: self.events_processed,
            events_failed: self.events_failed,
            pending: self.queue.to_vec(),
        };
        Ok(serde_json::to_value(snapshot)?)
    }

    /// Replace clock, counters and pending events with a snapshot's.
    ///
    /// Pending events keep their ids. The world is brought up to the
    /// restored clock.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the value is not a valid snapshot. The
    /// engine is unchanged in that case.
    pub fn restore(&mut self, value: Value) -> Result<(), SnapshotError> {
        let snapshot: EngineSnapshot = serde_json::from_value(value)?;
        self.clock = snapshot.clock;
        self.events_processed = snapshot.events_processed;
        self.events_failed = snapshot.events_failed;
        self.queue.clear();
        let restored = snapshot.pending.len();
        for event in snapshot.pending {
            self.queue.restore(event);
        }
        self.world.update(self.clock.hour(), self.clock.day());
        info!(clock = %self.clock, restored, "Engine restored");
        Ok(())
    }
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("clock", &self.clock)
            .field("pending", &self.queue.len())
            .field("events_processed", &self.events_processed)
            .field("status", &self.control.status())
            .finish_non_exhaustive()
    }
}
