//! Run control shared between a driver loop and its operator.
//!
//! [`RunControl`] is wrapped in an [`Arc`](std::sync::Arc) and handed to
//! whoever needs to pause, resume or stop a running driver. The loop parks
//! at the pause gate with [`RunControl::wait_if_paused`] and checks
//! [`RunControl::is_stop_requested`] between iterations.

use std::sync::atomic::{AtomicBool, Ordering};

use hamlet_types::RunStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::info;

use crate::clock::Clock;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Someone called [`RunControl::stop`].
    Stopped,
    /// The configured `max_minutes` bound was reached.
    MaxMinutesReached,
    /// Every agent was busy but no task remained on the heap.
    Exhausted,
}

/// Result of a driver run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Why the run ended.
    pub end_reason: EndReason,
    /// Clock when the run ended.
    pub final_clock: Clock,
    /// Simulated minutes covered by this run.
    pub minutes_elapsed: u64,
    /// Loop iterations executed.
    pub iterations: u64,
}

/// Log the end of a run.
pub fn log_run_end(driver: &str, outcome: &RunOutcome) {
    info!(
        driver,
        reason = ?outcome.end_reason,
        final_clock = %outcome.final_clock,
        minutes_elapsed = outcome.minutes_elapsed,
        iterations = outcome.iterations,
        "Run ended"
    );
}

/// Pause gate and stop flag.
#[derive(Debug, Default)]
pub struct RunControl {
    running: AtomicBool,
    paused: AtomicBool,
    stop_requested: AtomicBool,
    resume_notify: Notify,
}

impl RunControl {
    /// Fresh control: not running, not paused, no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the loop as started.
    ///
    /// A stop requested before the loop started is kept, so the loop exits
    /// on its first check.
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Mark the loop as finished. The stop request that ended it is
    /// consumed, so a later run starts clean.
    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        self.stop_requested.store(false, Ordering::Release);
    }

    /// Pause. The loop parks at the gate on its next iteration.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Request a stop. Also releases the pause gate so a paused loop sees
    /// the request.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Whether the loop is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Whether the loop is between `start` and `finish`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current run status.
    pub fn status(&self) -> RunStatus {
        if !self.is_running() {
            RunStatus::Stopped
        } else if self.is_paused() {
            RunStatus::Paused
        } else {
            RunStatus::Running
        }
    }

    /// Wait until the loop is no longer paused.
    ///
    /// Returns immediately if not paused.
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::Acquire) {
            self.resume_notify.notified().await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn status_follows_flags() {
        let control = RunControl::new();
        assert_eq!(control.status(), RunStatus::Stopped);
        control.start();
        assert_eq!(control.status(), RunStatus::Running);
        control.pause();
        assert_eq!(control.status(), RunStatus::Paused);
        control.resume();
        assert_eq!(control.status(), RunStatus::Running);
        control.finish();
        assert_eq!(control.status(), RunStatus::Stopped);
    }

    #[test]
    fn stop_before_start_is_kept() {
        let control = RunControl::new();
        control.stop();
        control.start();
        assert!(control.is_stop_requested());
        control.finish();
        assert!(!control.is_stop_requested());
    }

    #[tokio::test]
    async fn gate_is_open_when_not_paused() {
        let control = RunControl::new();
        tokio::time::timeout(Duration::from_millis(50), control.wait_if_paused())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stop_releases_a_paused_gate() {
        let control = Arc::new(RunControl::new());
        control.start();
        control.pause();

        let waiter = Arc::clone(&control);
        let handle = tokio::spawn(async move { waiter.wait_if_paused().await });

        tokio::task::yield_now().await;
        control.stop();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(control.is_stop_requested());
        assert!(!control.is_paused());
    }
}
