//! Lifecycle notifications.
//!
//! Each notification is a list of subscribers invoked in registration order.
//! A failing subscriber is logged and skipped; it never stops the others or
//! the driver loop.

use tracing::warn;

use crate::clock::Clock;

/// Error returned by a subscriber.
#[derive(Debug, thiserror::Error)]
#[error("subscriber failed: {message}")]
pub struct CallbackError {
    /// What went wrong.
    pub message: String,
}

impl CallbackError {
    /// Build an error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Boxed subscriber for payload `T`.
pub type Subscriber<T> = Box<dyn FnMut(&T) -> Result<(), CallbackError> + Send>;

/// Ordered list of subscribers for one notification.
pub struct Subscribers<T> {
    name: &'static str,
    list: Vec<Subscriber<T>>,
}

impl<T> Subscribers<T> {
    /// Empty list. `name` appears in failure logs.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            list: Vec::new(),
        }
    }

    /// Register a subscriber.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&T) -> Result<(), CallbackError> + Send + 'static,
    {
        self.list.push(Box::new(subscriber));
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Invoke every subscriber. Returns the number that failed.
    pub fn emit(&mut self, payload: &T) -> usize {
        let mut failures: usize = 0;
        for (index, subscriber) in self.list.iter_mut().enumerate() {
            if let Err(error) = subscriber(payload) {
                failures = failures.saturating_add(1);
                warn!(
                    notification = self.name,
                    subscriber = index,
                    error = %error,
                    "Subscriber failed"
                );
            }
        }
        failures
    }
}

impl<T> core::fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscribers")
            .field("name", &self.name)
            .field("len", &self.list.len())
            .finish()
    }
}

/// Payload of the time-advance notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAdvance {
    /// Clock after the skip.
    pub clock: Clock,
    /// Minutes skipped.
    pub skipped: u64,
}

/// Payload of the day-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayChange {
    /// Day that just ended.
    pub previous_day: u64,
    /// Day that just began.
    pub new_day: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn failing_subscriber_does_not_stop_the_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut subs: Subscribers<u64> = Subscribers::new("test");

        let c1 = Arc::clone(&calls);
        subs.subscribe(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        subs.subscribe(|_| Err(CallbackError::new("boom")));
        let c3 = Arc::clone(&calls);
        subs.subscribe(move |value| {
            c3.fetch_add(usize::try_from(*value).unwrap(), Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(subs.emit(&10), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 11);
        assert_eq!(subs.len(), 3);
    }
}
