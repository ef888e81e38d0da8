//! Decisions returned by a decision provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// An agent's choice of what to do next.
///
/// Providers may omit the duration; the simulation then falls back to its
/// configured default action length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Decision {
    /// Action identifier, e.g. `"move_to"`, `"sleep"`, `"browse_posts"`.
    pub action: String,
    /// Expected length in minutes.
    #[serde(default)]
    pub duration: Option<u64>,
    /// Action-specific parameters.
    #[serde(default)]
    pub payload: Value,
}

impl Decision {
    /// A decision with no explicit duration and an empty payload.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            duration: None,
            payload: Value::Null,
        }
    }

    /// Set the expected duration in minutes.
    #[must_use]
    pub const fn with_duration(mut self, minutes: u64) -> Self {
        self.duration = Some(minutes);
        self
    }

    /// Set the action payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_optional_on_the_wire() {
        let decision: Decision = serde_json::from_str(r#"{"action":"sleep"}"#).unwrap();
        assert_eq!(decision.action, "sleep");
        assert_eq!(decision.duration, None);
        assert!(decision.payload.is_null());
    }
}
