//! Decision provider contract.
//!
//! Whenever an agent goes idle the [`Simulation`](crate::simulation::Simulation)
//! hands its [`WorldContext`] to a [`DecisionProvider`] and waits for a
//! [`Decision`]. The provider could be a language-model client, a scripted
//! bot or a test stub. Requests for different agents run concurrently and
//! each one is bounded by the configured decision timeout, which the
//! simulation applies; providers do not need their own deadline.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use hamlet_types::{AgentId, Decision, WorldContext};

/// Errors that can occur while obtaining a decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// The provider did not answer within the deadline.
    #[error("agent {agent_id} timed out (deadline: {deadline_ms}ms)")]
    Timeout {
        /// The agent that timed out.
        agent_id: AgentId,
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// The provider failed.
    #[error("decision provider error: {message}")]
    Provider {
        /// Description of the error.
        message: String,
    },
}

impl DecisionError {
    /// Shorthand for [`DecisionError::Provider`].
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}

/// A source of agent decisions.
pub trait DecisionProvider: Send + Sync {
    /// Decide what `agent_id` does next.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Provider`] when no decision can be made. The
    /// agent stays idle and is asked again on the next iteration.
    fn decide(
        &self,
        agent_id: AgentId,
        context: WorldContext,
    ) -> BoxFuture<'_, Result<Decision, DecisionError>>;
}

/// Provider that answers every agent with a fixed decision.
///
/// Agents without an entry get the fallback. Useful for tests and for
/// running a world with no decision logic at all.
#[derive(Debug, Clone)]
pub struct FixedDecisionProvider {
    per_agent: BTreeMap<AgentId, Decision>,
    fallback: Decision,
}

impl FixedDecisionProvider {
    /// Provider that always returns `fallback`.
    pub const fn new(fallback: Decision) -> Self {
        Self {
            per_agent: BTreeMap::new(),
            fallback,
        }
    }

    /// Use `decision` for `agent_id` instead of the fallback.
    #[must_use]
    pub fn with_agent(mut self, agent_id: AgentId, decision: Decision) -> Self {
        self.per_agent.insert(agent_id, decision);
        self
    }
}

impl Default for FixedDecisionProvider {
    fn default() -> Self {
        Self::new(Decision::new("wait"))
    }
}

impl DecisionProvider for FixedDecisionProvider {
    fn decide(
        &self,
        agent_id: AgentId,
        _context: WorldContext,
    ) -> BoxFuture<'_, Result<Decision, DecisionError>> {
        let decision = self
            .per_agent
            .get(&agent_id)
            .unwrap_or(&self.fallback)
            .clone();
        Box::pin(async move { Ok(decision) })
    }
}
