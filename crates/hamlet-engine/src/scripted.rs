//! Scripted decision provider.
//!
//! Stands in for a language-model backend. Agents sleep through the night
//! and pick a random daytime activity otherwise, weighted toward staying
//! put. Randomness comes from a seeded [`StdRng`], so a run is reproducible
//! for a given seed as long as decisions are requested in the same order.

use std::sync::Mutex;

use futures::future::BoxFuture;
use hamlet_core::clock::Clock;
use hamlet_core::decision::{DecisionError, DecisionProvider};
use hamlet_types::{AgentId, Decision, TimeOfDay, WorldContext};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::debug;

/// Hour agents wake up.
const WAKE_HOUR: u64 = 7;

/// Random daytime activities and their duration ranges in minutes.
const ACTIVITIES: &[(&str, u64, u64)] = &[
    ("work", 60, 180),
    ("use_phone", 15, 45),
    ("take_photo", 5, 5),
    ("post_content", 3, 3),
    ("wait", 10, 30),
];

/// Percent chance that an awake agent walks somewhere instead.
const MOVE_CHANCE: u32 = 30;

/// Seeded, rule-based decision provider.
#[derive(Debug)]
pub struct ScriptedDecisionProvider {
    rng: Mutex<StdRng>,
}

impl ScriptedDecisionProvider {
    /// Provider seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn choose(&self, context: &WorldContext) -> Result<Decision, DecisionError> {
        if context.time_of_day == TimeOfDay::Night {
            let now = Clock::from_day_hour_minute(
                context.day,
                u64::from(context.hour),
                u64::from(context.minute),
            );
            return Ok(Decision::new("sleep").with_duration(now.minutes_until(WAKE_HOUR, 0)));
        }

        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let open: Vec<_> = context
            .nearby_locations
            .iter()
            .filter(|loc| loc.open && Some(loc.id) != context.location_id)
            .collect();
        if !open.is_empty() && rng.random_range(0..100) < MOVE_CHANCE {
            let index = rng.random_range(0..open.len());
            if let Some(target) = open.get(index) {
                // No duration: the executor estimates walking time.
                return Ok(Decision::new("move").with_payload(json!({
                    "location_id": target.id,
                    "name": target.name,
                })));
            }
        }

        let index = rng.random_range(0..ACTIVITIES.len());
        let Some(&(action, min, max)) = ACTIVITIES.get(index) else {
            return Err(DecisionError::provider("activity table is empty"));
        };
        let duration = rng.random_range(min..=max);
        Ok(Decision::new(action).with_duration(duration))
    }
}

impl DecisionProvider for ScriptedDecisionProvider {
    fn decide(
        &self,
        agent_id: AgentId,
        context: WorldContext,
    ) -> BoxFuture<'_, Result<Decision, DecisionError>> {
        let decision = self.choose(&context);
        if let Ok(ref d) = decision {
            debug!(agent = %agent_id, action = %d.action, duration = ?d.duration, "Scripted decision");
        }
        Box::pin(async move { decision })
    }
}
