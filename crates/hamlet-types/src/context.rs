//! World context handed to decision providers.
//!
//! The context is assembled by the world from the clock reading and the
//! agent's position. It is the only view of the world a decision provider
//! gets, so everything a prompt needs lives here.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{LocationKind, Season, TimeOfDay, Weather};
use crate::ids::{AgentId, LocationId};

/// A nearby location as seen from the agent's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyLocation {
    /// Location id.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Category.
    pub kind: LocationKind,
    /// Distance from the agent to the location's center.
    pub distance: f64,
    /// Whether the location is open at the current hour.
    pub open: bool,
}

/// Everything an agent can perceive when asked for a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldContext {
    /// The agent being asked.
    pub agent_id: AgentId,
    /// Day number, starting at 1.
    pub day: u64,
    /// Hour of day (0-23).
    pub hour: u32,
    /// Minute of hour (0-59).
    pub minute: u32,
    /// Time-of-day bucket.
    pub time_of_day: TimeOfDay,
    /// Current season.
    pub season: Season,
    /// Current weather.
    pub weather: Weather,
    /// Outdoor temperature in degrees Celsius.
    pub outdoor_temperature: f64,
    /// Indoor temperature in degrees Celsius.
    pub indoor_temperature: f64,
    /// Agent position, if the world knows it.
    pub position: Option<(f64, f64)>,
    /// Location the agent is inside, if any.
    pub location_id: Option<LocationId>,
    /// Whether the agent is indoors.
    pub indoors: bool,
    /// Up to five closest locations.
    pub nearby_locations: Vec<NearbyLocation>,
    /// Other agents within the nearby radius.
    pub nearby_agents: Vec<AgentId>,
}
