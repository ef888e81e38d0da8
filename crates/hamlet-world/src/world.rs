//! The world: environment, location arena and agent positions.

use std::collections::BTreeMap;

use hamlet_types::{AgentId, LocationId, NearbyLocation, TimeOfDay, WorldContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::environment::Environment;
use crate::error::WorldError;
use crate::location::Location;
use crate::settings::WorldSettings;

/// Maximum number of locations listed in a decision context.
const MAX_NEARBY_LOCATIONS: usize = 5;

/// Where an agent is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// Location the agent is inside, if any.
    pub location_id: Option<LocationId>,
}

impl Position {
    /// Distance to a point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// Short summary of world state for status reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSummary {
    /// World name.
    pub name: String,
    /// Day of the last update.
    pub day: u64,
    /// Current season.
    pub season: hamlet_types::Season,
    /// Current weather.
    pub weather: hamlet_types::Weather,
    /// Outdoor temperature.
    pub outdoor_temperature: f64,
    /// Indoor temperature.
    pub indoor_temperature: f64,
    /// Number of locations.
    pub locations: usize,
    /// Number of agents with a position.
    pub agents: usize,
}

/// Shared world state mutated by handlers and executors.
#[derive(Debug, Clone)]
pub struct World {
    settings: WorldSettings,
    environment: Environment,
    locations: BTreeMap<LocationId, Location>,
    positions: BTreeMap<AgentId, Position>,
}

impl World {
    /// Empty world with initial environment conditions.
    pub fn new(settings: WorldSettings) -> Self {
        let environment = Environment::new(&settings);
        Self {
            settings,
            environment,
            locations: BTreeMap::new(),
            positions: BTreeMap::new(),
        }
    }

    /// World settings.
    pub const fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Current environment.
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Hourly update of season, weather and temperature.
    pub fn update(&mut self, hour: u32, day: u64) {
        let previous_season = self.environment.season;
        let weather_changed = self.environment.update(hour, day, &self.settings);
        if self.environment.season != previous_season {
            info!(day, season = ?self.environment.season, "Season changed");
        }
        if weather_changed {
            debug!(day, hour, weather = ?self.environment.weather, "Weather changed");
        }
    }

    // -----------------------------------------------------------------------
    // Locations
    // -----------------------------------------------------------------------

    /// Insert a location.
    pub fn add_location(&mut self, location: Location) -> Result<(), WorldError> {
        if self.locations.contains_key(&location.id) {
            return Err(WorldError::DuplicateLocation(location.id));
        }
        self.locations.insert(location.id, location);
        Ok(())
    }

    /// Look up a location.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// All locations in id order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// First location whose rectangle contains the point.
    pub fn location_at(&self, x: f64, y: f64) -> Option<LocationId> {
        self.locations
            .values()
            .find(|loc| loc.contains_point(x, y))
            .map(|loc| loc.id)
    }

    /// Locations within `radius` of a point, closest first.
    pub fn nearby_locations(&self, x: f64, y: f64, radius: f64) -> Vec<(&Location, f64)> {
        let mut found: Vec<(&Location, f64)> = self
            .locations
            .values()
            .map(|loc| (loc, loc.distance_to_point(x, y)))
            .filter(|(_, d)| *d <= radius)
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }

    /// Agents inside a location.
    pub fn agents_at(&self, location: LocationId) -> Vec<AgentId> {
        self.locations
            .get(&location)
            .map(|loc| loc.occupants.iter().copied().collect())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    /// Current position of an agent.
    pub fn position(&self, agent: AgentId) -> Option<&Position> {
        self.positions.get(&agent)
    }

    /// Number of agents with a position.
    pub fn agent_count(&self) -> usize {
        self.positions.len()
    }

    /// Place an agent, bypassing opening hours and capacity.
    ///
    /// Used for seeding and restoring. Occupancy follows the new location.
    pub fn place_agent(
        &mut self,
        agent: AgentId,
        x: f64,
        y: f64,
        location_id: Option<LocationId>,
    ) -> Result<(), WorldError> {
        if let Some(id) = location_id.filter(|id| !self.locations.contains_key(id)) {
            return Err(WorldError::LocationNotFound(id));
        }
        self.relocate(agent, x, y, location_id);
        Ok(())
    }

    /// Move an agent into a location, checking opening hours and capacity.
    ///
    /// The agent ends up at the location's center.
    pub fn move_agent_to_location(
        &mut self,
        agent: AgentId,
        location_id: LocationId,
        hour: u32,
    ) -> Result<(), WorldError> {
        if !self.positions.contains_key(&agent) {
            return Err(WorldError::AgentNotFound(agent));
        }
        let location = self
            .locations
            .get(&location_id)
            .ok_or(WorldError::LocationNotFound(location_id))?;
        location.can_enter(agent, hour)?;
        let (x, y) = location.center();
        self.relocate(agent, x, y, Some(location_id));
        debug!(agent = %agent, location = %location_id, "Agent entered location");
        Ok(())
    }

    /// Move an agent to a point. The agent is inside whichever location
    /// contains the point, if any.
    pub fn move_agent_to_point(&mut self, agent: AgentId, x: f64, y: f64) -> Result<(), WorldError> {
        if !self.positions.contains_key(&agent) {
            return Err(WorldError::AgentNotFound(agent));
        }
        let x = x.clamp(0.0, self.settings.map_width);
        let y = y.clamp(0.0, self.settings.map_height);
        let location_id = self.location_at(x, y);
        self.relocate(agent, x, y, location_id);
        Ok(())
    }

    /// Remove an agent from the map. Returns `false` if it had no position.
    pub fn remove_agent(&mut self, agent: AgentId) -> bool {
        let Some(previous) = self.positions.remove(&agent) else {
            return false;
        };
        if let Some(loc) = previous
            .location_id
            .and_then(|id| self.locations.get_mut(&id))
        {
            loc.leave(agent);
        }
        true
    }

    fn relocate(&mut self, agent: AgentId, x: f64, y: f64, location_id: Option<LocationId>) {
        let previous = self.positions.insert(agent, Position { x, y, location_id });
        if let Some(loc) = previous
            .and_then(|p| p.location_id)
            .filter(|id| Some(*id) != location_id)
            .and_then(|id| self.locations.get_mut(&id))
        {
            loc.leave(agent);
        }
        if let Some(loc) = location_id.and_then(|id| self.locations.get_mut(&id)) {
            loc.enter(agent);
        }
    }

    /// Agents within `radius` of a point.
    pub fn nearby_agents(&self, x: f64, y: f64, radius: f64) -> Vec<AgentId> {
        self.positions
            .iter()
            .filter(|(_, pos)| pos.distance_to(x, y) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Other agents within `radius` of an agent.
    pub fn check_encounter(&self, agent: AgentId, radius: f64) -> Vec<AgentId> {
        let Some(pos) = self.positions.get(&agent) else {
            return Vec::new();
        };
        self.nearby_agents(pos.x, pos.y, radius)
            .into_iter()
            .filter(|other| *other != agent)
            .collect()
    }

    /// Whether two agents are within the configured encounter radius.
    pub fn within_encounter_radius(&self, a: AgentId, b: AgentId) -> bool {
        match (self.positions.get(&a), self.positions.get(&b)) {
            (Some(pa), Some(pb)) => pa.distance_to(pb.x, pb.y) <= self.settings.encounter_radius,
            _ => false,
        }
    }

    /// Walking time in minutes to a point, at least one.
    ///
    /// Returns `None` if the agent has no position.
    pub fn movement_minutes(&self, agent: AgentId, x: f64, y: f64) -> Option<u64> {
        let pos = self.positions.get(&agent)?;
        if self.settings.walk_speed <= 0.0 {
            return Some(1);
        }
        let minutes = (pos.distance_to(x, y) / self.settings.walk_speed).floor();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = minutes.max(0.0) as u64;
        Some(whole.max(1))
    }

    /// Assemble the decision context for an agent at a clock reading.
    pub fn context_for(&self, agent: AgentId, day: u64, hour: u32, minute: u32) -> WorldContext {
        let position = self.positions.get(&agent);
        let current = position
            .and_then(|p| p.location_id)
            .and_then(|id| self.locations.get(&id));

        let (nearby_locations, nearby_agents) = position.map_or_else(
            || (Vec::new(), Vec::new()),
            |pos| {
                let locations = self
                    .nearby_locations(pos.x, pos.y, self.settings.location_radius)
                    .into_iter()
                    .take(MAX_NEARBY_LOCATIONS)
                    .map(|(loc, distance)| NearbyLocation {
                        id: loc.id,
                        name: loc.name.clone(),
                        kind: loc.kind,
                        distance,
                        open: loc.is_open(hour),
                    })
                    .collect();
                let agents = self
                    .nearby_agents(pos.x, pos.y, self.settings.nearby_radius)
                    .into_iter()
                    .filter(|other| *other != agent)
                    .collect();
                (locations, agents)
            },
        );

        WorldContext {
            agent_id: agent,
            day,
            hour,
            minute,
            time_of_day: TimeOfDay::from_hour(hour),
            season: self.environment.season,
            weather: self.environment.weather,
            outdoor_temperature: self.environment.outdoor_temperature,
            indoor_temperature: self.environment.indoor_temperature,
            position: position.map(|p| (p.x, p.y)),
            location_id: current.map(|loc| loc.id),
            indoors: current.is_some_and(|loc| loc.is_indoor),
            nearby_locations,
            nearby_agents,
        }
    }

    /// Summary for status reports.
    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            name: self.settings.name.clone(),
            day: self.environment.day,
            season: self.environment.season,
            weather: self.environment.weather,
            outdoor_temperature: self.environment.outdoor_temperature,
            indoor_temperature: self.environment.indoor_temperature,
            locations: self.locations.len(),
            agents: self.positions.len(),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldSettings::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use hamlet_types::LocationKind;

    use super::*;

    fn world() -> World {
        let mut world = World::default();
        world
            .add_location(
                Location::new(LocationId::new(1), "Plaza", LocationKind::Public, 200.0, 200.0)
                    .with_size(60.0, 60.0)
                    .outdoor(),
            )
            .unwrap();
        world
            .add_location(
                Location::new(LocationId::new(2), "Cafe", LocationKind::Commercial, 100.0, 150.0)
                    .with_size(30.0, 25.0)
                    .with_hours(7, 22)
                    .with_capacity(1),
            )
            .unwrap();
        world
    }

    #[test]
    fn duplicate_location_is_rejected() {
        let mut world = world();
        let dup = Location::new(LocationId::new(1), "Again", LocationKind::Public, 0.0, 0.0);
        assert!(matches!(
            world.add_location(dup),
            Err(WorldError::DuplicateLocation(_))
        ));
    }

    #[test]
    fn occupancy_follows_position() {
        let mut world = world();
        let a = AgentId::new(1);
        world.place_agent(a, 210.0, 220.0, Some(LocationId::new(1))).unwrap();
        assert_eq!(world.agents_at(LocationId::new(1)), vec![a]);

        world.move_agent_to_location(a, LocationId::new(2), 9).unwrap();
        assert!(world.agents_at(LocationId::new(1)).is_empty());
        assert_eq!(world.agents_at(LocationId::new(2)), vec![a]);
        assert_eq!(world.position(a).unwrap().x, 115.0);

        world.move_agent_to_point(a, 5.0, 5.0).unwrap();
        assert!(world.agents_at(LocationId::new(2)).is_empty());
        assert_eq!(world.position(a).unwrap().location_id, None);

        assert!(world.remove_agent(a));
        assert!(world.position(a).is_none());
    }

    #[test]
    fn closed_or_full_location_refuses_entry() {
        let mut world = world();
        let a = AgentId::new(1);
        let b = AgentId::new(2);
        world.place_agent(a, 0.0, 0.0, None).unwrap();
        world.place_agent(b, 0.0, 0.0, None).unwrap();

        assert!(matches!(
            world.move_agent_to_location(a, LocationId::new(2), 23),
            Err(WorldError::LocationClosed { .. })
        ));
        world.move_agent_to_location(a, LocationId::new(2), 10).unwrap();
        assert!(matches!(
            world.move_agent_to_location(b, LocationId::new(2), 10),
            Err(WorldError::LocationAtCapacity { .. })
        ));
        assert!(matches!(
            world.move_agent_to_location(AgentId::new(9), LocationId::new(1), 10),
            Err(WorldError::AgentNotFound(_))
        ));
    }

    #[test]
    fn encounters_exclude_self() {
        let mut world = world();
        world.place_agent(AgentId::new(1), 10.0, 10.0, None).unwrap();
        world.place_agent(AgentId::new(2), 12.0, 13.0, None).unwrap();
        world.place_agent(AgentId::new(3), 100.0, 100.0, None).unwrap();

        assert_eq!(world.check_encounter(AgentId::new(1), 5.0), vec![AgentId::new(2)]);
        assert!(world.within_encounter_radius(AgentId::new(1), AgentId::new(2)));
        assert!(!world.within_encounter_radius(AgentId::new(1), AgentId::new(3)));
    }

    #[test]
    fn movement_takes_at_least_a_minute() {
        let mut world = world();
        world.place_agent(AgentId::new(1), 0.0, 0.0, None).unwrap();
        assert_eq!(world.movement_minutes(AgentId::new(1), 1.0, 0.0), Some(1));
        assert_eq!(world.movement_minutes(AgentId::new(1), 30.0, 40.0), Some(10));
        assert_eq!(world.movement_minutes(AgentId::new(7), 1.0, 0.0), None);
    }

    #[test]
    fn context_lists_nearby() {
        let mut world = world();
        world.place_agent(AgentId::new(1), 110.0, 160.0, Some(LocationId::new(2))).unwrap();
        world.place_agent(AgentId::new(2), 120.0, 170.0, None).unwrap();

        let ctx = world.context_for(AgentId::new(1), 1, 9, 30);
        assert_eq!(ctx.location_id, Some(LocationId::new(2)));
        assert!(ctx.indoors);
        assert_eq!(ctx.nearby_agents, vec![AgentId::new(2)]);
        assert_eq!(ctx.nearby_locations.first().map(|l| l.id), Some(LocationId::new(2)));
        assert_eq!(ctx.time_of_day, TimeOfDay::Morning);
    }
}
