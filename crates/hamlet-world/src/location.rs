//! Locations on the map with opening hours and occupant tracking.
//!
//! A [`Location`] is an axis-aligned rectangle with a category, a capacity
//! and opening hours. Occupancy is an id set, kept in sync with agent
//! positions by [`World`](crate::World).

use std::collections::BTreeSet;

use hamlet_types::{AgentId, LocationId, LocationKind};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Default side length of a location rectangle.
const DEFAULT_SIZE: f64 = 10.0;

/// Default occupant capacity.
const DEFAULT_CAPACITY: u32 = 100;

/// A place on the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Arena key.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Category.
    pub kind: LocationKind,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width in world units.
    pub width: f64,
    /// Height in world units.
    pub height: f64,
    /// Free-form description.
    pub description: String,
    /// Maximum number of occupants.
    pub capacity: u32,
    /// Whether the location is indoors.
    pub is_indoor: bool,
    /// Opening hour. `0` together with a closing hour of `24` means always open.
    pub opening_hour: u32,
    /// Closing hour (exclusive). May be smaller than the opening hour for
    /// locations open across midnight.
    pub closing_hour: u32,
    /// Agents currently inside.
    pub occupants: BTreeSet<AgentId>,
}

impl Location {
    /// A 10x10 indoor location open around the clock with capacity 100.
    pub fn new(id: LocationId, name: impl Into<String>, kind: LocationKind, x: f64, y: f64) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            x,
            y,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            description: String::new(),
            capacity: DEFAULT_CAPACITY,
            is_indoor: true,
            opening_hour: 0,
            closing_hour: 24,
            occupants: BTreeSet::new(),
        }
    }

    /// Set the rectangle size.
    #[must_use]
    pub const fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the opening hours.
    #[must_use]
    pub const fn with_hours(mut self, opening_hour: u32, closing_hour: u32) -> Self {
        self.opening_hour = opening_hour;
        self.closing_hour = closing_hour;
        self
    }

    /// Set the capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Mark the location as outdoors.
    #[must_use]
    pub const fn outdoor(mut self) -> Self {
        self.is_indoor = false;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Center of the rectangle.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether a point lies inside the rectangle (edges included).
    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        self.x <= px && px <= self.x + self.width && self.y <= py && py <= self.y + self.height
    }

    /// Distance from the center to a point.
    pub fn distance_to_point(&self, px: f64, py: f64) -> f64 {
        let (cx, cy) = self.center();
        (px - cx).hypot(py - cy)
    }

    /// Whether the location is open at the given hour.
    pub const fn is_open(&self, hour: u32) -> bool {
        if self.opening_hour == 0 && self.closing_hour == 24 {
            return true;
        }
        if self.opening_hour < self.closing_hour {
            self.opening_hour <= hour && hour < self.closing_hour
        } else {
            hour >= self.opening_hour || hour < self.closing_hour
        }
    }

    /// Number of agents inside, saturating at `u32::MAX`.
    pub fn occupant_count(&self) -> u32 {
        u32::try_from(self.occupants.len()).unwrap_or(u32::MAX)
    }

    /// Check whether an agent may enter at the given hour.
    ///
    /// An agent already inside may always stay.
    pub fn can_enter(&self, agent: AgentId, hour: u32) -> Result<(), WorldError> {
        if self.occupants.contains(&agent) {
            return Ok(());
        }
        if !self.is_open(hour) {
            return Err(WorldError::LocationClosed {
                location: self.id,
                hour,
            });
        }
        if self.occupant_count() >= self.capacity {
            return Err(WorldError::LocationAtCapacity {
                location: self.id,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Add an agent. Returns `false` if already inside.
    pub fn enter(&mut self, agent: AgentId) -> bool {
        self.occupants.insert(agent)
    }

    /// Remove an agent. Returns `false` if not inside.
    pub fn leave(&mut self, agent: AgentId) -> bool {
        self.occupants.remove(&agent)
    }
}
