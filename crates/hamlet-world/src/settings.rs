//! World settings, deserialized from the `world` section of the config file.

use hamlet_types::Season;
use serde::{Deserialize, Serialize};

/// Tunables for the world collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Display name of the world.
    #[serde(default = "default_name")]
    pub name: String,

    /// Seed for weather rolls. The same seed replays the same weather.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Map width in world units.
    #[serde(default = "default_map_size")]
    pub map_width: f64,

    /// Map height in world units.
    #[serde(default = "default_map_size")]
    pub map_height: f64,

    /// Probability that the weather changes on an hourly update.
    #[serde(default = "default_weather_change_probability")]
    pub weather_change_probability: f64,

    /// Walking speed in world units per minute.
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f64,

    /// Distance at which two agents count as meeting.
    #[serde(default = "default_encounter_radius")]
    pub encounter_radius: f64,

    /// Radius for the nearby-agents list in the decision context.
    #[serde(default = "default_nearby_radius")]
    pub nearby_radius: f64,

    /// Radius for the nearby-locations list in the decision context.
    #[serde(default = "default_location_radius")]
    pub location_radius: f64,

    /// Number of days per season.
    #[serde(default = "default_days_per_season")]
    pub days_per_season: u64,

    /// Base outdoor temperature per season.
    #[serde(default)]
    pub base_temperature: BaseTemperatures,
}

/// Base temperature in degrees Celsius for each season.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BaseTemperatures {
    /// Spring base.
    #[serde(default = "default_spring")]
    pub spring: f64,
    /// Summer base.
    #[serde(default = "default_summer")]
    pub summer: f64,
    /// Autumn base.
    #[serde(default = "default_autumn")]
    pub autumn: f64,
    /// Winter base.
    #[serde(default = "default_winter")]
    pub winter: f64,
}

impl BaseTemperatures {
    /// Base temperature for a season.
    pub const fn for_season(&self, season: Season) -> f64 {
        match season {
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Autumn => self.autumn,
            Season::Winter => self.winter,
        }
    }
}

fn default_name() -> String {
    "Hamlet".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_map_size() -> f64 {
    500.0
}

const fn default_weather_change_probability() -> f64 {
    0.1
}

const fn default_walk_speed() -> f64 {
    5.0
}

const fn default_encounter_radius() -> f64 {
    5.0
}

const fn default_nearby_radius() -> f64 {
    30.0
}

const fn default_location_radius() -> f64 {
    50.0
}

const fn default_days_per_season() -> u64 {
    30
}

const fn default_spring() -> f64 {
    18.0
}

const fn default_summer() -> f64 {
    28.0
}

const fn default_autumn() -> f64 {
    15.0
}

const fn default_winter() -> f64 {
    5.0
}

impl Default for BaseTemperatures {
    fn default() -> Self {
        Self {
            spring: default_spring(),
            summer: default_summer(),
            autumn: default_autumn(),
            winter: default_winter(),
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: default_seed(),
            map_width: default_map_size(),
            map_height: default_map_size(),
            weather_change_probability: default_weather_change_probability(),
            walk_speed: default_walk_speed(),
            encounter_radius: default_encounter_radius(),
            nearby_radius: default_nearby_radius(),
            location_radius: default_location_radius(),
            days_per_season: default_days_per_season(),
            base_temperature: BaseTemperatures::default(),
        }
    }
}
