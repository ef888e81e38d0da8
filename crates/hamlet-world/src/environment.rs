//! Weather, season and temperature.
//!
//! The environment is updated once per simulated hour. Each update recomputes
//! the season from the day number, rolls for a weather change and recomputes
//! outdoor and indoor temperatures.
//!
//! # Weather weights
//!
//! When the hourly change roll succeeds, the new weather is drawn from
//! season-dependent weights:
//!
//! | Weather | Spring | Summer | Autumn | Winter |
//! |---------|--------|--------|--------|--------|
//! | Sunny   | 40     | 50     | 40     | 20     |
//! | Cloudy  | 30     | 30     | 35     | 40     |
//! | Rainy   | 25     | 15     | 15     | 15     |
//! | Stormy  | 5      | 10     | 5      | 5      |
//! | Snowy   | 0      | 0      | 0      | 20     |
//! | Foggy   | 10     | 10     | 20     | 10     |
//!
//! # Determinism
//!
//! Rolls come from an `xorshift64` mix of `(seed, hour index)`, so the same
//! seed and the same sequence of updates replay the same weather.

use hamlet_types::{Season, Weather};
use serde::{Deserialize, Serialize};

use crate::settings::WorldSettings;

/// Hour with the highest outdoor temperature.
const PEAK_HOUR: f64 = 14.0;

/// Maximum drop below the seasonal base over the day.
const DAILY_SWING: f64 = 8.0;

/// Indoor temperature bounds.
const INDOOR_MIN: f64 = 18.0;
const INDOOR_MAX: f64 = 26.0;

/// Hour used for the initial temperature reading.
const INITIAL_HOUR: u32 = 12;

/// Seasonal weather weights, in [`Weather::ALL`] order.
#[derive(Debug, Clone, Copy)]
pub struct SeasonWeights {
    weights: [u32; 6],
}

impl SeasonWeights {
    /// Return the weather weights for the given season.
    pub const fn for_season(season: Season) -> Self {
        let weights = match season {
            Season::Spring => [40, 30, 25, 5, 0, 10],
            Season::Summer => [50, 30, 15, 10, 0, 10],
            Season::Autumn => [40, 35, 15, 5, 0, 20],
            Season::Winter => [20, 40, 15, 5, 20, 10],
        };
        Self { weights }
    }

    /// Sum of all weights.
    pub fn total(&self) -> u32 {
        self.weights.iter().fold(0_u32, |acc, w| acc.saturating_add(*w))
    }

    /// Select a weather given a roll in `[0, total())`.
    pub fn select(&self, roll: u32) -> Weather {
        let mut cumulative: u32 = 0;
        for (weather, weight) in Weather::ALL.iter().zip(self.weights.iter()) {
            cumulative = cumulative.saturating_add(*weight);
            if roll < cumulative {
                return *weather;
            }
        }
        Weather::Sunny
    }
}

/// Current environmental conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    /// Current weather.
    pub weather: Weather,
    /// Current season.
    pub season: Season,
    /// Outdoor temperature in degrees Celsius.
    pub outdoor_temperature: f64,
    /// Indoor temperature in degrees Celsius.
    pub indoor_temperature: f64,
    /// Day number of the last update.
    pub day: u64,
}

impl Environment {
    /// Initial conditions: day 1, spring, sunny, noon temperatures.
    pub fn new(settings: &WorldSettings) -> Self {
        let mut env = Self {
            weather: Weather::Sunny,
            season: Season::Spring,
            outdoor_temperature: 0.0,
            indoor_temperature: 0.0,
            day: 1,
        };
        env.update_temperature(INITIAL_HOUR, settings);
        env
    }

    /// Hourly update.
    ///
    /// Returns `true` when the weather changed.
    pub fn update(&mut self, hour: u32, day: u64, settings: &WorldSettings) -> bool {
        self.day = day.max(1);
        self.season = season_for_day(self.day, settings.days_per_season);

        let hour_index = self
            .day
            .saturating_sub(1)
            .saturating_mul(24)
            .saturating_add(u64::from(hour));
        let random = deterministic_random(settings.seed, hour_index);

        let mut changed = false;
        if unit_interval(random) < settings.weather_change_probability {
            let weights = SeasonWeights::for_season(self.season);
            let total = weights.total();
            if total > 0 {
                // Second draw so the change roll and the pick are independent.
                let pick = deterministic_random(random, hour_index);
                let roll = u32::try_from(pick.checked_rem(u64::from(total)).unwrap_or(0))
                    .unwrap_or(0);
                let next = weights.select(roll);
                changed = next != self.weather;
                self.weather = next;
            }
        }

        self.update_temperature(hour, settings);
        changed
    }

    /// Recompute temperatures for the given hour.
    ///
    /// Outdoor is the seasonal base, minus up to 8 degrees away from the
    /// 14:00 peak, plus the weather offset. Indoor is the base clamped to
    /// the comfort range.
    pub fn update_temperature(&mut self, hour: u32, settings: &WorldSettings) {
        let base = settings.base_temperature.for_season(self.season);
        let hour_factor = -(f64::from(hour) - PEAK_HOUR).abs() / PEAK_HOUR * DAILY_SWING;
        let weather_factor = f64::from(self.weather.temperature_offset());
        self.outdoor_temperature = base + hour_factor + weather_factor;
        self.indoor_temperature = base.clamp(INDOOR_MIN, INDOOR_MAX);
    }
}

/// Season for a 1-based day number.
///
/// A `days_per_season` of zero pins the world to spring.
pub fn season_for_day(day: u64, days_per_season: u64) -> Season {
    let index = day
        .saturating_sub(1)
        .checked_div(days_per_season)
        .unwrap_or(0);
    Season::from_index(index)
}

/// Map a random `u64` into `[0, 1]` using its upper 32 bits.
fn unit_interval(random: u64) -> f64 {
    let high = u32::try_from(random >> 32).unwrap_or(u32::MAX);
    f64::from(high) / f64::from(u32::MAX)
}

/// `xorshift64` over a mix of the seed and an hour index.
const fn deterministic_random(seed: u64, index: u64) -> u64 {
    let mut state = seed.wrapping_add(index.wrapping_mul(0x517c_c1b7_2722_0a95));

    if state == 0 {
        state = 0xdead_beef_cafe_babe;
    }

    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;

    state
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn seasons_rotate_every_thirty_days() {
        assert_eq!(season_for_day(1, 30), Season::Spring);
        assert_eq!(season_for_day(30, 30), Season::Spring);
        assert_eq!(season_for_day(31, 30), Season::Summer);
        assert_eq!(season_for_day(91, 30), Season::Winter);
        assert_eq!(season_for_day(121, 30), Season::Spring);
        assert_eq!(season_for_day(500, 0), Season::Spring);
    }

    #[test]
    fn temperature_peaks_at_fourteen() {
        let settings = WorldSettings::default();
        let mut env = Environment::new(&settings);
        env.weather = Weather::Cloudy;

        env.update_temperature(14, &settings);
        assert_eq!(env.outdoor_temperature, 18.0);

        env.update_temperature(0, &settings);
        assert_eq!(env.outdoor_temperature, 10.0);
        assert_eq!(env.indoor_temperature, 18.0);
    }

    #[test]
    fn indoor_temperature_is_clamped() {
        let settings = WorldSettings::default();
        let mut env = Environment::new(&settings);
        env.season = Season::Summer;
        env.update_temperature(12, &settings);
        assert_eq!(env.indoor_temperature, 26.0);

        env.season = Season::Winter;
        env.update_temperature(12, &settings);
        assert_eq!(env.indoor_temperature, 18.0);
    }

    #[test]
    fn weather_is_reproducible_for_a_seed() {
        let settings = WorldSettings::default();
        let mut a = Environment::new(&settings);
        let mut b = Environment::new(&settings);
        for hour_index in 0_u64..500 {
            let day = hour_index / 24 + 1;
            let hour = u32::try_from(hour_index % 24).unwrap();
            a.update(hour, day, &settings);
            b.update(hour, day, &settings);
            assert_eq!(a.weather, b.weather);
        }
    }

    #[test]
    fn weather_never_changes_with_zero_probability() {
        let settings = WorldSettings {
            weather_change_probability: 0.0,
            ..WorldSettings::default()
        };
        let mut env = Environment::new(&settings);
        for hour in 0..24 {
            assert!(!env.update(hour, 1, &settings));
        }
        assert_eq!(env.weather, Weather::Sunny);
    }

    #[test]
    fn no_snow_outside_winter() {
        let weights = SeasonWeights::for_season(Season::Summer);
        for roll in 0..weights.total() {
            assert_ne!(weights.select(roll), Weather::Snowy);
        }
    }

    #[test]
    fn weather_changes_at_full_probability() {
        let settings = WorldSettings {
            weather_change_probability: 1.1,
            days_per_season: 1,
            ..WorldSettings::default()
        };
        let mut env = Environment::new(&settings);
        let mut seen = std::collections::BTreeSet::new();
        for hour_index in 0_u64..400 {
            let day = hour_index / 24 + 1;
            let hour = u32::try_from(hour_index % 24).unwrap();
            env.update(hour, day, &settings);
            seen.insert(env.weather);
        }
        assert!(seen.len() > 3, "expected varied weather, saw {seen:?}");
    }
}
