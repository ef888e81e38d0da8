//! Logical clock for the Hamlet simulation.
//!
//! The clock is a single minute counter. Day, hour, minute and time-of-day
//! are derived from it and never stored. Both drivers own their clock
//! exclusively and only ever move it forward.

use hamlet_types::TimeOfDay;
use serde::{Deserialize, Serialize};

/// Minutes in one hour.
pub const MINUTES_PER_HOUR: u64 = 60;

/// Minutes in one day.
pub const MINUTES_PER_DAY: u64 = 1440;

/// First daytime hour.
const DAYTIME_START: u32 = 6;

/// Last daytime hour (inclusive).
const DAYTIME_END: u32 = 21;

/// Minute counter since 00:00 of day 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Clock {
    total_minutes: u64,
}

impl Clock {
    /// Clock at the given minute count.
    pub const fn new(total_minutes: u64) -> Self {
        Self { total_minutes }
    }

    /// Clock at a wall time. Day is 1-based and clamped to at least 1;
    /// hour and minute are taken as given and may carry over.
    pub const fn from_day_hour_minute(day: u64, hour: u64, minute: u64) -> Self {
        let total = day
            .saturating_sub(1)
            .saturating_mul(MINUTES_PER_DAY)
            .saturating_add(hour.saturating_mul(MINUTES_PER_HOUR))
            .saturating_add(minute);
        Self::new(total)
    }

    /// Minutes since 00:00 of day 1.
    pub const fn total_minutes(self) -> u64 {
        self.total_minutes
    }

    /// Day number, starting at 1.
    pub const fn day(self) -> u64 {
        (self.total_minutes / MINUTES_PER_DAY).saturating_add(1)
    }

    /// Hour of day, 0-23.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn hour(self) -> u32 {
        ((self.total_minutes % MINUTES_PER_DAY) / MINUTES_PER_HOUR) as u32
    }

    /// Minute of hour, 0-59.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn minute(self) -> u32 {
        (self.total_minutes % MINUTES_PER_HOUR) as u32
    }

    /// Minutes elapsed since midnight of the current day.
    pub const fn minute_of_day(self) -> u64 {
        self.total_minutes % MINUTES_PER_DAY
    }

    /// Time-of-day bucket.
    pub const fn time_of_day(self) -> TimeOfDay {
        TimeOfDay::from_hour(self.hour())
    }

    /// Whether the hour is between 06:00 and 21:59.
    pub const fn is_daytime(self) -> bool {
        let hour = self.hour();
        hour >= DAYTIME_START && hour <= DAYTIME_END
    }

    /// Move forward by `minutes`, saturating at `u64::MAX`.
    pub const fn advance(&mut self, minutes: u64) {
        self.total_minutes = self.total_minutes.saturating_add(minutes);
    }

    /// Jump to 00:00 of `day`. Never moves backwards.
    pub const fn set_to_day_start(&mut self, day: u64) {
        let target = Self::from_day_hour_minute(day, 0, 0).total_minutes;
        if target > self.total_minutes {
            self.total_minutes = target;
        }
    }

    /// Minutes until the next occurrence of `hour:minute`.
    ///
    /// A target equal to or earlier than the current wall time wraps to the
    /// next day, so the result is always in `1..=1440`.
    pub const fn minutes_until(self, hour: u64, minute: u64) -> u64 {
        let target = (hour.saturating_mul(MINUTES_PER_HOUR).saturating_add(minute)) % MINUTES_PER_DAY;
        let now = self.minute_of_day();
        if target > now {
            target.saturating_sub(now)
        } else {
            MINUTES_PER_DAY.saturating_sub(now).saturating_add(target)
        }
    }
}

impl core::fmt::Display for Clock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Day {}, {:02}:{:02}", self.day(), self.hour(), self.minute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_wall_time() {
        let clock = Clock::from_day_hour_minute(2, 3, 15);
        assert_eq!(clock.total_minutes(), 1635);
        assert_eq!(clock.day(), 2);
        assert_eq!(clock.hour(), 3);
        assert_eq!(clock.minute(), 15);
        assert_eq!(clock.time_of_day(), TimeOfDay::Night);
        assert!(!clock.is_daytime());
    }

    #[test]
    fn day_zero_clamps_to_one() {
        assert_eq!(Clock::from_day_hour_minute(0, 8, 0), Clock::from_day_hour_minute(1, 8, 0));
    }

    #[test]
    fn daytime_bounds() {
        assert!(Clock::from_day_hour_minute(1, 6, 0).is_daytime());
        assert!(Clock::from_day_hour_minute(1, 21, 59).is_daytime());
        assert!(!Clock::from_day_hour_minute(1, 22, 0).is_daytime());
        assert!(!Clock::from_day_hour_minute(1, 5, 59).is_daytime());
    }

    #[test]
    fn advance_saturates() {
        let mut clock = Clock::new(u64::MAX.saturating_sub(1));
        clock.advance(10);
        assert_eq!(clock.total_minutes(), u64::MAX);
    }

    #[test]
    fn day_start_never_goes_back() {
        let mut clock = Clock::from_day_hour_minute(3, 10, 0);
        clock.set_to_day_start(2);
        assert_eq!(clock.day(), 3);
        assert_eq!(clock.hour(), 10);

        clock.set_to_day_start(4);
        assert_eq!(clock, Clock::from_day_hour_minute(4, 0, 0));
    }

    #[test]
    fn minutes_until_wraps() {
        let clock = Clock::from_day_hour_minute(1, 8, 0);
        assert_eq!(clock.minutes_until(9, 30), 90);
        assert_eq!(clock.minutes_until(8, 0), 1440);
        assert_eq!(clock.minutes_until(7, 0), 1380);
        assert_eq!(clock.minutes_until(8, 1), 1);
    }

    #[test]
    fn display_format() {
        assert_eq!(Clock::from_day_hour_minute(2, 3, 5).to_string(), "Day 2, 03:05");
    }
}
