//! Enumeration types for the Hamlet simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Time and environment
// ---------------------------------------------------------------------------

/// Coarse bucket of the wall-clock hour.
///
/// | Bucket    | Hours   |
/// |-----------|---------|
/// | Morning   | 06-11   |
/// | Noon      | 12-13   |
/// | Afternoon | 14-17   |
/// | Evening   | 18-21   |
/// | Night     | 22-05   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TimeOfDay {
    /// 06:00 to 11:59.
    Morning,
    /// 12:00 to 13:59.
    Noon,
    /// 14:00 to 17:59.
    Afternoon,
    /// 18:00 to 21:59.
    Evening,
    /// 22:00 to 05:59.
    Night,
}

impl TimeOfDay {
    /// Bucket an hour of the day (0-23). Out-of-range hours count as night.
    pub const fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=13 => Self::Noon,
            14..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// Lowercase label, as shown to decision providers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Noon => "noon",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }
}

impl core::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Season of the year. Each season lasts a configurable number of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Season {
    /// First season of the year.
    Spring,
    /// Second season.
    Summer,
    /// Third season.
    Autumn,
    /// Fourth season.
    Winter,
}

impl Season {
    /// All seasons in calendar order.
    pub const ALL: [Self; 4] = [Self::Spring, Self::Summer, Self::Autumn, Self::Winter];

    /// Season for a 0-based season index, wrapping every four seasons.
    pub const fn from_index(index: u64) -> Self {
        match index % 4 {
            0 => Self::Spring,
            1 => Self::Summer,
            2 => Self::Autumn,
            _ => Self::Winter,
        }
    }
}

/// Current weather over the whole map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Weather {
    /// Clear skies.
    Sunny,
    /// Overcast.
    Cloudy,
    /// Rain.
    Rainy,
    /// Thunderstorm.
    Stormy,
    /// Snowfall.
    Snowy,
    /// Low visibility.
    Foggy,
}

impl Weather {
    /// Every weather variant, in the order used by the weight tables.
    pub const ALL: [Self; 6] = [
        Self::Sunny,
        Self::Cloudy,
        Self::Rainy,
        Self::Stormy,
        Self::Snowy,
        Self::Foggy,
    ];

    /// Temperature offset in whole degrees Celsius applied on top of the
    /// seasonal base.
    pub const fn temperature_offset(self) -> i32 {
        match self {
            Self::Sunny => 2,
            Self::Cloudy => 0,
            Self::Rainy => -3,
            Self::Stormy => -5,
            Self::Snowy => -8,
            Self::Foggy => -2,
        }
    }
}

/// Category of a location on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LocationKind {
    /// Parks, squares, streets.
    Public,
    /// Shops, cafes, restaurants.
    Commercial,
    /// Homes.
    Residential,
    /// Offices and studios.
    Workplace,
    /// Clinics and hospitals.
    Medical,
    /// Town hall and other offices.
    Government,
    /// Schools and libraries.
    Education,
    /// Gyms, cinemas, beaches.
    Recreation,
}

// ---------------------------------------------------------------------------
// Scheduled events
// ---------------------------------------------------------------------------

/// Kind of a scheduled event. Selects the handler in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    // --- Personal ---
    /// Working at a job.
    Work,
    /// Waiting in place.
    Wait,
    /// Sleeping.
    Sleep,
    /// Taking a photo.
    TakePhoto,
    /// Publishing a post.
    PostContent,
    /// Looking at the phone (feed, messages).
    UsePhone,
    /// Walking somewhere.
    Move,

    // --- Collective ---
    /// Face-to-face group conversation.
    OfflineChat,
    /// Group chat over the network.
    OnlineGroupChat,
    /// Private chat over the network.
    OnlinePrivateChat,

    // --- Emergency ---
    /// Two agents ran into each other.
    Encounter,
    /// An agent is getting exhausted.
    FatigueWarning,
    /// Something visible happened nearby.
    VisualEvent,
    /// Something audible happened nearby.
    AudioEvent,
}

impl EventKind {
    /// Whether the kind involves more than one agent.
    pub const fn is_collective(self) -> bool {
        matches!(
            self,
            Self::OfflineChat | Self::OnlineGroupChat | Self::OnlinePrivateChat
        )
    }

    /// Whether the kind belongs to the emergency family.
    pub const fn is_emergency(self) -> bool {
        matches!(
            self,
            Self::Encounter | Self::FatigueWarning | Self::VisualEvent | Self::AudioEvent
        )
    }
}

/// Urgency of a scheduled event. Smaller value means more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventPriority {
    /// System events (0).
    Critical,
    /// Sudden events such as encounters (10).
    Emergency,
    /// High (20).
    High,
    /// Default priority (50).
    #[default]
    Normal,
    /// Low (80).
    Low,
    /// Background work (100).
    Background,
}

impl EventPriority {
    /// Numeric rank used for ordering.
    pub const fn value(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Emergency => 10,
            Self::High => 20,
            Self::Normal => 50,
            Self::Low => 80,
            Self::Background => 100,
        }
    }
}

impl PartialOrd for EventPriority {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventPriority {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.value().cmp(&other.value())
    }
}

/// Lifecycle status of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventStatus {
    /// Waiting in the queue.
    #[default]
    Pending,
    /// Handler is running.
    InProgress,
    /// Handler succeeded.
    Completed,
    /// Cancelled before execution.
    Cancelled,
    /// Handler or hook failed. Never retried automatically.
    Failed,
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Run status shared by the tick engine and the action-driven simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RunStatus {
    /// Not running.
    #[default]
    Stopped,
    /// Loop is advancing time.
    Running,
    /// Loop is parked at the pause gate.
    Paused,
}
