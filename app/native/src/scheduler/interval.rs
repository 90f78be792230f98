//! Symbolic wallpaper cadences and their concrete durations.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// How often the wallpaper changes.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Change every hour.
    Hourly,
    /// Change once a day.
    #[default]
    Daily,
    /// Change once a week.
    Weekly,
}

impl Interval {
    /// All intervals, shortest first.
    pub const ALL: [Self; 3] = [Self::Hourly, Self::Daily, Self::Weekly];

    /// Returns the lowercase name used in persistence and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Maps symbolic intervals to concrete durations.
///
/// `Mock` keeps the same names but fires within minutes, for exercising the
/// full schedule by hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IntervalProfile {
    /// Real-world cadences.
    #[default]
    Production,
    /// Compressed cadences for manual testing.
    Mock,
}

impl IntervalProfile {
    /// Returns the concrete duration for `interval` under this profile.
    #[must_use]
    pub const fn duration(self, interval: Interval) -> Duration {
        let secs = match (self, interval) {
            (Self::Production, Interval::Hourly) => HOUR,
            (Self::Production, Interval::Daily) => DAY,
            (Self::Production, Interval::Weekly) => WEEK,
            (Self::Mock, Interval::Hourly) => 60,
            (Self::Mock, Interval::Daily) => 3 * 60,
            (Self::Mock, Interval::Weekly) => 5 * 60,
        };
        Duration::from_secs(secs)
    }
}
