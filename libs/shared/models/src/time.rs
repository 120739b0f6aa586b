use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Wall-clock time of day at minute precision, rendered as `HH:mm`.
///
/// Accepts `HH:mm` and the `HH:mm:ss` form Postgres `time` columns return;
/// seconds are truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(ClockTime)
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes >= MINUTES_PER_DAY {
            return None;
        }
        Self::from_hm(minutes / 60, minutes % 60)
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    /// Adds minutes on the same day. `None` when the result would wrap past midnight.
    pub fn checked_add_minutes(&self, minutes: i64) -> Option<Self> {
        let total = i64::from(self.minutes_since_midnight()) + minutes;
        if total < 0 || total >= i64::from(MINUTES_PER_DAY) {
            return None;
        }
        Self::from_minutes(total as u32)
    }

    /// End of the half-open interval `[self, self + minutes)`, as minutes since
    /// midnight. May exceed one day for intervals running past midnight.
    pub fn end_minutes(&self, minutes: i32) -> i64 {
        i64::from(self.minutes_since_midnight()) + i64::from(minutes)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(time: NaiveTime) -> Self {
        ClockTime(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for ClockTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map(ClockTime::from)
            .map_err(|_| format!("Invalid time '{}', expected HH:mm", s))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
