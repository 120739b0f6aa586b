// libs/calendar-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use shared_models::ClockTime;

// ==============================================================================
// CALENDAR CONFIGURATION
// ==============================================================================

/// Operating parameters of one clinic day, independent of which day it is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySettings {
    pub is_open: bool,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub interval_minutes: i32,
    #[serde(default)]
    pub lunch_break_start: Option<ClockTime>,
    #[serde(default)]
    pub lunch_break_end: Option<ClockTime>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub blocked_times: Vec<ClockTime>,
}

impl Default for DaySettings {
    /// Used for any day without a stored row: open 08:00-18:00, 30 minute
    /// slots, lunch 12:00-13:00.
    fn default() -> Self {
        Self {
            is_open: true,
            start_time: hm(8, 0),
            end_time: hm(18, 0),
            interval_minutes: 30,
            lunch_break_start: Some(hm(12, 0)),
            lunch_break_end: Some(hm(13, 0)),
            blocked_times: Vec::new(),
        }
    }
}

fn hm(hour: u32, minute: u32) -> ClockTime {
    ClockTime::from_minutes(hour * 60 + minute).unwrap_or_else(|| ClockTime::from(chrono::NaiveTime::MIN))
}

impl DaySettings {
    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.interval_minutes <= 0 {
            return Err(CalendarError::ValidationError(
                "Interval must be a positive number of minutes".to_string(),
            ));
        }
        if self.interval_minutes > 24 * 60 {
            return Err(CalendarError::ValidationError(
                "Interval cannot exceed one day".to_string(),
            ));
        }
        if self.is_open && self.start_time >= self.end_time {
            return Err(CalendarError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }
        match (self.lunch_break_start, self.lunch_break_end) {
            (Some(start), Some(end)) if start >= end => Err(CalendarError::ValidationError(
                "Lunch break must start before it ends".to_string(),
            )),
            (Some(_), None) | (None, Some(_)) => Err(CalendarError::ValidationError(
                "Lunch break needs both a start and an end".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Half-open lunch window `[start, end)`.
    pub fn is_lunch_break(&self, time: ClockTime) -> bool {
        match (self.lunch_break_start, self.lunch_break_end) {
            (Some(start), Some(end)) => time >= start && time < end,
            _ => false,
        }
    }

    pub fn is_blocked(&self, time: ClockTime) -> bool {
        self.blocked_times.contains(&time)
    }
}

/// Stored row keyed by `(clinic_id, date)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub clinic_id: Uuid,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub settings: DaySettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CalendarConfiguration {
    pub fn new(clinic_id: Uuid, date: NaiveDate, settings: DaySettings) -> Self {
        Self {
            id: None,
            clinic_id,
            date,
            settings,
            created_at: None,
            updated_at: None,
        }
    }

    /// Same content, ignoring the server-assigned identity and timestamps.
    pub fn same_content(&self, other: &CalendarConfiguration) -> bool {
        self.clinic_id == other.clinic_id
            && self.date == other.date
            && self.settings == other.settings
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ClockTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ClockTime>>::deserialize(deserializer)?.unwrap_or_default())
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkApplyRequest {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub settings: DaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDay {
    pub date: NaiveDate,
    pub error: String,
}

/// Outcome of a month-wide apply. Days are written independently, so a
/// partial failure leaves the saved days in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkApplyReport {
    pub clinic_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub saved: Vec<NaiveDate>,
    pub failed: Vec<FailedDay>,
}

impl BulkApplyReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Blocked,
    LunchBreak,
    Booked,
    Past,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotView {
    pub time: ClockTime,
    pub status: SlotStatus,
}

impl SlotView {
    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }
}

/// An existing pending or confirmed appointment occupying `[start, start + duration)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BookedInterval {
    pub start: ClockTime,
    pub duration_minutes: i32,
}

impl BookedInterval {
    pub fn overlaps(&self, start: ClockTime, duration_minutes: i32) -> bool {
        let a_start = i64::from(self.start.minutes_since_midnight());
        let a_end = self.start.end_minutes(self.duration_minutes);
        let b_start = i64::from(start.minutes_since_midnight());
        let b_end = start.end_minutes(duration_minutes);
        a_start < b_end && b_start < a_end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlots {
    pub clinic_id: Uuid,
    pub date: NaiveDate,
    pub is_open: bool,
    pub uses_default_config: bool,
    pub viewer_is_admin: bool,
    pub slots: Vec<SlotView>,
}

impl DaySlots {
    pub fn times(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.time.to_string()).collect()
    }

    pub fn offers(&self, time: ClockTime) -> bool {
        self.slots.iter().any(|slot| slot.time == time && slot.is_available())
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum CalendarError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid month {month} for year {year}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Only administrators can change clinic calendars")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
