// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

use shared_models::ClockTime;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked visit. Patient, service and clinic names are denormalized at
/// booking time so listings need no joins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub service_id: Uuid,
    pub service_name: String,
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub date: NaiveDate,
    pub time: ClockTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Pending and confirmed appointments hold their interval; cancelled ones don't.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Half-open `[time, time + duration)` overlap test on the same day.
    pub fn overlaps(&self, time: ClockTime, duration_minutes: i32) -> bool {
        crate::services::conflict::intervals_overlap(
            self.time,
            self.duration_minutes,
            time,
            duration_minutes,
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

fn parse_time(raw: &str) -> Result<ClockTime, AppointmentError> {
    raw.parse().map_err(AppointmentError::InvalidTime)
}

fn check_duration(minutes: i32) -> Result<(), AppointmentError> {
    if minutes <= 0 {
        return Err(AppointmentError::ValidationError(
            "Duration must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    /// Admins book on behalf of a patient; ignored for patients, who always
    /// book for themselves.
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    pub clinic_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    /// `HH:mm`
    pub time: String,
    /// Only honoured for admins. Defaults to the service duration.
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    /// Only honoured for admins.
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn parsed_time(&self) -> Result<ClockTime, AppointmentError> {
        parse_time(&self.time)
    }

    pub fn validate(&self) -> Result<ClockTime, AppointmentError> {
        if let Some(duration) = self.duration_minutes {
            check_duration(duration)?;
        }
        if self.status == Some(AppointmentStatus::Cancelled) {
            return Err(AppointmentError::ValidationError(
                "An appointment cannot be created cancelled".to_string(),
            ));
        }
        self.parsed_time()
    }
}

/// Partial update. Status changes go through the lifecycle table; date, time
/// and duration move the appointment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn status(status: AppointmentStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn is_reschedule(&self) -> bool {
        self.date.is_some() || self.time.is_some() || self.duration_minutes.is_some()
    }

    pub fn validate(&self) -> Result<Option<ClockTime>, AppointmentError> {
        if let Some(duration) = self.duration_minutes {
            check_duration(duration)?;
        }
        self.time.as_deref().map(parse_time).transpose()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub clinic_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AppointmentSearchQuery {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.clinic_id.map_or(true, |id| appointment.clinic_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.status.map_or(true, |s| appointment.status == s)
            && self.from.map_or(true, |from| appointment.date >= from)
            && self.to.map_or(true, |to| appointment.date <= to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckRequest {
    pub clinic_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub exclude_appointment_id: Option<Uuid>,
}

impl ConflictCheckRequest {
    pub fn validate(&self) -> Result<ClockTime, AppointmentError> {
        check_duration(self.duration_minutes)?;
        parse_time(&self.time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_count: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Service is not available for booking")]
    ServiceInactive,

    #[error("Patient profile is incomplete; missing: {}", .missing.join(", "))]
    ProfileIncomplete { missing: Vec<String> },

    #[error("Appointment slot not available")]
    SlotNotAvailable,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Cannot change appointment from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment conflicts with existing booking")]
    ConflictDetected,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
