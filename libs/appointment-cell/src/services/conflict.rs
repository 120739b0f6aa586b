use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::ClockTime;

use crate::models::{Appointment, AppointmentError, ConflictCheckRequest, ConflictCheckResponse};
use crate::services::store::AppointmentStore;

/// Half-open interval intersection: touching intervals do not overlap.
pub fn intervals_overlap(
    a_start: ClockTime,
    a_minutes: i32,
    b_start: ClockTime,
    b_minutes: i32,
) -> bool {
    let a_from = i64::from(a_start.minutes_since_midnight());
    let b_from = i64::from(b_start.minutes_since_midnight());
    a_from < b_start.end_minutes(b_minutes) && b_from < a_start.end_minutes(a_minutes)
}

/// Active appointments in `existing` that the proposed interval would collide with.
pub fn find_conflicts<'a>(
    existing: &'a [Appointment],
    time: ClockTime,
    duration_minutes: i32,
    exclude_appointment_id: Option<Uuid>,
) -> Vec<&'a Appointment> {
    existing
        .iter()
        .filter(|a| Some(a.id) != exclude_appointment_id)
        .filter(|a| a.is_active() && a.overlaps(time, duration_minutes))
        .collect()
}

pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Does an active appointment on `(clinic_id, date)` intersect `[time, time + duration)`?
    pub async fn has_conflict(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        time: ClockTime,
        duration_minutes: i32,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let response = self
            .check(clinic_id, date, time, duration_minutes, exclude_appointment_id, auth_token)
            .await?;
        Ok(response.has_conflict)
    }

    pub async fn check_conflicts(
        &self,
        request: &ConflictCheckRequest,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        let time = request.validate()?;
        self.check(
            request.clinic_id,
            request.date,
            time,
            request.duration_minutes,
            request.exclude_appointment_id,
            auth_token,
        )
        .await
    }

    async fn check(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        time: ClockTime,
        duration_minutes: i32,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        debug!("Checking conflicts for clinic {} on {} at {} ({} min)",
               clinic_id, date, time, duration_minutes);

        let existing = self.store.active_on_day(clinic_id, date, auth_token).await?;
        let conflicts = find_conflicts(&existing, time, duration_minutes, exclude_appointment_id);

        if !conflicts.is_empty() {
            warn!("Conflict detected for clinic {} on {} at {} - {} overlapping appointments",
                  clinic_id, date, time, conflicts.len());
        }

        Ok(ConflictCheckResponse {
            has_conflict: !conflicts.is_empty(),
            conflicting_count: conflicts.len(),
        })
    }
}
