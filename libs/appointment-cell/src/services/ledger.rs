use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use calendar_cell::models::{BookedInterval, CalendarError};
use calendar_cell::services::BookedSlotSource;

use crate::services::store::AppointmentStore;

/// Feeds the calendar's slot computation with the intervals held by active
/// appointments.
pub struct AppointmentLedger {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentLedger {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BookedSlotSource for AppointmentLedger {
    async fn booked_intervals(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BookedInterval>, CalendarError> {
        let appointments = self.store
            .active_on_day(clinic_id, date, auth_token)
            .await
            .map_err(|e| CalendarError::DatabaseError(e.to_string()))?;

        Ok(appointments
            .into_iter()
            .map(|a| BookedInterval { start: a.time, duration_minutes: a.duration_minutes })
            .collect())
    }
}
