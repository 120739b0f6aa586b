// libs/calendar-cell/src/services/calendar.rs
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::ActorContext;

use crate::models::{
    BulkApplyReport, CalendarConfiguration, CalendarError, DaySettings, DaySlots, FailedDay,
};
use crate::services::availability::{compute_day_slots, SlotContext};
use crate::services::store::{BookedSlotSource, CalendarStore};

/// Per-clinic, per-day operating parameters and the slots derived from them.
///
/// The single authority for slot computation: admins and patients go
/// through the same code path, differing only in `viewer_is_admin`.
pub struct CalendarService {
    store: Arc<dyn CalendarStore>,
    bookings: Arc<dyn BookedSlotSource>,
    utc_offset_minutes: i32,
}

impl CalendarService {
    pub fn new(
        store: Arc<dyn CalendarStore>,
        bookings: Arc<dyn BookedSlotSource>,
        utc_offset_minutes: i32,
    ) -> Self {
        Self { store, bookings, utc_offset_minutes }
    }

    /// Current clinic-local wall clock.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(i64::from(self.utc_offset_minutes))
    }

    pub async fn load(
        &self,
        clinic_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        actor: &ActorContext,
    ) -> Result<Vec<CalendarConfiguration>, CalendarError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(CalendarError::ValidationError(
                    "Range start must not be after range end".to_string(),
                ));
            }
        }

        debug!("Loading calendar for clinic {} ({:?} - {:?})", clinic_id, from, to);
        self.store.load(clinic_id, from, to, actor.token()).await
    }

    /// Upserts one day. Saving identical content twice leaves one unchanged row.
    pub async fn save(
        &self,
        config: CalendarConfiguration,
        actor: &ActorContext,
    ) -> Result<CalendarConfiguration, CalendarError> {
        if !actor.is_admin() {
            return Err(CalendarError::Unauthorized);
        }
        config.settings.validate()?;

        let saved = self.store.upsert(config, actor.token()).await?;
        info!("Saved calendar for clinic {} on {}", saved.clinic_id, saved.date);
        Ok(saved)
    }

    /// Writes `settings` to every day of the month, one independent upsert per day.
    ///
    /// All upserts are awaited together. Failed days are reported, saved days
    /// stay saved.
    pub async fn bulk_apply_to_month(
        &self,
        clinic_id: Uuid,
        settings: DaySettings,
        year: i32,
        month: u32,
        actor: &ActorContext,
    ) -> Result<BulkApplyReport, CalendarError> {
        if !actor.is_admin() {
            return Err(CalendarError::Unauthorized);
        }
        settings.validate()?;

        let days = days_of_month(year, month)?;
        info!("Applying calendar to {} days of {}-{:02} for clinic {}",
              days.len(), year, month, clinic_id);

        let writes = days.iter().map(|&date| {
            let config = CalendarConfiguration::new(clinic_id, date, settings.clone());
            async move { (date, self.store.upsert(config, actor.token()).await) }
        });

        let mut report = BulkApplyReport {
            clinic_id,
            year,
            month,
            saved: Vec::new(),
            failed: Vec::new(),
        };

        for (date, result) in join_all(writes).await {
            match result {
                Ok(_) => report.saved.push(date),
                Err(e) => {
                    warn!("Bulk apply failed for clinic {} on {}: {}", clinic_id, date, e);
                    report.failed.push(FailedDay { date, error: e.to_string() });
                }
            }
        }

        Ok(report)
    }

    /// Drops a day's row so it falls back to the default configuration.
    pub async fn reset(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        actor: &ActorContext,
    ) -> Result<bool, CalendarError> {
        if !actor.is_admin() {
            return Err(CalendarError::Unauthorized);
        }
        let removed = self.store.delete(clinic_id, date, actor.token()).await?;
        info!("Reset calendar for clinic {} on {} (row existed: {})", clinic_id, date, removed);
        Ok(removed)
    }

    /// Stored settings for a day, or the defaults when none exist.
    pub async fn settings_for(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        actor: &ActorContext,
    ) -> Result<(DaySettings, bool), CalendarError> {
        match self.store.get(clinic_id, date, actor.token()).await? {
            Some(config) => Ok((config.settings, false)),
            None => Ok((DaySettings::default(), true)),
        }
    }

    pub async fn get_available_time_slots(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        actor: &ActorContext,
    ) -> Result<DaySlots, CalendarError> {
        self.get_available_time_slots_at(clinic_id, date, actor, self.local_now()).await
    }

    /// Same as [`Self::get_available_time_slots`] against an explicit clock.
    pub async fn get_available_time_slots_at(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        actor: &ActorContext,
        now: NaiveDateTime,
    ) -> Result<DaySlots, CalendarError> {
        let (settings, uses_default_config) = self.settings_for(clinic_id, date, actor).await?;

        let booked = if settings.is_open {
            self.bookings.booked_intervals(clinic_id, date, actor.token()).await?
        } else {
            Vec::new()
        };

        let ctx = SlotContext {
            date,
            now,
            viewer_is_admin: actor.is_admin(),
            booked: &booked,
        };

        let slots = compute_day_slots(&settings, &ctx);
        debug!("Clinic {} on {}: {} slots for {}", clinic_id, date, slots.len(), actor.role);

        Ok(DaySlots {
            clinic_id,
            date,
            is_open: settings.is_open,
            uses_default_config,
            viewer_is_admin: actor.is_admin(),
            slots,
        })
    }
}

/// Every calendar day of `year`-`month`.
pub fn days_of_month(year: i32, month: u32) -> Result<Vec<NaiveDate>, CalendarError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(CalendarError::InvalidMonth { year, month })?;

    Ok(first
        .iter_days()
        .take_while(|date| date.month() == month)
        .collect())
}
