use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::memory::MemoryTable;
use shared_database::supabase::{eq, first_row, parse_rows, SupabaseClient};

use crate::models::{BookedInterval, CalendarConfiguration, CalendarError};

/// Persistence of per-day calendar rows, keyed by `(clinic_id, date)`.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn load(
        &self,
        clinic_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<CalendarConfiguration>, CalendarError>;

    async fn get(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Option<CalendarConfiguration>, CalendarError>;

    /// Insert-or-update on `(clinic_id, date)`.
    async fn upsert(
        &self,
        config: CalendarConfiguration,
        auth_token: &str,
    ) -> Result<CalendarConfiguration, CalendarError>;

    /// Returns whether a row existed.
    async fn delete(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<bool, CalendarError>;
}

/// Occupied intervals for a clinic day, provided by whoever owns appointments.
#[async_trait]
pub trait BookedSlotSource: Send + Sync {
    async fn booked_intervals(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BookedInterval>, CalendarError>;
}

/// No bookings at all. Useful when only the calendar shape matters.
pub struct NoBookings;

#[async_trait]
impl BookedSlotSource for NoBookings {
    async fn booked_intervals(
        &self,
        _clinic_id: Uuid,
        _date: NaiveDate,
        _auth_token: &str,
    ) -> Result<Vec<BookedInterval>, CalendarError> {
        Ok(Vec::new())
    }
}

// ==============================================================================
// SUPABASE
// ==============================================================================

pub struct SupabaseCalendarStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseCalendarStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn db_error(e: anyhow::Error) -> CalendarError {
    CalendarError::DatabaseError(e.to_string())
}

#[async_trait]
impl CalendarStore for SupabaseCalendarStore {
    async fn load(
        &self,
        clinic_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<CalendarConfiguration>, CalendarError> {
        let mut query_parts = vec![format!("clinic_id={}", eq(clinic_id))];
        if let Some(from) = from {
            query_parts.push(format!("date=gte.{}", from));
        }
        if let Some(to) = to {
            query_parts.push(format!("date=lte.{}", to));
        }

        let path = format!(
            "/rest/v1/calendar_configurations?{}&order=date.asc",
            query_parts.join("&")
        );
        debug!("Loading calendar rows: {}", path);

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(db_error)?;

        parse_rows(rows).map_err(db_error)
    }

    async fn get(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Option<CalendarConfiguration>, CalendarError> {
        let path = format!(
            "/rest/v1/calendar_configurations?clinic_id={}&date={}&limit=1",
            eq(clinic_id),
            eq(date)
        );

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(db_error)?;

        first_row(rows).map_err(db_error)
    }

    async fn upsert(
        &self,
        mut config: CalendarConfiguration,
        auth_token: &str,
    ) -> Result<CalendarConfiguration, CalendarError> {
        // The natural key decides identity; never send a client-side id.
        config.id = None;
        config.created_at = None;
        config.updated_at = Some(Utc::now());

        let body = serde_json::to_value(&config)
            .map_err(|e| CalendarError::DatabaseError(e.to_string()))?;

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/calendar_configurations?on_conflict=clinic_id,date",
                Some(auth_token),
                Some(body),
                Some(SupabaseClient::upsert_headers()),
            )
            .await
            .map_err(db_error)?;

        first_row(rows)
            .map_err(db_error)?
            .ok_or_else(|| CalendarError::DatabaseError("Upsert returned no row".to_string()))
    }

    async fn delete(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<bool, CalendarError> {
        let path = format!(
            "/rest/v1/calendar_configurations?clinic_id={}&date={}",
            eq(clinic_id),
            eq(date)
        );

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(db_error)?;

        Ok(!rows.is_empty())
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryCalendarStore {
    rows: MemoryTable<(Uuid, NaiveDate), CalendarConfiguration>,
}

impl InMemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self) -> usize {
        self.rows.len().await
    }
}

#[async_trait]
impl CalendarStore for InMemoryCalendarStore {
    async fn load(
        &self,
        clinic_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        _auth_token: &str,
    ) -> Result<Vec<CalendarConfiguration>, CalendarError> {
        let mut rows = self.rows
            .filter(|row| {
                row.clinic_id == clinic_id
                    && from.map_or(true, |from| row.date >= from)
                    && to.map_or(true, |to| row.date <= to)
            })
            .await;
        rows.sort_by_key(|row| row.date);
        Ok(rows)
    }

    async fn get(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        _auth_token: &str,
    ) -> Result<Option<CalendarConfiguration>, CalendarError> {
        Ok(self.rows.get(&(clinic_id, date)).await)
    }

    async fn upsert(
        &self,
        mut config: CalendarConfiguration,
        _auth_token: &str,
    ) -> Result<CalendarConfiguration, CalendarError> {
        let key = (config.clinic_id, config.date);
        let mut rows = self.rows.lock().await;
        let now = Utc::now();

        match rows.get(&key) {
            Some(existing) => {
                config.id = existing.id;
                config.created_at = existing.created_at;
                config.updated_at = if existing.same_content(&config) {
                    existing.updated_at
                } else {
                    Some(now)
                };
            }
            None => {
                config.id = Some(Uuid::new_v4());
                config.created_at = Some(now);
                config.updated_at = Some(now);
            }
        }

        rows.insert(key, config.clone());
        Ok(config)
    }

    async fn delete(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        _auth_token: &str,
    ) -> Result<bool, CalendarError> {
        Ok(self.rows.remove(&(clinic_id, date)).await.is_some())
    }
}
