use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::memory::MemoryTable;
use shared_database::supabase::{eq, first_row, is_conflict, is_not_found, parse_rows, SupabaseClient};

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery};
use crate::services::conflict::find_conflicts;

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Conflict check and insert as one step. Fails with
    /// [`AppointmentError::ConflictDetected`] when the interval is taken.
    async fn reserve(&self, appointment: Appointment, auth_token: &str)
        -> Result<Appointment, AppointmentError>;

    /// Moves an existing appointment, re-checking conflicts against every
    /// other active appointment. A cancelled appointment is moved unchecked.
    async fn reschedule(&self, appointment: Appointment, auth_token: &str)
        -> Result<Appointment, AppointmentError>;

    /// Writes status and notes without any conflict check.
    async fn update(&self, appointment: Appointment, auth_token: &str)
        -> Result<Option<Appointment>, AppointmentError>;

    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<Appointment>, AppointmentError>;

    /// Ordered by date, then time.
    async fn list(&self, query: &AppointmentSearchQuery, auth_token: &str)
        -> Result<Vec<Appointment>, AppointmentError>;

    /// Pending and confirmed appointments of one clinic day.
    async fn active_on_day(&self, clinic_id: Uuid, date: NaiveDate, auth_token: &str)
        -> Result<Vec<Appointment>, AppointmentError>;

    async fn delete(&self, id: Uuid, auth_token: &str) -> Result<bool, AppointmentError>;
}

fn db_error(e: impl std::fmt::Display) -> AppointmentError {
    AppointmentError::DatabaseError(e.to_string())
}

// ==============================================================================
// SUPABASE
// ==============================================================================

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, query: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?{}", query);
        debug!("Fetching appointments: {}", path);

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(db_error)?;
        parse_rows(rows).map_err(db_error)
    }

    /// The stored procedure is not clinic-scoped, so a hit is confirmed
    /// against this clinic's day. A missing procedure falls back to that check.
    async fn interval_taken(&self, appointment: &Appointment, auth_token: &str) -> Result<bool, AppointmentError> {
        let rpc: Result<bool, anyhow::Error> = self.supabase
            .rpc(
                "check_appointment_conflict",
                Some(auth_token),
                json!({
                    "p_date": appointment.date,
                    "p_time": appointment.time,
                    "p_duration": appointment.duration_minutes,
                }),
            )
            .await;

        match rpc {
            Ok(false) => return Ok(false),
            Ok(true) => {}
            Err(e) if is_not_found(&e) => {
                warn!("check_appointment_conflict unavailable, checking clinic day directly");
            }
            Err(e) => return Err(db_error(e)),
        }

        let existing = self.active_on_day(appointment.clinic_id, appointment.date, auth_token).await?;
        Ok(!find_conflicts(&existing, appointment.time, appointment.duration_minutes, None).is_empty())
    }

    async fn patch(
        &self,
        id: Uuid,
        body: Value,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id={}", eq(id));

        let result: Result<Vec<Value>, anyhow::Error> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => first_row(rows).map_err(db_error),
            Err(e) if is_conflict(&e) => Err(AppointmentError::ConflictDetected),
            Err(e) => Err(db_error(e)),
        }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    /// `check_appointment_conflict` RPC followed by the insert. The unique
    /// index on `(clinic_id, date, time)` turns a concurrent booking of the
    /// same start time into a 409; overlapping bookings with different start
    /// times can still both pass the RPC if they race.
    async fn reserve(
        &self,
        mut appointment: Appointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if self.interval_taken(&appointment, auth_token).await? {
            return Err(AppointmentError::ConflictDetected);
        }

        let now = Utc::now();
        appointment.created_at = Some(now);
        appointment.updated_at = Some(now);
        let body = serde_json::to_value(&appointment).map_err(db_error)?;

        let result: Result<Vec<Value>, anyhow::Error> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => first_row(rows)
                .map_err(db_error)?
                .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no row".to_string())),
            Err(e) if is_conflict(&e) => {
                warn!("Lost booking race for clinic {} on {} at {}",
                      appointment.clinic_id, appointment.date, appointment.time);
                Err(AppointmentError::ConflictDetected)
            }
            Err(e) => Err(db_error(e)),
        }
    }

    async fn reschedule(
        &self,
        appointment: Appointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if appointment.is_active() {
            let existing = self.active_on_day(appointment.clinic_id, appointment.date, auth_token).await?;
            if !find_conflicts(&existing, appointment.time, appointment.duration_minutes, Some(appointment.id)).is_empty() {
                return Err(AppointmentError::ConflictDetected);
            }
        }

        let body = json!({
            "date": appointment.date,
            "time": appointment.time,
            "duration_minutes": appointment.duration_minutes,
            "status": appointment.status,
            "notes": appointment.notes,
            "updated_at": Utc::now(),
        });

        self.patch(appointment.id, body, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn update(
        &self,
        appointment: Appointment,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let body = json!({
            "status": appointment.status,
            "notes": appointment.notes,
            "updated_at": Utc::now(),
        });
        self.patch(appointment.id, body, auth_token).await
    }

    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        let rows = self.fetch(&format!("id={}&limit=1", eq(id)), auth_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn list(
        &self,
        query: &AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![];

        if let Some(clinic_id) = query.clinic_id {
            query_parts.push(format!("clinic_id={}", eq(clinic_id)));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id={}", eq(patient_id)));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status={}", eq(status)));
        }
        if let Some(from) = query.from {
            query_parts.push(format!("date=gte.{}", from));
        }
        if let Some(to) = query.to {
            query_parts.push(format!("date=lte.{}", to));
        }
        query_parts.push("order=date.asc,time.asc".to_string());

        self.fetch(&query_parts.join("&"), auth_token).await
    }

    async fn active_on_day(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let query = format!(
            "clinic_id={}&date={}&status=in.(pending,confirmed)&order=time.asc",
            eq(clinic_id),
            eq(date)
        );
        self.fetch(&query, auth_token).await
    }

    async fn delete(&self, id: Uuid, auth_token: &str) -> Result<bool, AppointmentError> {
        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::DELETE,
                &format!("/rest/v1/appointments?id={}", eq(id)),
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

/// Single-process store. Every check-then-write runs under one table lock,
/// so reservations are fully atomic here.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    rows: MemoryTable<Uuid, Appointment>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.len().await
    }
}

fn same_day(rows: &std::collections::HashMap<Uuid, Appointment>, a: &Appointment) -> Vec<Appointment> {
    rows.values()
        .filter(|other| other.clinic_id == a.clinic_id && other.date == a.date)
        .cloned()
        .collect()
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn reserve(
        &self,
        mut appointment: Appointment,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut rows = self.rows.lock().await;

        let day = same_day(&rows, &appointment);
        if !find_conflicts(&day, appointment.time, appointment.duration_minutes, None).is_empty() {
            return Err(AppointmentError::ConflictDetected);
        }

        let now = Utc::now();
        appointment.created_at = Some(now);
        appointment.updated_at = Some(now);
        rows.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn reschedule(
        &self,
        mut appointment: Appointment,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut rows = self.rows.lock().await;

        let created_at = rows
            .get(&appointment.id)
            .map(|existing| existing.created_at)
            .ok_or(AppointmentError::NotFound)?;

        if appointment.is_active() {
            let day = same_day(&rows, &appointment);
            if !find_conflicts(&day, appointment.time, appointment.duration_minutes, Some(appointment.id)).is_empty() {
                return Err(AppointmentError::ConflictDetected);
            }
        }

        appointment.created_at = created_at;
        appointment.updated_at = Some(Utc::now());
        rows.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(
        &self,
        appointment: Appointment,
        _auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.rows
            .update(&appointment.id, |row| {
                row.status = appointment.status;
                row.notes = appointment.notes.clone();
                row.updated_at = Some(Utc::now());
            })
            .await)
    }

    async fn get(&self, id: Uuid, _auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.rows.get(&id).await)
    }

    async fn list(
        &self,
        query: &AppointmentSearchQuery,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut rows = self.rows.filter(|a| query.matches(a)).await;
        rows.sort_by_key(|a| (a.date, a.time));
        Ok(rows)
    }

    async fn active_on_day(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut rows = self.rows
            .filter(|a| a.clinic_id == clinic_id && a.date == date && a.is_active())
            .await;
        rows.sort_by_key(|a| a.time);
        Ok(rows)
    }

    async fn delete(&self, id: Uuid, _auth_token: &str) -> Result<bool, AppointmentError> {
        Ok(self.rows.remove(&id).await.is_some())
    }
}
