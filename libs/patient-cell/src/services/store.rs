use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::memory::MemoryTable;
use shared_database::supabase::{eq, first_row, parse_rows, SupabaseClient};

use crate::models::{PatientError, PatientProfile, PatientSearchQuery};

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<PatientProfile>, PatientError>;

    async fn by_user(&self, user_id: &str, auth_token: &str)
        -> Result<Option<PatientProfile>, PatientError>;

    /// Insert-or-replace on `user_id`.
    async fn save(&self, profile: PatientProfile, auth_token: &str)
        -> Result<PatientProfile, PatientError>;

    async fn search(&self, query: &PatientSearchQuery, auth_token: &str)
        -> Result<Vec<PatientProfile>, PatientError>;
}

fn db_error(e: impl std::fmt::Display) -> PatientError {
    PatientError::DatabaseError(e.to_string())
}

const DEFAULT_LIMIT: i32 = 50;

// ==============================================================================
// SUPABASE
// ==============================================================================

pub struct SupabasePatientStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabasePatientStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, query: &str, auth_token: &str) -> Result<Vec<PatientProfile>, PatientError> {
        let path = format!("/rest/v1/patient_profiles?{}", query);
        debug!("Fetching patient profiles: {}", path);

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(db_error)?;
        parse_rows(rows).map_err(db_error)
    }
}

#[async_trait]
impl PatientStore for SupabasePatientStore {
    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<PatientProfile>, PatientError> {
        let rows = self.fetch(&format!("id={}&limit=1", eq(id)), auth_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn by_user(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Option<PatientProfile>, PatientError> {
        let rows = self.fetch(&format!("user_id={}&limit=1", eq(user_id)), auth_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn save(
        &self,
        mut profile: PatientProfile,
        auth_token: &str,
    ) -> Result<PatientProfile, PatientError> {
        profile.created_at = None;
        profile.updated_at = Some(Utc::now());
        let body = serde_json::to_value(&profile).map_err(db_error)?;

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patient_profiles?on_conflict=user_id",
                Some(auth_token),
                Some(body),
                Some(SupabaseClient::upsert_headers()),
            )
            .await
            .map_err(db_error)?;

        first_row(rows)
            .map_err(db_error)?
            .ok_or_else(|| PatientError::DatabaseError("Profile upsert returned no row".to_string()))
    }

    async fn search(
        &self,
        query: &PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<PatientProfile>, PatientError> {
        let mut query_parts = vec![];

        if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = urlencoding::encode(term);
            query_parts.push(format!("or=(full_name.ilike.*{}*,id_number.ilike.*{}*)", term, term));
        }
        if let Some(clinic_id) = query.clinic_id {
            query_parts.push(format!("clinic_id={}", eq(clinic_id)));
        }

        query_parts.push("order=full_name.asc".to_string());
        query_parts.push(format!("limit={}", query.limit.unwrap_or(DEFAULT_LIMIT)));
        query_parts.push(format!("offset={}", query.offset.unwrap_or(0)));

        self.fetch(&query_parts.join("&"), auth_token).await
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryPatientStore {
    rows: MemoryTable<Uuid, PatientProfile>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn get(&self, id: Uuid, _auth_token: &str) -> Result<Option<PatientProfile>, PatientError> {
        Ok(self.rows.get(&id).await)
    }

    async fn by_user(
        &self,
        user_id: &str,
        _auth_token: &str,
    ) -> Result<Option<PatientProfile>, PatientError> {
        Ok(self.rows.find(|p| p.user_id == user_id).await)
    }

    async fn save(
        &self,
        mut profile: PatientProfile,
        _auth_token: &str,
    ) -> Result<PatientProfile, PatientError> {
        let mut rows = self.rows.lock().await;
        let now = Utc::now();

        let existing = rows.values().find(|p| p.user_id == profile.user_id).cloned();
        match existing {
            Some(existing) => {
                rows.remove(&existing.id);
                profile.id = existing.id;
                profile.created_at = existing.created_at;
            }
            None => profile.created_at = Some(now),
        }
        profile.updated_at = Some(now);

        rows.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn search(
        &self,
        query: &PatientSearchQuery,
        _auth_token: &str,
    ) -> Result<Vec<PatientProfile>, PatientError> {
        let term = query.q.as_deref().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());

        let mut matches = self.rows
            .filter(|p| {
                let term_matches = term.as_deref().map_or(true, |term| {
                    p.full_name.to_lowercase().contains(term)
                        || p.id_number.as_deref().is_some_and(|id| id.to_lowercase().contains(term))
                });
                let clinic_matches = query.clinic_id.map_or(true, |c| p.clinic_id == Some(c));
                term_matches && clinic_matches
            })
            .await;

        matches.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(0) as usize;
        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }
}
