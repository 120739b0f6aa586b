use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::memory::MemoryTable;
use shared_database::supabase::{eq, first_row, parse_rows, SupabaseClient};

use crate::models::{CatalogError, Clinic, Service, UpdateClinicRequest, UpdateServiceRequest};

#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn list(&self, auth_token: &str) -> Result<Vec<Clinic>, CatalogError>;

    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<Clinic>, CatalogError>;

    async fn insert(&self, clinic: Clinic, auth_token: &str) -> Result<Clinic, CatalogError>;

    /// `None` when no clinic has this id.
    async fn update(
        &self,
        id: Uuid,
        changes: UpdateClinicRequest,
        auth_token: &str,
    ) -> Result<Option<Clinic>, CatalogError>;

    async fn delete(&self, id: Uuid, auth_token: &str) -> Result<bool, CatalogError>;
}

#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn list(&self, include_inactive: bool, auth_token: &str)
        -> Result<Vec<Service>, CatalogError>;

    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<Service>, CatalogError>;

    async fn insert(&self, service: Service, auth_token: &str) -> Result<Service, CatalogError>;

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateServiceRequest,
        auth_token: &str,
    ) -> Result<Option<Service>, CatalogError>;

    async fn delete(&self, id: Uuid, auth_token: &str) -> Result<bool, CatalogError>;
}

fn db_error(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::DatabaseError(e.to_string())
}

// ==============================================================================
// SUPABASE
// ==============================================================================

fn stamped(mut body: Value) -> Value {
    if let Some(fields) = body.as_object_mut() {
        fields.insert("updated_at".to_string(), serde_json::json!(Utc::now()));
    }
    body
}

/// Generic PostgREST table access shared by the clinic and service stores.
struct RestTable {
    supabase: Arc<SupabaseClient>,
    table: &'static str,
}

impl RestTable {
    async fn select<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        auth_token: &str,
    ) -> Result<Vec<T>, CatalogError> {
        let path = format!("/rest/v1/{}?{}", self.table, query);
        debug!("Fetching catalog rows: {}", path);

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(db_error)?;
        parse_rows(rows).map_err(db_error)
    }

    async fn write<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        query: &str,
        body: Option<Value>,
        auth_token: &str,
    ) -> Result<Option<T>, CatalogError> {
        let path = if query.is_empty() {
            format!("/rest/v1/{}", self.table)
        } else {
            format!("/rest/v1/{}?{}", self.table, query)
        };

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                method,
                &path,
                Some(auth_token),
                body,
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(db_error)?;
        first_row(rows).map_err(db_error)
    }
}

pub struct SupabaseClinicStore {
    table: RestTable,
}

impl SupabaseClinicStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { table: RestTable { supabase, table: "clinics" } }
    }
}

#[async_trait]
impl ClinicStore for SupabaseClinicStore {
    async fn list(&self, auth_token: &str) -> Result<Vec<Clinic>, CatalogError> {
        self.table.select("order=name.asc", auth_token).await
    }

    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<Clinic>, CatalogError> {
        let rows: Vec<Clinic> = self.table
            .select(&format!("id={}&limit=1", eq(id)), auth_token)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, clinic: Clinic, auth_token: &str) -> Result<Clinic, CatalogError> {
        let body = serde_json::to_value(&clinic).map_err(db_error)?;
        self.table
            .write(Method::POST, "", Some(body), auth_token)
            .await?
            .ok_or_else(|| CatalogError::DatabaseError("Insert returned no row".to_string()))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateClinicRequest,
        auth_token: &str,
    ) -> Result<Option<Clinic>, CatalogError> {
        let body = stamped(serde_json::to_value(&changes).map_err(db_error)?);
        self.table
            .write(Method::PATCH, &format!("id={}", eq(id)), Some(body), auth_token)
            .await
    }

    async fn delete(&self, id: Uuid, auth_token: &str) -> Result<bool, CatalogError> {
        let removed: Option<Clinic> = self.table
            .write(Method::DELETE, &format!("id={}", eq(id)), None, auth_token)
            .await?;
        Ok(removed.is_some())
    }
}

pub struct SupabaseServiceStore {
    table: RestTable,
}

impl SupabaseServiceStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { table: RestTable { supabase, table: "services" } }
    }
}

#[async_trait]
impl ServiceStore for SupabaseServiceStore {
    async fn list(
        &self,
        include_inactive: bool,
        auth_token: &str,
    ) -> Result<Vec<Service>, CatalogError> {
        let query = if include_inactive {
            "order=name.asc".to_string()
        } else {
            "active=eq.true&order=name.asc".to_string()
        };
        self.table.select(&query, auth_token).await
    }

    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<Service>, CatalogError> {
        let rows: Vec<Service> = self.table
            .select(&format!("id={}&limit=1", eq(id)), auth_token)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, service: Service, auth_token: &str) -> Result<Service, CatalogError> {
        let body = serde_json::to_value(&service).map_err(db_error)?;
        self.table
            .write(Method::POST, "", Some(body), auth_token)
            .await?
            .ok_or_else(|| CatalogError::DatabaseError("Insert returned no row".to_string()))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateServiceRequest,
        auth_token: &str,
    ) -> Result<Option<Service>, CatalogError> {
        let body = stamped(serde_json::to_value(&changes).map_err(db_error)?);
        self.table
            .write(Method::PATCH, &format!("id={}", eq(id)), Some(body), auth_token)
            .await
    }

    async fn delete(&self, id: Uuid, auth_token: &str) -> Result<bool, CatalogError> {
        let removed: Option<Service> = self.table
            .write(Method::DELETE, &format!("id={}", eq(id)), None, auth_token)
            .await?;
        Ok(removed.is_some())
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryClinicStore {
    rows: MemoryTable<Uuid, Clinic>,
}

impl InMemoryClinicStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClinicStore for InMemoryClinicStore {
    async fn list(&self, _auth_token: &str) -> Result<Vec<Clinic>, CatalogError> {
        let mut clinics = self.rows.filter(|_| true).await;
        clinics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clinics)
    }

    async fn get(&self, id: Uuid, _auth_token: &str) -> Result<Option<Clinic>, CatalogError> {
        Ok(self.rows.get(&id).await)
    }

    async fn insert(&self, mut clinic: Clinic, _auth_token: &str) -> Result<Clinic, CatalogError> {
        let now = Utc::now();
        clinic.created_at = Some(now);
        clinic.updated_at = Some(now);
        self.rows.put(clinic.id, clinic.clone()).await;
        Ok(clinic)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateClinicRequest,
        _auth_token: &str,
    ) -> Result<Option<Clinic>, CatalogError> {
        Ok(self.rows
            .update(&id, |clinic| {
                changes.apply_to(clinic);
                clinic.updated_at = Some(Utc::now());
            })
            .await)
    }

    async fn delete(&self, id: Uuid, _auth_token: &str) -> Result<bool, CatalogError> {
        Ok(self.rows.remove(&id).await.is_some())
    }
}

#[derive(Default)]
pub struct InMemoryServiceStore {
    rows: MemoryTable<Uuid, Service>,
}

impl InMemoryServiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServiceStore for InMemoryServiceStore {
    async fn list(
        &self,
        include_inactive: bool,
        _auth_token: &str,
    ) -> Result<Vec<Service>, CatalogError> {
        let mut services = self.rows.filter(|s| include_inactive || s.active).await;
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn get(&self, id: Uuid, _auth_token: &str) -> Result<Option<Service>, CatalogError> {
        Ok(self.rows.get(&id).await)
    }

    async fn insert(&self, mut service: Service, _auth_token: &str) -> Result<Service, CatalogError> {
        let now = Utc::now();
        service.created_at = Some(now);
        service.updated_at = Some(now);
        self.rows.put(service.id, service.clone()).await;
        Ok(service)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateServiceRequest,
        _auth_token: &str,
    ) -> Result<Option<Service>, CatalogError> {
        Ok(self.rows
            .update(&id, |service| {
                changes.apply_to(service);
                service.updated_at = Some(Utc::now());
            })
            .await)
    }

    async fn delete(&self, id: Uuid, _auth_token: &str) -> Result<bool, CatalogError> {
        Ok(self.rows.remove(&id).await.is_some())
    }
}
