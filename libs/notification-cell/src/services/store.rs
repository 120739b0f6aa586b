use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::memory::MemoryTable;
use shared_database::supabase::{eq, first_row, parse_rows, SupabaseClient};

use crate::models::{Notification, NotificationError};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification, auth_token: &str)
        -> Result<Notification, NotificationError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: &str, unread_only: bool, auth_token: &str)
        -> Result<Vec<Notification>, NotificationError>;

    /// `None` unless the notification exists and belongs to `user_id`.
    async fn mark_read(&self, id: Uuid, user_id: &str, auth_token: &str)
        -> Result<Option<Notification>, NotificationError>;
}

fn db_error(e: impl std::fmt::Display) -> NotificationError {
    NotificationError::DatabaseError(e.to_string())
}

// ==============================================================================
// SUPABASE
// ==============================================================================

pub struct SupabaseNotificationStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseNotificationStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl NotificationStore for SupabaseNotificationStore {
    async fn insert(
        &self,
        notification: Notification,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        let body = serde_json::to_value(&notification).map_err(db_error)?;

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/notifications",
                Some(auth_token),
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(db_error)?;

        first_row(rows)
            .map_err(db_error)?
            .ok_or_else(|| NotificationError::DatabaseError("Insert returned no row".to_string()))
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        auth_token: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut path = format!("/rest/v1/notifications?user_id={}", eq(user_id));
        if unread_only {
            path.push_str("&read=eq.false");
        }
        path.push_str("&order=created_at.desc");
        debug!("Fetching notifications: {}", path);

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(db_error)?;
        parse_rows(rows).map_err(db_error)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Option<Notification>, NotificationError> {
        let path = format!("/rest/v1/notifications?id={}&user_id={}", eq(id), eq(user_id));

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "read": true })),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(db_error)?;
        first_row(rows).map_err(db_error)
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryNotificationStore {
    rows: MemoryTable<Uuid, Notification>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(
        &self,
        mut notification: Notification,
        _auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        notification.created_at = Some(Utc::now());
        self.rows.put(notification.id, notification.clone()).await;
        Ok(notification)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        _auth_token: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut rows = self.rows
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .await;
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        user_id: &str,
        _auth_token: &str,
    ) -> Result<Option<Notification>, NotificationError> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&id) {
            Some(notification) if notification.user_id == user_id => {
                notification.read = true;
                Ok(Some(notification.clone()))
            }
            _ => Ok(None),
        }
    }
}
