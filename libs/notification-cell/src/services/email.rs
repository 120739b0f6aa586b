use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_database::supabase::SupabaseClient;

use crate::models::{EmailMessage, NotificationError};

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage, auth_token: &str) -> Result<(), NotificationError>;
}

/// Delivers mail through the store's `send-email` edge function.
pub struct SupabaseEmailSender {
    supabase: Arc<SupabaseClient>,
    function_path: String,
}

impl SupabaseEmailSender {
    pub fn new(supabase: Arc<SupabaseClient>, function_path: impl Into<String>) -> Self {
        Self { supabase, function_path: function_path.into() }
    }
}

#[async_trait]
impl EmailSender for SupabaseEmailSender {
    async fn send(&self, message: &EmailMessage, auth_token: &str) -> Result<(), NotificationError> {
        debug!("Sending email '{}' to {}", message.subject, message.to);

        self.supabase
            .execute(
                Method::POST,
                &self.function_path,
                Some(auth_token),
                Some(json!(message)),
            )
            .await
            .map_err(|e| NotificationError::EmailError(e.to_string()))
    }
}

/// Writes the message to the log instead of sending it.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage, _auth_token: &str) -> Result<(), NotificationError> {
        info!("Email to {}: {} - {}", message.to, message.subject, message.text);
        Ok(())
    }
}
