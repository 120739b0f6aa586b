use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_database::memory::MemoryTable;
use shared_database::supabase::{eq, SupabaseClient};
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::extractor::RoleDirectory;

#[derive(Debug, Deserialize)]
struct UserRoleRow {
    role: String,
}

/// Reads roles from the `user_roles` table.
pub struct SupabaseRoleDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseRoleDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl RoleDirectory for SupabaseRoleDirectory {
    async fn role_of(&self, user_id: &str, auth_token: &str) -> Result<Option<Role>, AppError> {
        debug!("Looking up role for user {}", user_id);

        let path = format!("/rest/v1/user_roles?user_id={}&select=role", eq(user_id));
        let rows: Vec<UserRoleRow> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Highest privilege wins when a user carries several rows.
        let mut resolved = None;
        for row in rows {
            match row.role.parse::<Role>() {
                Ok(Role::Admin) => return Ok(Some(Role::Admin)),
                Ok(role) => resolved = Some(role),
                Err(e) => warn!("Ignoring role row for {}: {}", user_id, e),
            }
        }
        Ok(resolved)
    }

    async fn assign(&self, user_id: &str, role: Role, auth_token: &str) -> Result<(), AppError> {
        let _: Vec<Value> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/user_roles?on_conflict=user_id",
                Some(auth_token),
                Some(json!({ "user_id": user_id, "role": role.to_string() })),
                Some(SupabaseClient::upsert_headers()),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!("Assigned role {} to user {}", role, user_id);
        Ok(())
    }
}

/// Fixture directory for the in-memory backend and tests.
#[derive(Default)]
pub struct InMemoryRoleDirectory {
    roles: MemoryTable<String, Role>,
}

impl InMemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the directory, typically with the bootstrap administrators.
    pub async fn with_roles<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Role)>,
    {
        let directory = Self::new();
        for (user_id, role) in entries {
            directory.roles.put(user_id, role).await;
        }
        directory
    }
}

#[async_trait]
impl RoleDirectory for InMemoryRoleDirectory {
    async fn role_of(&self, user_id: &str, _auth_token: &str) -> Result<Option<Role>, AppError> {
        Ok(self.roles.get(&user_id.to_string()).await)
    }

    async fn assign(&self, user_id: &str, role: Role, _auth_token: &str) -> Result<(), AppError> {
        self.roles.put(user_id.to_string(), role).await;
        info!("Assigned role {} to user {}", role, user_id);
        Ok(())
    }
}
