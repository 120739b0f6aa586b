use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use tracing::debug;

use shared_models::auth::{ActorContext, Role, User};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

/// Source of truth for a user's role (the `user_roles` table in production).
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// `None` when the user has no role row.
    async fn role_of(&self, user_id: &str, auth_token: &str) -> Result<Option<Role>, AppError>;

    async fn assign(&self, user_id: &str, role: Role, auth_token: &str) -> Result<(), AppError>;
}

/// State required by [`auth_middleware`].
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub roles: Arc<dyn RoleDirectory>,
}

impl AuthState {
    pub fn new(config: Arc<AppConfig>, roles: Arc<dyn RoleDirectory>) -> Self {
        Self { config, roles }
    }
}

fn bearer_token(request: &Request<Body>) -> Result<String, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

/// Validates the bearer token, resolves the caller's role and stores both the
/// [`User`] and the [`ActorContext`] in the request extensions.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;

    let user = validate_token(&token, &auth.config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    let role = auth
        .roles
        .role_of(&user.id, &token)
        .await?
        .unwrap_or(Role::Patient);

    debug!("Resolved actor {} with role {}", user.id, role);

    let mut actor = ActorContext::new(user.id.clone(), role).with_token(token);
    actor.email = user.email.clone();

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

pub fn require_admin(actor: &ActorContext) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Administrator role required".to_string()))
    }
}
