use axum::{
    extract::{Path, State, Json, Extension},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::{ActorContext, Role, TokenResponse};
use shared_models::error::AppError;
use shared_utils::extractor::{require_admin, AuthState};
use shared_utils::jwt;

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: Role,
}

// Helper function to extract token
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
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

/// Validates the token and reports the clinic role it maps to.
pub async fn validate_token(
    State(auth): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;
    let user = jwt::validate_token(&token, &auth.config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    let role = auth.roles.role_of(&user.id, &token).await?.unwrap_or(Role::Patient);

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: Some(role.to_string()),
    }))
}

pub async fn verify_token(
    State(auth): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;
    let valid = jwt::validate_token(&token, &auth.config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

pub async fn current_actor(
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<ActorContext>, AppError> {
    Ok(Json(actor))
}

pub async fn assign_role(
    State(auth): State<AuthState>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<String>,
    Json(request): Json<AssignRoleRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&actor)?;

    if user_id == actor.user_id && request.role != Role::Admin {
        return Err(AppError::ValidationError("Administrators cannot demote themselves".to_string()));
    }

    auth.roles.assign(&user_id, request.role, actor.token()).await?;

    Ok(Json(json!({
        "success": true,
        "user_id": user_id,
        "role": request.role
    })))
}
