use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::ActorContext;
use shared_models::error::AppError;

use crate::models::{PatientError, PatientSearchQuery, UpsertProfileRequest};
use crate::services::PatientService;

pub fn to_app_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound(e.to_string()),
        PatientError::ProfileIncomplete { .. } => AppError::PreconditionFailed(e.to_string()),
        PatientError::InvalidBirthDate => AppError::ValidationError(e.to_string()),
        PatientError::Unauthorized => AppError::Forbidden(e.to_string()),
        PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_my_profile(
    State(patients): State<Arc<PatientService>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    let profile = patients.get_own(&actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn upsert_my_profile(
    State(patients): State<Arc<PatientService>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<UpsertProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let profile = patients.upsert_own(request, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "profile": profile,
        "complete": profile.is_complete()
    })))
}

#[axum::debug_handler]
pub async fn get_my_completeness(
    State(patients): State<Arc<PatientService>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    let completeness = patients.completeness(&actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(completeness)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(patients): State<Arc<PatientService>>,
    Extension(actor): Extension<ActorContext>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let profile = patients.get(patient_id, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(patients): State<Arc<PatientService>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let found = patients.search(query, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "patients": found,
        "total": found.len()
    })))
}
