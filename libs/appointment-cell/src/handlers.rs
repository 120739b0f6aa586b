// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::ActorContext;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, ConflictCheckRequest, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

pub fn to_app_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound
        | AppointmentError::PatientNotFound
        | AppointmentError::ClinicNotFound
        | AppointmentError::ServiceNotFound => AppError::NotFound(e.to_string()),
        AppointmentError::ServiceInactive => AppError::BadRequest(e.to_string()),
        AppointmentError::ProfileIncomplete { .. } => AppError::PreconditionFailed(e.to_string()),
        AppointmentError::SlotNotAvailable | AppointmentError::ConflictDetected => {
            AppError::Conflict(e.to_string())
        }
        AppointmentError::InvalidTime(_) => AppError::ValidationError(e.to_string()),
        AppointmentError::InvalidStatusTransition { .. } => AppError::BadRequest(e.to_string()),
        AppointmentError::Unauthorized => AppError::Forbidden(e.to_string()),
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = booking
        .create_appointment(request, &actor)
        .await
        .map_err(to_app_error)?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(booking): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = booking
        .search_appointments(query, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<ActorContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking
        .get_appointment(appointment_id, &actor)
        .await
        .map_err(to_app_error)?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<ActorContext>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking
        .update_appointment(appointment_id, request, &actor)
        .await
        .map_err(to_app_error)?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<ActorContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    booking
        .delete_appointment(appointment_id, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

// ==============================================================================
// STATUS SHORTCUTS
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<ActorContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking
        .confirm_appointment(appointment_id, &actor)
        .await
        .map_err(to_app_error)?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<ActorContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking
        .cancel_appointment(appointment_id, &actor)
        .await
        .map_err(to_app_error)?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn check_conflicts(
    State(booking): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<ConflictCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let response = booking
        .check_conflicts(request, &actor)
        .await
        .map_err(to_app_error)?;
    Ok(Json(json!(response)))
}
