// libs/calendar-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::ActorContext;
use shared_models::error::AppError;

use crate::models::{
    BulkApplyRequest, CalendarConfiguration, CalendarError, CalendarRangeQuery, DaySettings,
    SlotsQuery,
};
use crate::services::CalendarService;

fn to_app_error(e: CalendarError) -> AppError {
    match e {
        CalendarError::ValidationError(msg) => AppError::ValidationError(msg),
        CalendarError::InvalidMonth { .. } => AppError::ValidationError(e.to_string()),
        CalendarError::Unauthorized => AppError::Forbidden(e.to_string()),
        CalendarError::DatabaseError(msg) => AppError::Database(msg),
    }
}

pub async fn get_calendar(
    State(calendar): State<Arc<CalendarService>>,
    Extension(actor): Extension<ActorContext>,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<CalendarRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let configurations = calendar
        .load(clinic_id, query.from, query.to, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "clinic_id": clinic_id,
        "configurations": configurations,
        "defaults": DaySettings::default(),
    })))
}

pub async fn save_day(
    State(calendar): State<Arc<CalendarService>>,
    Extension(actor): Extension<ActorContext>,
    Path((clinic_id, date)): Path<(Uuid, NaiveDate)>,
    Json(settings): Json<DaySettings>,
) -> Result<Json<Value>, AppError> {
    let saved = calendar
        .save(CalendarConfiguration::new(clinic_id, date, settings), &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "configuration": saved,
        "message": "Calendar day saved"
    })))
}

pub async fn reset_day(
    State(calendar): State<Arc<CalendarService>>,
    Extension(actor): Extension<ActorContext>,
    Path((clinic_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    let removed = calendar
        .reset(clinic_id, date, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "removed": removed,
        "message": "Day reverted to default configuration"
    })))
}

pub async fn bulk_apply(
    State(calendar): State<Arc<CalendarService>>,
    Extension(actor): Extension<ActorContext>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<BulkApplyRequest>,
) -> Result<Json<Value>, AppError> {
    let report = calendar
        .bulk_apply_to_month(clinic_id, request.settings, request.year, request.month, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": report.is_complete(),
        "report": report,
    })))
}

pub async fn get_slots(
    State(calendar): State<Arc<CalendarService>>,
    Extension(actor): Extension<ActorContext>,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let day = calendar
        .get_available_time_slots(clinic_id, query.date, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(day)))
}
