// libs/clinic-cell/src/handlers.rs
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
    CatalogError, CreateClinicRequest, CreateServiceRequest, ServiceListQuery,
    UpdateClinicRequest, UpdateServiceRequest,
};
use crate::services::CatalogService;

fn to_app_error(e: CatalogError) -> AppError {
    match e {
        CatalogError::ClinicNotFound | CatalogError::ServiceNotFound => AppError::NotFound(e.to_string()),
        CatalogError::ValidationError(msg) => AppError::ValidationError(msg),
        CatalogError::Unauthorized => AppError::Forbidden(e.to_string()),
        CatalogError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// CLINIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_clinics(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    let clinics = catalog.list_clinics(&actor).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "clinics": clinics,
        "total": clinics.len()
    })))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic = catalog.get_clinic(clinic_id, &actor).await.map_err(to_app_error)?;
    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn create_clinic(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let clinic = catalog.create_clinic(request, &actor).await.map_err(to_app_error)?;
    Ok((StatusCode::CREATED, Json(json!(clinic))))
}

#[axum::debug_handler]
pub async fn update_clinic(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic = catalog
        .update_clinic(clinic_id, request, &actor)
        .await
        .map_err(to_app_error)?;
    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn delete_clinic(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    catalog.delete_clinic(clinic_id, &actor).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Clinic deleted"
    })))
}

// ==============================================================================
// SERVICE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_services(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<ServiceListQuery>,
) -> Result<Json<Value>, AppError> {
    let services = catalog
        .list_services(query.include_inactive, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "services": services,
        "total": services.len()
    })))
}

#[axum::debug_handler]
pub async fn get_service(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = catalog.get_service(service_id, &actor).await.map_err(to_app_error)?;
    Ok(Json(json!(service)))
}

#[axum::debug_handler]
pub async fn create_service(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = catalog.create_service(request, &actor).await.map_err(to_app_error)?;
    Ok((StatusCode::CREATED, Json(json!(service))))
}

#[axum::debug_handler]
pub async fn update_service(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Path(service_id): Path<Uuid>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let service = catalog
        .update_service(service_id, request, &actor)
        .await
        .map_err(to_app_error)?;
    Ok(Json(json!(service)))
}

#[axum::debug_handler]
pub async fn delete_service(
    State(catalog): State<Arc<CatalogService>>,
    Extension(actor): Extension<ActorContext>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    catalog.delete_service(service_id, &actor).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Service deleted"
    })))
}
