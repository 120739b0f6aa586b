use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::ActorContext;
use shared_models::error::AppError;

use crate::models::{NotificationError, NotificationQuery};
use crate::services::NotificationService;

fn to_app_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::NotFound => AppError::NotFound(e.to_string()),
        NotificationError::DatabaseError(msg) => AppError::Database(msg),
        NotificationError::EmailError(msg) => AppError::ExternalService(msg),
    }
}

pub async fn list_notifications(
    State(notifications): State<Arc<NotificationService>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Value>, AppError> {
    let items = notifications
        .list_own(query.unread_only, &actor)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "notifications": items,
        "unread": items.iter().filter(|n| !n.read).count()
    })))
}

pub async fn mark_read(
    State(notifications): State<Arc<NotificationService>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let notification = notifications.mark_read(id, &actor).await.map_err(to_app_error)?;
    Ok(Json(json!(notification)))
}
