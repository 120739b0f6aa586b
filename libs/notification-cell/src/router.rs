use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
    middleware,
};

use shared_utils::extractor::{auth_middleware, AuthState};

use crate::handlers;
use crate::services::NotificationService;

pub fn notification_routes(auth: AuthState, notifications: Arc<NotificationService>) -> Router {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/{id}/read", patch(handlers::mark_read))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(notifications)
}
