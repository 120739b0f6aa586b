// libs/calendar-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_utils::extractor::{auth_middleware, AuthState};

use crate::handlers;
use crate::services::CalendarService;

pub fn calendar_routes(auth: AuthState, calendar: Arc<CalendarService>) -> Router {
    Router::new()
        .route("/{clinic_id}", get(handlers::get_calendar))
        .route("/{clinic_id}/slots", get(handlers::get_slots))
        .route("/{clinic_id}/bulk-apply", post(handlers::bulk_apply))
        .route("/{clinic_id}/days/{date}", put(handlers::save_day).delete(handlers::reset_day))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(calendar)
}
