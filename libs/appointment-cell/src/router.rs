// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::extractor::{auth_middleware, AuthState};

use crate::handlers;
use crate::services::booking::AppointmentBookingService;

pub fn appointment_routes(auth: AuthState, booking: Arc<AppointmentBookingService>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment).get(handlers::search_appointments))
        .route("/check-conflict", post(handlers::check_conflicts))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(booking)
}
