use axum::{
    Router,
    routing::get,
};

use appointment_cell::appointment_routes;
use auth_cell::auth_routes;
use calendar_cell::calendar_routes;
use clinic_cell::{clinic_routes, service_routes};
use notification_cell::notification_routes;
use patient_cell::patient_routes;

use crate::state::AppServices;

pub fn create_router(services: AppServices) -> Router {
    let auth = services.auth;

    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/auth", auth_routes(auth.clone()))
        .nest("/clinics", clinic_routes(auth.clone(), services.catalog.clone()))
        .nest("/services", service_routes(auth.clone(), services.catalog))
        .nest("/patients", patient_routes(auth.clone(), services.patients))
        .nest("/calendar", calendar_routes(auth.clone(), services.calendar))
        .nest("/appointments", appointment_routes(auth.clone(), services.appointments))
        .nest("/notifications", notification_routes(auth, services.notifications))
}
