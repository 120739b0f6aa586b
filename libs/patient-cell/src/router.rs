use std::sync::Arc;
use axum::{middleware, routing::get, Router};
use shared_utils::extractor::{auth_middleware, AuthState};

use crate::handlers::*;
use crate::services::PatientService;

pub fn patient_routes(auth: AuthState, patients: Arc<PatientService>) -> Router {
    Router::new()
        .route("/", get(search_patients))
        .route("/me", get(get_my_profile).put(upsert_my_profile))
        .route("/me/completeness", get(get_my_completeness))
        .route("/{id}", get(get_patient))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(patients)
}
