// libs/clinic-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_utils::extractor::{auth_middleware, AuthState};

use crate::handlers;
use crate::services::CatalogService;

pub fn clinic_routes(auth: AuthState, catalog: Arc<CatalogService>) -> Router {
    Router::new()
        .route("/", get(handlers::list_clinics).post(handlers::create_clinic))
        .route(
            "/{clinic_id}",
            get(handlers::get_clinic)
                .put(handlers::update_clinic)
                .delete(handlers::delete_clinic),
        )
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(catalog)
}

pub fn service_routes(auth: AuthState, catalog: Arc<CatalogService>) -> Router {
    Router::new()
        .route("/", get(handlers::list_services).post(handlers::create_service))
        .route(
            "/{service_id}",
            get(handlers::get_service)
                .patch(handlers::update_service)
                .delete(handlers::delete_service),
        )
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(catalog)
}
