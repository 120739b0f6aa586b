use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_utils::extractor::{auth_middleware, AuthState};

use crate::handlers;

pub fn auth_routes(state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/validate", post(handlers::validate_token))
        .route("/verify", post(handlers::verify_token));

    let protected_routes = Router::new()
        .route("/me", get(handlers::current_actor))
        .route("/roles/{user_id}", put(handlers::assign_role))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
