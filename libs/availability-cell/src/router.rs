use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Routes mounted under `/v1/doctors` alongside the directory routes.
pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/{doctor_id}/availability", get(handlers::get_availability))
        .route("/{doctor_id}/availability", put(handlers::set_availability))
        .route("/{doctor_id}/slots", get(handlers::get_slots))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
