use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    // Every booking operation requires authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::propose_booking))
        .route("/{booking_id}", get(handlers::get_booking))
        .route("/{booking_id}", delete(handlers::delete_booking))
        .route("/{booking_id}/cancel", patch(handlers::cancel_booking))
        .route("/day/{date}", get(handlers::get_day_schedule))
        .route("/patient/{patient_id}", get(handlers::get_patient_bookings))
        .route("/doctor/{doctor_id}", get(handlers::get_doctor_bookings))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
