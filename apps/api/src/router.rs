use std::sync::Arc;

use axum::{
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use auth_cell::router::auth_routes;
use availability_cell::router::availability_routes;
use booking_cell::router::booking_routes;
use directory_cell::router::{doctor_routes, patient_routes};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Carebook API is running!" }))
        .route("/health", get(health_check))
        .nest("/v1/auth", auth_routes(state.clone()))
        .nest("/v1/bookings", booking_routes(state.clone()))
        .nest(
            "/v1/doctors",
            doctor_routes(state.clone()).merge(availability_routes(state.clone())),
        )
        .nest("/v1/patients", patient_routes(state))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
