use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    // Register and login are the only unauthenticated writes in the API;
    // validate does its own header check so expired tokens get a clean 401.
    let public_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/validate", get(handlers::validate_token));

    Router::new().merge(public_routes).with_state(state)
}
