use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::HeaderMap,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_utils::jwt;

use crate::models::{AuthError, LoginRequest, RegisterRequest};
use crate::services::AuthService;

// Helper function to extract token
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Registering new {} account", request.role);

    let service = AuthService::new(&config);
    let response = service.register(request).await.map_err(map_auth_error)?;

    Ok(Json(json!({
        "success": true,
        "user": response.user,
        "access_token": response.access_token,
        "token_type": response.token_type,
        "expires_in": response.expires_in
    })))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AuthService::new(&config);
    let response = service.login(request).await.map_err(map_auth_error)?;

    Ok(Json(json!({
        "success": true,
        "user": response.user,
        "access_token": response.access_token,
        "token_type": response.token_type,
        "expires_in": response.expires_in
    })))
}

/// Echo the identity inside a bearer token, or 401.
#[axum::debug_handler]
pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match jwt::validate_token(&token, &config.jwt_secret) {
        Ok(user) => {
            let response = TokenResponse {
                valid: true,
                user_id: user.id,
                email: user.email,
                role: user.role,
            };

            Ok(Json(response))
        }
        Err(err) => Err(AppError::Auth(err)),
    }
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_auth_error(err: AuthError) -> AppError {
    match err {
        AuthError::EmailTaken => AppError::Conflict(err.to_string()),
        AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
        AuthError::Internal(message) => AppError::Internal(message),
        AuthError::DatabaseError(message) => AppError::Database(message),
        AuthError::InvalidEmail(_) | AuthError::InvalidRole(_) | AuthError::WeakPassword => {
            AppError::BadRequest(err.to_string())
        }
    }
}
