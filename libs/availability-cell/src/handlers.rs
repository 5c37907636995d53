use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{AvailabilityError, SetAvailabilityRequest};
use crate::services::AvailabilityService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub from: String,
    pub to: String,
    pub slot_minutes: Option<u32>,
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Extension(_user): Extension<AuthUser>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let windows = service
        .get_windows(doctor_id)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "count": windows.len(),
        "windows": windows
    })))
}

/// Replace a doctor's weekly windows. Doctors may only set their own; admins
/// can set anyone's.
#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = user.role.as_deref() == Some("doctor") && doctor_id == user.id;
    let is_admin = user.role.as_deref() == Some("admin");
    if !is_self && !is_admin {
        return Err(AppError::Forbidden(
            "Not authorized to set this doctor's availability".to_string(),
        ));
    }

    let service = AvailabilityService::new(&state);
    let windows = service
        .set_windows(doctor_id, request)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "count": windows.len(),
        "windows": windows
    })))
}

/// Concrete bookable slices for a doctor over a date range, each flagged
/// against the doctor's calendar.
#[axum::debug_handler]
pub async fn get_slots(
    State(state): State<Arc<AppConfig>>,
    Extension(_user): Extension<AuthUser>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let slots = service
        .bookable_slots(doctor_id, &query.from, &query.to, query.slot_minutes)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "from": query.from,
        "to": query.to,
        "count": slots.len(),
        "slots": slots
    })))
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_availability_error(err: AvailabilityError) -> AppError {
    match err {
        AvailabilityError::InvalidWindow(message) => AppError::BadRequest(message),
        AvailabilityError::InvalidDate(message) => {
            AppError::BadRequest(format!("Invalid date: {}", message))
        }
        AvailabilityError::DatabaseError(message) => AppError::Database(message),
    }
}
