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

use directory_cell::models::PartyRole;

use crate::models::{BookingError, CancelBookingRequest, ProposeBookingRequest};
use crate::services::AdmissionService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct DayScheduleQuery {
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub include_cancelled: Option<bool>,
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Propose a booking. Patients book for themselves; admins can book on any
/// patient's behalf.
#[axum::debug_handler]
pub async fn propose_booking(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ProposeBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = request.patient_id == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_self && !is_admin {
        return Err(AppError::Forbidden(
            "Not authorized to book for this patient".to_string(),
        ));
    }

    let service = AdmissionService::from_config(&state);
    let booking = service
        .propose_booking(request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AdmissionService::from_config(&state);
    let booking = service
        .get_booking(booking_id)
        .await
        .map_err(map_booking_error)?;

    let allowed = match user.role.as_deref() {
        Some("admin") => true,
        Some("doctor") => booking.doctor_id == user.id,
        _ => booking.patient_id == user.id,
    };
    if !allowed {
        return Err(AppError::Forbidden(
            "Not authorized to view this booking".to_string(),
        ));
    }

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

/// Cancel a booking. A reason, when present, is appended to the booking
/// note.
#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let reason = request.reason;
    // Unknown or missing roles get patient privileges only.
    let actor_role = user
        .role
        .as_deref()
        .and_then(|r| r.parse::<PartyRole>().ok())
        .unwrap_or(PartyRole::Patient);

    let service = AdmissionService::from_config(&state);
    let booking = service
        .cancel_booking(booking_id, user.id, actor_role, reason)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking cancelled"
    })))
}

/// Hard delete a booking. Admins can delete any; a doctor can delete one of
/// their own.
#[axum::debug_handler]
pub async fn delete_booking(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AdmissionService::from_config(&state);

    let is_admin = user.role.as_deref() == Some("admin");
    if !is_admin {
        let booking = service
            .get_booking(booking_id)
            .await
            .map_err(map_booking_error)?;
        let is_own_as_doctor =
            user.role.as_deref() == Some("doctor") && booking.doctor_id == user.id;
        if !is_own_as_doctor {
            return Err(AppError::Forbidden(
                "Not authorized to delete this booking".to_string(),
            ));
        }
    }

    service
        .remove_booking(booking_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Booking deleted"
    })))
}

/// Day schedule for a doctor: non-cancelled bookings starting on the given
/// UTC date, ascending. Doctors default to their own schedule.
#[axum::debug_handler]
pub async fn get_day_schedule(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<String>,
    Query(query): Query<DayScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = match user.role.as_deref() {
        Some("admin") => query.doctor_id.ok_or_else(|| {
            AppError::BadRequest("doctor_id query parameter is required".to_string())
        })?,
        Some("doctor") => {
            let doctor_id = query.doctor_id.unwrap_or(user.id);
            if doctor_id != user.id {
                return Err(AppError::Forbidden(
                    "Not authorized to view another doctor's schedule".to_string(),
                ));
            }
            doctor_id
        }
        _ => {
            return Err(AppError::Forbidden(
                "Only doctors can view a day schedule".to_string(),
            ))
        }
    };

    let service = AdmissionService::from_config(&state);
    let bookings = service
        .list_by_day(doctor_id, &date)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "date": date,
        "doctor_id": doctor_id,
        "count": bookings.len(),
        "bookings": bookings
    })))
}

#[axum::debug_handler]
pub async fn get_patient_bookings(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let is_self = patient_id == user.id;
    let is_admin = user.role.as_deref() == Some("admin");
    if !is_self && !is_admin {
        return Err(AppError::Forbidden(
            "Not authorized to view this patient's bookings".to_string(),
        ));
    }

    let service = AdmissionService::from_config(&state);
    let bookings = service
        .list_for_patient(patient_id, query.include_cancelled.unwrap_or(false))
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "count": bookings.len(),
        "bookings": bookings
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_bookings(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let is_self = doctor_id == user.id && user.role.as_deref() == Some("doctor");
    let is_admin = user.role.as_deref() == Some("admin");
    if !is_self && !is_admin {
        return Err(AppError::Forbidden(
            "Not authorized to view this doctor's bookings".to_string(),
        ));
    }

    let service = AdmissionService::from_config(&state);
    let bookings = service
        .list_for_doctor(doctor_id, query.include_cancelled.unwrap_or(false))
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "count": bookings.len(),
        "bookings": bookings
    })))
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_booking_error(err: BookingError) -> AppError {
    match err {
        BookingError::DoctorConflict | BookingError::PatientConflict => {
            AppError::Conflict(err.to_string())
        }
        BookingError::NotFound => AppError::NotFound("Booking not found".to_string()),
        BookingError::Forbidden(message) => AppError::Forbidden(message),
        BookingError::DatabaseError(message) => AppError::Database(message),
        BookingError::InvalidInterval
        | BookingError::UnknownParty(_)
        | BookingError::InvalidRole { .. }
        | BookingError::InvalidDate(_)
        | BookingError::InvalidStatusTransition(_) => AppError::BadRequest(err.to_string()),
    }
}
