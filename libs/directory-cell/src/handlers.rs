use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{DirectoryError, DoctorListParams};
use crate::services::directory::DirectoryService;

fn map_directory_error(err: DirectoryError) -> AppError {
    match err {
        DirectoryError::NotFound => AppError::NotFound("Directory entry not found".to_string()),
        DirectoryError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<DoctorListParams>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);

    let doctors = service
        .list_doctors(&params)
        .await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "page": page,
        "per_page": per_page,
        "count": doctors.len(),
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);

    let doctor = service
        .get_doctor(doctor_id)
        .await
        .map_err(|e| match e {
            DirectoryError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            other => map_directory_error(other),
        })?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    // Patients may only fetch their own profile; doctors and admins may
    // fetch any.
    let is_self = patient_id == user.id;
    let is_doctor = user.role.as_deref() == Some("doctor");
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_self && !is_doctor && !is_admin {
        return Err(AppError::Forbidden(
            "Not authorized to view this patient profile".to_string(),
        ));
    }

    let service = DirectoryService::new(&state);

    let patient = service
        .get_patient(patient_id)
        .await
        .map_err(|e| match e {
            DirectoryError::NotFound => AppError::NotFound("Patient not found".to_string()),
            other => map_directory_error(other),
        })?;

    Ok(Json(json!(patient)))
}
