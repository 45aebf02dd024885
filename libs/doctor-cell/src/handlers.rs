use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{Doctor, DoctorRequest, DoctorSearchFilters};
use crate::services::doctor::DoctorService;

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Query(filters): Query<DoctorSearchFilters>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let service = DoctorService::new(&state);
    let doctors = service.list_doctors(&filters).await?;

    Ok(Json(doctors))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Doctor>, AppError> {
    let service = DoctorService::new(&state);
    let doctor = service.get_doctor(doctor_id).await?;

    Ok(Json(doctor))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Json(request): Json<DoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let profile = request.validate()?;

    let service = DoctorService::new(&state);
    let doctor = service.create_doctor(profile).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Doctor created successfully",
            "doctor": doctor
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<i64>,
    Json(request): Json<DoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let profile = request.validate()?;

    let service = DoctorService::new(&state);
    let doctor = service.update_doctor(doctor_id, profile).await?;

    Ok(Json(json!({
        "message": "Doctor updated successfully",
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    service.delete_doctor(doctor_id).await?;

    Ok(Json(json!({
        "message": "Doctor deleted successfully"
    })))
}
