use axum::{
    extract::{Path, State, Extension},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{Patient, PatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
) -> Result<Json<Vec<Patient>>, AppError> {
    let service = PatientService::new(&state);
    let patients = service.list_patients().await?;

    Ok(Json(patients))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Patient>, AppError> {
    let service = PatientService::new(&state);
    let patient = service.get_patient(patient_id).await?;

    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Json(request): Json<PatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let details = request.validate()?;

    let service = PatientService::new(&state);
    let patient = service.create_patient(details).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Patient created successfully",
            "patient": patient
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(patient_id): Path<i64>,
    Json(request): Json<PatientRequest>,
) -> Result<Json<Value>, AppError> {
    let details = request.validate()?;

    let service = PatientService::new(&state);
    let patient = service.update_patient(patient_id, details).await?;

    Ok(Json(json!({
        "message": "Patient updated successfully",
        "patient": patient
    })))
}
