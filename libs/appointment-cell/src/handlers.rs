// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    AppointmentQueryParams, ConflictCheckQuery, ConflictCheckResponse, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Value>, AppError> {
    let filter = params.validate()?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service.list_appointments(&filter).await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.get_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let new_appointment = request.validate()?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service.book_appointment(new_appointment).await?;

    info!("User {} booked appointment {}", user.id, appointment.appointment.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment created successfully",
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let changes = request.validate()?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service.update_appointment(appointment_id, changes).await?;

    info!("User {} updated appointment {}", user.id, appointment_id);

    Ok(Json(json!({
        "message": "Appointment updated successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    service.delete_appointment(appointment_id).await?;

    info!("User {} deleted appointment {}", user.id, appointment_id);

    Ok(Json(json!({
        "message": "Appointment deleted successfully"
    })))
}

/// Read-only probe used by the booking form before submit.
#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<ConflictCheckResponse>, AppError> {
    let request = query.validate()?;

    let service = AppointmentBookingService::new(&state);
    let has_conflict = service
        .check_conflict(request.doctor_id, request.appointment_time, request.exclude_id)
        .await?;

    Ok(Json(ConflictCheckResponse {
        has_conflict,
        doctor_id: request.doctor_id,
        appointment_time: request.appointment_time,
    }))
}
