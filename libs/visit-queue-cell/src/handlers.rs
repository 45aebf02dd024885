use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{AddToQueueRequest, UpdateQueueRequest};
use crate::services::queue::VisitQueueService;

#[axum::debug_handler]
pub async fn get_queue(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = VisitQueueService::new(&state);
    let queue = service.list_active().await?;

    Ok(Json(json!(queue)))
}

#[axum::debug_handler]
pub async fn add_to_queue(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<AddToQueueRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let new_entry = request.validate()?;

    let service = VisitQueueService::new(&state);
    let entry = service.add_patient(new_entry).await?;

    info!("User {} queued patient {}", user.id, entry.entry.patient_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Patient added to queue successfully",
            "queueEntry": entry
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_queue_entry(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(entry_id): Path<i64>,
    Json(request): Json<UpdateQueueRequest>,
) -> Result<Json<Value>, AppError> {
    let changes = request.validate()?;

    let service = VisitQueueService::new(&state);
    let entry = service.update_entry(entry_id, changes).await?;

    Ok(Json(json!({
        "message": "Queue entry updated successfully",
        "queueEntry": entry
    })))
}

#[axum::debug_handler]
pub async fn remove_from_queue(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(entry_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = VisitQueueService::new(&state);
    service.remove_entry(entry_id).await?;

    Ok(Json(json!({
        "message": "Patient removed from queue successfully"
    })))
}
