use axum::{
    extract::{Extension, Json, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::{extract_bearer_token, require_admin};
use shared_utils::jwt::validate_token;
use shared_utils::AppState;

use crate::models::{LoginRequest, LoginResponse, RegisterRequest, UserProfile};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let credentials = request.validate()?;

    let service = AuthService::new(&state);
    let response = service.login(credentials).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;
    let new_user = request.validate()?;

    let service = AuthService::new(&state);
    let profile = service.register(new_user).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": profile
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<UserProfile>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let service = AuthService::new(&state);
    let profile = service.profile(user.id).await?;

    Ok(Json(profile))
}

pub async fn validate_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;
    let user = validate_token(token, &state.config.jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}
