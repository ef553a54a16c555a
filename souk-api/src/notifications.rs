use axum::{
    extract::State,
    middleware,
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use souk_shared::models::DeviceToken;

use crate::{
    error::AppError,
    middleware::{require_auth, AuthUser},
    state::AppState,
};

const DEFAULT_PLATFORM: &str = "android";

#[derive(Debug, Deserialize)]
pub struct RegisterTokenRequest {
    pub token: String,
    pub platform: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/notifications/tokens", post(register_token))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// POST /v1/notifications/tokens
async fn register_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RegisterTokenRequest>,
) -> Result<Json<DeviceToken>, AppError> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("token is required".into()));
    }
    let platform = req
        .platform
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PLATFORM);

    let saved = state
        .devices
        .upsert_token(user.user_id, token, platform)
        .await
        .map_err(|e| AppError::Internal(format!("Token registration failed: {e}")))?;

    tracing::info!(user_id = %user.user_id, platform, "Device token registered");
    Ok(Json(saved))
}
