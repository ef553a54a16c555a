use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use souk_shared::models::{Category, CategoryNode};
use uuid::Uuid;

use crate::{error::AppError, middleware::require_auth, state::AppState};

#[derive(Debug, Serialize)]
struct RefreshResponse {
    count: usize,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/v1/categories/refresh", post(refresh_categories))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/v1/categories", get(list_categories))
        .route("/v1/categories/{id}", get(get_category))
        .merge(protected)
}

/// GET /v1/categories
async fn list_categories(State(state): State<AppState>) -> Json<Arc<[CategoryNode]>> {
    Json(state.categories.find_all())
}

/// GET /v1/categories/{id}
async fn get_category(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Category>, AppError> {
    state
        .categories
        .find_one(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("category not found: {id}")))
}

/// POST /v1/categories/refresh
async fn refresh_categories(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let count = state.categories.refresh().await?;
    Ok(Json(RefreshResponse { count }))
}
