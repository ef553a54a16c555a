use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.categories.snapshot();
    Json(json!({
        "status": "ok",
        "categories": snapshot.len(),
        "categories_loaded_at": snapshot.loaded_at(),
    }))
}
