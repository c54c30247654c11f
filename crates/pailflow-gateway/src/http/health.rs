use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// `GET /health` (spec.md §6) — liveness probe, no auth required.
pub async fn health_handler(State(_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({"status": "healthy", "service": "pailflow"}))
}
