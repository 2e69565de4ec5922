//! Liveness endpoint.

use axum::Json;
use serde_json::{json, Value};

pub const HEALTH_PATH: &str = "/health";

/// `{"status":"ok"}` with `Content-Type: application/json`, whatever the query.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
