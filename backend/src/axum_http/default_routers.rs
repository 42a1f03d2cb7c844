use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use super::error_responses::not_found_body;

pub async fn not_found() -> impl IntoResponse {
    not_found_body()
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
