use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

use crate::{config::stage::Stage, usecases::errors::BillingError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A use-case error rendered for a given stage.
pub struct AppError {
    error: BillingError,
    stage: Stage,
}

impl AppError {
    pub fn new(error: BillingError, stage: Stage) -> Self {
        Self { error, stage }
    }

    pub fn body(&self) -> ErrorResponse {
        let detail = if self.stage.exposes_error_detail() {
            self.error.detail()
        } else {
            None
        };

        ErrorResponse {
            code: self.error.status_code().as_u16(),
            message: self.error.to_string(),
            detail,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = ?self.error, "http: request failed");
        }

        (status, Json(self.body())).into_response()
    }
}

pub fn not_found_body() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            code: StatusCode::NOT_FOUND.as_u16(),
            message: "Route not found".to_string(),
            detail: None,
        }),
    )
}
