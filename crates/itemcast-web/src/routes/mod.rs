//! Route handlers.

pub mod health;
pub mod items;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use itemcast_core::CoreError;
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// Successful response body: `{"success": true, "data": ...}`.
pub fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Error response rendered as `{"success": false, "error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        let status = match &e {
            CoreError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
            CoreError::Database(_) => {
                error!(error = %e, "Item store request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}
