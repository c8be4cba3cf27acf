use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// 400 response listing every failed field as `field: message`
pub fn validation_error(errors: &ValidationErrors) -> Response {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    // field_errors is a HashMap; keep the message stable
    fields.sort();

    ErrorResponse::new("validation_error", &fields.join("; "))
        .into_response_with(StatusCode::BAD_REQUEST)
}

/// 500 response; the detail is logged, not returned
pub fn internal_error(detail: &str) -> Response {
    tracing::error!(error = %detail, "request failed");
    ErrorResponse::new("internal_error", "Internal server error")
        .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}
