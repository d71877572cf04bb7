//! API error responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notify_core::ValidationError;

/// Body of every error response.
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Failure of an API request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was malformed or failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// The service failed.
    #[error(transparent)]
    Internal(#[from] color_eyre::eyre::Report),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(e) => {
                tracing::error!(error = ?e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
