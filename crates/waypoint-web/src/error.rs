use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use waypoint_core::{ErrorResponse, ResolveError, ValidationError};

/// Request-level failures, rendered as `{ "success": false, "error": .. }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) | Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Resolve(error) if error.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Resolve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
