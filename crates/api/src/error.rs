//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_store::StoreError;
use saga::SubmitError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order submission failed.
    Submit(SubmitError),
    /// Order store read failed.
    Store(StoreError),
}

impl ApiError {
    /// Returns the status code this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Submit(err) => submit_error_status(err),
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::Submit(err) => err.to_string(),
            ApiError::Store(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, %status, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn submit_error_status(err: &SubmitError) -> StatusCode {
    match err {
        SubmitError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SubmitError::GoodsUnidentifiable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitError::InventoryExhausted { .. } => StatusCode::CONFLICT,
        SubmitError::TransientRemote { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SubmitError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
        SubmitError::Persistence { .. } | SubmitError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        ApiError::Submit(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
