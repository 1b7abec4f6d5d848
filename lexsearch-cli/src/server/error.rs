use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<lexsearch_lib::Error> for ApiError {
    fn from(err: lexsearch_lib::Error) -> Self {
        use lexsearch_lib::Error;

        match err {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Embedding(_) | Error::Llm(_) => ApiError::ServiceUnavailable(err.to_string()),
            Error::Load { .. } | Error::IndexMismatch(_) | Error::Io(_) => ApiError::internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let message = match self {
            ApiError::BadRequest(msg) | ApiError::ServiceUnavailable(msg) | ApiError::Internal(msg) => msg,
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
