//! Error types for the API tier.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Errors
//! from the pipeline crates map onto it through `From`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gambit_core::{ImportError, LineRequestError, QueueError, StoreError};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request is malformed or refers to something not ready yet.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A game identifier could not be parsed from the request path.
    #[error("invalid game id: {0}")]
    InvalidGameId(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::BadRequest(msg) | Self::InvalidGameId(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Invalid(msg) => Self::BadRequest(msg),
            StoreError::Db(e) => Self::Internal(format!("database error: {e}")),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        Self::Internal(format!("queue error: {e}"))
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::EmptyName | ImportError::Notation(_) => Self::BadRequest(e.to_string()),
            ImportError::Store(e) => e.into(),
            ImportError::Queue(e) => e.into(),
        }
    }
}

impl From<LineRequestError> for ApiError {
    fn from(e: LineRequestError) -> Self {
        match e {
            LineRequestError::NoPosition { .. } => Self::BadRequest(e.to_string()),
            LineRequestError::Store(e) => e.into(),
            LineRequestError::Queue(e) => e.into(),
        }
    }
}
