use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use snapmap_common::LedgerError;
use snapmap_common::storage::StorageError;

/// Structured error response returned by the JSON endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable error description.
    #[schema(example = "Missing data")]
    pub error: String,
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `UNSUPPORTED_FILE`, `NOT_FOUND`, `STORAGE_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// Required request data is missing or malformed.
    Validation(String),
    /// A file was rejected by the type or size filter.
    UnsupportedFile(String),
    /// The referenced image does not exist. Rendered as a plain-text body.
    NotFound(String),
    /// The storage medium could not be written or read.
    Storage(String),
    Internal(String),
}

impl AppError {
    pub fn missing_data() -> Self {
        AppError::Validation("Missing data".into())
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    code: "VALIDATION_ERROR",
                },
            ),
            AppError::UnsupportedFile(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    code: "UNSUPPORTED_FILE",
                },
            ),
            AppError::Storage(detail) => {
                tracing::error!("Storage error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Failed to store upload".into(),
                        code: "STORAGE_ERROR",
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "An unexpected error occurred".into(),
                        code: "INTERNAL_ERROR",
                    },
                )
            }
            AppError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "Not found".into(),
                    code: "NOT_FOUND",
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::NotFound(detail) = &self {
            tracing::debug!("Not found: {}", detail);
            return (StatusCode::NOT_FOUND, "Not found").into_response();
        }

        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => AppError::NotFound(name),
            StorageError::InvalidName(msg) => AppError::UnsupportedFile(msg),
            StorageError::SizeLimitExceeded { .. } => AppError::UnsupportedFile(err.to_string()),
            StorageError::NameCollision { .. } | StorageError::Io(_) => {
                AppError::Storage(err.to_string())
            }
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Storage(err.to_string())
    }
}
