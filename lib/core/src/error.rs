use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these —
// never on the human-readable detail string.

/// Stable error code constants.
///
/// Clients should match on `code` from `{"code": "OUT_OF_STOCK", "detail": "..."}`.
/// Codes never change; detail messages may be reworded.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const WINDOW_CLOSED: &str = "WINDOW_CLOSED";
    pub const WINDOW_NOT_OPEN: &str = "WINDOW_NOT_OPEN";
    pub const OUT_OF_STOCK: &str = "OUT_OF_STOCK";
    pub const ALREADY_CLAIMED: &str = "ALREADY_CLAIMED";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const BUSY: &str = "BUSY";
    pub const INTERNAL: &str = "INTERNAL";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type used across all modules.
///
/// Each variant maps to a stable error code (see [`error_code`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"code": "OUT_OF_STOCK", "detail": "drop 'abc' has no stock left"}
/// ```
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Resource does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// join/leave attempted after the claim window ended. HTTP 403.
    #[error("{0}")]
    WindowClosed(String),

    /// claim attempted outside the open claim window. HTTP 403.
    #[error("{0}")]
    WindowNotOpen(String),

    /// claim attempted with zero remaining stock. HTTP 409.
    #[error("{0}")]
    OutOfStock(String),

    /// Duplicate claim by the same user on the same drop. HTTP 409.
    #[error("{0}")]
    AlreadyClaimed(String),

    /// Input data is invalid. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid authentication credentials. HTTP 401.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but lacks required permission. HTTP 403.
    #[error("{0}")]
    PermissionDenied(String),

    /// Per-drop serialization point unavailable within the bounded wait.
    /// Safe to retry with backoff — no partial state change occurred.
    /// HTTP 503.
    #[error("{0}")]
    Busy(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::WindowClosed(_) => error_code::WINDOW_CLOSED,
            ServiceError::WindowNotOpen(_) => error_code::WINDOW_NOT_OPEN,
            ServiceError::OutOfStock(_) => error_code::OUT_OF_STOCK,
            ServiceError::AlreadyClaimed(_) => error_code::ALREADY_CLAIMED,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::Unauthorized(_) => error_code::UNAUTHENTICATED,
            ServiceError::PermissionDenied(_) => error_code::PERMISSION_DENIED,
            ServiceError::Busy(_) => error_code::BUSY,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::WindowClosed(_) => StatusCode::FORBIDDEN,
            ServiceError::WindowNotOpen(_) => StatusCode::FORBIDDEN,
            ServiceError::OutOfStock(_) => StatusCode::CONFLICT,
            ServiceError::AlreadyClaimed(_) => StatusCode::CONFLICT,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ServiceError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a caller may safely retry the operation with backoff.
    ///
    /// True only for errors that imply no partial state change. Terminal
    /// outcomes (OutOfStock, AlreadyClaimed, WindowClosed, ...) are never
    /// retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Busy(_) | ServiceError::Storage(_))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "code": self.error_code(),
            "detail": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
