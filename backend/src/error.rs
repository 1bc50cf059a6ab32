//! Error handling for the Inventory Management API
//!
//! Every handler returns `AppResult<T>`; `AppError` is the single place where
//! failures are turned into HTTP status codes and a JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::StockError;
use thiserror::Error;
use utoipa::ToSchema;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient { .. } => AppError::InsufficientStock(err.to_string()),
            StockError::NonPositiveQuantity(_)
            | StockError::NegativeQuantity(_)
            | StockError::Overflow => AppError::validation("quantity", err.to_string()),
            StockError::OverRelease { .. } => AppError::conflict("stock", err.to_string()),
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl AppError {
    /// Status code and body for this error
    pub fn to_parts(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid email or password"),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                ),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field.clone()),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::InvalidInput(errors) => {
                let (field, message) = first_validation_error(errors);
                let detail = ErrorDetail::new("VALIDATION_ERROR", message);
                let detail = match field {
                    Some(field) => detail.with_field(field),
                    None => detail,
                };
                (StatusCode::BAD_REQUEST, detail)
            }
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                )
                .with_field(field.clone()),
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", message.clone()).with_field(resource.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone()),
            ),
            AppError::InsufficientStock(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_STOCK", msg.clone()),
            ),
            AppError::DatabaseError(err) => database_error_parts(err),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

/// Map database errors without leaking SQL details to clients
fn database_error_parts(err: &sqlx::Error) -> (StatusCode, ErrorDetail) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            ErrorDetail::new("NOT_FOUND", "Record not found"),
        ),
        sqlx::Error::Database(db) if db.is_unique_violation() => (
            StatusCode::CONFLICT,
            ErrorDetail::new("DUPLICATE_ENTRY", "A record with these values already exists"),
        ),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_check_violation() => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new(
                "CONSTRAINT_VIOLATION",
                "The request violates a data integrity constraint",
            ),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
        ),
    }
}

fn first_validation_error(errors: &validator::ValidationErrors) -> (Option<String>, String) {
    errors
        .field_errors()
        .into_iter()
        .min_by(|a, b| a.0.cmp(b.0))
        .and_then(|(field, errs)| {
            errs.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (Some(field.to_string()), message)
            })
        })
        .unwrap_or_else(|| (None, "Invalid request".to_string()))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.to_parts();

        if status.is_server_error() {
            tracing::error!(code = %error_detail.code, "Error: {:?}", self);
        } else {
            tracing::debug!(code = %error_detail.code, "Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_auth_errors_map_to_401_and_403() {
        assert_eq!(AppError::InvalidCredentials.to_parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.to_parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::InsufficientPermissions.to_parts().0,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_duplicate_entry_is_conflict() {
        let (status, detail) = AppError::DuplicateEntry("sku".to_string()).to_parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(detail.code, "DUPLICATE_ENTRY");
        assert_eq!(detail.field.as_deref(), Some("sku"));
    }

    #[test]
    fn test_stock_errors_convert() {
        let err: AppError = StockError::Insufficient {
            requested: 5,
            available: 2,
        }
        .into();
        let (status, detail) = err.to_parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail.code, "INSUFFICIENT_STOCK");

        let err: AppError = StockError::NonPositiveQuantity(0).into();
        assert_eq!(err.to_parts().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_errors_hide_details() {
        let (status, detail) = AppError::DatabaseError(sqlx::Error::PoolTimedOut).to_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail.message, "A database error occurred");

        let (status, _) = AppError::DatabaseError(sqlx::Error::RowNotFound).to_parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let (status, detail) = AppError::Internal("secret stack".to_string()).to_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!detail.message.contains("secret"));
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[test]
    fn test_validator_errors_report_field() {
        let errors = Sample {
            name: String::new(),
        }
        .validate()
        .unwrap_err();
        let (status, detail) = AppError::from(errors).to_parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("name"));
        assert_eq!(detail.message, "name is required");
    }
}
