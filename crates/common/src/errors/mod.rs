//! Error types for the SIGET service
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling
//!
//! Ownership failures are deliberately reported to clients as "not found
//! or not authorized" with a 404 status, indistinguishable from a plain
//! missing row. The internal variant stays distinct for logging.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,

    // Resource errors (4xxx)
    NotFound,

    // Conflict errors (5xxx)
    Conflict,
    DuplicateRut,
    DuplicateEmail,
    DuplicateRecordYear,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,
    TransactionError,

    // External service errors (8xxx)
    PdfRenderError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidCredentials => 2002,
            ErrorCode::InvalidToken => 2003,
            ErrorCode::ExpiredToken => 2004,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::DuplicateRut => 5002,
            ErrorCode::DuplicateEmail => 5003,
            ErrorCode::DuplicateRecordYear => 5004,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,
            ErrorCode::TransactionError => 7003,

            // External (8xxx)
            ErrorCode::PdfRenderError => 8001,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors (rejected before any transaction opens)
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// Ownership chain failure. Surfaced to clients exactly like NotFound.
    #[error("{resource_type} not found or not authorized")]
    Ownership { resource_type: String, id: String },

    // Conflict errors
    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("RUT already in use by another patient")]
    DuplicateRut,

    #[error("Email already in use")]
    DuplicateEmail,

    #[error("A record already exists for this patient in year {year}")]
    DuplicateRecordYear { year: i32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    /// Failure mid-composite-operation. Always rolled back before this is
    /// returned; clients only ever see an opaque internal failure.
    #[error("Transaction failed: {message}")]
    Transaction { message: String },

    // External service errors
    #[error("PDF rendering failed: {message}")]
    PdfRender { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            // Conflated on purpose: clients cannot tell absent from not-owned
            AppError::NotFound { .. } | AppError::Ownership { .. } => ErrorCode::NotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::DuplicateRut => ErrorCode::DuplicateRut,
            AppError::DuplicateEmail => ErrorCode::DuplicateEmail,
            AppError::DuplicateRecordYear { .. } => ErrorCode::DuplicateRecordYear,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Transaction { .. } => ErrorCode::TransactionError,
            AppError::PdfRender { .. } | AppError::HttpClient(_) => ErrorCode::PdfRenderError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::MissingField { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. }
            | AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 404 Not Found (ownership failures included, by design)
            AppError::NotFound { .. } | AppError::Ownership { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Duplicate { .. }
            | AppError::DuplicateRut
            | AppError::DuplicateEmail
            | AppError::DuplicateRecordYear { .. } => StatusCode::CONFLICT,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Transaction { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::PdfRender { .. } | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to put in a response body.
    ///
    /// Server-side failures are reported opaquely; everything that happened
    /// inside a rolled-back transaction stays in the logs.
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }

    /// Translate a SeaORM error, mapping unique-constraint violations to the
    /// provided conflict error.
    pub fn from_db_err(err: sea_orm::DbErr, on_unique: AppError) -> AppError {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => on_unique,
            _ => AppError::Database(err),
        }
    }
}

/// Structured error response for the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log based on severity; ownership failures are logged as
        // authorization denials even though the response says 404.
        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if let AppError::Ownership { resource_type, id } = &self {
            tracing::warn!(
                resource = %resource_type,
                id = %id,
                status = status.as_u16(),
                "Ownership check failed"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::NotFound {
            resource_type: "patient".into(),
            id: "abc".into(),
        };
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::MissingField {
            field: "rut".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_ownership_conflated_with_not_found() {
        let owned = AppError::Ownership {
            resource_type: "academic record".into(),
            id: "abc".into(),
        };
        let missing = AppError::NotFound {
            resource_type: "academic record".into(),
            id: "abc".into(),
        };
        // Same status and code; a caller cannot tell them apart
        assert_eq!(owned.status_code(), missing.status_code());
        assert_eq!(owned.code(), missing.code());
        assert_eq!(owned.status_code(), StatusCode::NOT_FOUND);
        assert!(owned.to_string().contains("not found or not authorized"));
    }

    #[test]
    fn test_conflict_errors() {
        assert_eq!(
            AppError::DuplicateRecordYear { year: 2024 }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::DuplicateRut.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_transaction_error_is_opaque() {
        let err = AppError::Transaction {
            message: "activities insert failed: rating out of range".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        // The triggering detail must never reach the caller
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_client_errors_keep_specific_messages() {
        let err = AppError::DuplicateRecordYear { year: 2025 };
        assert!(err.public_message().contains("2025"));
    }
}
