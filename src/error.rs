use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::validation::FieldError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("account already exists for this email")]
    DuplicateAccount,

    #[error("unknown plan: {0}")]
    UnknownPlan(i64),

    /// The generate-and-insert loop hit the store's verifier uniqueness
    /// constraint on every attempt.
    #[error("credential keyspace exhausted after {0} attempts")]
    KeyspaceExhausted(u32),

    /// Internal retry signal from the store: the generated verifier collided
    /// with an existing row. Consumed by the generation loop, never surfaced.
    #[error("credential verifier collision")]
    CredentialCollision,

    #[error("account not found")]
    AccountNotFound,

    /// The record is not in the lifecycle stage the operation requires.
    #[error("license is not awaiting payment")]
    InvalidState,

    #[error("invalid license key")]
    InvalidCredential,

    #[error("license is not active")]
    InactiveLicense,

    #[error("license has expired")]
    LicenseExpired,

    #[error("payment signature verification failed")]
    InvalidSignature,

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldError>>,
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details, fields) = match self {
            AppError::DuplicateAccount => (
                StatusCode::CONFLICT,
                "Conflict",
                Some("An account already exists for this email".to_string()),
                None,
            ),
            AppError::UnknownPlan(id) => (
                StatusCode::BAD_REQUEST,
                "Bad request",
                Some(format!("Unknown plan: {}", id)),
                None,
            ),
            AppError::InvalidState => (
                StatusCode::CONFLICT,
                "Conflict",
                Some("License is not awaiting payment".to_string()),
                None,
            ),
            AppError::AccountNotFound => (
                StatusCode::NOT_FOUND,
                "Not found",
                Some("Account not found".to_string()),
                None,
            ),
            // No distinction between these in the response body - telling a
            // caller WHY their credential was rejected is an oracle.
            AppError::InvalidCredential
            | AppError::InactiveLicense
            | AppError::LicenseExpired
            | AppError::InvalidSignature => (StatusCode::UNAUTHORIZED, "Unauthorized", None, None),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed",
                None,
                Some(errors),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg), None),
            AppError::KeyspaceExhausted(attempts) => {
                tracing::error!(attempts, "credential generation ran out of retries");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                    None,
                )
            }
            AppError::CredentialCollision => {
                tracing::error!("verifier collision escaped the generation retry loop");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                    None,
                )
            }
            AppError::Gateway(msg) => {
                tracing::error!("payment gateway error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Payment gateway error",
                    None,
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                    None,
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
