use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::ValidateRequest;
use crate::validation;

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// POST /validate - check a presented license key.
///
/// Every verification failure collapses to 401 {valid: false} with no
/// reason, so the endpoint is neither an account-existence nor an expiry
/// oracle.
pub async fn validate_license(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<impl IntoResponse> {
    validation::validate_validate_request(&request)?;

    match state.lifecycle.validate(&request.email, &request.license_key) {
        Ok(record) => Ok((
            StatusCode::OK,
            Json(ValidateResponse {
                valid: true,
                plan: Some(record.plan_name),
                expires_at: record.expires_at,
            }),
        )),
        Err(
            AppError::AccountNotFound
            | AppError::InactiveLicense
            | AppError::InvalidCredential
            | AppError::LicenseExpired,
        ) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(ValidateResponse {
                valid: false,
                plan: None,
                expires_at: None,
            }),
        )),
        Err(e) => Err(e),
    }
}
