use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{ConfirmRequest, LicenseStatus};
use crate::validation;

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub status: LicenseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// POST /purchase/confirm - activate a reserved license once the gateway
/// confirms the payment callback is authentic.
///
/// Signature verification is a hard precondition: an absent or unverifiable
/// signature is rejected here and the lifecycle is never invoked.
pub async fn confirm_purchase(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>> {
    validation::validate_confirm_request(&request)?;

    if !state
        .gateway
        .verify_callback(&request.order_ref, &request.payment_ref, &request.signature)
    {
        tracing::warn!(
            account_id = %request.account_id,
            order_ref = %request.order_ref,
            "payment callback signature rejected"
        );
        return Err(AppError::InvalidSignature);
    }

    let (record, _delivery) = state
        .lifecycle
        .complete_purchase(&request.account_id, &request.payment_ref)
        .await?;

    Ok(Json(ConfirmResponse {
        status: record.status,
        expires_at: record.expires_at,
    }))
}
