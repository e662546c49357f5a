use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{LicenseStatus, PurchaseRequest, RetryOrderRequest};
use crate::validation;

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub account_id: String,
    pub status: LicenseStatus,
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_minor_units: Option<i64>,
}

/// POST /purchase - free plans come back 200 ACTIVE, paid plans 201 with the
/// order the client must settle.
pub async fn initiate_purchase(
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> Result<impl IntoResponse> {
    validation::validate_purchase_request(&request)?;

    let (record, _delivery) = state.lifecycle.initiate_purchase(&request).await?;

    let status_code = match record.status {
        LicenseStatus::Active => StatusCode::OK,
        LicenseStatus::PendingPayment => StatusCode::CREATED,
    };
    let amount = (record.status == LicenseStatus::PendingPayment)
        .then_some(record.plan_amount_minor_units);

    Ok((
        status_code,
        Json(PurchaseResponse {
            account_id: record.id,
            status: record.status,
            plan: record.plan_name,
            order_ref: record.payment_order_ref,
            amount_minor_units: amount,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct RetryOrderResponse {
    pub account_id: String,
    pub order_ref: String,
    pub amount_minor_units: i64,
}

/// POST /purchase/retry-order - recover a reserved record whose order
/// creation failed at initiation.
pub async fn retry_order(
    State(state): State<AppState>,
    Json(request): Json<RetryOrderRequest>,
) -> Result<Json<RetryOrderResponse>> {
    let record = state
        .lifecycle
        .retry_order_creation(&request.account_id)
        .await?;

    // InvalidState above guarantees the ref is present here.
    let order_ref = record.payment_order_ref.unwrap_or_default();
    Ok(Json(RetryOrderResponse {
        account_id: record.id,
        order_ref,
        amount_minor_units: record.plan_amount_minor_units,
    }))
}
