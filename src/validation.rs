//! Explicit request validation.
//!
//! Every inbound DTO is checked by a function here before any domain request
//! is constructed; failures come back as a structured list of per-field
//! errors so the client sees everything wrong at once.

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{ConfirmRequest, PurchaseRequest, ValidateRequest};

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Normalize an email for storage and lookup: trimmed, lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email shape check.
///
/// Exactly one @, non-empty local part without spaces, non-empty domain with
/// an interior dot. Intentionally permissive - a sanity check, not RFC 5322.
fn email_shape_ok(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains(' ') || domain.contains('@') {
        return false;
    }
    !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn mobile_ok(mobile: &str) -> bool {
    let mobile = mobile.trim();
    mobile.len() == 10 && mobile.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_purchase_request(request: &PurchaseRequest) -> Result<()> {
    let mut errors = Vec::new();
    if request.full_name.trim().is_empty() {
        errors.push(FieldError {
            field: "full_name",
            message: "Full name is required",
        });
    }
    if !email_shape_ok(&request.email) {
        errors.push(FieldError {
            field: "email",
            message: "Invalid email format",
        });
    }
    if !mobile_ok(&request.mobile_number) {
        errors.push(FieldError {
            field: "mobile_number",
            message: "Mobile number must be 10 digits",
        });
    }
    if request.plan_id < 0 {
        errors.push(FieldError {
            field: "plan_id",
            message: "Invalid plan ID",
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// The signature is deliberately not checked here: an absent signature is an
/// authenticity failure (401 from the gateway check), not a malformed field.
pub fn validate_confirm_request(request: &ConfirmRequest) -> Result<()> {
    let mut errors = Vec::new();
    if request.account_id.trim().is_empty() {
        errors.push(FieldError {
            field: "account_id",
            message: "Account ID is required",
        });
    }
    if request.order_ref.trim().is_empty() {
        errors.push(FieldError {
            field: "order_ref",
            message: "Order reference is required",
        });
    }
    if request.payment_ref.trim().is_empty() {
        errors.push(FieldError {
            field: "payment_ref",
            message: "Payment reference is required",
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn validate_validate_request(request: &ValidateRequest) -> Result<()> {
    let mut errors = Vec::new();
    if !email_shape_ok(&request.email) {
        errors.push(FieldError {
            field: "email",
            message: "Invalid email format",
        });
    }
    if request.license_key.trim().is_empty() {
        errors.push(FieldError {
            field: "license_key",
            message: "License key is required",
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}
