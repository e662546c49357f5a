use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stored lifecycle stage of a license.
///
/// Expiry is not a stored state: an ACTIVE record whose `expires_at` has
/// passed is treated as expired at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseStatus {
    #[serde(rename = "PENDING_PAYMENT")]
    PendingPayment,
    #[serde(rename = "ACTIVE")]
    Active,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::PendingPayment => "PENDING_PAYMENT",
            LicenseStatus::Active => "ACTIVE",
        }
    }
}

impl FromStr for LicenseStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(LicenseStatus::PendingPayment),
            "ACTIVE" => Ok(LicenseStatus::Active),
            _ => Err(()),
        }
    }
}

/// One license record per account.
#[derive(Debug, Clone)]
pub struct LicenseRecord {
    pub id: String,
    pub full_name: String,
    pub contact_email: String,
    pub mobile_number: String,
    /// Argon2id verifier for the license key. Unique across all records;
    /// never logged, never serialized out.
    pub credential_verifier: String,
    /// Plaintext key held only between paid-plan reservation and activation,
    /// so it can still be delivered after payment without regeneration.
    /// Must be None whenever status != PENDING_PAYMENT.
    pub pending_plaintext_credential: Option<String>,
    pub status: LicenseStatus,
    /// Plan snapshot taken at purchase time; the catalog may change later.
    pub plan_id: i64,
    pub plan_name: String,
    pub plan_amount_minor_units: i64,
    pub payment_order_ref: Option<String>,
    pub payment_confirmation_ref: Option<String>,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

/// Insert input for a new license record.
#[derive(Debug, Clone)]
pub struct CreateLicense {
    pub full_name: String,
    pub contact_email: String,
    pub mobile_number: String,
    pub credential_verifier: String,
    pub pending_plaintext_credential: Option<String>,
    pub status: LicenseStatus,
    pub plan_id: i64,
    pub plan_name: String,
    pub plan_amount_minor_units: i64,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub full_name: String,
    pub email: String,
    pub mobile_number: String,
    pub plan_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub account_id: String,
    pub order_ref: String,
    pub payment_ref: String,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct RetryOrderRequest {
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub email: String,
    pub license_key: String,
}
