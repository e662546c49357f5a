//! The license lifecycle state machine.
//!
//! States: NEW -> PENDING_PAYMENT -> ACTIVE, or NEW -> ACTIVE directly for a
//! free plan. Expiry is a read-time projection, never a stored transition.
//!
//! Collaborators (store, payment gateway, notification channel) are injected
//! at construction; the lifecycle owns the ordering and atomicity rules
//! between them.

use std::sync::Arc;

use chrono::Utc;

use crate::db::{DbPool, queries};
use crate::email::{self, NotificationChannel};
use crate::error::{AppError, Result};
use crate::keygen::KeyGenerator;
use crate::models::{CreateLicense, LicenseRecord, LicenseStatus, PurchaseRequest};
use crate::payments::PaymentGateway;
use crate::plans::{Plan, PlanCatalog};
use crate::validation::normalize_email;

const SECONDS_PER_DAY: i64 = 86_400;

/// Attempts at generating a non-colliding credential before giving up.
/// Bounds the retry loop so a degenerate store state fails loudly instead of
/// spinning.
const MAX_KEY_ATTEMPTS: u32 = 10;

/// Outcome of the best-effort plaintext delivery accompanying a state change.
///
/// `MissingCredential` is the data-corruption case: activation found no
/// stored pending plaintext. It is reported separately from a transient
/// `Failed` so the two are never conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialDelivery {
    Delivered,
    Failed,
    MissingCredential,
    /// Paid-plan initiation: delivery happens at activation, not now.
    Deferred,
}

pub struct LicenseLifecycle {
    db: DbPool,
    keygen: KeyGenerator,
    catalog: PlanCatalog,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationChannel>,
}

impl LicenseLifecycle {
    pub fn new(
        db: DbPool,
        keygen: KeyGenerator,
        catalog: PlanCatalog,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            db,
            keygen,
            catalog,
            gateway,
            notifier,
        }
    }

    /// Start a purchase: reserve (paid) or immediately activate (free) a
    /// license for a new account.
    ///
    /// Free plans are persisted ACTIVE and the key is delivered best-effort.
    /// Paid plans are persisted PENDING_PAYMENT with the plaintext held on
    /// the record, then an order is requested from the gateway. If order
    /// creation fails the reserved record stays put - recoverable via
    /// [`retry_order_creation`](Self::retry_order_creation) - and the error
    /// surfaces to the caller.
    pub async fn initiate_purchase(
        &self,
        request: &PurchaseRequest,
    ) -> Result<(LicenseRecord, CredentialDelivery)> {
        let email = normalize_email(&request.email);
        let conn = self.db.get()?;

        if queries::get_license_by_email(&conn, &email)?.is_some() {
            return Err(AppError::DuplicateAccount);
        }

        let plan = self.catalog.lookup(request.plan_id)?;
        let free = plan.amount_minor_units == 0;
        let now = Utc::now().timestamp();

        let (record, plaintext) =
            self.insert_with_fresh_credential(&conn, request, &email, plan, free, now)?;

        if free {
            tracing::info!(account_id = %record.id, plan = %plan.display_name, "free plan activated");
            let delivery = self.deliver_credential(&record, &plaintext).await;
            return Ok((record, delivery));
        }

        let order_ref = self
            .gateway
            .create_order(plan.amount_minor_units, &record.id)
            .await?;
        queries::set_payment_order_ref(&conn, &record.id, &order_ref)?;
        tracing::info!(account_id = %record.id, order_ref = %order_ref, "license reserved pending payment");

        let mut record = record;
        record.payment_order_ref = Some(order_ref);
        Ok((record, CredentialDelivery::Deferred))
    }

    /// Generate a credential and insert the record, retrying on verifier
    /// collision. The store's UNIQUE constraints validate each attempt; a
    /// racing duplicate email surfaces here as `DuplicateAccount`.
    fn insert_with_fresh_credential(
        &self,
        conn: &rusqlite::Connection,
        request: &PurchaseRequest,
        email: &str,
        plan: &Plan,
        free: bool,
        now: i64,
    ) -> Result<(LicenseRecord, String)> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let key = self.keygen.generate()?;
            let input = CreateLicense {
                full_name: request.full_name.trim().to_string(),
                contact_email: email.to_string(),
                mobile_number: request.mobile_number.trim().to_string(),
                credential_verifier: key.verifier,
                pending_plaintext_credential: (!free).then(|| key.plaintext.clone()),
                status: if free {
                    LicenseStatus::Active
                } else {
                    LicenseStatus::PendingPayment
                },
                plan_id: plan.id,
                plan_name: plan.display_name.to_string(),
                plan_amount_minor_units: plan.amount_minor_units,
                issued_at: free.then_some(now),
                expires_at: free.then_some(now + plan.validity_days * SECONDS_PER_DAY),
            };
            match queries::insert_license(conn, &input) {
                Ok(record) => return Ok((record, key.plaintext)),
                Err(AppError::CredentialCollision) => {
                    tracing::warn!(attempt, "credential verifier collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::KeyspaceExhausted(MAX_KEY_ATTEMPTS))
    }

    /// Activate a reserved license after the payment callback has been
    /// verified by the caller.
    ///
    /// Strictly non-idempotent: only a PENDING_PAYMENT record activates, and
    /// the transition itself is a conditional update so concurrent attempts
    /// produce exactly one activation. Validity is recomputed from the plan
    /// snapshot at confirmation time - a slow payment does not shorten the
    /// effective window.
    pub async fn complete_purchase(
        &self,
        account_id: &str,
        payment_ref: &str,
    ) -> Result<(LicenseRecord, CredentialDelivery)> {
        let conn = self.db.get()?;
        let record =
            queries::get_license_by_id(&conn, account_id)?.ok_or(AppError::AccountNotFound)?;

        if record.status != LicenseStatus::PendingPayment {
            return Err(AppError::InvalidState);
        }

        let plan = self.catalog.lookup(record.plan_id)?;
        let now = Utc::now().timestamp();
        let expires_at = now + plan.validity_days * SECONDS_PER_DAY;

        // Taken before the update clears it on the stored row.
        let plaintext = record.pending_plaintext_credential.clone();

        if !queries::activate_license(&conn, &record.id, now, expires_at, payment_ref)? {
            // Lost the race to a concurrent completion.
            return Err(AppError::InvalidState);
        }
        drop(conn);

        let mut record = record;
        record.status = LicenseStatus::Active;
        record.issued_at = Some(now);
        record.expires_at = Some(expires_at);
        record.payment_confirmation_ref = Some(payment_ref.to_string());
        record.pending_plaintext_credential = None;

        tracing::info!(account_id = %record.id, payment_ref, "license activated");

        let delivery = match plaintext {
            Some(key) => self.deliver_credential(&record, &key).await,
            None => {
                // Activation stands; the key is unrecoverable and an operator
                // has to reconcile. Not a transient delivery failure.
                tracing::error!(
                    account_id = %record.id,
                    "no pending plaintext credential at activation, key cannot be delivered"
                );
                CredentialDelivery::MissingCredential
            }
        };

        Ok((record, delivery))
    }

    /// Recovery path for a reserved record whose order creation failed:
    /// request a fresh order from the gateway and attach it.
    pub async fn retry_order_creation(&self, account_id: &str) -> Result<LicenseRecord> {
        let conn = self.db.get()?;
        let record =
            queries::get_license_by_id(&conn, account_id)?.ok_or(AppError::AccountNotFound)?;

        if record.status != LicenseStatus::PendingPayment || record.payment_order_ref.is_some() {
            return Err(AppError::InvalidState);
        }

        let order_ref = self
            .gateway
            .create_order(record.plan_amount_minor_units, &record.id)
            .await?;
        queries::set_payment_order_ref(&conn, &record.id, &order_ref)?;
        tracing::info!(account_id = %record.id, order_ref = %order_ref, "payment order re-created");

        let mut record = record;
        record.payment_order_ref = Some(order_ref);
        Ok(record)
    }

    /// Validate a presented license key against stored state.
    ///
    /// Read-only: expiry is observed, not written back.
    pub fn validate(&self, email: &str, plaintext: &str) -> Result<LicenseRecord> {
        let conn = self.db.get()?;
        let record = queries::get_license_by_email(&conn, &normalize_email(email))?
            .ok_or(AppError::AccountNotFound)?;

        if record.status != LicenseStatus::Active {
            return Err(AppError::InactiveLicense);
        }

        if !self.keygen.verify(plaintext, &record.credential_verifier) {
            return Err(AppError::InvalidCredential);
        }

        if let Some(expires_at) = record.expires_at
            && Utc::now().timestamp() > expires_at
        {
            return Err(AppError::LicenseExpired);
        }

        Ok(record)
    }

    /// Best-effort key delivery. Persistence already happened; a failed send
    /// is logged and reported, never propagated.
    async fn deliver_credential(
        &self,
        record: &LicenseRecord,
        plaintext: &str,
    ) -> CredentialDelivery {
        let (subject, body) = email::license_key_message(
            &record.full_name,
            &record.plan_name,
            plaintext,
            record.expires_at,
        );
        match self
            .notifier
            .deliver(&record.contact_email, &subject, &body)
            .await
        {
            Ok(()) => CredentialDelivery::Delivered,
            Err(e) => {
                tracing::warn!(account_id = %record.id, error = %e, "license key delivery failed");
                CredentialDelivery::Failed
            }
        }
    }
}
