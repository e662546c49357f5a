use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{LICENSE_COLS, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Map a UNIQUE-constraint failure on the licenses table to the error the
/// lifecycle needs: a duplicate email is a caller mistake, a duplicate
/// verifier tells the generation loop to try again.
fn map_license_conflict(err: rusqlite::Error) -> AppError {
    if let rusqlite::Error::SqliteFailure(e, Some(msg)) = &err
        && e.code == rusqlite::ErrorCode::ConstraintViolation
    {
        if msg.contains("licenses.contact_email") {
            return AppError::DuplicateAccount;
        }
        if msg.contains("licenses.credential_verifier") {
            return AppError::CredentialCollision;
        }
    }
    err.into()
}

/// Insert a new license record.
///
/// The table's UNIQUE constraints are the concurrency guard here: of two
/// racing inserts for one email, exactly one succeeds and the other gets
/// `DuplicateAccount`.
pub fn insert_license(conn: &Connection, input: &CreateLicense) -> Result<LicenseRecord> {
    let id = gen_id();
    let created_at = now();

    conn.execute(
        "INSERT INTO licenses (id, full_name, contact_email, mobile_number, credential_verifier, \
         pending_plaintext_credential, status, plan_id, plan_name, plan_amount_minor_units, \
         issued_at, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            &id,
            &input.full_name,
            &input.contact_email,
            &input.mobile_number,
            &input.credential_verifier,
            &input.pending_plaintext_credential,
            input.status.as_str(),
            input.plan_id,
            &input.plan_name,
            input.plan_amount_minor_units,
            input.issued_at,
            input.expires_at,
            created_at,
        ],
    )
    .map_err(map_license_conflict)?;

    Ok(LicenseRecord {
        id,
        full_name: input.full_name.clone(),
        contact_email: input.contact_email.clone(),
        mobile_number: input.mobile_number.clone(),
        credential_verifier: input.credential_verifier.clone(),
        pending_plaintext_credential: input.pending_plaintext_credential.clone(),
        status: input.status,
        plan_id: input.plan_id,
        plan_name: input.plan_name.clone(),
        plan_amount_minor_units: input.plan_amount_minor_units,
        payment_order_ref: None,
        payment_confirmation_ref: None,
        issued_at: input.issued_at,
        expires_at: input.expires_at,
        created_at,
    })
}

pub fn get_license_by_id(conn: &Connection, id: &str) -> Result<Option<LicenseRecord>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        &[&id],
    )
}

pub fn get_license_by_email(conn: &Connection, email: &str) -> Result<Option<LicenseRecord>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE contact_email = ?1",
            LICENSE_COLS
        ),
        &[&email],
    )
}

pub fn get_license_by_verifier(conn: &Connection, verifier: &str) -> Result<Option<LicenseRecord>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE credential_verifier = ?1",
            LICENSE_COLS
        ),
        &[&verifier],
    )
}

/// Attach the gateway's order reference to a reserved record.
pub fn set_payment_order_ref(conn: &Connection, id: &str, order_ref: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET payment_order_ref = ?2 WHERE id = ?1",
        params![id, order_ref],
    )?;
    Ok(affected > 0)
}

/// The PENDING_PAYMENT -> ACTIVE transition, as one conditional update.
///
/// The status guard in the WHERE clause makes this a compare-and-swap: of two
/// racing completion attempts, exactly one updates a row and the loser sees
/// zero rows affected. The pending plaintext is cleared in the same statement
/// so it cannot survive activation.
pub fn activate_license(
    conn: &Connection,
    id: &str,
    issued_at: i64,
    expires_at: i64,
    payment_ref: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET status = 'ACTIVE', issued_at = ?2, expires_at = ?3, \
         payment_confirmation_ref = ?4, pending_plaintext_credential = NULL \
         WHERE id = ?1 AND status = 'PENDING_PAYMENT'",
        params![id, issued_at, expires_at, payment_ref],
    )?;
    Ok(affected > 0)
}

pub fn count_licenses_by_email(conn: &Connection, email: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM licenses WHERE contact_email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count)
}
