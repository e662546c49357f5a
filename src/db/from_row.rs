//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

pub const LICENSE_COLS: &str = "id, full_name, contact_email, mobile_number, credential_verifier, \
     pending_plaintext_credential, status, plan_id, plan_name, plan_amount_minor_units, \
     payment_order_ref, payment_confirmation_ref, issued_at, expires_at, created_at";

impl FromRow for LicenseRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(LicenseRecord {
            id: row.get(0)?,
            full_name: row.get(1)?,
            contact_email: row.get(2)?,
            mobile_number: row.get(3)?,
            credential_verifier: row.get(4)?,
            pending_plaintext_credential: row.get(5)?,
            status: parse_enum(row, 6, "status")?,
            plan_id: row.get(7)?,
            plan_name: row.get(8)?,
            plan_amount_minor_units: row.get(9)?,
            payment_order_ref: row.get(10)?,
            payment_confirmation_ref: row.get(11)?,
            issued_at: row.get(12)?,
            expires_at: row.get(13)?,
            created_at: row.get(14)?,
        })
    }
}
