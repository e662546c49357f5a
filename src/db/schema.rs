use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- One license record per account.
        -- contact_email and credential_verifier carry the two uniqueness
        -- invariants; both are enforced here, not in application code.
        -- pending_plaintext_credential is only ever non-NULL while
        -- status = 'PENDING_PAYMENT'.
        CREATE TABLE IF NOT EXISTS licenses (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            contact_email TEXT NOT NULL UNIQUE,
            mobile_number TEXT NOT NULL,
            credential_verifier TEXT NOT NULL UNIQUE,
            pending_plaintext_credential TEXT,
            status TEXT NOT NULL CHECK (status IN ('PENDING_PAYMENT', 'ACTIVE')),
            plan_id INTEGER NOT NULL,
            plan_name TEXT NOT NULL,
            plan_amount_minor_units INTEGER NOT NULL,
            payment_order_ref TEXT,
            payment_confirmation_ref TEXT,
            issued_at INTEGER,
            expires_at INTEGER,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_email ON licenses(contact_email);
        CREATE INDEX IF NOT EXISTS idx_licenses_status ON licenses(status);
        "#,
    )
}
