//! License key generation and verification.
//!
//! A license key is 12 uniformly random decimal digits. What gets stored is
//! never the key itself but an Argon2id verifier (salted, slow), so even a
//! leaked database does not make the 12-digit space brute-forceable.
//!
//! Uniqueness is not this module's concern: the store's UNIQUE constraint on
//! the verifier column is authoritative, and the lifecycle retries generation
//! against it.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng as SaltRng},
};
use rand::{Rng, rngs::OsRng};

use crate::error::{AppError, Result};

/// Number of decimal digits in a license key.
pub const CREDENTIAL_DIGITS: usize = 12;

/// A freshly generated license key pair.
pub struct GeneratedKey {
    /// The plaintext key handed to the account holder. Never persisted
    /// outside the transient pending-payment window.
    pub plaintext: String,
    /// Argon2id PHC string stored for later verification.
    pub verifier: String,
}

#[derive(Clone, Copy, Default)]
pub struct KeyGenerator;

impl KeyGenerator {
    /// Generate a random 12-digit key and its verifier.
    pub fn generate(&self) -> Result<GeneratedKey> {
        let mut rng = OsRng;
        let plaintext: String = (0..CREDENTIAL_DIGITS)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();

        let salt = SaltString::generate(&mut SaltRng);
        let verifier = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("credential hashing failed: {}", e)))?
            .to_string();

        Ok(GeneratedKey {
            plaintext,
            verifier,
        })
    }

    /// Check a presented key against a stored verifier.
    ///
    /// Comparison happens inside the hash scheme (constant-time); a malformed
    /// verifier simply fails verification rather than erroring, since the
    /// caller treats both the same way.
    pub fn verify(&self, plaintext: &str, verifier: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(verifier) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
