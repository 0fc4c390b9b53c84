//! Argon2 secret hashing
//!
//! Secured secrets are PHC strings, so the parameters and salt travel with
//! the hash and verification needs no extra state.

use arbor_core::{Error, Result, SecretHasher};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Registry name
pub const NAME: &str = "argon2";

const SALT_LEN: usize = 16;

/// Argon2id with default parameters
#[derive(Default)]
pub struct Argon2Crypto {
    argon2: Argon2<'static>,
}

impl Argon2Crypto {
    /// Create a hasher with default parameters
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretHasher for Argon2Crypto {
    fn name(&self) -> &str {
        NAME
    }

    fn secure_secret(&self, plain: &str) -> Result<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|e| Error::Storage(format!("Failed to generate salt: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Storage(format!("Failed to encode salt: {e}")))?;

        self.argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| Error::Storage(format!("Failed to hash secret: {e}")))
    }

    fn verify_secret(&self, plain: &str, secured: &str) -> Result<()> {
        let parsed = PasswordHash::new(secured).map_err(|e| {
            tracing::warn!(error = %e, "Stored secret is not a valid PHC string");
            Error::AuthenticationFailure
        })?;

        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .map_err(|_| Error::AuthenticationFailure)
    }
}
