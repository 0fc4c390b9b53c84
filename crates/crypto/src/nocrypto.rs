//! Identity "hashing"
//!
//! Only useful for tests and development servers.

use arbor_core::{Error, Result, SecretHasher};
use subtle::ConstantTimeEq;

/// Registry name
pub const NAME: &str = "nocrypto";

/// Stores secrets unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCrypto;

impl SecretHasher for NoCrypto {
    fn name(&self) -> &str {
        NAME
    }

    fn secure_secret(&self, plain: &str) -> Result<String> {
        Ok(plain.to_string())
    }

    fn verify_secret(&self, plain: &str, secured: &str) -> Result<()> {
        if bool::from(plain.as_bytes().ct_eq(secured.as_bytes())) {
            Ok(())
        } else {
            Err(Error::AuthenticationFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_identity() {
        let secured = NoCrypto.secure_secret("hunter2").unwrap();
        assert_eq!(secured, "hunter2");
        NoCrypto.verify_secret("hunter2", &secured).unwrap();
    }

    #[test]
    fn test_mismatch() {
        assert!(matches!(
            NoCrypto.verify_secret("hunter3", "hunter2"),
            Err(Error::AuthenticationFailure)
        ));
        assert!(NoCrypto.verify_secret("hunter", "hunter2").is_err());
    }
}
