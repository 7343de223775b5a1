// src/crypto/providers/sha256.rs
//! SHA-256 digest provider.
//!
//! Serves the `Digest` operation only; registered in the public scope so
//! thumbprinting and prehashing never require private key access.

use ring::digest;

use super::CryptoProvider;
use crate::crypto::keys::Algorithm;
use crate::crypto::CryptoError;

/// Digest provider backed by `ring`'s SHA-256.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Provider;

impl Sha256Provider {
    pub fn new() -> Self {
        Sha256Provider
    }
}

impl CryptoProvider for Sha256Provider {
    fn name(&self) -> &'static str {
        "SHA-256"
    }

    fn digest(&self, algorithm: &Algorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.check_algorithm(algorithm)?;
        Ok(digest::digest(&digest::SHA256, data).as_ref().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_known_vector() {
        // SHA-256 of the empty string
        let out = Sha256Provider::new()
            .digest(&Algorithm::sha256(), b"")
            .unwrap();
        assert_eq!(
            out,
            vec![
                0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99,
                0x6f, 0xb9, 0x24, 0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95,
                0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
            ]
        );
    }

    #[test]
    fn test_mismatched_algorithm_name_is_rejected() {
        assert!(matches!(
            Sha256Provider::new().digest(&Algorithm::es256k(), b"data"),
            Err(CryptoError::Algorithm(_))
        ));
    }
}
