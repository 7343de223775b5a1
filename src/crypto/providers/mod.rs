// src/crypto/providers/mod.rs
//! Pluggable cryptographic providers.
//!
//! One provider implements one algorithm family and interprets only its own
//! opaque key-handle shape. Providers declare disjoint usage sets for the
//! private, public and (optionally) symmetric keys they mint; the usage
//! policy checks here gate generation and import before any material is
//! touched.

use super::jwk::JsonWebKey;
use super::keys::{Algorithm, CryptoKey, CryptoKeyPair, KeyUsage};
use super::CryptoError;

pub mod secp256k1;
pub mod sha256;

pub use secp256k1::Secp256k1Provider;
pub use sha256::Sha256Provider;

/// Key material supplied to an import operation.
///
/// Import does not know the key type up front; raw material is classified
/// by inspecting its shape (see the secp256k1 provider's tag-byte rules).
#[derive(Clone, Copy, Debug)]
pub enum KeyMaterial<'a> {
    /// A parsed JSON Web Key
    Jwk(&'a JsonWebKey),
    /// Raw provider-specific bytes (e.g. a SEC1-encoded point)
    Raw(&'a [u8]),
}

fn unsupported(provider: &str, operation: &str) -> CryptoError {
    CryptoError::Algorithm(format!(
        "provider '{provider}' does not support the {operation} operation"
    ))
}

/// A pluggable implementation of one cryptographic algorithm family.
///
/// Every operation has a default "not supported" implementation so a
/// provider implements only the subset it serves (the digest provider
/// implements `digest` alone).
pub trait CryptoProvider: Send + Sync {
    /// Registry name of the algorithm this provider serves.
    fn name(&self) -> &'static str;

    /// Usages permitted on private keys minted by this provider.
    fn private_key_usages(&self) -> &[KeyUsage] {
        &[]
    }

    /// Usages permitted on public keys minted by this provider.
    fn public_key_usages(&self) -> &[KeyUsage] {
        &[]
    }

    /// Usages permitted on symmetric keys, for symmetric-only providers.
    fn symmetric_key_usages(&self) -> Option<&[KeyUsage]> {
        None
    }

    /// Validates algorithm parameters for this family (required curve,
    /// required hash). Called by the dispatcher before every delegation.
    fn check_algorithm(&self, algorithm: &Algorithm) -> Result<(), CryptoError> {
        if algorithm.matches_name(self.name()) {
            Ok(())
        } else {
            Err(CryptoError::Algorithm(format!(
                "algorithm '{}' does not match provider '{}'",
                algorithm.name,
                self.name()
            )))
        }
    }

    /// Usage policy for key generation: the requested set must be non-empty
    /// and lie inside the provider's declared allowed sets.
    fn check_generate_key(&self, usages: &[KeyUsage]) -> Result<(), CryptoError> {
        if usages.is_empty() {
            return Err(CryptoError::KeyUsage(
                "key generation requires at least one usage".to_string(),
            ));
        }
        let allowed: Vec<KeyUsage> = match self.symmetric_key_usages() {
            Some(symmetric) => symmetric.to_vec(),
            None => {
                let mut set = self.private_key_usages().to_vec();
                set.extend_from_slice(self.public_key_usages());
                set
            }
        };
        for usage in usages {
            if !allowed.contains(usage) {
                return Err(CryptoError::KeyUsage(format!(
                    "usage '{}' is not permitted by provider '{}'",
                    usage.as_str(),
                    self.name()
                )));
            }
        }
        Ok(())
    }

    /// Usage policy for key import: the private set is applied first, the
    /// public set only when that check fails, because the key type is not
    /// known until the material's shape has been inspected.
    fn check_import_key(&self, usages: &[KeyUsage]) -> Result<(), CryptoError> {
        if usages.is_empty() {
            return Err(CryptoError::KeyUsage(
                "key import requires at least one usage".to_string(),
            ));
        }
        let private = self.private_key_usages();
        if usages.iter().all(|u| private.contains(u)) {
            return Ok(());
        }
        let public = self.public_key_usages();
        if usages.iter().all(|u| public.contains(u)) {
            return Ok(());
        }
        Err(CryptoError::KeyUsage(format!(
            "requested usages are not permitted by provider '{}'",
            self.name()
        )))
    }

    /// Computes a digest of `data`.
    fn digest(&self, _algorithm: &Algorithm, _data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Err(unsupported(self.name(), "digest"))
    }

    /// Generates a fresh key pair.
    fn generate_key_pair(
        &self,
        _algorithm: &Algorithm,
        _extractable: bool,
        _usages: &[KeyUsage],
    ) -> Result<CryptoKeyPair, CryptoError> {
        Err(unsupported(self.name(), "generate-key-pair"))
    }

    /// Signs `data` with a private key.
    fn sign(
        &self,
        _algorithm: &Algorithm,
        _key: &CryptoKey,
        _data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Err(unsupported(self.name(), "sign"))
    }

    /// Verifies `signature` over `data` with a public key.
    ///
    /// Returns `Ok(false)` for a merely-invalid signature; errors are
    /// reserved for malformed inputs.
    fn verify(
        &self,
        _algorithm: &Algorithm,
        _key: &CryptoKey,
        _signature: &[u8],
        _data: &[u8],
    ) -> Result<bool, CryptoError> {
        Err(unsupported(self.name(), "verify"))
    }

    /// Imports key material into a [`CryptoKey`].
    fn import_key(
        &self,
        _material: KeyMaterial<'_>,
        _algorithm: &Algorithm,
        _extractable: bool,
        _usages: &[KeyUsage],
    ) -> Result<CryptoKey, CryptoError> {
        Err(unsupported(self.name(), "import-key"))
    }

    /// Exports a key in JWK form.
    fn export_key(&self, _key: &CryptoKey) -> Result<JsonWebKey, CryptoError> {
        Err(unsupported(self.name(), "export-key"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SignOnly;

    impl CryptoProvider for SignOnly {
        fn name(&self) -> &'static str {
            "TEST"
        }
        fn private_key_usages(&self) -> &[KeyUsage] {
            &[KeyUsage::Sign]
        }
        fn public_key_usages(&self) -> &[KeyUsage] {
            &[KeyUsage::Verify]
        }
    }

    #[test]
    fn test_generate_rejects_empty_usage_set() {
        assert!(matches!(
            SignOnly.check_generate_key(&[]),
            Err(CryptoError::KeyUsage(_))
        ));
    }

    #[test]
    fn test_generate_rejects_usage_outside_declared_sets() {
        assert!(SignOnly
            .check_generate_key(&[KeyUsage::Sign, KeyUsage::Verify])
            .is_ok());
        assert!(matches!(
            SignOnly.check_generate_key(&[KeyUsage::Sign, KeyUsage::Encrypt]),
            Err(CryptoError::KeyUsage(_))
        ));
    }

    #[test]
    fn test_import_falls_back_to_public_set() {
        // Sign lives in the private set, Verify only in the public set
        assert!(SignOnly.check_import_key(&[KeyUsage::Sign]).is_ok());
        assert!(SignOnly.check_import_key(&[KeyUsage::Verify]).is_ok());
        // Mixed sets satisfy neither and are refused
        assert!(matches!(
            SignOnly.check_import_key(&[KeyUsage::Sign, KeyUsage::Verify]),
            Err(CryptoError::KeyUsage(_))
        ));
    }

    #[test]
    fn test_unimplemented_operation_is_an_algorithm_error() {
        let alg = Algorithm::es256k();
        assert!(matches!(
            SignOnly.digest(&alg, b"data"),
            Err(CryptoError::Algorithm(_))
        ));
    }
}
