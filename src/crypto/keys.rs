// src/crypto/keys.rs
//! Core key model for the cryptographic layer.
//!
//! Defines the [`CryptoKey`] / [`CryptoKeyPair`] representations shared by
//! every provider, together with the key-type, key-usage and algorithm
//! descriptors the dispatcher enforces policy over.
//!
//! # Security Notes
//! - Key handles are opaque byte payloads; only the provider that minted a
//!   key interprets its handle shape
//! - Non-extractable keys are refused export at the dispatch layer before
//!   any provider code runs

use serde::{Deserialize, Serialize};

use super::CryptoError;

/// The type of a cryptographic key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// Public half of an asymmetric pair; safe to share
    Public,
    /// Private half of an asymmetric pair; never leaves the agent
    Private,
    /// Symmetric secret key
    Secret,
}

/// A capability a key may be used for.
///
/// A key's usage set must be a subset of what its provider declares for the
/// key's type; the dispatcher rejects any operation outside the set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyUsage {
    Sign,
    Verify,
    Encrypt,
    Decrypt,
    DeriveBits,
    WrapKey,
    UnwrapKey,
}

impl KeyUsage {
    /// JWK `key_ops` member name for this usage.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyUsage::Sign => "sign",
            KeyUsage::Verify => "verify",
            KeyUsage::Encrypt => "encrypt",
            KeyUsage::Decrypt => "decrypt",
            KeyUsage::DeriveBits => "deriveBits",
            KeyUsage::WrapKey => "wrapKey",
            KeyUsage::UnwrapKey => "unwrapKey",
        }
    }
}

/// Algorithm descriptor bound to a key and supplied with every operation.
///
/// # Fields
/// - `name`: registry name, e.g. `"ES256K"` or `"SHA-256"`
/// - `named_curve`: curve identifier for elliptic-curve algorithms
/// - `hash`: digest algorithm applied before signing, when applicable
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_curve: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Algorithm {
    /// ECDSA over secp256k1 with SHA-256 prehashing (the agent default).
    pub fn es256k() -> Self {
        Algorithm {
            name: "ES256K".to_string(),
            named_curve: Some("secp256k1".to_string()),
            hash: Some("SHA-256".to_string()),
        }
    }

    /// Plain SHA-256 digest algorithm.
    pub fn sha256() -> Self {
        Algorithm {
            name: "SHA-256".to_string(),
            named_curve: None,
            hash: None,
        }
    }

    /// Case-insensitive name comparison, the registry's matching rule.
    pub fn matches_name(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

/// Opaque, provider-specific key material.
///
/// For the secp256k1 provider the payload is the raw 32-byte scalar for
/// private keys and the 64-byte `X || Y` point for public keys. No code
/// outside the owning provider interprets the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyHandle(pub(crate) Vec<u8>);

impl KeyHandle {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        KeyHandle(bytes)
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for KeyHandle {
    /// Never prints key material.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyHandle({} bytes)", self.0.len())
    }
}

/// One cryptographic key instance.
///
/// # Fields
/// - `key_type`: public, private or secret
/// - `extractable`: whether raw/JWK export is permitted
/// - `algorithm`: the algorithm descriptor the key was created under
/// - `usages`: capabilities the key may be used for
/// - `handle`: opaque provider-owned material
#[derive(Clone, Debug, PartialEq)]
pub struct CryptoKey {
    pub key_type: KeyType,
    pub extractable: bool,
    pub algorithm: Algorithm,
    pub usages: Vec<KeyUsage>,
    pub(crate) handle: KeyHandle,
}

impl CryptoKey {
    /// Creates a new key. Crate-internal: only providers mint keys.
    pub(crate) fn new(
        key_type: KeyType,
        extractable: bool,
        algorithm: Algorithm,
        usages: Vec<KeyUsage>,
        handle: KeyHandle,
    ) -> Self {
        CryptoKey {
            key_type,
            extractable,
            algorithm,
            usages,
            handle,
        }
    }

    /// Checks that this key permits `usage`.
    ///
    /// # Returns
    /// - `Ok(())` when the usage is present
    /// - `Err(CryptoError::KeyUsage)` otherwise
    pub fn ensure_usage(&self, usage: KeyUsage) -> Result<(), CryptoError> {
        if self.usages.contains(&usage) {
            Ok(())
        } else {
            Err(CryptoError::KeyUsage(format!(
                "key does not permit the '{}' operation",
                usage.as_str()
            )))
        }
    }

    /// Checks that this key is of the expected type.
    pub fn ensure_type(&self, expected: KeyType) -> Result<(), CryptoError> {
        if self.key_type == expected {
            Ok(())
        } else {
            Err(CryptoError::KeyUsage(format!(
                "operation requires a {:?} key, found {:?}",
                expected, self.key_type
            )))
        }
    }
}

/// A private/public key pair generated together.
///
/// The pair is the unit returned by key generation: the private half signs,
/// the public half verifies.
#[derive(Clone, Debug)]
pub struct CryptoKeyPair {
    pub public_key: CryptoKey,
    pub private_key: CryptoKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_usage_rejects_missing_capability() {
        let key = CryptoKey::new(
            KeyType::Private,
            false,
            Algorithm::es256k(),
            vec![KeyUsage::Sign],
            KeyHandle::new(vec![1u8; 32]),
        );
        assert!(key.ensure_usage(KeyUsage::Sign).is_ok());
        assert!(matches!(
            key.ensure_usage(KeyUsage::Verify),
            Err(CryptoError::KeyUsage(_))
        ));
    }

    #[test]
    fn test_handle_debug_hides_material() {
        let handle = KeyHandle::new(vec![0xAB; 32]);
        let rendered = format!("{:?}", handle);
        assert!(!rendered.contains("AB"));
        assert!(rendered.contains("32 bytes"));
    }

    #[test]
    fn test_algorithm_name_matching_is_case_insensitive() {
        assert!(Algorithm::es256k().matches_name("es256k"));
        assert!(!Algorithm::es256k().matches_name("ES256"));
    }
}
