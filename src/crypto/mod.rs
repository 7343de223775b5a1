// src/crypto/mod.rs
//! Cryptographic layer: key model, JWK interchange, provider plug-ins and
//! the policy-enforcing operation dispatcher.
//!
//! Layering (leaves first): providers own the primitive operations for one
//! algorithm family each; [`operations::CryptoOperations`] routes an
//! operation + algorithm name + scope to the registered provider after
//! validating algorithm and key-usage policy; the key model and JWK code
//! sit on top for interchange and thumbprinting.

use thiserror::Error;

use crate::storage::keystore::KeyStoreError;

pub mod jwk;
pub mod keys;
pub mod operations;
pub mod providers;

/// Errors raised by the cryptographic layer.
///
/// Policy and format errors are never retried; they indicate programmer or
/// input error and surface to the caller immediately.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Unsupported algorithm, mismatched algorithm name, or bad parameters
    #[error("algorithm error: {0}")]
    Algorithm(String),

    /// Malformed key material (e.g. an unsupported point encoding)
    #[error("key format error: {0}")]
    KeyFormat(String),

    /// Requested capability not permitted for the key
    #[error("key usage error: {0}")]
    KeyUsage(String),

    /// Key material failed validity checks (e.g. scalar out of range)
    #[error("invalid key: {0}")]
    KeyInvalid(String),

    /// Digest output did not have the size the signature scheme requires
    #[error("digest size mismatch: expected {expected} bytes, found {found}")]
    DigestSize { expected: usize, found: usize },

    /// Failure inside the underlying cryptographic primitive
    #[error("provider failure: {0}")]
    Provider(String),

    /// Key retrieval from the backing store failed
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
}
