// src/storage/keystore.rs
//! Scoped key storage for the credential agent.
//!
//! A [`KeyStore`] maps a key reference string to one or more key versions.
//! Reads are scoped: a caller holding only a [`KeyScope::PublicOnly`]
//! reference can never obtain private key material, and a policy-denied
//! read is reported distinctly from an absent key.
//!
//! # Note
//! The bundled [`InMemoryKeyStore`] is suitable for tests and in-process
//! agents. Production deployments back this trait with platform key storage.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::crypto::keys::{CryptoKey, KeyType};

/// Visibility scope of a key-store read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyScope {
    /// Only public keys are visible
    PublicOnly,
    /// Only private or secret keys are visible
    PrivateOnly,
    /// Unrestricted
    Both,
}

impl KeyScope {
    /// Whether a key of `key_type` is visible under this scope.
    fn admits(&self, key_type: KeyType) -> bool {
        match self {
            KeyScope::PublicOnly => key_type == KeyType::Public,
            KeyScope::PrivateOnly => {
                key_type == KeyType::Private || key_type == KeyType::Secret
            }
            KeyScope::Both => true,
        }
    }
}

/// Errors raised by key-store access.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// No key exists under the reference
    #[error("no key stored under reference '{0}'")]
    NotFound(String),

    /// A key exists but the read scope does not admit it
    #[error("access to reference '{reference}' denied under {scope:?} scope")]
    AccessDenied { reference: String, scope: KeyScope },
}

/// Opaque, scoped storage of key material by reference string.
///
/// Implementations must be safe for concurrent reads of stored (immutable)
/// keys; writes to the same reference must be serialized so two writers
/// never race to populate one alias.
pub trait KeyStore: Send + Sync {
    /// Retrieves the latest key version stored under `reference` that the
    /// given scope admits.
    ///
    /// # Errors
    /// - [`KeyStoreError::NotFound`] when nothing is stored under the reference
    /// - [`KeyStoreError::AccessDenied`] when versions exist but none is
    ///   visible under `scope`
    fn get(&self, reference: &str, scope: KeyScope) -> Result<CryptoKey, KeyStoreError>;

    /// Appends a new key version under `reference`.
    fn store(&self, reference: &str, key: CryptoKey) -> Result<(), KeyStoreError>;

    /// Number of versions stored under `reference` (0 when absent).
    fn version_count(&self, reference: &str) -> usize;
}

/// In-memory key store backed by a mutex-guarded hashmap.
///
/// The single lock serializes writers per the [`KeyStore`] contract; reads
/// clone the stored key so no lock is held across cryptographic operations.
#[derive(Default)]
pub struct InMemoryKeyStore {
    /// Key versions by reference, newest last
    keys: Mutex<HashMap<String, Vec<CryptoKey>>>,
}

impl InMemoryKeyStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        InMemoryKeyStore {
            keys: Mutex::new(HashMap::new()),
        }
    }
}

impl KeyStore for InMemoryKeyStore {
    fn get(&self, reference: &str, scope: KeyScope) -> Result<CryptoKey, KeyStoreError> {
        let keys = self.keys.lock().unwrap();
        let versions = keys
            .get(reference)
            .ok_or_else(|| KeyStoreError::NotFound(reference.to_string()))?;

        versions
            .iter()
            .rev()
            .find(|key| scope.admits(key.key_type))
            .cloned()
            .ok_or_else(|| KeyStoreError::AccessDenied {
                reference: reference.to_string(),
                scope,
            })
    }

    fn store(&self, reference: &str, key: CryptoKey) -> Result<(), KeyStoreError> {
        let mut keys = self.keys.lock().unwrap();
        keys.entry(reference.to_string()).or_default().push(key);
        Ok(())
    }

    fn version_count(&self, reference: &str) -> usize {
        let keys = self.keys.lock().unwrap();
        keys.get(reference).map_or(0, Vec::len)
    }
}
