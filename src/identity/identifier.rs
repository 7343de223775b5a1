// src/identity/identifier.rs
//! The agent's own decentralized identity.
//!
//! An [`Identifier`] pairs a decentralized-identifier string with the
//! key-store reference of its signing key. It owns exactly the key
//! references it was configured with; remote-resolved public keys are
//! fetched and looked up, never owned.

use crate::crypto::jwk::JsonWebKey;
use crate::crypto::keys::{Algorithm, KeyUsage};
use crate::crypto::operations::CryptoOperations;
use crate::crypto::CryptoError;
use crate::storage::keystore::{KeyScope, KeyStore};
use crate::token::jws::{JwsToken, TokenError};

/// A decentralized identity held by this agent.
#[derive(Clone, Debug)]
pub struct Identifier {
    /// The DID string, e.g. "did:agent:4fc1..."
    pub id: String,

    /// Key-store reference of the signing key pair
    pub signing_key_reference: String,
}

impl Identifier {
    /// Wraps an existing identity whose keys are already in the store.
    pub fn new(id: impl Into<String>, signing_key_reference: impl Into<String>) -> Self {
        Identifier {
            id: id.into(),
            signing_key_reference: signing_key_reference.into(),
        }
    }

    /// Creates a new identity, generating and storing a fresh ES256K
    /// signing key pair under `signing_key_reference`.
    pub fn create(
        id: impl Into<String>,
        signing_key_reference: impl Into<String>,
        crypto: &CryptoOperations,
    ) -> Result<Self, CryptoError> {
        let reference = signing_key_reference.into();
        crypto.generate_and_store_key_pair(
            &reference,
            &Algorithm::es256k(),
            &[KeyUsage::Sign, KeyUsage::Verify],
        )?;
        Ok(Identifier {
            id: id.into(),
            signing_key_reference: reference,
        })
    }

    /// The key id this identity places in token headers.
    pub fn key_id(&self) -> String {
        format!("{}#{}", self.id, self.signing_key_reference)
    }

    /// Signs a payload into a compact token under this identity's key.
    pub fn sign_payload(
        &self,
        payload: &[u8],
        crypto: &CryptoOperations,
    ) -> Result<JwsToken, TokenError> {
        JwsToken::sign(payload, &self.signing_key_reference, &self.key_id(), crypto)
    }

    /// Exports the public half of the signing key as a JWK (kid filled in).
    pub fn public_jwk(&self, crypto: &CryptoOperations) -> Result<JsonWebKey, CryptoError> {
        let public_key = crypto
            .key_store()
            .get(&self.signing_key_reference, KeyScope::PublicOnly)?;
        let mut jwk = crypto.export_key(&public_key)?;
        jwk.kid = Some(self.key_id());
        Ok(jwk)
    }

    /// Thumbprint of this identity's public key.
    pub fn thumbprint(&self, crypto: &CryptoOperations) -> Result<String, CryptoError> {
        let public_key = crypto
            .key_store()
            .get(&self.signing_key_reference, KeyScope::PublicOnly)?;
        crypto.thumbprint(&public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::storage::keystore::InMemoryKeyStore;

    #[test]
    fn test_create_sign_and_export() {
        let crypto = CryptoOperations::new(Arc::new(InMemoryKeyStore::new()));
        let identity = Identifier::create("did:agent:alice", "signing-1", &crypto).unwrap();
        assert_eq!(identity.key_id(), "did:agent:alice#signing-1");

        let token = identity.sign_payload(b"hello", &crypto).unwrap();
        assert_eq!(token.header().kid, "did:agent:alice#signing-1");

        let jwk = identity.public_jwk(&crypto).unwrap();
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.kid.as_deref(), Some("did:agent:alice#signing-1"));
        assert!(jwk.d.is_none());

        assert!(!identity.thumbprint(&crypto).unwrap().is_empty());
    }
}
