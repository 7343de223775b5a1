// src/identity/resolver.rs
//! Identifier resolution: decentralized identifier → public key set.
//!
//! Resolution is a black-box lookup consumed by token verification and
//! request validation. A failed lookup is a distinct not-found condition,
//! never a default key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::jwk::JsonWebKey;

/// Errors raised during identifier resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The identifier does not resolve to any document
    #[error("identifier '{0}' could not be resolved")]
    NotFound(String),

    /// The resolver endpoint could not be reached
    #[error("resolution transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with something that is not a key set
    #[error("malformed resolution response: {0}")]
    Malformed(String),
}

/// One public key published by a resolved identifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedKey {
    /// Key id, either a fragment ("#signing-1") or a full DID URL
    pub id: String,

    /// The public key material
    #[serde(rename = "publicKeyJwk")]
    pub public_key_jwk: JsonWebKey,

    /// Intended use, e.g. "sig"
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub intended_use: Option<String>,
}

/// The resolved form of a decentralized identifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DidDocument {
    pub id: String,

    #[serde(rename = "publicKey", default)]
    pub keys: Vec<ResolvedKey>,
}

impl DidDocument {
    /// Finds the published key matching a token header's `kid`.
    ///
    /// Key ids may be published as bare fragments; matching compares the
    /// full id first and falls back to the fragment after the last `#`.
    pub fn find_key(&self, kid: &str) -> Option<&ResolvedKey> {
        if let Some(key) = self.keys.iter().find(|key| key.id == kid) {
            return Some(key);
        }
        let fragment = kid.rsplit('#').next()?;
        self.keys
            .iter()
            .find(|key| key.id.rsplit('#').next() == Some(fragment))
    }
}

/// Maps a decentralized identifier to its published public key set.
pub trait IdentifierResolver: Send + Sync {
    /// Resolves `id` to its document.
    ///
    /// # Errors
    /// [`ResolveError::NotFound`] when the identifier is unknown, never a
    /// default key.
    fn resolve(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<DidDocument, ResolveError>> + Send;
}

/// Resolver backed by a remote HTTP endpoint.
///
/// Issues `GET {endpoint}/{id}` and expects a [`DidDocument`] JSON body.
#[derive(Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResolver {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpResolver {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl IdentifierResolver for HttpResolver {
    async fn resolve(&self, id: &str) -> Result<DidDocument, ResolveError> {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), id);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound(id.to_string()));
        }
        if !response.status().is_success() {
            return Err(ResolveError::Malformed(format!(
                "resolver returned status {}",
                response.status()
            )));
        }
        response
            .json::<DidDocument>()
            .await
            .map_err(|e| ResolveError::Malformed(e.to_string()))
    }
}

/// In-memory resolver for tests and fixed deployments.
#[derive(Clone, Default)]
pub struct StaticResolver {
    documents: HashMap<String, DidDocument>,
}

impl StaticResolver {
    pub fn new() -> Self {
        StaticResolver {
            documents: HashMap::new(),
        }
    }

    /// Registers a document under its own id.
    pub fn insert(&mut self, document: DidDocument) {
        self.documents.insert(document.id.clone(), document);
    }
}

impl IdentifierResolver for StaticResolver {
    async fn resolve(&self, id: &str) -> Result<DidDocument, ResolveError> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> DidDocument {
        DidDocument {
            id: "did:agent:bob".to_string(),
            keys: vec![ResolvedKey {
                id: "#signing-1".to_string(),
                public_key_jwk: JsonWebKey {
                    kty: "EC".to_string(),
                    ..Default::default()
                },
                intended_use: Some("sig".to_string()),
            }],
        }
    }

    #[test]
    fn test_find_key_matches_fragment() {
        let doc = document();
        assert!(doc.find_key("did:agent:bob#signing-1").is_some());
        assert!(doc.find_key("#signing-1").is_some());
        assert!(doc.find_key("#other").is_none());
    }

    #[tokio::test]
    async fn test_static_resolver_not_found_is_distinct() {
        let mut resolver = StaticResolver::new();
        resolver.insert(document());

        assert!(resolver.resolve("did:agent:bob").await.is_ok());
        assert!(matches!(
            resolver.resolve("did:agent:mallory").await,
            Err(ResolveError::NotFound(_))
        ));
    }
}
