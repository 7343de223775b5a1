// src/crypto/operations.rs
//! Policy-enforcing dispatcher over the provider registry.
//!
//! Every cryptographic operation in the agent flows through
//! [`CryptoOperations`]. For each call the dispatcher, in order:
//! 1. resolves the provider registered for the algorithm name within the
//!    requested scope (falling back to the unrestricted scope),
//! 2. validates that the algorithm name matches the key's bound algorithm,
//! 3. validates algorithm-specific parameters (curve, hash),
//! 4. validates key usage and key type for key-consuming operations,
//! 5. delegates to the provider.
//!
//! Any check failure aborts the call before the provider runs; dispatch is
//! never partial.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;

use super::jwk::JsonWebKey;
use super::keys::{Algorithm, CryptoKey, CryptoKeyPair, KeyType, KeyUsage};
use super::providers::{CryptoProvider, KeyMaterial, Secp256k1Provider, Sha256Provider};
use super::CryptoError;
use crate::storage::keystore::{KeyScope, KeyStore};

/// The operations the dispatcher can route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Digest,
    GenerateKey,
    GenerateKeyPair,
    Sign,
    Verify,
    Encrypt,
    Decrypt,
    DeriveBits,
    ImportKey,
    ExportKey,
}

/// Registration scope of a provider.
///
/// Lets a public-only provider (e.g. hashing, verification) coexist with a
/// full signing provider for the same deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderScope {
    /// Public-key-only contexts
    Public,
    /// Private-key contexts
    Private,
    /// Unrestricted
    All,
}

/// Mapping from (algorithm name, scope) to a provider instance.
///
/// The provider set is closed per deployment, so a plain table (no
/// reflection) is the whole dispatch mechanism.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<(String, ProviderScope), Arc<dyn CryptoProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry {
            providers: HashMap::new(),
        }
    }

    /// Registers `provider` for its declared algorithm name within `scope`.
    pub fn register(&mut self, scope: ProviderScope, provider: Arc<dyn CryptoProvider>) {
        let name = provider.name().to_ascii_lowercase();
        self.providers.insert((name, scope), provider);
    }

    /// Resolves the provider for `algorithm_name` within `scope`, falling
    /// back to the unrestricted registration.
    pub fn resolve(
        &self,
        algorithm_name: &str,
        scope: ProviderScope,
    ) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        let name = algorithm_name.to_ascii_lowercase();
        if let Some(provider) = self.providers.get(&(name.clone(), scope)) {
            return Ok(provider.clone());
        }
        if scope != ProviderScope::All {
            if let Some(provider) = self.providers.get(&(name, ProviderScope::All)) {
                return Ok(provider.clone());
            }
        }
        Err(CryptoError::Algorithm(format!(
            "no provider registered for algorithm '{algorithm_name}' in {scope:?} scope"
        )))
    }
}

/// Default deployment table: SHA-256 digesting in the public scope and the
/// full ES256K signing provider unrestricted.
static DEFAULT_REGISTRY: Lazy<ProviderRegistry> = Lazy::new(|| {
    let mut registry = ProviderRegistry::new();
    registry.register(ProviderScope::Public, Arc::new(Sha256Provider::new()));
    registry.register(ProviderScope::All, Arc::new(Secp256k1Provider::new()));
    registry
});

/// The agent's cryptographic front door.
///
/// Owns the provider registry and a handle to the key store so callers can
/// address keys by reference string without ever holding private material.
#[derive(Clone)]
pub struct CryptoOperations {
    registry: ProviderRegistry,
    key_store: Arc<dyn KeyStore>,
}

impl CryptoOperations {
    /// Creates a dispatcher over the default provider registry.
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        CryptoOperations {
            registry: DEFAULT_REGISTRY.clone(),
            key_store,
        }
    }

    /// Creates a dispatcher over a caller-built registry.
    pub fn with_registry(registry: ProviderRegistry, key_store: Arc<dyn KeyStore>) -> Self {
        CryptoOperations {
            registry,
            key_store,
        }
    }

    /// The backing key store.
    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.key_store
    }

    /// Validates that a key-consuming operation's algorithm matches the
    /// algorithm the key was created under.
    fn check_key_binding(algorithm: &Algorithm, key: &CryptoKey) -> Result<(), CryptoError> {
        if key.algorithm.matches_name(&algorithm.name) {
            Ok(())
        } else {
            Err(CryptoError::Algorithm(format!(
                "operation algorithm '{}' does not match key algorithm '{}'",
                algorithm.name, key.algorithm.name
            )))
        }
    }

    /// Computes a digest of `data` via the public-scope provider table.
    pub fn digest(&self, algorithm: &Algorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let provider = self.registry.resolve(&algorithm.name, ProviderScope::Public)?;
        provider.check_algorithm(algorithm)?;
        debug!("dispatch {:?} via provider '{}'", Operation::Digest, provider.name());
        provider.digest(algorithm, data)
    }

    /// Generates a key pair after usage-policy validation.
    pub fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> Result<CryptoKeyPair, CryptoError> {
        let provider = self.registry.resolve(&algorithm.name, ProviderScope::Private)?;
        provider.check_algorithm(algorithm)?;
        provider.check_generate_key(usages)?;
        debug!(
            "dispatch {:?} via provider '{}'",
            Operation::GenerateKeyPair,
            provider.name()
        );
        provider.generate_key_pair(algorithm, extractable, usages)
    }

    /// Generates a signing key pair and stores both halves under
    /// `reference` in the key store.
    ///
    /// The store's internal lock serializes concurrent writers to the same
    /// reference, so two flows cannot race to populate one alias.
    pub fn generate_and_store_key_pair(
        &self,
        reference: &str,
        algorithm: &Algorithm,
        usages: &[KeyUsage],
    ) -> Result<CryptoKeyPair, CryptoError> {
        let pair = self.generate_key_pair(algorithm, false, usages)?;
        self.key_store.store(reference, pair.private_key.clone())?;
        self.key_store.store(reference, pair.public_key.clone())?;
        Ok(pair)
    }

    /// Signs `data` with an in-hand private key.
    pub fn sign(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let provider = self.registry.resolve(&algorithm.name, ProviderScope::Private)?;
        Self::check_key_binding(algorithm, key)?;
        provider.check_algorithm(algorithm)?;
        key.ensure_usage(KeyUsage::Sign)?;
        if key.key_type == KeyType::Public {
            return Err(CryptoError::KeyUsage(
                "signing requires a private or secret key".to_string(),
            ));
        }
        debug!("dispatch {:?} via provider '{}'", Operation::Sign, provider.name());
        provider.sign(algorithm, key, data)
    }

    /// Signs `data` with the private key stored under `reference`.
    pub fn sign_with_reference(&self, reference: &str, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = self.key_store.get(reference, KeyScope::PrivateOnly)?;
        let algorithm = key.algorithm.clone();
        self.sign(&algorithm, &key, data)
    }

    /// Verifies `signature` over `data` with a public key.
    ///
    /// # Returns
    /// `Ok(false)` for a merely-invalid signature; `Err` only for policy
    /// violations or malformed inputs.
    pub fn verify(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let provider = self.registry.resolve(&algorithm.name, ProviderScope::Public)?;
        Self::check_key_binding(algorithm, key)?;
        provider.check_algorithm(algorithm)?;
        key.ensure_usage(KeyUsage::Verify)?;
        key.ensure_type(KeyType::Public)?;
        debug!("dispatch {:?} via provider '{}'", Operation::Verify, provider.name());
        provider.verify(algorithm, key, signature, data)
    }

    /// Imports key material after usage-policy validation.
    pub fn import_key(
        &self,
        material: KeyMaterial<'_>,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> Result<CryptoKey, CryptoError> {
        let provider = self.registry.resolve(&algorithm.name, ProviderScope::All)?;
        provider.check_algorithm(algorithm)?;
        provider.check_import_key(usages)?;
        debug!("dispatch {:?} via provider '{}'", Operation::ImportKey, provider.name());
        provider.import_key(material, algorithm, extractable, usages)
    }

    /// Exports a key as a JWK.
    ///
    /// # Errors
    /// A non-extractable key is refused here, before any provider runs.
    pub fn export_key(&self, key: &CryptoKey) -> Result<JsonWebKey, CryptoError> {
        if !key.extractable {
            return Err(CryptoError::KeyUsage(
                "key is not extractable".to_string(),
            ));
        }
        let provider = self.registry.resolve(&key.algorithm.name, ProviderScope::All)?;
        debug!("dispatch {:?} via provider '{}'", Operation::ExportKey, provider.name());
        provider.export_key(key)
    }

    /// Computes the thumbprint of a key's public identity.
    ///
    /// Routed through the provider's JWK form internally, so it works for
    /// non-extractable keys too; only the digest ever leaves this call.
    pub fn thumbprint(&self, key: &CryptoKey) -> Result<String, CryptoError> {
        let provider = self.registry.resolve(&key.algorithm.name, ProviderScope::All)?;
        let jwk = provider.export_key(key)?;
        jwk.thumbprint(self, &Algorithm::sha256())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keystore::InMemoryKeyStore;

    fn ops() -> CryptoOperations {
        CryptoOperations::new(Arc::new(InMemoryKeyStore::new()))
    }

    #[test]
    fn test_unknown_algorithm_has_no_provider() {
        assert!(matches!(
            ops().digest(
                &Algorithm {
                    name: "SHA-512".to_string(),
                    named_curve: None,
                    hash: None
                },
                b"data"
            ),
            Err(CryptoError::Algorithm(_))
        ));
    }

    #[test]
    fn test_generate_with_foreign_usage_fails() {
        let err = ops()
            .generate_key_pair(&Algorithm::es256k(), false, &[KeyUsage::Encrypt])
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyUsage(_)));
    }

    #[test]
    fn test_sign_requires_sign_usage() {
        let crypto = ops();
        // Verify-only request: the private half ends up with no usages
        let pair = crypto
            .generate_key_pair(&Algorithm::es256k(), false, &[KeyUsage::Verify])
            .unwrap();
        assert!(matches!(
            crypto.sign(&Algorithm::es256k(), &pair.private_key, b"data"),
            Err(CryptoError::KeyUsage(_))
        ));
    }

    #[test]
    fn test_sign_rejects_public_key() {
        let crypto = ops();
        let pair = crypto
            .generate_key_pair(&Algorithm::es256k(), false, &[KeyUsage::Sign, KeyUsage::Verify])
            .unwrap();
        // Force the usage through to reach the type check
        let mut forged = pair.public_key.clone();
        forged.usages = vec![KeyUsage::Sign];
        assert!(matches!(
            crypto.sign(&Algorithm::es256k(), &forged, b"data"),
            Err(CryptoError::KeyUsage(_))
        ));
    }

    #[test]
    fn test_algorithm_key_binding_is_checked() {
        let crypto = ops();
        let pair = crypto
            .generate_key_pair(&Algorithm::es256k(), false, &[KeyUsage::Sign, KeyUsage::Verify])
            .unwrap();
        let mismatched = Algorithm {
            name: "ES256".to_string(),
            named_curve: None,
            hash: None,
        };
        assert!(matches!(
            crypto.sign(&mismatched, &pair.private_key, b"data"),
            Err(CryptoError::Algorithm(_))
        ));
    }

    #[test]
    fn test_sign_with_reference_round_trip() {
        let crypto = ops();
        let pair = crypto
            .generate_and_store_key_pair(
                "agent-signing",
                &Algorithm::es256k(),
                &[KeyUsage::Sign, KeyUsage::Verify],
            )
            .unwrap();

        let signature = crypto.sign_with_reference("agent-signing", b"envelope").unwrap();
        assert!(crypto
            .verify(&Algorithm::es256k(), &pair.public_key, &signature, b"envelope")
            .unwrap());
    }

    #[test]
    fn test_non_extractable_key_is_not_exported() {
        let crypto = ops();
        let pair = crypto
            .generate_key_pair(&Algorithm::es256k(), false, &[KeyUsage::Sign, KeyUsage::Verify])
            .unwrap();
        assert!(matches!(
            crypto.export_key(&pair.private_key),
            Err(CryptoError::KeyUsage(_))
        ));
    }

    #[test]
    fn test_thumbprint_deterministic_and_metadata_free() {
        let crypto = ops();
        let pair = crypto
            .generate_key_pair(&Algorithm::es256k(), true, &[KeyUsage::Sign, KeyUsage::Verify])
            .unwrap();

        let a = crypto.thumbprint(&pair.public_key).unwrap();
        let b = crypto.thumbprint(&pair.public_key).unwrap();
        assert_eq!(a, b);

        // The private half shares the public identity, hence the thumbprint
        let c = crypto.thumbprint(&pair.private_key).unwrap();
        assert_eq!(a, c);

        // Metadata differences in the JWK never change the digest
        let mut jwk = crypto.export_key(&pair.public_key).unwrap();
        let plain = jwk.thumbprint(&crypto, &Algorithm::sha256()).unwrap();
        jwk.kid = Some("#key-2".to_string());
        jwk.alg = Some("ES256K".to_string());
        jwk.key_use = Some("sig".to_string());
        jwk.ext = Some(true);
        assert_eq!(plain, jwk.thumbprint(&crypto, &Algorithm::sha256()).unwrap());
    }
}
