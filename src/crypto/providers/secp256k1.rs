// src/crypto/providers/secp256k1.rs
//! ECDSA provider for the secp256k1 curve.
//!
//! Implements key generation, SHA-256-prehashed signing and verification,
//! and JWK/raw key import and export on top of the `k256` crate. Key
//! handles are the raw 32-byte private scalar and the 64-byte `X || Y`
//! public point; no other shape crosses the provider boundary.
//!
//! # Key-material shapes
//! Raw public key material is classified by its leading tag byte:
//! - `0x04`: uncompressed point, 65 bytes (tag + 32 X + 32 Y)
//! - `0x06`/`0x07`: hybrid forms, treated as uncompressed
//! - `0x02`/`0x03`: compressed points, not supported; rejected with a
//!   key-format error

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};

use super::{CryptoProvider, KeyMaterial, Sha256Provider};
use crate::crypto::jwk::JsonWebKey;
use crate::crypto::keys::{Algorithm, CryptoKey, CryptoKeyPair, KeyHandle, KeyType, KeyUsage};
use crate::crypto::CryptoError;
use crate::utils::serialization::{base64url_decode, base64url_encode};

/// Size of one curve coordinate and of the private scalar.
const COORDINATE_SIZE: usize = 32;
/// Size of an uncompressed SEC1 point: tag byte plus both coordinates.
const UNCOMPRESSED_POINT_SIZE: usize = 1 + 2 * COORDINATE_SIZE;
/// Digest length the signature scheme operates over.
const DIGEST_SIZE: usize = 32;

const TAG_COMPRESSED_EVEN: u8 = 0x02;
const TAG_COMPRESSED_ODD: u8 = 0x03;
const TAG_UNCOMPRESSED: u8 = 0x04;
const TAG_HYBRID_EVEN: u8 = 0x06;
const TAG_HYBRID_ODD: u8 = 0x07;

/// ECDSA/secp256k1 signing provider.
///
/// Messages are prehashed through a separate digest provider before the
/// scalar operation; the digest must be exactly 32 bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1Provider {
    digest_provider: Sha256Provider,
}

impl Secp256k1Provider {
    pub fn new() -> Self {
        Secp256k1Provider {
            digest_provider: Sha256Provider::new(),
        }
    }

    /// Resolves and validates the hash descriptor for this algorithm,
    /// defaulting to SHA-256 when unspecified.
    fn hash_algorithm(algorithm: &Algorithm) -> Result<Algorithm, CryptoError> {
        match algorithm.hash.as_deref() {
            None => Ok(Algorithm::sha256()),
            Some(name) if name.eq_ignore_ascii_case("SHA-256") => Ok(Algorithm::sha256()),
            Some(other) => Err(CryptoError::Algorithm(format!(
                "hash '{other}' is not supported for ES256K; use SHA-256"
            ))),
        }
    }

    /// Prehashes `data` and enforces the exact digest length the curve
    /// operation requires.
    fn prehash(&self, algorithm: &Algorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let hash = Self::hash_algorithm(algorithm)?;
        let digest = self.digest_provider.digest(&hash, data)?;
        if digest.len() != DIGEST_SIZE {
            return Err(CryptoError::DigestSize {
                expected: DIGEST_SIZE,
                found: digest.len(),
            });
        }
        Ok(digest)
    }

    /// Reconstructs the private scalar from a key handle, validating that
    /// it lies in the valid range for the curve's group order.
    fn secret_from_handle(key: &CryptoKey) -> Result<SecretKey, CryptoError> {
        let bytes = key.handle.bytes();
        if bytes.len() != COORDINATE_SIZE {
            return Err(CryptoError::KeyFormat(format!(
                "private key handle must be {COORDINATE_SIZE} bytes, found {}",
                bytes.len()
            )));
        }
        SecretKey::from_slice(bytes).map_err(|_| {
            CryptoError::KeyInvalid(
                "private scalar is outside the valid range for the curve order".to_string(),
            )
        })
    }

    /// Reconstructs the public point from a 64-byte `X || Y` handle.
    fn verifying_key_from_handle(key: &CryptoKey) -> Result<VerifyingKey, CryptoError> {
        let bytes = key.handle.bytes();
        if bytes.len() != 2 * COORDINATE_SIZE {
            return Err(CryptoError::KeyFormat(format!(
                "public key handle must be {} bytes, found {}",
                2 * COORDINATE_SIZE,
                bytes.len()
            )));
        }
        let mut sec1 = Vec::with_capacity(UNCOMPRESSED_POINT_SIZE);
        sec1.push(TAG_UNCOMPRESSED);
        sec1.extend_from_slice(bytes);
        VerifyingKey::from_sec1_bytes(&sec1)
            .map_err(|_| CryptoError::KeyInvalid("public point is not on the curve".to_string()))
    }

    /// Splits classified uncompressed point bytes into an `X || Y` handle.
    fn point_handle(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match data.first() {
            Some(&TAG_COMPRESSED_EVEN) | Some(&TAG_COMPRESSED_ODD) => Err(
                CryptoError::KeyFormat("Compressed Hex format is not supported".to_string()),
            ),
            Some(&TAG_UNCOMPRESSED) | Some(&TAG_HYBRID_EVEN) | Some(&TAG_HYBRID_ODD) => {
                if data.len() != UNCOMPRESSED_POINT_SIZE {
                    return Err(CryptoError::KeyFormat(format!(
                        "uncompressed point must be {UNCOMPRESSED_POINT_SIZE} bytes, found {}",
                        data.len()
                    )));
                }
                Ok(data[1..].to_vec())
            }
            Some(tag) => Err(CryptoError::KeyFormat(format!(
                "unrecognized key-material tag byte 0x{tag:02x}"
            ))),
            None => Err(CryptoError::KeyFormat("empty key material".to_string())),
        }
    }

    /// Decodes a base64url JWK member into exactly one coordinate.
    fn decode_coordinate(name: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
        let bytes = base64url_decode(value)
            .map_err(|e| CryptoError::KeyFormat(format!("JWK '{name}' is not base64url: {e}")))?;
        if bytes.len() != COORDINATE_SIZE {
            return Err(CryptoError::KeyFormat(format!(
                "JWK '{name}' must decode to {COORDINATE_SIZE} bytes, found {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    fn import_jwk(
        &self,
        jwk: &JsonWebKey,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> Result<CryptoKey, CryptoError> {
        if jwk.kty != "EC" {
            return Err(CryptoError::KeyFormat(format!(
                "expected an EC key, found kty '{}'",
                jwk.kty
            )));
        }
        if let Some(crv) = &jwk.crv {
            if !crv.eq_ignore_ascii_case("secp256k1") && !crv.eq_ignore_ascii_case("K-256") {
                return Err(CryptoError::KeyFormat(format!(
                    "curve '{crv}' is not secp256k1"
                )));
            }
        }

        // The private scalar's presence decides the key type
        if let Some(d) = &jwk.d {
            let scalar = Self::decode_coordinate("d", d)?;
            let private_usages: Vec<KeyUsage> = usages
                .iter()
                .copied()
                .filter(|u| self.private_key_usages().contains(u))
                .collect();
            return Ok(CryptoKey::new(
                KeyType::Private,
                extractable,
                algorithm.clone(),
                private_usages,
                KeyHandle::new(scalar),
            ));
        }

        let x = jwk
            .x
            .as_ref()
            .ok_or_else(|| CryptoError::KeyFormat("JWK is missing 'x'".to_string()))?;
        let y = jwk
            .y
            .as_ref()
            .ok_or_else(|| CryptoError::KeyFormat("JWK is missing 'y'".to_string()))?;
        let mut point = Vec::with_capacity(UNCOMPRESSED_POINT_SIZE);
        point.push(TAG_UNCOMPRESSED);
        point.extend(Self::decode_coordinate("x", x)?);
        point.extend(Self::decode_coordinate("y", y)?);

        // Reject off-curve coordinates at the boundary
        PublicKey::from_sec1_bytes(&point)
            .map_err(|_| CryptoError::KeyInvalid("public point is not on the curve".to_string()))?;

        let public_usages: Vec<KeyUsage> = usages
            .iter()
            .copied()
            .filter(|u| self.public_key_usages().contains(u))
            .collect();
        Ok(CryptoKey::new(
            KeyType::Public,
            extractable,
            algorithm.clone(),
            public_usages,
            KeyHandle::new(point[1..].to_vec()),
        ))
    }
}

impl CryptoProvider for Secp256k1Provider {
    fn name(&self) -> &'static str {
        "ES256K"
    }

    fn private_key_usages(&self) -> &[KeyUsage] {
        &[KeyUsage::Sign]
    }

    fn public_key_usages(&self) -> &[KeyUsage] {
        &[KeyUsage::Verify]
    }

    fn check_algorithm(&self, algorithm: &Algorithm) -> Result<(), CryptoError> {
        if !algorithm.matches_name(self.name()) {
            return Err(CryptoError::Algorithm(format!(
                "algorithm '{}' does not match provider '{}'",
                algorithm.name,
                self.name()
            )));
        }
        if let Some(curve) = &algorithm.named_curve {
            if !curve.eq_ignore_ascii_case("secp256k1") && !curve.eq_ignore_ascii_case("K-256") {
                return Err(CryptoError::Algorithm(format!(
                    "curve '{curve}' is not supported by ES256K"
                )));
            }
        }
        Self::hash_algorithm(algorithm).map(|_| ())
    }

    /// Generates a fresh key pair from a uniformly random scalar.
    ///
    /// The private handle is the raw scalar; the public handle is the
    /// derived `X || Y` point. Both halves share one algorithm descriptor,
    /// and each half keeps only the requested usages its type admits.
    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> Result<CryptoKeyPair, CryptoError> {
        let secret_key = SecretKey::random(&mut rand::thread_rng());
        let public_key = secret_key.public_key();

        let point = public_key.to_encoded_point(false);
        let mut public_handle = Vec::with_capacity(2 * COORDINATE_SIZE);
        public_handle.extend_from_slice(point.x().ok_or_else(|| {
            CryptoError::Provider("generated point has no X coordinate".to_string())
        })?);
        public_handle.extend_from_slice(point.y().ok_or_else(|| {
            CryptoError::Provider("generated point has no Y coordinate".to_string())
        })?);

        let private_usages: Vec<KeyUsage> = usages
            .iter()
            .copied()
            .filter(|u| self.private_key_usages().contains(u))
            .collect();
        let public_usages: Vec<KeyUsage> = usages
            .iter()
            .copied()
            .filter(|u| self.public_key_usages().contains(u))
            .collect();

        Ok(CryptoKeyPair {
            private_key: CryptoKey::new(
                KeyType::Private,
                extractable,
                algorithm.clone(),
                private_usages,
                KeyHandle::new(secret_key.to_bytes().to_vec()),
            ),
            public_key: CryptoKey::new(
                KeyType::Public,
                true,
                algorithm.clone(),
                public_usages,
                KeyHandle::new(public_handle),
            ),
        })
    }

    /// Signs `data` after SHA-256 prehashing.
    ///
    /// # Returns
    /// 64-byte compact ECDSA signature (`R || S`), RFC 6979 deterministic.
    fn sign(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let secret_key = Self::secret_from_handle(key)?;
        let digest = self.prehash(algorithm, data)?;

        let signing_key = SigningKey::from(&secret_key);
        let signature: Signature = signing_key
            .sign_prehash(&digest)
            .map_err(|e| CryptoError::Provider(format!("signing failed: {e}")))?;
        Ok(signature.to_vec())
    }

    /// Verifies a compact signature after SHA-256 prehashing.
    ///
    /// A signature that parses but does not validate, and a signature that
    /// fails to parse at all, both yield `Ok(false)`; only malformed keys
    /// or digests raise errors.
    fn verify(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let verifying_key = Self::verifying_key_from_handle(key)?;
        let digest = self.prehash(algorithm, data)?;

        let signature = match Signature::from_slice(signature) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify_prehash(&digest, &signature).is_ok())
    }

    fn import_key(
        &self,
        material: KeyMaterial<'_>,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> Result<CryptoKey, CryptoError> {
        match material {
            KeyMaterial::Jwk(jwk) => self.import_jwk(jwk, algorithm, extractable, usages),
            KeyMaterial::Raw(data) => {
                let handle = Self::point_handle(data)?;
                // Validate the classified point before accepting it
                let mut sec1 = Vec::with_capacity(UNCOMPRESSED_POINT_SIZE);
                sec1.push(TAG_UNCOMPRESSED);
                sec1.extend_from_slice(&handle);
                PublicKey::from_sec1_bytes(&sec1).map_err(|_| {
                    CryptoError::KeyInvalid("public point is not on the curve".to_string())
                })?;

                let public_usages: Vec<KeyUsage> = usages
                    .iter()
                    .copied()
                    .filter(|u| self.public_key_usages().contains(u))
                    .collect();
                Ok(CryptoKey::new(
                    KeyType::Public,
                    extractable,
                    algorithm.clone(),
                    public_usages,
                    KeyHandle::new(handle),
                ))
            }
        }
    }

    /// Exports a key as a JWK.
    ///
    /// A private-key export re-derives the public point so the combined
    /// private + public JWK form carries `x` and `y` alongside `d`.
    fn export_key(&self, key: &CryptoKey) -> Result<JsonWebKey, CryptoError> {
        let mut jwk = JsonWebKey {
            kty: "EC".to_string(),
            crv: Some("secp256k1".to_string()),
            key_ops: Some(key.usages.iter().map(|u| u.as_str().to_string()).collect()),
            ..Default::default()
        };

        match key.key_type {
            KeyType::Public => {
                let bytes = key.handle.bytes();
                if bytes.len() != 2 * COORDINATE_SIZE {
                    return Err(CryptoError::KeyFormat(format!(
                        "public key handle must be {} bytes, found {}",
                        2 * COORDINATE_SIZE,
                        bytes.len()
                    )));
                }
                jwk.x = Some(base64url_encode(&bytes[..COORDINATE_SIZE]));
                jwk.y = Some(base64url_encode(&bytes[COORDINATE_SIZE..]));
            }
            KeyType::Private => {
                let secret_key = Self::secret_from_handle(key)?;
                let point = secret_key.public_key().to_encoded_point(false);
                let x = point.x().ok_or_else(|| {
                    CryptoError::Provider("derived point has no X coordinate".to_string())
                })?;
                let y = point.y().ok_or_else(|| {
                    CryptoError::Provider("derived point has no Y coordinate".to_string())
                })?;
                jwk.x = Some(base64url_encode(x));
                jwk.y = Some(base64url_encode(y));
                jwk.d = Some(base64url_encode(key.handle.bytes()));
            }
            KeyType::Secret => {
                return Err(CryptoError::KeyFormat(
                    "secret keys are not exportable by the ES256K provider".to_string(),
                ))
            }
        }
        Ok(jwk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate() -> CryptoKeyPair {
        Secp256k1Provider::new()
            .generate_key_pair(&Algorithm::es256k(), true, &[KeyUsage::Sign, KeyUsage::Verify])
            .unwrap()
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let provider = Secp256k1Provider::new();
        let pair = generate();
        let alg = Algorithm::es256k();

        let signature = provider.sign(&alg, &pair.private_key, b"presentation request").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(provider
            .verify(&alg, &pair.public_key, &signature, b"presentation request")
            .unwrap());
        assert!(!provider
            .verify(&alg, &pair.public_key, &signature, b"tampered request")
            .unwrap());
    }

    #[test]
    fn test_garbled_signature_is_false_not_error() {
        let provider = Secp256k1Provider::new();
        let pair = generate();
        let alg = Algorithm::es256k();

        let mut signature = provider.sign(&alg, &pair.private_key, b"payload").unwrap();
        signature[10] ^= 0xFF;
        // Flipped bytes may make the signature unparseable; still Ok(false)
        assert!(!provider.verify(&alg, &pair.public_key, &signature, b"payload").unwrap());
        assert!(!provider.verify(&alg, &pair.public_key, &[0u8; 7], b"payload").unwrap());
    }

    #[test]
    fn test_compressed_point_import_is_rejected() {
        let provider = Secp256k1Provider::new();
        let mut compressed = vec![TAG_COMPRESSED_EVEN];
        compressed.extend_from_slice(&[0x11; 32]);
        assert_eq!(compressed.len(), 33);

        let err = provider
            .import_key(
                KeyMaterial::Raw(&compressed),
                &Algorithm::es256k(),
                true,
                &[KeyUsage::Verify],
            )
            .unwrap_err();
        match err {
            CryptoError::KeyFormat(msg) => {
                assert_eq!(msg, "Compressed Hex format is not supported")
            }
            other => panic!("expected KeyFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_hybrid_tag_is_treated_as_uncompressed() {
        let provider = Secp256k1Provider::new();
        let pair = generate();
        let alg = Algorithm::es256k();

        let mut hybrid = vec![TAG_HYBRID_EVEN];
        hybrid.extend_from_slice(pair.public_key.handle.bytes());
        let imported = provider
            .import_key(KeyMaterial::Raw(&hybrid), &alg, true, &[KeyUsage::Verify])
            .unwrap();
        assert_eq!(imported.handle, pair.public_key.handle);
    }

    #[test]
    fn test_unknown_tag_is_a_format_error() {
        let provider = Secp256k1Provider::new();
        let err = provider
            .import_key(
                KeyMaterial::Raw(&[0x05; 65]),
                &Algorithm::es256k(),
                true,
                &[KeyUsage::Verify],
            )
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyFormat(_)));
    }

    #[test]
    fn test_jwk_round_trip_public() {
        let provider = Secp256k1Provider::new();
        let pair = generate();
        let alg = Algorithm::es256k();

        let jwk = provider.export_key(&pair.public_key).unwrap();
        let imported = provider
            .import_key(KeyMaterial::Jwk(&jwk), &alg, true, &[KeyUsage::Verify])
            .unwrap();
        assert_eq!(imported.handle, pair.public_key.handle);
        assert_eq!(imported.key_type, KeyType::Public);
    }

    #[test]
    fn test_jwk_round_trip_private() {
        let provider = Secp256k1Provider::new();
        let pair = generate();
        let alg = Algorithm::es256k();

        let jwk = provider.export_key(&pair.private_key).unwrap();
        // Private export re-derives the public point
        assert!(jwk.x.is_some() && jwk.y.is_some() && jwk.d.is_some());

        let imported = provider
            .import_key(KeyMaterial::Jwk(&jwk), &alg, true, &[KeyUsage::Sign])
            .unwrap();
        assert_eq!(imported.handle, pair.private_key.handle);
        assert_eq!(imported.key_type, KeyType::Private);
    }

    #[test]
    fn test_out_of_range_scalar_is_key_invalid() {
        let provider = Secp256k1Provider::new();
        // All-0xFF exceeds the secp256k1 group order
        let bad = CryptoKey::new(
            KeyType::Private,
            false,
            Algorithm::es256k(),
            vec![KeyUsage::Sign],
            KeyHandle::new(vec![0xFF; 32]),
        );
        assert!(matches!(
            provider.sign(&Algorithm::es256k(), &bad, b"data"),
            Err(CryptoError::KeyInvalid(_))
        ));
        assert!(matches!(
            provider.export_key(&bad),
            Err(CryptoError::KeyInvalid(_))
        ));
    }
}
