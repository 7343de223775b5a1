// src/crypto/jwk.rs
//! JSON Web Key interchange representation and thumbprint computation.
//!
//! A [`JsonWebKey`] is the canonical form a key takes when it crosses the
//! agent boundary: resolver documents, token headers and key export all
//! speak JWK. Thumbprints follow RFC 7638: the digest of the minimal
//! required-member subset serialized in alphabetical member order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::keys::Algorithm;
use super::operations::CryptoOperations;
use super::CryptoError;
use crate::utils::serialization::base64url_encode;

/// A JSON Web Key per RFC 7517 conventions.
///
/// Optional members absent from the source are omitted on output, never
/// emitted as null. Base64url members (`x`, `y`, `d`) are canonical
/// untrimmed strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type, e.g. "EC"
    pub kty: String,

    /// Key identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Named curve for EC keys, e.g. "secp256k1"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// Intended public key use ("sig" or "enc")
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Permitted operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,

    /// Algorithm identifier, e.g. "ES256K"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Extractability marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,

    /// base64url X coordinate (EC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// base64url Y coordinate (EC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// base64url private scalar (EC private keys)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl JsonWebKey {
    /// Builds the canonical minimal JWK used for thumbprinting.
    ///
    /// Only the required members for the key type are included (`crv`,
    /// `kty`, `x`, `y` for EC keys); `d` never contributes, so private and
    /// public forms of the same key share one thumbprint. serde_json's
    /// object map keeps members in alphabetical order, and compact
    /// serialization emits no whitespace.
    fn canonical_members(&self) -> Result<Map<String, Value>, CryptoError> {
        if self.kty != "EC" {
            return Err(CryptoError::Algorithm(format!(
                "thumbprint is not defined for key type '{}'",
                self.kty
            )));
        }
        let crv = self
            .crv
            .as_ref()
            .ok_or_else(|| CryptoError::KeyFormat("JWK is missing 'crv'".to_string()))?;
        let x = self
            .x
            .as_ref()
            .ok_or_else(|| CryptoError::KeyFormat("JWK is missing 'x'".to_string()))?;
        let y = self
            .y
            .as_ref()
            .ok_or_else(|| CryptoError::KeyFormat("JWK is missing 'y'".to_string()))?;

        let mut members = Map::new();
        members.insert("crv".to_string(), Value::String(crv.clone()));
        members.insert("kty".to_string(), Value::String(self.kty.clone()));
        members.insert("x".to_string(), Value::String(x.clone()));
        members.insert("y".to_string(), Value::String(y.clone()));
        Ok(members)
    }

    /// Computes the RFC 7638 thumbprint of this key.
    ///
    /// # Arguments
    /// * `crypto` - Dispatcher providing the digest operation
    /// * `hash` - Digest algorithm descriptor (normally SHA-256)
    ///
    /// # Returns
    /// base64url (unpadded) encoding of the digest. Deterministic and
    /// stable across process runs: metadata members (`kid`, `alg`, `use`,
    /// `ext`, `key_ops`) never influence the result.
    pub fn thumbprint(
        &self,
        crypto: &CryptoOperations,
        hash: &Algorithm,
    ) -> Result<String, CryptoError> {
        let members = self.canonical_members()?;
        let canonical = serde_json::to_string(&Value::Object(members))
            .map_err(|e| CryptoError::Provider(format!("canonical JWK serialization: {e}")))?;
        let digest = crypto.digest(hash, canonical.as_bytes())?;
        Ok(base64url_encode(&digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_members_are_omitted() {
        let jwk = JsonWebKey {
            kty: "EC".to_string(),
            crv: Some("secp256k1".to_string()),
            x: Some("AQAB".to_string()),
            y: Some("AQAC".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&jwk).unwrap();
        assert!(!json.contains("kid"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_canonical_members_sorted_and_minimal() {
        let jwk = JsonWebKey {
            kty: "EC".to_string(),
            kid: Some("#key-1".to_string()),
            alg: Some("ES256K".to_string()),
            crv: Some("secp256k1".to_string()),
            x: Some("xxxx".to_string()),
            y: Some("yyyy".to_string()),
            d: Some("dddd".to_string()),
            ..Default::default()
        };
        let members = jwk.canonical_members().unwrap();
        let canonical = serde_json::to_string(&Value::Object(members)).unwrap();
        assert_eq!(
            canonical,
            r#"{"crv":"secp256k1","kty":"EC","x":"xxxx","y":"yyyy"}"#
        );
    }

    #[test]
    fn test_missing_coordinate_is_a_format_error() {
        let jwk = JsonWebKey {
            kty: "EC".to_string(),
            crv: Some("secp256k1".to_string()),
            x: Some("xxxx".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            jwk.canonical_members(),
            Err(CryptoError::KeyFormat(_))
        ));
    }
}
