// src/token/jws.rs
//! Compact signed-token (JWS) codec.
//!
//! Encodes and decodes the three-segment envelope used for every signed
//! protocol message: `base64url(header).base64url(payload).base64url(sig)`.
//! The header minimally carries the algorithm name and a key id; the
//! payload is arbitrary caller-supplied bytes; the signature covers the
//! first two encoded segments joined by the delimiter.
//!
//! A token is created once at signing time and never mutated; verification
//! is a pure function of the envelope and a resolved public key.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::keys::{Algorithm, CryptoKey};
use crate::crypto::operations::CryptoOperations;
use crate::crypto::CryptoError;
use crate::storage::keystore::{KeyScope, KeyStore, KeyStoreError};
use crate::utils::serialization::{base64url_decode, base64url_encode};

/// Errors raised by the token codec.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Structurally invalid envelope (wrong segment count, bad encoding)
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The signature did not verify against the supplied public key.
    /// Recoverable and reportable; callers inspect it, they do not crash.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Header or payload serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure in the underlying cryptographic layer
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Signing key retrieval failure
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
}

/// Protected header of a compact token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signature algorithm name, e.g. "ES256K"
    pub alg: String,

    /// Identifier of the signing key, e.g. "did:agent:abc#signing-1"
    pub kid: String,

    /// Token type marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// An immutable compact signed token.
///
/// The original encoded segments are retained so verification always runs
/// over the exact bytes that were signed, not a re-serialization.
#[derive(Clone, Debug, PartialEq)]
pub struct JwsToken {
    header: JwsHeader,
    payload: Vec<u8>,
    protected: String,
    encoded_payload: String,
    signature: Vec<u8>,
}

impl JwsToken {
    /// Signs `payload` with the private key stored under `key_reference`.
    ///
    /// # Arguments
    /// * `payload` - Raw payload bytes (typically a serialized protocol object)
    /// * `key_reference` - Key-store reference of the signing key
    /// * `kid` - Key id to place in the header
    /// * `crypto` - Dispatcher providing the sign operation
    ///
    /// # Returns
    /// A complete, immutable token ready for compact serialization.
    pub fn sign(
        payload: &[u8],
        key_reference: &str,
        kid: &str,
        crypto: &CryptoOperations,
    ) -> Result<Self, TokenError> {
        let key = crypto
            .key_store()
            .get(key_reference, KeyScope::PrivateOnly)?;

        let header = JwsHeader {
            alg: key.algorithm.name.clone(),
            kid: kid.to_string(),
            typ: Some("JWT".to_string()),
        };
        let protected = base64url_encode(&serde_json::to_vec(&header)?);
        let encoded_payload = base64url_encode(payload);

        let signing_input = format!("{protected}.{encoded_payload}");
        let signature = crypto.sign(&key.algorithm, &key, signing_input.as_bytes())?;

        Ok(JwsToken {
            header,
            payload: payload.to_vec(),
            protected,
            encoded_payload,
            signature,
        })
    }

    /// Parses a compact serialization into a token.
    ///
    /// # Errors
    /// [`TokenError::MalformedEnvelope`] unless the input is exactly three
    /// base64url segments with a JSON object header.
    pub fn parse(compact: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = compact.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::MalformedEnvelope(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let header_bytes = base64url_decode(segments[0])
            .map_err(|e| TokenError::MalformedEnvelope(format!("header segment: {e}")))?;
        let header: JwsHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| TokenError::MalformedEnvelope(format!("header JSON: {e}")))?;
        let payload = base64url_decode(segments[1])
            .map_err(|e| TokenError::MalformedEnvelope(format!("payload segment: {e}")))?;
        let signature = base64url_decode(segments[2])
            .map_err(|e| TokenError::MalformedEnvelope(format!("signature segment: {e}")))?;

        Ok(JwsToken {
            header,
            payload,
            protected: segments[0].to_string(),
            encoded_payload: segments[1].to_string(),
            signature,
        })
    }

    /// Renders the token in compact serialization.
    pub fn serialize_compact(&self) -> String {
        format!(
            "{}.{}.{}",
            self.protected,
            self.encoded_payload,
            base64url_encode(&self.signature)
        )
    }

    /// Verifies the token against a resolved public key.
    ///
    /// # Returns
    /// The decoded payload bytes on success.
    ///
    /// # Errors
    /// [`TokenError::SignatureInvalid`] for a wrong-but-well-formed
    /// signature; crypto/policy errors for malformed inputs.
    pub fn verify(
        &self,
        public_key: &CryptoKey,
        crypto: &CryptoOperations,
    ) -> Result<Vec<u8>, TokenError> {
        let algorithm = Algorithm {
            name: self.header.alg.clone(),
            named_curve: None,
            hash: None,
        };
        let signing_input = format!("{}.{}", self.protected, self.encoded_payload);
        let valid = crypto.verify(
            &algorithm,
            public_key,
            &self.signature,
            signing_input.as_bytes(),
        )?;
        if valid {
            Ok(self.payload.clone())
        } else {
            Err(TokenError::SignatureInvalid)
        }
    }

    /// Deserializes the payload as JSON claims.
    pub fn claims<T: serde::de::DeserializeOwned>(&self) -> Result<T, TokenError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::crypto::keys::KeyUsage;
    use crate::storage::keystore::InMemoryKeyStore;

    fn signing_setup() -> (CryptoOperations, CryptoKey) {
        let crypto = CryptoOperations::new(Arc::new(InMemoryKeyStore::new()));
        let pair = crypto
            .generate_and_store_key_pair(
                "signing-1",
                &Algorithm::es256k(),
                &[KeyUsage::Sign, KeyUsage::Verify],
            )
            .unwrap();
        (crypto, pair.public_key)
    }

    #[test]
    fn test_sign_parse_verify_round_trip() {
        let (crypto, public_key) = signing_setup();
        let payload = br#"{"iss":"did:agent:alice"}"#;

        let token = JwsToken::sign(payload, "signing-1", "did:agent:alice#signing-1", &crypto)
            .unwrap();
        let compact = token.serialize_compact();
        assert_eq!(compact.matches('.').count(), 2);

        let parsed = JwsToken::parse(&compact).unwrap();
        assert_eq!(parsed.header().alg, "ES256K");
        assert_eq!(parsed.header().kid, "did:agent:alice#signing-1");
        assert_eq!(parsed.verify(&public_key, &crypto).unwrap(), payload.to_vec());
    }

    #[test]
    fn test_tampered_signature_is_reported_not_raised() {
        let (crypto, public_key) = signing_setup();
        let token = JwsToken::sign(b"payload", "signing-1", "#signing-1", &crypto).unwrap();
        let compact = token.serialize_compact();

        // Flip one character of the signature segment within the alphabet
        let sig_start = compact.rfind('.').unwrap() + 1;
        let mut tampered: Vec<char> = compact.chars().collect();
        tampered[sig_start] = if tampered[sig_start] == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();

        let parsed = JwsToken::parse(&tampered).unwrap();
        assert!(matches!(
            parsed.verify(&public_key, &crypto),
            Err(TokenError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let (crypto, public_key) = signing_setup();
        let token = JwsToken::sign(b"original", "signing-1", "#signing-1", &crypto).unwrap();
        let compact = token.serialize_compact();

        let mut segments: Vec<&str> = compact.split('.').collect();
        let forged_payload = base64url_encode(b"forged!!");
        segments[1] = &forged_payload;
        let forged = segments.join(".");

        let parsed = JwsToken::parse(&forged).unwrap();
        assert!(matches!(
            parsed.verify(&public_key, &crypto),
            Err(TokenError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        assert!(matches!(
            JwsToken::parse("only.two"),
            Err(TokenError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            JwsToken::parse("a.b.c.d"),
            Err(TokenError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_header_must_be_json() {
        let bogus = format!(
            "{}.{}.{}",
            base64url_encode(b"not json"),
            base64url_encode(b"{}"),
            base64url_encode(&[0u8; 64])
        );
        assert!(matches!(
            JwsToken::parse(&bogus),
            Err(TokenError::MalformedEnvelope(_))
        ));
    }
}
