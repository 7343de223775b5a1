// src/models/credential.rs
//! Verifiable Credential data model.
//!
//! A credential travels as a compact signed envelope; this wrapper pairs
//! the raw envelope (which must be preserved byte-exact for re-use in
//! presentations) with its parsed claims.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::token::jws::{JwsToken, TokenError};

/// Claims carried inside a verifiable credential envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VcClaims {
    /// Credential id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Issuer's decentralized identifier
    pub iss: String,

    /// Subject's decentralized identifier
    pub sub: String,

    /// Issued-at, unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiry, unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Credential subject claims
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vc: BTreeMap<String, Value>,
}

/// A held verifiable credential: raw envelope plus parsed claims.
///
/// Parsing does not verify: a holder may carry credentials whose issuers
/// it cannot currently resolve. Verification happens on demand against a
/// resolved issuer key.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiableCredential {
    raw: String,
    claims: VcClaims,
}

impl VerifiableCredential {
    /// Parses a raw compact envelope into a credential without verifying.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let token = JwsToken::parse(raw)?;
        let claims: VcClaims = token.claims()?;
        Ok(VerifiableCredential {
            raw: raw.to_string(),
            claims,
        })
    }

    /// The byte-exact envelope, as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &VcClaims {
        &self.claims
    }

    /// Issuer DID shortcut.
    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_raw_byte_exact() {
        let claims = VcClaims {
            jti: Some("urn:vc:1".to_string()),
            iss: "did:agent:issuer".to_string(),
            sub: "did:agent:holder".to_string(),
            ..Default::default()
        };
        let header = crate::utils::serialization::base64url_encode(
            br#"{"alg":"ES256K","kid":"did:agent:issuer#k1"}"#,
        );
        let payload = crate::utils::serialization::base64url_encode(
            serde_json::to_string(&claims).unwrap().as_bytes(),
        );
        let sig = crate::utils::serialization::base64url_encode(&[0u8; 64]);
        let raw = format!("{header}.{payload}.{sig}");

        let credential = VerifiableCredential::parse(&raw).unwrap();
        assert_eq!(credential.raw(), raw);
        assert_eq!(credential.issuer(), "did:agent:issuer");
        assert_eq!(credential.claims().jti.as_deref(), Some("urn:vc:1"));
    }

    #[test]
    fn test_malformed_envelope_does_not_parse() {
        assert!(VerifiableCredential::parse("not-a-token").is_err());
    }
}
