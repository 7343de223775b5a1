// src/models/claims.rs
//! Claim sets carried inside signed protocol envelopes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attestation::AttestationRequirements;

/// Display registration a requester attaches to its request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequesterRegistration {
    /// Human-readable entity name for display
    #[serde(rename = "clientName", default)]
    pub client_name: String,
}

/// Claims of a signed presentation request token.
///
/// Timestamps are unix seconds. `exp` is an exclusive upper bound: a token
/// whose `exp` equals the current time is already expired.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestClaims {
    /// Requester's decentralized identifier
    pub iss: String,

    /// Intended audience; when present it must match this agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiry (exclusive), unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not-before, unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Replay nonce echoed back in the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Requester display metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<RequesterRegistration>,

    /// What the requester wants
    #[serde(default)]
    pub attestations: AttestationRequirements,
}

/// Attestation bindings collected into a response.
///
/// Map values are the proof forms: a raw credential envelope (string), a
/// nested presentation (array of raw envelopes), or a self-issued claim
/// value. Ordered maps keep signed payloads reproducible.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttestationBindings {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub presentations: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", rename = "selfIssued")]
    pub self_issued: BTreeMap<String, Value>,
}

impl AttestationBindings {
    pub fn is_empty(&self) -> bool {
        self.presentations.is_empty() && self.self_issued.is_empty()
    }
}

/// Claims of a signed exchange response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseClaims {
    /// Fresh random correlation id
    pub jti: String,

    /// Responder's decentralized identifier
    pub iss: String,

    /// The original requester
    pub aud: String,

    /// Issued-at, unix seconds
    pub iat: i64,

    /// Expiry (`iat` + configured lifetime), unix seconds
    pub exp: i64,

    /// Contract the response answers, for issuance flows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    /// Echoed request nonce, when the request carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Collected proofs; omitted entirely when nothing was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestations: Option<AttestationBindings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_attestations_are_omitted() {
        let claims = ResponseClaims {
            jti: "abc".to_string(),
            iss: "did:agent:responder".to_string(),
            aud: "did:agent:requester".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            ..Default::default()
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("attestations"));
        assert!(!json.contains("contract"));
    }

    #[test]
    fn test_request_claims_round_trip() {
        let json = r#"{
            "iss": "did:agent:verifier",
            "aud": "did:agent:holder",
            "exp": 1700000000,
            "registration": {"clientName": "Example Verifier"},
            "attestations": {
                "presentations": [{"credentialType": "DriverLicense", "required": true}]
            }
        }"#;
        let claims: RequestClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.attestations.presentations.len(), 1);
        assert!(claims.attestations.presentations[0].required);
        assert_eq!(
            claims.registration.unwrap().client_name,
            "Example Verifier"
        );
    }
}
