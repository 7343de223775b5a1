// src/protocol/response.rs
//! Exchange responses: proof collection and response signing.
//!
//! A response accumulates zero or more (attestation → proof) bindings
//! during the collection phase, then becomes an immutable signed envelope
//! once formatted. Supplying no proof at all is valid whenever every
//! attestation in the request was optional.

use serde_json::Value;

use super::request::{IssuanceRequest, PresentationRequest};
use crate::identity::identifier::Identifier;
use crate::crypto::operations::CryptoOperations;
use crate::models::claims::{AttestationBindings, ResponseClaims};
use crate::token::jws::{JwsToken, TokenError};

/// A proof supplied for one attestation requirement.
#[derive(Clone, Debug, PartialEq)]
pub enum AttestationProof {
    /// An existing verifiable credential's raw envelope
    Credential(String),

    /// A self-issued claim value
    SelfIssued(Value),

    /// A nested presentation embedding raw signed credential envelopes.
    /// Nesting is bounded to depth 1: the embedded envelopes are carried
    /// as-is and are not re-validated against fresh requests.
    Presentation(Vec<String>),
}

/// Response to an issuance request.
#[derive(Clone, Debug)]
pub struct IssuanceResponse {
    /// Contract being answered
    pub contract_url: String,
    /// The issuer the response goes back to
    pub audience: String,
    bindings: AttestationBindings,
}

/// Response to a presentation request.
#[derive(Clone, Debug)]
pub struct PresentationResponse {
    /// The requester the response goes back to
    pub audience: String,
    /// Request nonce to echo
    pub nonce: Option<String>,
    bindings: AttestationBindings,
}

/// The two kinds of exchange response.
#[derive(Clone, Debug)]
pub enum ExchangeResponse {
    Issuance(IssuanceResponse),
    Presentation(PresentationResponse),
}

/// Fresh random correlation id: 16 bytes of entropy, hex-rendered.
fn correlation_id() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl ExchangeResponse {
    /// Starts an empty response to an issuance request.
    pub fn for_issuance(request: &IssuanceRequest) -> Self {
        ExchangeResponse::Issuance(IssuanceResponse {
            contract_url: request.contract_url.clone(),
            audience: request.contract.issuer.clone(),
            bindings: AttestationBindings::default(),
        })
    }

    /// Starts an empty response to a presentation request.
    pub fn for_presentation(request: &PresentationRequest) -> Self {
        ExchangeResponse::Presentation(PresentationResponse {
            audience: request.claims.iss.clone(),
            nonce: request.claims.nonce.clone(),
            bindings: AttestationBindings::default(),
        })
    }

    fn bindings_mut(&mut self) -> &mut AttestationBindings {
        match self {
            ExchangeResponse::Issuance(r) => &mut r.bindings,
            ExchangeResponse::Presentation(r) => &mut r.bindings,
        }
    }

    /// Binds a proof to an attestation name (the credential type for
    /// credential and presentation proofs, the claim name for self-issued
    /// values). Later bindings under the same name replace earlier ones.
    pub fn add_proof(&mut self, name: &str, proof: AttestationProof) {
        let bindings = self.bindings_mut();
        match proof {
            AttestationProof::Credential(raw) => {
                bindings
                    .presentations
                    .insert(name.to_string(), Value::String(raw));
            }
            AttestationProof::SelfIssued(value) => {
                bindings.self_issued.insert(name.to_string(), value);
            }
            AttestationProof::Presentation(envelopes) => {
                bindings.presentations.insert(
                    name.to_string(),
                    Value::Array(envelopes.into_iter().map(Value::String).collect()),
                );
            }
        }
    }

    /// Number of collected bindings.
    pub fn proof_count(&self) -> usize {
        let bindings = match self {
            ExchangeResponse::Issuance(r) => &r.bindings,
            ExchangeResponse::Presentation(r) => &r.bindings,
        };
        bindings.presentations.len() + bindings.self_issued.len()
    }

    /// Formats and signs the response under the responder's key.
    ///
    /// The payload carries a fresh correlation id, `iss` = responder,
    /// `aud` = original requester, `iat`/`exp` with the configured
    /// lifetime, and the collected bindings (omitted entirely when no
    /// proof was supplied).
    pub fn format_and_sign(
        &self,
        responder: &Identifier,
        crypto: &CryptoOperations,
        lifetime_secs: i64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<JwsToken, TokenError> {
        let iat = now.timestamp();
        let (audience, contract, nonce, bindings) = match self {
            ExchangeResponse::Issuance(r) => (
                r.audience.clone(),
                Some(r.contract_url.clone()),
                None,
                &r.bindings,
            ),
            ExchangeResponse::Presentation(r) => {
                (r.audience.clone(), None, r.nonce.clone(), &r.bindings)
            }
        };

        let claims = ResponseClaims {
            jti: correlation_id(),
            iss: responder.id.clone(),
            aud: audience,
            iat,
            exp: iat + lifetime_secs,
            contract,
            nonce,
            attestations: if bindings.is_empty() {
                None
            } else {
                Some(bindings.clone())
            },
        };
        let payload = serde_json::to_vec(&claims)?;
        responder.sign_payload(&payload, crypto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::protocol::request::{ContractDescriptor, IssuanceRequest};
    use crate::storage::keystore::InMemoryKeyStore;

    fn issuance_request() -> IssuanceRequest {
        IssuanceRequest {
            contract_url: "https://issuer.example/contracts/dl".to_string(),
            contract: ContractDescriptor {
                id: "https://issuer.example/contracts/dl".to_string(),
                issuer: "did:agent:issuer".to_string(),
                credential_type: "DriverLicense".to_string(),
                entity_name: "DMV".to_string(),
                attestations: Default::default(),
            },
        }
    }

    #[test]
    fn test_correlation_ids_are_fresh() {
        assert_ne!(correlation_id(), correlation_id());
        assert_eq!(correlation_id().len(), 32);
    }

    #[test]
    fn test_empty_response_omits_attestation_block() {
        let crypto = CryptoOperations::new(Arc::new(InMemoryKeyStore::new()));
        let responder = Identifier::create("did:agent:holder", "signing-1", &crypto).unwrap();

        let response = ExchangeResponse::for_issuance(&issuance_request());
        assert_eq!(response.proof_count(), 0);

        let token = response
            .format_and_sign(&responder, &crypto, 3600, chrono::Utc::now())
            .unwrap();
        let claims: ResponseClaims = token.claims().unwrap();
        assert!(claims.attestations.is_none());
        assert_eq!(claims.iss, "did:agent:holder");
        assert_eq!(claims.aud, "did:agent:issuer");
        assert_eq!(claims.exp, claims.iat + 3600);
        assert_eq!(
            claims.contract.as_deref(),
            Some("https://issuer.example/contracts/dl")
        );
    }

    #[test]
    fn test_collected_proofs_land_in_the_payload() {
        let crypto = CryptoOperations::new(Arc::new(InMemoryKeyStore::new()));
        let responder = Identifier::create("did:agent:holder", "signing-1", &crypto).unwrap();

        let mut response = ExchangeResponse::for_issuance(&issuance_request());
        response.add_proof(
            "IdentityCard",
            AttestationProof::Credential("aaa.bbb.ccc".to_string()),
        );
        response.add_proof(
            "email",
            AttestationProof::SelfIssued(Value::String("holder@example.com".to_string())),
        );
        assert_eq!(response.proof_count(), 2);

        let token = response
            .format_and_sign(&responder, &crypto, 3600, chrono::Utc::now())
            .unwrap();
        let claims: ResponseClaims = token.claims().unwrap();
        let bindings = claims.attestations.unwrap();
        assert_eq!(
            bindings.presentations.get("IdentityCard"),
            Some(&Value::String("aaa.bbb.ccc".to_string()))
        );
        assert_eq!(
            bindings.self_issued.get("email"),
            Some(&Value::String("holder@example.com".to_string()))
        );
    }
}
