// src/protocol/request.rs
//! Inbound exchange requests: classification and parsing.
//!
//! An inbound URI is classified as an issuance request (it names a
//! credential contract) or a presentation request (it carries a signed
//! request token). The two request kinds form a closed sum type with
//! exhaustive matching at every consumption site.

use serde::{Deserialize, Serialize};

use super::exchange::RejectionReason;
use crate::models::attestation::AttestationRequirements;
use crate::models::claims::RequestClaims;
use crate::token::jws::JwsToken;
use crate::utils::serialization::deserialize;

/// A credential contract: the issuer's offer of a credential type and the
/// attestations it wants in exchange.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    /// Contract URL
    pub id: String,

    /// Issuer's decentralized identifier
    pub issuer: String,

    /// Credential type this contract issues, e.g. "DriverLicense"
    #[serde(rename = "credentialType")]
    pub credential_type: String,

    /// Issuer display name
    #[serde(rename = "entityName", default)]
    pub entity_name: String,

    /// Inputs the issuer requires
    #[serde(default)]
    pub attestations: AttestationRequirements,
}

/// A parsed issuance request.
#[derive(Clone, Debug, PartialEq)]
pub struct IssuanceRequest {
    /// Where the contract came from
    pub contract_url: String,
    /// The contract itself
    pub contract: ContractDescriptor,
}

/// A parsed presentation request: the raw signed token plus its claims.
#[derive(Clone, Debug, PartialEq)]
pub struct PresentationRequest {
    /// The request envelope, byte-exact as received
    pub raw: String,
    /// Parsed (not yet verified) envelope
    pub token: JwsToken,
    /// Parsed request claims
    pub claims: RequestClaims,
}

/// The two kinds of inbound exchange request.
#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeRequest {
    Issuance(IssuanceRequest),
    Presentation(PresentationRequest),
}

impl ExchangeRequest {
    /// Display name of the requesting entity.
    pub fn entity_name(&self) -> &str {
        match self {
            ExchangeRequest::Issuance(req) => &req.contract.entity_name,
            ExchangeRequest::Presentation(req) => req
                .claims
                .registration
                .as_ref()
                .map(|r| r.client_name.as_str())
                .unwrap_or_default(),
        }
    }

    /// Decentralized identifier of the requesting entity.
    pub fn entity_id(&self) -> &str {
        match self {
            ExchangeRequest::Issuance(req) => &req.contract.issuer,
            ExchangeRequest::Presentation(req) => &req.claims.iss,
        }
    }

    /// Builds an issuance request from a contract document.
    pub fn issuance_from_contract(
        contract_url: &str,
        contract_json: &str,
    ) -> Result<Self, RejectionReason> {
        let contract: ContractDescriptor = deserialize(contract_json)
            .map_err(|e| RejectionReason::MalformedRequest(format!("contract JSON: {e}")))?;
        if contract.credential_type.is_empty() {
            return Err(RejectionReason::MalformedRequest(
                "contract names no credential type".to_string(),
            ));
        }
        Ok(ExchangeRequest::Issuance(IssuanceRequest {
            contract_url: contract_url.to_string(),
            contract,
        }))
    }

    /// Builds a presentation request from a signed request token.
    pub fn presentation_from_token(raw: &str) -> Result<Self, RejectionReason> {
        let token = JwsToken::parse(raw)
            .map_err(|e| RejectionReason::MalformedRequest(e.to_string()))?;
        let claims: RequestClaims = token
            .claims()
            .map_err(|e| RejectionReason::MalformedRequest(format!("request claims: {e}")))?;
        if claims.iss.is_empty() {
            return Err(RejectionReason::MalformedRequest(
                "request names no issuer".to_string(),
            ));
        }
        Ok(ExchangeRequest::Presentation(PresentationRequest {
            raw: raw.to_string(),
            token,
            claims,
        }))
    }
}

/// What an inbound URI pointed at, before any fetch happens.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestHint {
    /// Issuance: the contract document lives at this URL
    Issuance { contract_url: String },
    /// Presentation: the signed request token travelled inline
    Presentation { token: String },
    /// Presentation: the signed request token must be fetched
    PresentationByReference { request_uri: String },
}

/// Classifies an inbound request URI.
///
/// A `contract` query parameter marks issuance; `request` carries an
/// inline token; `request_uri` points at one. Anything else is malformed.
pub fn classify_request_uri(uri: &str) -> Result<RequestHint, RejectionReason> {
    let parsed = reqwest::Url::parse(uri)
        .map_err(|e| RejectionReason::MalformedRequest(format!("request URI: {e}")))?;

    for (name, value) in parsed.query_pairs() {
        match name.as_ref() {
            "contract" => {
                return Ok(RequestHint::Issuance {
                    contract_url: value.into_owned(),
                })
            }
            "request" => {
                return Ok(RequestHint::Presentation {
                    token: value.into_owned(),
                })
            }
            "request_uri" => {
                return Ok(RequestHint::PresentationByReference {
                    request_uri: value.into_owned(),
                })
            }
            _ => {}
        }
    }
    Err(RejectionReason::MalformedRequest(
        "URI carries neither a contract nor a request token".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_issuance_uri() {
        let hint = classify_request_uri(
            "openid-vc://?contract=https%3A%2F%2Fissuer.example%2Fcontracts%2Fdl",
        )
        .unwrap();
        assert_eq!(
            hint,
            RequestHint::Issuance {
                contract_url: "https://issuer.example/contracts/dl".to_string()
            }
        );
    }

    #[test]
    fn test_classify_presentation_uri() {
        let hint = classify_request_uri("openid-vc://?request=aaa.bbb.ccc").unwrap();
        assert_eq!(
            hint,
            RequestHint::Presentation {
                token: "aaa.bbb.ccc".to_string()
            }
        );
    }

    #[test]
    fn test_classify_rejects_bare_uri() {
        assert!(matches!(
            classify_request_uri("openid-vc://?state=xyz"),
            Err(RejectionReason::MalformedRequest(_))
        ));
        assert!(matches!(
            classify_request_uri("::not a uri::"),
            Err(RejectionReason::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_issuance_contract_parsing() {
        let contract = r#"{
            "id": "https://issuer.example/contracts/dl",
            "issuer": "did:agent:issuer",
            "credentialType": "DriverLicense",
            "entityName": "Department of Motor Vehicles"
        }"#;
        let request = ExchangeRequest::issuance_from_contract(
            "https://issuer.example/contracts/dl",
            contract,
        )
        .unwrap();
        assert_eq!(request.entity_id(), "did:agent:issuer");
        assert_eq!(request.entity_name(), "Department of Motor Vehicles");
    }

    #[test]
    fn test_contract_without_credential_type_is_malformed() {
        let contract = r#"{"id": "x", "issuer": "did:agent:issuer", "credentialType": ""}"#;
        assert!(matches!(
            ExchangeRequest::issuance_from_contract("x", contract),
            Err(RejectionReason::MalformedRequest(_))
        ));
    }
}
