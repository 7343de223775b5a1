// src/models/attestation.rs
//! Attestation requirements: what a requester wants from this agent.

use serde::{Deserialize, Serialize};

/// A requester's declaration of one credential requirement.
///
/// Immutable once parsed from a request. `required = false` requirements
/// may legitimately go unanswered; the response then simply carries no
/// binding for them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialAttestationRequest {
    /// Credential type being requested, e.g. "DriverLicense"
    #[serde(rename = "credentialType")]
    pub credential_type: String,

    /// Whether the exchange fails without this credential
    #[serde(default)]
    pub required: bool,

    /// Issuers the requester will accept the credential from
    #[serde(default)]
    pub issuers: Vec<String>,

    /// Fallback contract URLs to obtain the credential when absent
    #[serde(default)]
    pub contracts: Vec<String>,
}

/// The attestation section of an exchange request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttestationRequirements {
    /// Verifiable-credential presentations being requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presentations: Vec<CredentialAttestationRequest>,

    /// Self-issued claim names being requested
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "selfIssued")]
    pub self_issued: Vec<String>,
}
