// src/protocol/exchange.rs
//! The credential-exchange state machine.
//!
//! One inbound request walks `Received → Parsed → Validated → Responding →
//! Signed → Sent`, with a terminal `Rejected(reason)` reachable from the
//! parsing and validation steps. A rejection is a value the caller
//! inspects and logs, never a crash. Transport failure after signing keeps
//! the exchange in `Signed` with the envelope retained for resending.

use chrono::{DateTime, Utc};
use log::{info, warn};
use thiserror::Error;

use super::request::{ExchangeRequest, PresentationRequest};
use super::response::{AttestationProof, ExchangeResponse};
use crate::crypto::keys::KeyUsage;
use crate::crypto::operations::CryptoOperations;
use crate::crypto::providers::KeyMaterial;
use crate::identity::identifier::Identifier;
use crate::identity::resolver::IdentifierResolver;
use crate::token::jws::TokenError;
use crate::transport::session::HubSession;
use crate::transport::wire::HubResponse;
use crate::transport::TransportError;

/// Why a request was rejected.
///
/// Every variant carries enough structured detail to log and surface
/// without re-deriving context.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RejectionReason {
    /// Structurally invalid URI, contract or envelope
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The request signature did not verify against the requester's keys
    #[error("invalid request signature: {0}")]
    InvalidSignature(String),

    /// The request is outside its validity window (zero grace period;
    /// `exp` is an exclusive upper bound)
    #[error("request expired or not yet valid: {0}")]
    Expired(String),

    /// The request was addressed to someone else
    #[error("audience mismatch: request is for '{found}', this agent is '{expected}'")]
    AudienceMismatch { expected: String, found: String },
}

/// Errors raised by the state machine itself.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// A step was invoked out of order
    #[error("invalid exchange state: {0}")]
    State(String),

    /// The request was rejected; the exchange is terminal
    #[error(transparent)]
    Rejected(#[from] RejectionReason),

    /// Response signing failed
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Delivery failed; the signed envelope is retained
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Observable state of one exchange.
#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeState {
    Received,
    Parsed,
    Validated,
    Responding,
    Signed,
    Sent,
    Rejected(RejectionReason),
}

/// Validates a presentation request against the requester's resolved keys
/// and its time/audience constraints.
///
/// Checks run in order: signature, `exp`/`nbf` bounds against `now` with
/// zero grace period, then `aud` when present.
pub async fn validate_presentation_request<R: IdentifierResolver>(
    request: &PresentationRequest,
    resolver: &R,
    agent_id: &str,
    crypto: &CryptoOperations,
    now: DateTime<Utc>,
) -> Result<(), RejectionReason> {
    let document = resolver
        .resolve(&request.claims.iss)
        .await
        .map_err(|e| RejectionReason::InvalidSignature(e.to_string()))?;

    let kid = &request.token.header().kid;
    let resolved = document.find_key(kid).ok_or_else(|| {
        RejectionReason::InvalidSignature(format!("no published key matches kid '{kid}'"))
    })?;

    let public_key = crypto
        .import_key(
            KeyMaterial::Jwk(&resolved.public_key_jwk),
            &crate::crypto::keys::Algorithm::es256k(),
            true,
            &[KeyUsage::Verify],
        )
        .map_err(|e| RejectionReason::InvalidSignature(e.to_string()))?;

    request
        .token
        .verify(&public_key, crypto)
        .map_err(|e| RejectionReason::InvalidSignature(e.to_string()))?;

    let timestamp = now.timestamp();
    if let Some(exp) = request.claims.exp {
        // exp == now is already expired
        if timestamp >= exp {
            return Err(RejectionReason::Expired(format!(
                "exp {exp} <= now {timestamp}"
            )));
        }
    }
    if let Some(nbf) = request.claims.nbf {
        if timestamp < nbf {
            return Err(RejectionReason::Expired(format!(
                "nbf {nbf} > now {timestamp}"
            )));
        }
    }

    if let Some(aud) = &request.claims.aud {
        if aud != agent_id {
            return Err(RejectionReason::AudienceMismatch {
                expected: agent_id.to_string(),
                found: aud.clone(),
            });
        }
    }
    Ok(())
}

/// One inbound exchange, from receipt to delivery.
pub struct CredentialExchange {
    state: ExchangeState,
    request: Option<ExchangeRequest>,
    response: Option<ExchangeResponse>,
    signed_envelope: Option<String>,
}

impl Default for CredentialExchange {
    fn default() -> Self {
        Self::receive()
    }
}

impl CredentialExchange {
    /// Starts a new exchange in the `Received` state.
    pub fn receive() -> Self {
        CredentialExchange {
            state: ExchangeState::Received,
            request: None,
            response: None,
            signed_envelope: None,
        }
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    pub fn request(&self) -> Option<&ExchangeRequest> {
        self.request.as_ref()
    }

    /// The signed response envelope, available from `Signed` onward.
    pub fn signed_envelope(&self) -> Option<&str> {
        self.signed_envelope.as_deref()
    }

    fn expect_state(&self, expected: &ExchangeState, step: &str) -> Result<(), ExchangeError> {
        if &self.state == expected {
            Ok(())
        } else {
            Err(ExchangeError::State(format!(
                "{step} requires {expected:?}, exchange is {:?}",
                self.state
            )))
        }
    }

    fn reject(&mut self, reason: RejectionReason) -> ExchangeError {
        warn!("exchange rejected: {reason}");
        self.state = ExchangeState::Rejected(reason.clone());
        ExchangeError::Rejected(reason)
    }

    /// `Received → Parsed`: accepts an already-classified request.
    pub fn parse(&mut self, parsed: Result<ExchangeRequest, RejectionReason>) -> Result<(), ExchangeError> {
        self.expect_state(&ExchangeState::Received, "parse")?;
        match parsed {
            Ok(request) => {
                info!(
                    "parsed {} request from '{}'",
                    match request {
                        ExchangeRequest::Issuance(_) => "issuance",
                        ExchangeRequest::Presentation(_) => "presentation",
                    },
                    request.entity_id()
                );
                self.request = Some(request);
                self.state = ExchangeState::Parsed;
                Ok(())
            }
            Err(reason) => Err(self.reject(reason)),
        }
    }

    /// `Parsed → Validated`: verifies signature, validity window and
    /// audience. Issuance requests carry no signature of their own and
    /// pass straight through.
    pub async fn validate<R: IdentifierResolver>(
        &mut self,
        resolver: &R,
        agent_id: &str,
        crypto: &CryptoOperations,
        now: DateTime<Utc>,
    ) -> Result<(), ExchangeError> {
        self.expect_state(&ExchangeState::Parsed, "validate")?;
        let request = self
            .request
            .as_ref()
            .ok_or_else(|| ExchangeError::State("no parsed request".to_string()))?;

        let outcome = match request {
            ExchangeRequest::Issuance(_) => Ok(()),
            ExchangeRequest::Presentation(req) => {
                validate_presentation_request(req, resolver, agent_id, crypto, now).await
            }
        };
        match outcome {
            Ok(()) => {
                self.state = ExchangeState::Validated;
                Ok(())
            }
            Err(reason) => Err(self.reject(reason)),
        }
    }

    /// `Validated → Responding`: opens the proof-collection phase.
    pub fn begin_response(&mut self) -> Result<(), ExchangeError> {
        self.expect_state(&ExchangeState::Validated, "begin_response")?;
        let response = match self.request.as_ref() {
            Some(ExchangeRequest::Issuance(req)) => ExchangeResponse::for_issuance(req),
            Some(ExchangeRequest::Presentation(req)) => ExchangeResponse::for_presentation(req),
            None => return Err(ExchangeError::State("no validated request".to_string())),
        };
        self.response = Some(response);
        self.state = ExchangeState::Responding;
        Ok(())
    }

    /// Binds one proof while in `Responding`.
    pub fn add_proof(&mut self, name: &str, proof: AttestationProof) -> Result<(), ExchangeError> {
        self.expect_state(&ExchangeState::Responding, "add_proof")?;
        self.response
            .as_mut()
            .ok_or_else(|| ExchangeError::State("no response under construction".to_string()))?
            .add_proof(name, proof);
        Ok(())
    }

    /// `Responding → Signed`: formats and signs the collected response.
    pub fn sign(
        &mut self,
        responder: &Identifier,
        crypto: &CryptoOperations,
        lifetime_secs: i64,
    ) -> Result<(), ExchangeError> {
        self.expect_state(&ExchangeState::Responding, "sign")?;
        let response = self
            .response
            .as_ref()
            .ok_or_else(|| ExchangeError::State("no response under construction".to_string()))?;
        let token = response.format_and_sign(responder, crypto, lifetime_secs, Utc::now())?;
        self.signed_envelope = Some(token.serialize_compact());
        self.state = ExchangeState::Signed;
        Ok(())
    }

    /// `Signed → Sent`: delivers the envelope through the session.
    ///
    /// On transport failure the exchange stays in `Signed` and keeps the
    /// envelope, so the caller may resend.
    pub async fn send(&mut self, session: &HubSession) -> Result<HubResponse, ExchangeError> {
        self.expect_state(&ExchangeState::Signed, "send")?;
        let envelope = self
            .signed_envelope
            .clone()
            .ok_or_else(|| ExchangeError::State("no signed envelope".to_string()))?;

        match session.send(&envelope).await {
            Ok(response) => {
                self.state = ExchangeState::Sent;
                Ok(response)
            }
            Err(e) => {
                warn!("delivery failed, envelope retained: {e}");
                Err(ExchangeError::Transport(e))
            }
        }
    }
}
