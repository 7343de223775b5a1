// src/transport/session.rs
//! Authenticated session against a remote counterparty.
//!
//! A [`HubSession`] wraps signed protocol envelopes in an authenticated
//! request/response cycle: the access token is acquired lazily on the
//! first send (an unauthenticated exchange against the same endpoint) and
//! renewed at most once per request after an authentication failure. A
//! second authentication failure surfaces as a terminal error; the
//! single-retry cap is the only automatic retry in the agent.

use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use super::wire::{demux, HubResponse};
use super::TransportError;
use crate::crypto::operations::CryptoOperations;
use crate::identity::identifier::Identifier;
use crate::utils::serialization::serialize;

/// Claims of the self-signed token-request assertion.
#[derive(Serialize)]
struct TokenRequestClaims {
    iss: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Lifetime of the self-signed assertion used to request an access token.
const TOKEN_REQUEST_LIFETIME_SECS: i64 = 600;

/// One authenticated session with a remote counterparty.
///
/// The cached access token is the session's only mutable state; the async
/// mutex serializes the read-check-refresh-write sequence so concurrent
/// sends neither lose a freshly acquired token nor reuse one already known
/// to be expired. A refresh is committed only after the remote call fully
/// completes, so caller-side cancellation never leaves the cache
/// half-updated.
pub struct HubSession {
    client: reqwest::Client,
    /// Target endpoint, also the audience of token-request assertions
    endpoint: String,
    /// This agent's identity, used to self-sign token requests
    client_identity: Identifier,
    /// Counterparty's decentralized identifier
    pub counterparty: String,
    crypto: CryptoOperations,
    access_token: Mutex<Option<String>>,
}

impl HubSession {
    pub fn new(
        endpoint: impl Into<String>,
        client_identity: Identifier,
        counterparty: impl Into<String>,
        crypto: CryptoOperations,
    ) -> Self {
        HubSession {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            client_identity,
            counterparty: counterparty.into(),
            crypto,
            access_token: Mutex::new(None),
        }
    }

    /// Requests a fresh access token: an unauthenticated POST of a
    /// self-signed assertion to the session endpoint. The response body is
    /// the token.
    async fn request_access_token(&self) -> Result<String, TransportError> {
        let now = Utc::now().timestamp();
        let claims = TokenRequestClaims {
            iss: self.client_identity.id.clone(),
            aud: self.endpoint.clone(),
            iat: now,
            exp: now + TOKEN_REQUEST_LIFETIME_SECS,
        };
        let payload = serialize(&claims)
            .map_err(|e| TransportError::Token(e.to_string()))?
            .into_bytes();
        let assertion = self
            .client_identity
            .sign_payload(&payload, &self.crypto)
            .map_err(|e| TransportError::Token(e.to_string()))?;

        debug!("requesting access token from {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/jwt")
            .body(assertion.serialize_compact())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body.trim().to_string())
    }

    /// Returns the cached token, acquiring one on first use.
    async fn ensure_token(&self) -> Result<String, TransportError> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let fresh = self.request_access_token().await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    /// Invalidates `stale` and acquires exactly one replacement.
    ///
    /// If another send already replaced the token, that replacement is
    /// used without a second acquisition round.
    async fn refresh_token(&self, stale: &str) -> Result<String, TransportError> {
        let mut cached = self.access_token.lock().await;
        if let Some(current) = cached.as_ref() {
            if current != stale {
                return Ok(current.clone());
            }
        }
        *cached = None;
        let fresh = self.request_access_token().await?;
        // Committed only now, after the remote call fully completed
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    async fn post_authenticated(
        &self,
        payload: &str,
        token: &str,
    ) -> Result<reqwest::Response, TransportError> {
        Ok(self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await?)
    }

    /// Sends a protocol payload, handling token renewal.
    ///
    /// # Behavior
    /// - 401 once: invalidate the cached token, acquire one replacement,
    ///   retry the original request exactly once
    /// - 401 twice: [`TransportError::AuthenticationFailure`]
    /// - any other non-2xx: immediate [`TransportError::Status`], no retry
    /// - 2xx: body demultiplexed by its `@type` discriminator
    pub async fn send(&self, payload: &str) -> Result<HubResponse, TransportError> {
        let token = self.ensure_token().await?;
        let mut response = self.post_authenticated(payload, &token).await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!(
                "counterparty {} rejected the access token; renewing once",
                self.counterparty
            );
            let fresh = self.refresh_token(&token).await?;
            response = self.post_authenticated(payload, &fresh).await?;
            if response.status() == reqwest::StatusCode::UNAUTHORIZED {
                return Err(TransportError::AuthenticationFailure);
            }
        }

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        demux(&body)
    }
}
