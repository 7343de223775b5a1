// src/transport/mod.rs
//! Authenticated request/response transport against a remote counterparty.

use thiserror::Error;

pub mod session;
pub mod wire;

/// Errors raised by the session transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The counterparty could not be reached
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status with no retry semantics
    #[error("counterparty returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Authentication still failing after the single permitted renewal
    #[error("authentication failed after access-token renewal")]
    AuthenticationFailure,

    /// Response carried a discriminator outside the known set
    #[error("unrecognized response type: {0}")]
    UnknownResponseType(String),

    /// The counterparty answered with its well-known error shape
    #[error("remote error {code}: {message}")]
    Remote { code: String, message: String },

    /// Access-token acquisition failed before any request went out
    #[error("access-token acquisition failed: {0}")]
    Token(String),
}
