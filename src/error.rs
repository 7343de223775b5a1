// src/error.rs
//! Crate-level error type aggregating every layer's errors.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::identity::resolver::ResolveError;
use crate::protocol::exchange::ExchangeError;
use crate::storage::keystore::KeyStoreError;
use crate::token::jws::TokenError;
use crate::transport::TransportError;

/// Any error the agent can surface to a caller.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
