// src/lib.rs

//! # Decentralized Identity Agent
//!
//! A toolkit for decentralized-identity credential exchange: an agent
//! holds its own identifiers and keys, answers credential issuance and
//! presentation requests, and delivers signed responses over an
//! authenticated session.
//!
//! ## Architecture Overview
//! 1. **Cryptography Layer**: pluggable providers behind a
//!    policy-enforcing operation dispatcher (`crypto`)
//! 2. **Storage Layer**: versioned, scope-checked key store (`storage`)
//! 3. **Token Layer**: compact signed-token codec (`token`)
//! 4. **Identity Layer**: own identifiers and counterparty resolution
//!    (`identity`)
//! 5. **Protocol Layer**: the credential-exchange state machine
//!    (`protocol`)
//! 6. **Transport Layer**: authenticated hub sessions (`transport`)

pub mod config; // Environment-backed agent configuration
pub mod crypto; // Key model, providers, operation dispatch
pub mod error; // Crate-level error aggregation
pub mod identity; // Own identifiers and resolution
pub mod models; // Claim sets and credential shapes
pub mod protocol; // Exchange state machine
pub mod storage; // Key store
pub mod token; // Compact signed-token codec
pub mod transport; // Authenticated sessions
pub mod utils; // Serialization helpers

pub use config::AgentConfig;
pub use crypto::operations::CryptoOperations;
pub use error::AgentError;
pub use identity::identifier::Identifier;
pub use identity::resolver::{HttpResolver, IdentifierResolver, StaticResolver};
pub use protocol::exchange::{CredentialExchange, ExchangeState, RejectionReason};
pub use storage::keystore::{InMemoryKeyStore, KeyScope, KeyStore};
pub use token::jws::JwsToken;
pub use transport::session::HubSession;
