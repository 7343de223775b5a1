// src/identity/mod.rs
//! Decentralized identities: the agent's own identifier and resolution of
//! counterparty identifiers to their public key sets.

pub mod identifier;
pub mod resolver;
