// src/protocol/mod.rs
//! The credential-exchange protocol: request classification, the exchange
//! state machine, and response formatting.

pub mod exchange;
pub mod request;
pub mod response;
