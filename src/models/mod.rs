// src/models/mod.rs
//! Data structures shared across the protocol layer.

pub mod attestation;
pub mod claims;
pub mod credential;
