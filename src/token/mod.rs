// src/token/mod.rs
//! Compact signed-token codec.

pub mod jws;
