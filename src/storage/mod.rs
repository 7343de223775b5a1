// src/storage/mod.rs
//! Key storage layer.

pub mod keystore;
