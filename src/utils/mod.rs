// src/utils/mod.rs
//! Shared serialization helpers.

pub mod serialization;
