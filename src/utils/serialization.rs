// src/utils/serialization.rs
//! Serialization utilities for the credential agent.
//!
//! Provides serialization and deserialization functions for:
//! - JSON data structures
//! - base64url (unpadded) byte encodings used throughout the JOSE envelopes

use serde::{de::DeserializeOwned, Serialize};

/// Serializes a value to a JSON string.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(String)` with JSON representation on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Deserializes a value from a JSON string.
///
/// # Arguments
/// * `data` - JSON string to deserialize
///
/// # Returns
/// - `Ok(T)` with deserialized value on success
/// - `Err(serde_json::Error)` if deserialization fails
pub fn deserialize<T: DeserializeOwned>(data: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

/// Encodes bytes as unpadded base64url (RFC 7515 `BASE64URL`).
///
/// Every envelope segment, JWK coordinate and thumbprint in this crate
/// uses this encoding. Fields are treated as canonical untrimmed strings;
/// no whitespace handling is applied on either side.
pub fn base64url_encode(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes an unpadded base64url string back into bytes.
///
/// # Returns
/// - `Ok(Vec<u8>)` with the decoded bytes
/// - `Err(base64::DecodeError)` on invalid characters or padding
pub fn base64url_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::decode_config(data, base64::URL_SAFE_NO_PAD)
}
