// src/transport/wire.rs
//! Counterparty wire format.
//!
//! Every response is a JSON object discriminated by its `@type` field.
//! The discriminator set is closed; an unknown discriminator is a protocol
//! error, and the well-known error shape is surfaced as the underlying
//! remote error rather than as a response value.

use serde::Deserialize;
use serde_json::Value;

use super::TransportError;

/// A typed counterparty response, demultiplexed by `@type`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "@type")]
pub enum HubResponse {
    /// Acknowledgement of a write
    WriteResponse {
        #[serde(default)]
        revisions: Vec<String>,
    },

    /// Result page of an object query
    ObjectQueryResponse {
        #[serde(default)]
        objects: Vec<Value>,
        #[serde(rename = "skipToken", default)]
        skip_token: Option<String>,
    },

    /// Result page of a commit query
    CommitQueryResponse {
        #[serde(default)]
        commits: Vec<Value>,
        #[serde(rename = "skipToken", default)]
        skip_token: Option<String>,
    },

    /// The counterparty's error shape
    ErrorResponse {
        #[serde(rename = "errorCode", default)]
        error_code: Option<String>,
        #[serde(rename = "developerMessage", default)]
        developer_message: Option<String>,
    },
}

/// Parses a response body into its typed form.
///
/// # Errors
/// - [`TransportError::UnknownResponseType`] for an unrecognized `@type`
/// - [`TransportError::Remote`] when the body is the error-response shape
pub fn demux(body: &str) -> Result<HubResponse, TransportError> {
    match serde_json::from_str::<HubResponse>(body) {
        Ok(HubResponse::ErrorResponse {
            error_code,
            developer_message,
        }) => Err(TransportError::Remote {
            code: error_code.unwrap_or_else(|| "unknown".to_string()),
            message: developer_message.unwrap_or_default(),
        }),
        Ok(response) => Ok(response),
        Err(e) => Err(TransportError::UnknownResponseType(e.to_string())),
    }
}
