// src/config.rs
//! Agent configuration.
//!
//! Loaded once at startup from the process environment (a `.env` file is
//! honored when present). All fields have workable defaults so tests and
//! local runs need no environment at all.

use std::env;

use dotenv::dotenv;

/// Default lifetime of signed responses, in seconds.
const DEFAULT_RESPONSE_LIFETIME_SECS: i64 = 3600;

/// Runtime configuration of the agent.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Counterparty endpoint signed envelopes are delivered to
    pub hub_endpoint: String,

    /// Base URL of the identifier-resolution endpoint
    pub resolver_endpoint: String,

    /// This agent's decentralized identifier
    pub client_id: String,

    /// Validity window stamped into signed responses
    pub response_lifetime_secs: i64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            hub_endpoint: "http://localhost:3000/hub".to_string(),
            resolver_endpoint: "http://localhost:3000/resolve".to_string(),
            client_id: "did:agent:local".to_string(),
            response_lifetime_secs: DEFAULT_RESPONSE_LIFETIME_SECS,
        }
    }
}

impl AgentConfig {
    /// Builds the configuration from the environment, falling back to
    /// defaults for anything unset.
    ///
    /// # Environment Variables
    /// - `HUB_ENDPOINT`: counterparty endpoint URL
    /// - `RESOLVER_ENDPOINT`: identifier-resolution endpoint URL
    /// - `CLIENT_ID`: this agent's decentralized identifier
    /// - `RESPONSE_LIFETIME_SECS`: response validity window in seconds
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = AgentConfig::default();
        AgentConfig {
            hub_endpoint: env::var("HUB_ENDPOINT").unwrap_or(defaults.hub_endpoint),
            resolver_endpoint: env::var("RESOLVER_ENDPOINT").unwrap_or(defaults.resolver_endpoint),
            client_id: env::var("CLIENT_ID").unwrap_or(defaults.client_id),
            response_lifetime_secs: env::var("RESPONSE_LIFETIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.response_lifetime_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = AgentConfig::default();
        assert!(!config.hub_endpoint.is_empty());
        assert!(!config.client_id.is_empty());
        assert_eq!(config.response_lifetime_secs, 3600);
    }
}
