//! Orchestrator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Orchestrator configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Relay base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fixed delay between status polls in milliseconds. No backoff;
    /// generation jobs are short and bounded.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum accepted prompt length in characters.
    #[serde(default = "default_max_prompt_len")]
    pub max_prompt_len: usize,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8787/api".to_string()
}

fn default_poll_interval_ms() -> u64 {
    atelier_types::POLL_INTERVAL_MS
}

fn default_max_prompt_len() -> usize {
    atelier_types::MAX_PROMPT_LEN
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_prompt_len: default_max_prompt_len(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Configuration load errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl OrchestratorConfig {
    /// Load from a TOML file; absent keys take their defaults.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.poll_interval_ms, 2500);
        assert_eq!(config.max_prompt_len, 2000);
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config: OrchestratorConfig =
            toml::from_str("base_url = \"https://relay.example/api\"").expect("parse");
        assert_eq!(config.base_url, "https://relay.example/api");
        assert_eq!(config.poll_interval_ms, 2500);
    }
}
