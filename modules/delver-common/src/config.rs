use std::env;

use tracing::info;

const DEFAULT_ENDPOINT: &str = "https://api.webscout.dev";
const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Application configuration loaded from environment variables.
///
/// Both provider keys are optional: a missing WebScout key degrades retrieval
/// to empty results, a missing Anthropic key degrades insight extraction to
/// its deterministic fallbacks. Neither aborts startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// WebScout gateway base URLs, in round-robin order.
    pub webscout_endpoints: Vec<String>,
    pub webscout_api_key: Option<String>,

    // AI provider
    pub anthropic_api_key: Option<String>,
    pub model: String,

    // Rate gate for the WebScout gateway
    pub rate_limit: usize,
    pub rate_window_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut webscout_endpoints = env::var("WEBSCOUT_ENDPOINTS")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        if webscout_endpoints.is_empty() {
            webscout_endpoints.push(DEFAULT_ENDPOINT.to_string());
        }

        Self {
            webscout_endpoints,
            webscout_api_key: optional_env("WEBSCOUT_API_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            model: env::var("DELVER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            rate_limit: env::var("SEARCH_RATE_LIMIT")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .expect("SEARCH_RATE_LIMIT must be a number"),
            rate_window_secs: env::var("SEARCH_RATE_WINDOW_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("SEARCH_RATE_WINDOW_SECS must be a number"),
        }
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        info!(
            endpoints = self.webscout_endpoints.len(),
            webscout_key = self.webscout_api_key.is_some(),
            anthropic_key = self.anthropic_api_key.is_some(),
            model = self.model.as_str(),
            rate_limit = self.rate_limit,
            rate_window_secs = self.rate_window_secs,
            "Config loaded"
        );
    }
}

/// Read an env var, treating unset and empty the same way.
fn optional_env(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}
