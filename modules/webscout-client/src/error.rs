use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebScoutError>;

#[derive(Debug, Error)]
pub enum WebScoutError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl WebScoutError {
    /// Gateway timeout on the bulk scrape endpoint, the documented trigger
    /// for per-URL fallback.
    pub fn is_gateway_timeout(&self) -> bool {
        matches!(self, WebScoutError::Api { status: 504, .. })
    }
}

impl From<reqwest::Error> for WebScoutError {
    fn from(err: reqwest::Error) -> Self {
        WebScoutError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WebScoutError {
    fn from(err: serde_json::Error) -> Self {
        WebScoutError::Parse(err.to_string())
    }
}
