use thiserror::Error;

#[derive(Error, Debug)]
pub enum DelverError {
    #[error("Research run cancelled")]
    Cancelled,

    #[error("Search error: {0}")]
    Search(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl DelverError {
    /// Whether this error is the cancellation signal. Cancellation is the
    /// only error allowed to cross a recursion boundary.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DelverError::Cancelled)
    }
}
