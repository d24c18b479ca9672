use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    /// Network failure, timeout or non-2xx response.
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Browser launch, navigation, capture or upload failed.
    #[error("Screenshot capture failed: {0}")]
    Capture(String),

    /// Store read or append failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Something unexpected happened while walking one catalog.
    #[error("Catalog {catalog} aborted: {reason}")]
    CatalogFatal { catalog: String, reason: String },

    /// Credential or store setup failed before any catalog work.
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing the .xlsx export failed.
    #[error("Export failed: {0}")]
    Export(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScraperError {
    pub fn transport(url: &str, reason: impl ToString) -> Self {
        ScraperError::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScraperError::Transport { .. } | ScraperError::Persistence(_)
        )
    }
}
