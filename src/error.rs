use thiserror::Error;

/// Main error type for the prediction service
#[derive(Error, Debug)]
pub enum SicboError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Feed errors
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Invalid feed data: {0}")]
    InvalidFeedData(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SicboError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SicboError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SicboError::RateLimited(_) | SicboError::FeedUnavailable(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for SicboError
pub type Result<T> = std::result::Result<T, SicboError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(SicboError::RateLimited("429".into()).is_transient());
        assert!(SicboError::FeedUnavailable("502".into()).is_transient());
        assert!(!SicboError::InvalidFeedData("bad".into()).is_transient());
        assert!(!SicboError::Validation("x".into()).is_transient());
    }

    #[test]
    fn display_includes_context() {
        let err = SicboError::NotFound("#42".into());
        assert_eq!(err.to_string(), "Session not found: #42");
    }
}
