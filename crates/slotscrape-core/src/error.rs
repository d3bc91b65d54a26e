use thiserror::Error;

/// Application-wide error types for slotscrape.
#[derive(Error, Debug)]
pub enum AppError {
    /// The submitted URL is missing, malformed, or not http/https.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed (non-success status or unreadable body).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A single fetch timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Every fetch strategy was tried and none produced an extractable game.
    #[error(
        "All {tried} scraping strategies failed. Site may have strong anti-bot protection.{}",
        last_error.as_ref().map(|e| format!(" Last error: {e}")).unwrap_or_default()
    )]
    StrategiesExhausted {
        tried: usize,
        last_error: Option<String>,
    },

    /// The whole job exceeded its deadline.
    #[error("Job timed out after {0} seconds")]
    JobTimeout(u64),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Callback delivery failed.
    #[error("Notification error: {0}")]
    NotificationError(String),

    /// Too many submissions from one requester.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout")
                    || msg.contains("connect")
                    || msg.contains("reset")
                    || msg.starts_with("HTTP 429")
                    || msg.starts_with("HTTP 5")
            }
            _ => false,
        }
    }

    /// Returns true for errors raised by a single fetch attempt.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }
}
