//! Error types for the Focuspath study companion
//!
//! Structured errors use thiserror; the binary edge wraps them with anyhow.
//! Most store operations deliberately swallow storage failures (logging them)
//! so these errors mainly surface from explicit `save()` calls, configuration
//! loading, and the web collaborator.

use thiserror::Error;

/// Main error type for Focuspath operations
#[derive(Error, Debug)]
pub enum FocuspathError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Network failure talking to an external provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider asked us to slow down
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Call did not complete within its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Input rejected by validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Web access is disabled, unconfigured, or over quota
    #[error("Web unavailable: {0}")]
    WebUnavailable(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl FocuspathError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FocuspathError::RateLimitExceeded(_) | FocuspathError::Timeout(_)
        )
    }
}

/// Result type alias for Focuspath operations
pub type Result<T> = std::result::Result<T, FocuspathError>;

/// Convert anyhow::Error to FocuspathError
impl From<anyhow::Error> for FocuspathError {
    fn from(err: anyhow::Error) -> Self {
        // Alternate form keeps the whole context chain
        FocuspathError::Other(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FocuspathError::WebUnavailable("consent not granted".to_string());
        assert_eq!(err.to_string(), "Web unavailable: consent not granted");
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        assert!(json_err.is_err());

        let err: FocuspathError = json_err.unwrap_err().into();
        assert!(matches!(err, FocuspathError::Serialization(_)));
    }

    #[test]
    fn test_context_survives_conversion() {
        use anyhow::Context;

        fn load() -> Result<()> {
            Err::<(), _>(FocuspathError::ValidationError("missing field".to_string()))
                .context("Failed to load configuration")?;
            Ok(())
        }

        let err = load().unwrap_err();
        assert!(matches!(err, FocuspathError::Other(_)));
        let message = err.to_string();
        assert!(message.starts_with("Failed to load configuration"));
        assert!(message.contains("missing field"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(FocuspathError::RateLimitExceeded("429".into()).is_transient());
        assert!(FocuspathError::Timeout("30s".into()).is_transient());
        assert!(!FocuspathError::NetworkError("dns".into()).is_transient());
        assert!(!FocuspathError::ValidationError("bad".into()).is_transient());
    }
}
