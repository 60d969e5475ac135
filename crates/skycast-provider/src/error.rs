//! Provider-specific error types.
//!
//! Every upstream failure is categorized exactly once at this boundary;
//! the rest of the system only ever sees these variants.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid API key")]
    Auth,

    #[error("{0}")]
    NotFound(String),

    #[error("API rate limit exceeded. Please try again later.")]
    RateLimit,

    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("Network error. Please check your connection.")]
    Network(String),

    #[error("{0}")]
    Unknown(String),
}

impl ProviderError {
    /// Categorize an upstream HTTP status. `context` names the city or
    /// coordinate pair being resolved, for the not-found message.
    pub fn from_status(status: u16, context: &str) -> Self {
        match status {
            401 => Self::Auth,
            404 => Self::NotFound(format!("City '{}' not found", context)),
            429 => Self::RateLimit,
            other => Self::Unknown(format!("Upstream returned HTTP {}", other)),
        }
    }

    /// Categorize a transport-level reqwest failure (no HTTP status).
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Network(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }

    /// Stable machine-readable label, matching the wire field `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::NotFound(_) => "not_found",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Network(_) => "network",
            Self::Unknown(_) => "unknown",
        }
    }

    /// HTTP status the API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Auth => 401,
            Self::NotFound(_) => 404,
            Self::RateLimit => 429,
            Self::Timeout | Self::Network(_) | Self::Unknown(_) => 500,
        }
    }

    /// Whether a later retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Timeout | Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_categorization_is_deterministic() {
        assert!(matches!(ProviderError::from_status(401, "x"), ProviderError::Auth));
        assert!(matches!(ProviderError::from_status(404, "x"), ProviderError::NotFound(_)));
        assert!(matches!(ProviderError::from_status(429, "x"), ProviderError::RateLimit));
        assert!(matches!(ProviderError::from_status(503, "x"), ProviderError::Unknown(_)));
    }

    #[test]
    fn test_not_found_message_names_the_city() {
        let err = ProviderError::from_status(404, "Zzyzx123");
        assert_eq!(err.to_string(), "City 'Zzyzx123' not found");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ProviderError::Auth.kind(), "auth");
        assert_eq!(ProviderError::RateLimit.kind(), "rate_limit");
        assert_eq!(ProviderError::Timeout.kind(), "timeout");
        assert_eq!(ProviderError::Network("x".into()).kind(), "network");
        assert_eq!(ProviderError::Unknown("x".into()).kind(), "unknown");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ProviderError::Auth.status_code(), 401);
        assert_eq!(ProviderError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ProviderError::RateLimit.status_code(), 429);
        assert_eq!(ProviderError::Timeout.status_code(), 500);
    }

    #[test]
    fn test_is_retryable() {
        assert!(ProviderError::RateLimit.is_retryable());
        assert!(ProviderError::Timeout.is_retryable());
        assert!(!ProviderError::Auth.is_retryable());
        assert!(!ProviderError::NotFound("x".into()).is_retryable());
    }
}
