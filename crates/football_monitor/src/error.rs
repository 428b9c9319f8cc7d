use thiserror::Error;

/// Failures at the data-provider boundary
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited by provider (HTTP 429)")]
    RateLimited,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("cannot decode provider payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Timeouts, connection problems, 429 and 5xx are worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Transport(_) | ProviderError::RateLimited => true,
            ProviderError::Http { status, .. } => *status >= 500,
            ProviderError::Decode(_) | ProviderError::NotFound(_) | ProviderError::NotConfigured(_) => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::RateLimited => Some(429),
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else if e.is_decode() {
            ProviderError::Transport(format!("body decode: {e}"))
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ProviderError::RateLimited.is_transient());
        assert!(ProviderError::Timeout("t".into()).is_transient());
        assert!(ProviderError::Http { status: 503, message: String::new() }.is_transient());
        assert!(!ProviderError::Http { status: 401, message: String::new() }.is_transient());
        assert!(!ProviderError::NotFound("x".into()).is_transient());
    }
}
