//! Upstream provider failures.
//!
//! Every variant is recovered inside the acquisition service (stale
//! fallback or an unavailable result). None of them reach UI callers.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Provider returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Data format error: {message}")]
    Format { message: String },

    #[error("Provider reported an error: {message}")]
    Upstream { message: String },

    #[error("Provider not configured: {message}")]
    NotConfigured { message: String },
}

impl ProviderError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::format(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            ProviderError::network(err.to_string())
        }
    }
}
