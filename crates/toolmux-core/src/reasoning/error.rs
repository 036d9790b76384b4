//! Reasoning service error types

use thiserror::Error;

/// Errors raised while talking to the reasoning service
#[derive(Error, Debug)]
pub enum ReasoningError {
    /// Missing API key
    #[error("API key is required for {provider}")]
    MissingApiKey { provider: String },

    /// API request failed
    #[error("{provider} API error: {message}")]
    Api { provider: String, message: String },

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Mock scripts ran out of rounds
    #[error("No scripted reply left")]
    ScriptExhausted,

    #[error("{0}")]
    Other(String),
}

impl ReasoningError {
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type ReasoningResult<T> = Result<T, ReasoningError>;
