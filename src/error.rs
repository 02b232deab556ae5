//! Error types for the Gemini Chat SDK

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed caller input (bad history shape, mixed part kinds, bad
    /// parameter schema). Never retried.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Non-retryable API status, or retries exhausted. `attempts` is the
    /// total number of requests issued before giving up.
    #[error("API request failed with status {status} after {attempts} attempt(s): {body}")]
    Transport {
        status: u16,
        body: String,
        attempts: u32,
    },

    /// The model declined to produce usable content (safety, recitation,
    /// truncation, ...). Surfaced by the response text accessor.
    #[error("Response blocked: {0}")]
    Blocked(String),

    /// A function call named a function that is not registered, or the
    /// registered handler failed. Stops the conversation loop.
    #[error("Function dispatch failed: {0}")]
    Dispatch(String),

    /// The function-calling loop hit its safety bound without the model
    /// producing a final answer.
    #[error("Conversation exceeded {limit} turns without completing")]
    MaxTurnsExceeded { limit: u32 },

    /// Credential source failed to produce or refresh a token
    #[error("Credential error: {0}")]
    Credential(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new blocked-response error
    pub fn blocked(msg: impl Into<String>) -> Self {
        Error::Blocked(msg.into())
    }

    /// Create a new dispatch error
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Error::Dispatch(msg.into())
    }

    /// Create a new credential error
    pub fn credential(msg: impl Into<String>) -> Self {
        Error::Credential(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = Error::config("model is required");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Invalid configuration: model is required");
    }

    #[test]
    fn test_error_validation() {
        let err = Error::validation("turn 0 must have role `user`");
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.to_string(), "Invalid input: turn 0 must have role `user`");
    }

    #[test]
    fn test_error_transport() {
        let err = Error::Transport {
            status: 503,
            body: "unavailable".to_string(),
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "API request failed with status 503 after 5 attempt(s): unavailable"
        );
    }

    #[test]
    fn test_error_blocked() {
        let err = Error::blocked("finish reason SAFETY");
        assert!(matches!(err, Error::Blocked(_)));
        assert_eq!(err.to_string(), "Response blocked: finish reason SAFETY");
    }

    #[test]
    fn test_error_dispatch() {
        let err = Error::dispatch("function `get_weather` is not registered");
        assert!(matches!(err, Error::Dispatch(_)));
    }

    #[test]
    fn test_error_max_turns() {
        let err = Error::MaxTurnsExceeded { limit: 25 };
        assert_eq!(
            err.to_string(),
            "Conversation exceeded 25 turns without completing"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
