//! Configuration helpers for the Gemini Chat SDK
//!
//! Credential handling and endpoint resolution. The SDK never acquires
//! credentials itself; it consumes either a static API key or a
//! caller-supplied [`TokenProvider`] and decides only which header the
//! resulting value goes into.

use crate::{Error, Result};
use async_trait::async_trait;
use std::env;
use std::sync::Arc;

/// Default base URL for the Google AI Studio endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Source of a bearer token for Vertex-style authentication.
///
/// `refresh` is invoked at most once per request by the transport when the
/// API answers 401/403, then the request is retried with the new token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return the current token
    async fn token(&self) -> Result<String>;

    /// Obtain a fresh token after an authorization failure
    async fn refresh(&self) -> Result<String>;
}

/// Credential source placed on outgoing requests
#[derive(Clone)]
pub enum Credentials {
    /// Static API key sent as `x-goog-api-key`
    ApiKey(String),
    /// Bearer token sent as `Authorization: Bearer <token>`
    Token(Arc<dyn TokenProvider>),
}

impl Credentials {
    /// Credentials from a static API key
    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey(key.into())
    }

    /// Credentials from a refreshable token source
    pub fn token_provider(provider: Arc<dyn TokenProvider>) -> Self {
        Credentials::Token(provider)
    }

    /// Whether an authorization failure can be recovered by refreshing
    pub(crate) fn is_refreshable(&self) -> bool {
        matches!(self, Credentials::Token(_))
    }

    /// Produce the auth header for the next request
    pub(crate) async fn header(&self) -> Result<(&'static str, String)> {
        match self {
            Credentials::ApiKey(key) => Ok(("x-goog-api-key", key.clone())),
            Credentials::Token(provider) => {
                let token = provider.token().await?;
                Ok(("authorization", format!("Bearer {token}")))
            }
        }
    }

    pub(crate) async fn refresh(&self) -> Result<()> {
        match self {
            Credentials::ApiKey(_) => Err(Error::credential("API keys cannot be refreshed")),
            Credentials::Token(provider) => {
                provider.refresh().await?;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("Credentials::ApiKey(***)"),
            Credentials::Token(_) => f.write_str("Credentials::Token(..)"),
        }
    }
}

/// Base URL for a Vertex AI project/region pair.
///
/// The returned base slots into the same `{base}/models/{model}:operation`
/// path scheme as the Studio endpoint.
pub fn vertex_base_url(region: &str, project: &str) -> String {
    format!(
        "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google"
    )
}

/// Get the API key from the `GEMINI_API_KEY` environment variable
pub fn api_key_from_env() -> Option<String> {
    env::var("GEMINI_API_KEY").ok()
}

/// Get the model name from environment variable or fallback
///
/// Priority:
/// 1. `GEMINI_MODEL` environment variable
/// 2. fallback parameter
pub fn model_from_env(fallback: Option<&str>) -> Option<String> {
    if let Ok(model) = env::var("GEMINI_MODEL") {
        return Some(model);
    }
    fallback.map(|s| s.to_string())
}

/// Get the base URL from environment variable, fallback, or the Studio
/// default
///
/// Priority:
/// 1. `GEMINI_BASE_URL` environment variable
/// 2. fallback parameter
/// 3. [`DEFAULT_BASE_URL`]
pub fn base_url_from_env(fallback: Option<&str>) -> String {
    if let Ok(url) = env::var("GEMINI_BASE_URL") {
        return url;
    }
    fallback.unwrap_or(DEFAULT_BASE_URL).to_string()
}
