//! HTTP transport with retry and exponential backoff
//!
//! All SDK endpoints (`generateContent`, `countTokens`, `cachedContents`)
//! go through [`Transport::send`], which owns the retry contract:
//!
//! - 429 and 5xx responses are retried with a delay of `2^attempt` seconds
//!   (1s, 2s, 4s, ...), at most [`MAX_ATTEMPTS`] requests in total, with no
//!   sleep after the final failure.
//! - A 401/403 with a refreshable credential triggers one token refresh and
//!   an immediate retry that does not consume a backoff slot.
//! - Any other non-2xx status fails immediately, surfacing the response
//!   body in the error.
//!
//! The HTTP call itself sits behind the [`HttpExecutor`] trait so tests can
//! drive the retry loop with scripted responses (see [`ScriptedExecutor`])
//! instead of a live server.

use crate::config::Credentials;
use crate::{Error, Result};
use async_trait::async_trait;
pub use reqwest::Method;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Maximum number of requests issued for one logical call
pub const MAX_ATTEMPTS: u32 = 5;

/// A single outgoing HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
}

/// A raw HTTP response: status plus unparsed body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes one HTTP exchange. Implemented by the real reqwest-backed
/// executor and by scripted test doubles.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Production executor backed by a pooled [`reqwest::Client`]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(Error::Http)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(Error::Http)?;
        Ok(HttpResponse { status, body })
    }
}

/// Test executor that plays back a fixed sequence of responses and records
/// every request it receives.
///
/// Used by the SDK's own test suite to exercise the retry loop and the
/// conversation engine against deterministic response sequences.
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedExecutor {
    /// Build an executor that answers with `(status, body)` pairs in order
    pub fn new(responses: Vec<(u16, &str)>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| HttpResponse {
                        status,
                        body: body.to_string(),
                    })
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Requests observed so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests observed so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpExecutor for ScriptedExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::config("scripted executor ran out of responses"))
    }
}

/// Retrying transport shared by the chat session and the cache manager
#[derive(Clone)]
pub struct Transport {
    executor: Arc<dyn HttpExecutor>,
    credentials: Credentials,
}

impl Transport {
    /// Transport over a real HTTP client with the given request timeout
    pub fn new(credentials: Credentials, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            executor: Arc::new(ReqwestExecutor::new(timeout_secs)?),
            credentials,
        })
    }

    /// Transport over a caller-supplied executor
    pub fn with_executor(credentials: Credentials, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            executor,
            credentials,
        }
    }

    /// Issue a request and parse the JSON response body, applying the
    /// retry policy described in the module docs. An empty 2xx body maps
    /// to JSON null.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let mut attempts: u32 = 0;
        let mut refreshed = false;

        loop {
            // Headers are rebuilt per attempt so a refreshed token is
            // picked up on the retry.
            let (auth_name, auth_value) = self.credentials.header().await?;
            let request = HttpRequest {
                method: method.clone(),
                url: url.to_string(),
                headers: vec![
                    ("content-type", "application/json".to_string()),
                    (auth_name, auth_value),
                ],
                body: body.clone(),
            };

            let response = self.executor.execute(request).await?;

            match response.status {
                200..=299 => {
                    if response.body.trim().is_empty() {
                        return Ok(serde_json::Value::Null);
                    }
                    return serde_json::from_str(&response.body).map_err(Error::Json);
                }
                429 | 500..=599 => {
                    attempts += 1;
                    if attempts >= MAX_ATTEMPTS {
                        return Err(Error::Transport {
                            status: response.status,
                            body: response.body,
                            attempts,
                        });
                    }
                    let delay = Duration::from_secs(1u64 << (attempts - 1));
                    if response.status == 429 {
                        log::warn!(
                            "rate limit reached, retrying in {}s (attempt {attempts})",
                            delay.as_secs()
                        );
                    } else {
                        log::warn!(
                            "server error {}, retrying in {}s (attempt {attempts})",
                            response.status,
                            delay.as_secs()
                        );
                    }
                    sleep(delay).await;
                }
                401 | 403 if self.credentials.is_refreshable() && !refreshed => {
                    // One refresh per logical call; does not consume a
                    // backoff slot.
                    log::debug!("authorization failed with {}, refreshing token", response.status);
                    refreshed = true;
                    self.credentials.refresh().await?;
                }
                status => {
                    return Err(Error::Transport {
                        status,
                        body: response.body,
                        attempts: attempts + 1,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_parses_json_body() {
        let executor = ScriptedExecutor::new(vec![(200, r#"{"ok": true}"#)]);
        let transport =
            Transport::with_executor(Credentials::api_key("k"), executor.clone());

        let value = transport
            .send(Method::POST, "http://test/models/m:generateContent", None)
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(executor.request_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_success_body_maps_to_null() {
        let executor = ScriptedExecutor::new(vec![(200, "")]);
        let transport = Transport::with_executor(Credentials::api_key("k"), executor);

        let value = transport
            .send(Method::DELETE, "http://test/cachedContents/c1", None)
            .await
            .unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_immediately() {
        let executor = ScriptedExecutor::new(vec![(400, "bad request")]);
        let transport =
            Transport::with_executor(Credentials::api_key("k"), executor.clone());

        let err = transport
            .send(Method::POST, "http://test/models/m:generateContent", None)
            .await
            .unwrap_err();
        match err {
            Error::Transport {
                status,
                body,
                attempts,
            } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad request");
                assert_eq!(attempts, 1);
            }
            other => panic!("expected transport error, got {other}"),
        }
        assert_eq!(executor.request_count(), 1);
    }

    #[tokio::test]
    async fn test_auth_header_placement() {
        let executor = ScriptedExecutor::new(vec![(200, "{}")]);
        let transport =
            Transport::with_executor(Credentials::api_key("secret"), executor.clone());

        transport
            .send(Method::POST, "http://test/models/m:generateContent", None)
            .await
            .unwrap();

        let requests = executor.requests();
        assert!(
            requests[0]
                .headers
                .iter()
                .any(|(name, value)| *name == "x-goog-api-key" && value == "secret")
        );
    }
}
