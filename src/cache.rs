//! Content cache management
//!
//! CRUD operations against the `cachedContents` resource, sharing the
//! transport (and therefore the retry contract) with the chat session.
//! Create a cache from large context once, then attach its name to a
//! session via `ChatOptions::cached_content` to avoid resending the
//! context on every turn.

use crate::config::Credentials;
use crate::transport::{HttpExecutor, Transport};
use crate::types::{Content, Role, Tool};
use crate::{Error, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A cached-content resource as stored by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<serde_json::Value>,
}

/// Inputs for creating a cache
#[derive(Debug, Clone, Default)]
pub struct CacheParams {
    /// Model the cache is bound to (required); a bare name gets a
    /// `models/` prefix
    pub model: Option<String>,
    pub display_name: Option<String>,
    pub contents: Vec<Content>,
    pub system_instruction: Option<Content>,
    /// Time to live in seconds; mutually exclusive with `expire_time`
    pub ttl_seconds: Option<u64>,
    /// RFC 3339 expiry timestamp; mutually exclusive with `ttl_seconds`
    pub expire_time: Option<String>,
}

/// Inputs for updating a cache's expiry
#[derive(Debug, Clone, Default)]
pub struct UpdateCacheParams {
    pub ttl_seconds: Option<u64>,
    pub expire_time: Option<String>,
    /// camelCase property names; converted to snake_case for the
    /// `update_mask` query parameter
    pub update_mask: Vec<String>,
}

/// Response of the list operation
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheListResponse {
    #[serde(default)]
    pub cached_contents: Vec<CachedContent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Client for the `cachedContents` resource
pub struct CacheManager {
    transport: Transport,
    base_url: String,
}

impl CacheManager {
    /// Manager backed by a real HTTP client against the Studio endpoint
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(credentials, DEFAULT_TIMEOUT_SECS)?,
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Manager over a caller-supplied executor (used by tests)
    pub fn with_executor(credentials: Credentials, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            transport: Transport::with_executor(credentials, executor),
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (e.g. for a Vertex endpoint)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Upload a new content cache
    pub async fn create(&self, params: CacheParams) -> Result<CachedContent> {
        if params.ttl_seconds.is_some() && params.expire_time.is_some() {
            return Err(Error::validation(
                "cannot specify both ttl_seconds and expire_time when creating a content cache",
            ));
        }
        let model = params
            .model
            .ok_or_else(|| Error::validation("cached content must specify a model"))?;
        let model = if model.contains('/') {
            model
        } else {
            // Bare names are assumed to be non-tuned models.
            format!("models/{model}")
        };

        let mut system_instruction = params.system_instruction;
        if let Some(instruction) = system_instruction.as_mut() {
            instruction.role.get_or_insert(Role::System);
        }

        let body = CachedContent {
            name: None,
            display_name: params.display_name,
            model: Some(model),
            contents: params.contents,
            system_instruction,
            tools: Vec::new(),
            ttl: params.ttl_seconds.map(|seconds| format!("{seconds}s")),
            expire_time: params.expire_time,
            create_time: None,
            update_time: None,
            usage_metadata: None,
        };

        let raw = self
            .transport
            .send(
                Method::POST,
                &self.collection_url(),
                Some(serde_json::to_value(&body)?),
            )
            .await?;
        serde_json::from_value(raw).map_err(Error::Json)
    }

    /// List uploaded content caches
    pub async fn list(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<CacheListResponse> {
        let mut url = self.collection_url();
        let mut params = Vec::new();
        if let Some(size) = page_size {
            params.push(format!("pageSize={size}"));
        }
        if let Some(token) = page_token {
            params.push(format!("pageToken={token}"));
        }
        if !params.is_empty() {
            url = format!("{url}?{}", params.join("&"));
        }
        let raw = self.transport.send(Method::GET, &url, None).await?;
        serde_json::from_value(raw).map_err(Error::Json)
    }

    /// Fetch one content cache by name
    pub async fn get(&self, name: &str) -> Result<CachedContent> {
        let url = self.resource_url(name)?;
        let raw = self.transport.send(Method::GET, &url, None).await?;
        serde_json::from_value(raw).map_err(Error::Json)
    }

    /// Update a cache's expiry
    pub async fn update(&self, name: &str, params: UpdateCacheParams) -> Result<CachedContent> {
        let mut url = self.resource_url(name)?;
        if !params.update_mask.is_empty() {
            let mask: Vec<String> = params
                .update_mask
                .iter()
                .map(|property| camel_to_snake(property))
                .collect();
            url = format!("{url}?update_mask={}", mask.join(","));
        }
        let body = CachedContent {
            ttl: params.ttl_seconds.map(|seconds| format!("{seconds}s")),
            expire_time: params.expire_time,
            ..CachedContent::default()
        };
        let raw = self
            .transport
            .send(Method::PATCH, &url, Some(serde_json::to_value(&body)?))
            .await?;
        serde_json::from_value(raw).map_err(Error::Json)
    }

    /// Delete a content cache by name
    pub async fn delete(&self, name: &str) -> Result<()> {
        let url = self.resource_url(name)?;
        self.transport.send(Method::DELETE, &url, None).await?;
        Ok(())
    }

    fn collection_url(&self) -> String {
        format!("{}/cachedContents", self.base_url.trim_end_matches('/'))
    }

    fn resource_url(&self, name: &str) -> Result<String> {
        Ok(format!(
            "{}/{}",
            self.collection_url(),
            parse_cache_name(name)?
        ))
    }
}

/// Accept `cachedContents/<id>` or a bare `<id>`; reject empty names
fn parse_cache_name(name: &str) -> Result<&str> {
    let bare = name.strip_prefix("cachedContents/").unwrap_or(name);
    if bare.is_empty() {
        return Err(Error::validation(format!(
            "invalid cache name `{name}`; must be `cachedContents/<name>` or `<name>`"
        )));
    }
    Ok(bare)
}

fn camel_to_snake(property: &str) -> String {
    let mut out = String::with_capacity(property.len());
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cache_name() {
        assert_eq!(parse_cache_name("cachedContents/abc").unwrap(), "abc");
        assert_eq!(parse_cache_name("abc").unwrap(), "abc");
        assert!(parse_cache_name("").is_err());
        assert!(parse_cache_name("cachedContents/").is_err());
    }

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("ttlSeconds"), "ttl_seconds");
        assert_eq!(camel_to_snake("expireTime"), "expire_time");
        assert_eq!(camel_to_snake("ttl"), "ttl");
    }

    #[tokio::test]
    async fn test_create_rejects_ttl_and_expire_time_together() {
        let manager = CacheManager::with_executor(
            Credentials::api_key("k"),
            crate::transport::ScriptedExecutor::new(Vec::new()),
        );
        let result = manager
            .create(CacheParams {
                model: Some("gemini-1.5-flash".to_string()),
                ttl_seconds: Some(300),
                expire_time: Some("2031-01-01T00:00:00Z".to_string()),
                ..CacheParams::default()
            })
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_requires_model() {
        let manager = CacheManager::with_executor(
            Credentials::api_key("k"),
            crate::transport::ScriptedExecutor::new(Vec::new()),
        );
        let result = manager.create(CacheParams::default()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
