//! Core types for the Gemini Chat SDK
//!
//! Wire-level request/response types for the `generateContent` and
//! `countTokens` endpoints, plus the [`ChatOptions`] builder used to
//! configure a [`crate::ChatSession`].
//!
//! All wire types serialize with the API's camelCase field names via serde
//! attributes; nothing here is hand-encoded.

use crate::config::Credentials;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Function,
    System,
}

/// One atomic content unit within a turn.
///
/// Externally tagged so each variant serializes under its wire key:
/// `{"text": ...}`, `{"functionCall": {...}}`, `{"functionResponse": {...}}`,
/// and so on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(Blob),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
    ExecutableCode(ExecutableCode),
    CodeExecutionResult(CodeExecutionResult),
}

impl Part {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    /// Create an inline-data part from base64 data and a mime type
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData(Blob {
            mime_type: mime_type.into(),
            data: data.into(),
        })
    }

    pub fn is_function_response(&self) -> bool {
        matches!(self, Part::FunctionResponse(_))
    }
}

/// Raw bytes (base64) with a mime type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// A function call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub args: serde_json::Value,
}

/// The result of a local function invocation, echoed back to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

/// Code the model generated for execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableCode {
    pub language: String,
    pub code: String,
}

/// Output from executing model-generated code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecutionResult {
    pub outcome: String,
    pub output: String,
}

/// One role-tagged turn in a conversation.
///
/// The role is optional on the wire (responses may omit it); history turns
/// always carry one. Invariants over seeded histories are enforced by
/// [`crate::validate_history`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role),
            parts,
        }
    }

    /// A user turn with the given parts
    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    /// A model turn with the given parts
    pub fn model(parts: Vec<Part>) -> Self {
        Self::new(Role::Model, parts)
    }

    /// A function-result turn with the given parts
    pub fn function(parts: Vec<Part>) -> Self {
        Self::new(Role::Function, parts)
    }

    /// A system turn with the given parts
    pub fn system(parts: Vec<Part>) -> Self {
        Self::new(Role::System, parts)
    }

    /// A user turn wrapping plain text
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::text(text)])
    }

    /// A model turn wrapping plain text
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::model(vec![Part::text(text)])
    }
}

/// Generation parameters, passed through to the API verbatim
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

/// Safety setting, passed through verbatim
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Wire schema of a single declared function parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemSchema>,
}

/// Item type of an array-typed parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemSchema {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Wire schema of a declared function's parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// Wire form of a function declaration: only name, description, and the
/// parameter schema travel to the model. Dispatch metadata stays local.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDeclarationSchema {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// A tools entry aggregating all declared functions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclarationSchema>,
}

/// Request body for the `generateContent` endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_content: Option<String>,
}

/// Request body for the `countTokens` endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensRequest {
    pub contents: Vec<Content>,
}

/// Response body of the `countTokens` endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    pub total_tokens: u32,
    #[serde(default)]
    pub cached_content_token_count: Option<u32>,
}

/// Why a candidate stopped generating.
///
/// Everything except `Stop` counts as a bad termination for the text
/// accessor. Unknown future values deserialize as `Other`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    #[serde(rename = "FINISH_REASON_UNSPECIFIED")]
    Unspecified,
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Blocklist,
    ProhibitedContent,
    Spii,
    MalformedFunctionCall,
    #[serde(other)]
    Other,
}

impl FinishReason {
    /// True when this reason means the candidate's content is not usable
    /// as a final answer.
    pub fn is_bad(&self) -> bool {
        !matches!(self, FinishReason::Stop)
    }
}

/// One generated candidate
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<FinishReason>,
    #[serde(default)]
    pub index: Option<u32>,
}

/// Feedback on the prompt itself (present when the prompt was blocked)
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Option<serde_json::Value>,
}

/// Token accounting reported by the API
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<u32>,
    #[serde(default)]
    pub candidates_token_count: Option<u32>,
    #[serde(default)]
    pub total_token_count: Option<u32>,
    #[serde(default)]
    pub cached_content_token_count: Option<u32>,
}

/// Parsed response of the `generateContent` endpoint.
///
/// Derived accessors (`text()`, `function_calls()`, `structured()`) are
/// implemented in the response module.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// Options for configuring a chat session
#[derive(Clone)]
pub struct ChatOptions {
    /// Model name (e.g. "gemini-1.5-flash")
    pub model: String,

    /// Credential source placed on every request
    pub credentials: Credentials,

    /// API base URL
    pub base_url: String,

    /// System instruction sent with every request
    pub system_instruction: Option<Content>,

    /// Generation parameters, passed through verbatim
    pub generation_config: GenerationConfig,

    /// Safety settings, passed through verbatim
    pub safety_settings: Vec<SafetySetting>,

    /// Tool config, passed through verbatim
    pub tool_config: Option<serde_json::Value>,

    /// Handle of a cached-content resource to attach to requests
    pub cached_content: Option<String>,

    /// Safety bound on the function-calling loop
    pub max_turns: u32,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl std::fmt::Debug for ChatOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOptions")
            .field("model", &self.model)
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("system_instruction", &self.system_instruction)
            .field("generation_config", &self.generation_config)
            .field("max_turns", &self.max_turns)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChatOptions {
    /// Create a new builder for ChatOptions
    pub fn builder() -> ChatOptionsBuilder {
        ChatOptionsBuilder::default()
    }
}

/// Builder for ChatOptions
#[derive(Default)]
pub struct ChatOptionsBuilder {
    model: Option<String>,
    credentials: Option<Credentials>,
    base_url: Option<String>,
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
    tool_config: Option<serde_json::Value>,
    cached_content: Option<String>,
    max_turns: Option<u32>,
    timeout: Option<u64>,
}

impl ChatOptionsBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::api_key(key));
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set a plain-text system instruction
    pub fn system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::system(vec![Part::text(text)]));
        self
    }

    /// Set a pre-shaped system instruction. A missing role defaults to
    /// `system`.
    pub fn system_instruction_content(mut self, mut content: Content) -> Self {
        content.role.get_or_insert(Role::System);
        self.system_instruction = Some(content);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.generation_config.temperature = Some(temperature);
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.generation_config.max_output_tokens = Some(tokens);
        self
    }

    pub fn candidate_count(mut self, count: u32) -> Self {
        self.generation_config.candidate_count = Some(count);
        self
    }

    pub fn stop_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.generation_config.stop_sequences.push(sequence.into());
        self
    }

    pub fn response_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.generation_config.response_mime_type = Some(mime_type.into());
        self
    }

    pub fn response_schema(mut self, schema: serde_json::Value) -> Self {
        self.generation_config.response_schema = Some(schema);
        self
    }

    pub fn generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }

    pub fn safety_setting(mut self, category: impl Into<String>, threshold: impl Into<String>) -> Self {
        self.safety_settings.push(SafetySetting {
            category: category.into(),
            threshold: threshold.into(),
        });
        self
    }

    pub fn tool_config(mut self, config: serde_json::Value) -> Self {
        self.tool_config = Some(config);
        self
    }

    pub fn cached_content(mut self, name: impl Into<String>) -> Self {
        self.cached_content = Some(name.into());
        self
    }

    pub fn max_turns(mut self, turns: u32) -> Self {
        self.max_turns = Some(turns);
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> crate::Result<ChatOptions> {
        let model = self
            .model
            .ok_or_else(|| crate::Error::config("model is required"))?;

        let credentials = self
            .credentials
            .ok_or_else(|| crate::Error::config("credentials are required (api_key or credentials)"))?;

        Ok(ChatOptions {
            model,
            credentials,
            base_url: self
                .base_url
                .unwrap_or_else(|| crate::config::DEFAULT_BASE_URL.to_string()),
            system_instruction: self.system_instruction,
            generation_config: self.generation_config,
            safety_settings: self.safety_settings,
            tool_config: self.tool_config,
            cached_content: self.cached_content,
            max_turns: self.max_turns.unwrap_or(25),
            timeout: self.timeout.unwrap_or(60),
        })
    }
}
