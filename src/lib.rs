//! # Gemini Chat SDK
//!
//! A Rust client for the Google Gemini `generateContent` API with
//! multi-turn chat, function calling, token counting, and content caching.
//!
//! ## Overview
//!
//! The SDK wraps one wire contract — `generateContent` / `countTokens`
//! JSON-over-HTTPS — and layers a conversation engine on top of it. The
//! engine owns turn history, declares caller-registered functions to the
//! model, dispatches requested calls against local handlers, and keeps
//! looping until the model produces a final answer.
//!
//! ## Key Features
//!
//! - **Multi-Turn Chat**: Stateful sessions with validated turn history
//! - **Function Calling**: Declare typed functions; the engine dispatches
//!   calls positionally and feeds results back automatically
//! - **Terminal & Args-Only Functions**: Declarations can stop the loop or
//!   hand raw arguments back to the caller
//! - **Retry Logic**: Exponential backoff on rate limits and server errors,
//!   with one-shot token refresh on authorization failures
//! - **Structured Output**: JSON-mode accessors over responses
//! - **Content Caching**: CRUD client for the `cachedContents` resource
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gemini_chat::{ChatOptions, ChatSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ChatOptions::builder()
//!         .model("gemini-1.5-flash")
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!
//!     let mut chat = ChatSession::new(options)?;
//!
//!     let outcome = chat.send_message("Write a haiku about spreadsheets.").await?;
//!     println!("{}", outcome.text()?);
//!
//!     // History is maintained across turns
//!     let outcome = chat.send_message("Now make it rhyme.").await?;
//!     println!("{}", outcome.text()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Function Calling
//!
//! ```rust,no_run
//! use gemini_chat::{ChatOptions, ChatSession, FunctionDeclaration, FunctionReturn};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ChatOptions::builder()
//!         .model("gemini-1.5-flash")
//!         .api_key("...")
//!         .build()?;
//!     let mut chat = ChatSession::new(options)?;
//!
//!     let declaration = FunctionDeclaration::builder("set_light_values")
//!         .description("Set brightness and color temperature of a light")
//!         .parameter("brightness", "number", "Light level from 0 to 100")
//!         .parameter("color_temperature", "string", "daylight, cool, or warm")
//!         .build()?;
//!
//!     chat.register_function(declaration, |args| async move {
//!         // Arguments arrive positionally in declaration order.
//!         Ok(FunctionReturn::Structured(json!({
//!             "brightness": args[0].clone(),
//!             "colorTemperature": args[1].clone(),
//!         })))
//!     })?;
//!
//!     // The engine keeps calling functions until the model is done.
//!     let outcome = chat.send_message("Dim the lights to a cozy warm glow.").await?;
//!     println!("{}", outcome.text()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **chat**: Conversation engine — history, dispatch loop, turn validation
//! - **tools**: Function declarations, the dispatch registry, handler types
//! - **transport**: Retrying HTTP layer behind an executor seam
//! - **format**: Input normalization into the content/role schema
//! - **response**: Derived accessors over parsed responses
//! - **types**: Wire request/response types and session options
//! - **config**: Credentials, endpoints, environment helpers
//! - **cache**: Content-cache CRUD client
//! - **error**: Error taxonomy and the crate `Result` alias

/// Conversation engine: stateful sessions, the function-calling loop, and
/// history validation.
mod chat;

/// Credential sources, endpoint resolution, and environment helpers.
mod config;

/// Error types and conversions used across all public APIs.
mod error;

/// Input normalization into the provider's content/role schema.
mod format;

/// Derived accessors over `generateContent` responses.
mod response;

/// Function declarations, the dispatch registry, and handler types.
mod tools;

/// HTTP transport with retry/backoff and the executor seam.
mod transport;

/// Wire-level request/response types and session options.
mod types;

/// Content-cache CRUD client over the shared transport.
pub mod cache;

// --- Conversation Engine ---

pub use chat::{ChatOutcome, ChatSession, validate_history};

// --- Configuration ---

pub use config::{
    Credentials, DEFAULT_BASE_URL, TokenProvider, api_key_from_env, base_url_from_env,
    model_from_env, vertex_base_url,
};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Input Formatting ---

pub use format::{MessageInput, PartInput, format_content, format_system_instruction};

// --- Function System ---

pub use tools::{
    FunctionDeclaration, FunctionDeclarationBuilder, FunctionHandler, FunctionRegistry,
    FunctionReturn, RegisteredFunction,
};

// --- Transport ---

pub use transport::{
    HttpExecutor, HttpRequest, HttpResponse, MAX_ATTEMPTS, Method, ReqwestExecutor,
    ScriptedExecutor, Transport,
};

// --- Core Types ---

pub use types::{
    Blob, Candidate, ChatOptions, ChatOptionsBuilder, CodeExecutionResult, Content,
    CountTokensResponse, ExecutableCode, FinishReason, FunctionCall,
    FunctionDeclarationSchema, FunctionResponse, GenerateContentResponse, GenerationConfig,
    ItemSchema, ParameterSchema, Part, PromptFeedback, PropertySchema, Role, SafetySetting,
    Tool, UsageMetadata,
};

// --- Content Caching ---

pub use cache::{CacheListResponse, CacheManager, CacheParams, CachedContent, UpdateCacheParams};

/// Convenience module containing the most commonly used types and
/// functions. Import with `use gemini_chat::prelude::*;`.
pub mod prelude {
    pub use crate::{
        ChatOptions, ChatOutcome, ChatSession, Content, Credentials, Error, FunctionDeclaration,
        FunctionReturn, GenerateContentResponse, MessageInput, Part, Result, Role,
    };
}
