//! Multi-turn chat sessions with function-calling orchestration
//!
//! This module is the heart of the SDK: a [`ChatSession`] owns the
//! conversation history and the function registry, and
//! [`ChatSession::send_message`] drives the protocol loop against the
//! `generateContent` endpoint.
//!
//! # The conversation loop
//!
//! ```text
//! send_message(input)
//!     │
//!     ├─> format input into a content turn (unless pre-built)
//!     │
//!     ├─> POST history + new turn (+ declared tools) to generateContent
//!     │
//!     ├─> response requests a function call?
//!     │   ├─ no  ──> append turn + model answer to history, return response
//!     │   └─ yes ──> look up the function by name in the registry
//!     │       ├─ terminal   ──> invoke it, return the response, stop
//!     │       ├─ args-only  ──> return the call's arguments, stop
//!     │       └─ otherwise  ──> invoke it positionally, append the
//!     │                         functionCall and functionResponse turns,
//!     │                         loop without new user input
//!     │
//!     └─> loop bounded by max_turns; exceeding it is an error
//! ```
//!
//! The loop is strictly sequential: no second request is issued before the
//! prior dispatch and history update have completed. One session owns its
//! history and registry exclusively; nothing is shared across sessions.
//!
//! # Example
//!
//! ```rust,no_run
//! use gemini_chat::{ChatOptions, ChatSession, FunctionDeclaration, FunctionReturn};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> gemini_chat::Result<()> {
//!     let options = ChatOptions::builder()
//!         .model("gemini-1.5-flash")
//!         .api_key("...")
//!         .system_instruction("You help manage a spreadsheet.")
//!         .build()?;
//!
//!     let mut chat = ChatSession::new(options)?;
//!
//!     let declaration = FunctionDeclaration::builder("get_weather")
//!         .description("Get current weather for a city")
//!         .parameter("city", "string", "The city to look up")
//!         .build()?;
//!     chat.register_function(declaration, |args| async move {
//!         let city = args[0].as_str().unwrap_or("unknown");
//!         Ok(FunctionReturn::Structured(json!({"city": city, "forecast": "sunny"})))
//!     })?;
//!
//!     let outcome = chat.send_message("What's the weather in Paris?").await?;
//!     println!("{}", outcome.text()?);
//!     Ok(())
//! }
//! ```

use crate::format::{MessageInput, format_content};
use crate::tools::{FunctionDeclaration, FunctionRegistry, FunctionReturn};
use crate::transport::{HttpExecutor, Transport};
use crate::types::{
    ChatOptions, Content, CountTokensRequest, CountTokensResponse, FunctionResponse,
    GenerateContentRequest, GenerateContentResponse, Part, Role,
};
use crate::{Error, Result};
use reqwest::Method;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;

/// Substituted when a dispatched function had nothing to return
const EMPTY_RESULT_MARKER: &str =
    "the function has been successfully executed but has nothing to return";

/// What a completed `send_message` call produced
#[derive(Debug)]
pub enum ChatOutcome {
    /// The model's final (decorated) response
    Complete(GenerateContentResponse),
    /// The raw arguments of an args-only function call; no local code ran
    Arguments(Value),
}

impl ChatOutcome {
    /// The final response, if this outcome carries one
    pub fn response(&self) -> Option<&GenerateContentResponse> {
        match self {
            ChatOutcome::Complete(response) => Some(response),
            ChatOutcome::Arguments(_) => None,
        }
    }

    /// The returned arguments, if this outcome carries them
    pub fn arguments(&self) -> Option<&Value> {
        match self {
            ChatOutcome::Arguments(args) => Some(args),
            ChatOutcome::Complete(_) => None,
        }
    }

    /// Shortcut for `response().text()`
    pub fn text(&self) -> Result<String> {
        match self {
            ChatOutcome::Complete(response) => response.text(),
            ChatOutcome::Arguments(_) => Err(Error::validation(
                "outcome carries function arguments, not a model response",
            )),
        }
    }
}

/// Validate a caller-seeded history against the provider's turn rules.
///
/// Checks that every role is allowed in history, the first turn is a user
/// turn, every turn has at least one part, part kinds are permitted for
/// their role, and each turn's role is a legal successor of the previous
/// one. Errors cite the offending turn index.
pub fn validate_history(history: &[Content]) -> Result<()> {
    let mut previous: Option<Role> = None;
    for (index, turn) in history.iter().enumerate() {
        let role = turn
            .role
            .ok_or_else(|| Error::validation(format!("turn {index} is missing a role")))?;

        if !matches!(role, Role::User | Role::Model | Role::Function) {
            return Err(Error::validation(format!(
                "turn {index} has role `{role:?}`, which is not allowed in a history"
            )));
        }
        if index == 0 && role != Role::User {
            return Err(Error::validation(
                "turn 0 must have role `user`".to_string(),
            ));
        }
        if turn.parts.is_empty() {
            return Err(Error::validation(format!(
                "turn {index} must contain at least one part"
            )));
        }
        for part in &turn.parts {
            if !part_allowed(role, part) {
                return Err(Error::validation(format!(
                    "turn {index} carries a part kind not permitted for role `{role:?}`"
                )));
            }
        }
        if let Some(previous_role) = previous
            && !may_follow(role, previous_role)
        {
            return Err(Error::validation(format!(
                "turn {index}: role `{role:?}` may not follow `{previous_role:?}`"
            )));
        }
        previous = Some(role);
    }
    Ok(())
}

fn part_allowed(role: Role, part: &Part) -> bool {
    match role {
        Role::User => matches!(part, Part::Text(_) | Part::InlineData(_)),
        Role::Model => matches!(
            part,
            Part::Text(_)
                | Part::FunctionCall(_)
                | Part::ExecutableCode(_)
                | Part::CodeExecutionResult(_)
                | Part::InlineData(_)
        ),
        Role::Function => matches!(part, Part::FunctionResponse(_)),
        Role::System => false,
    }
}

fn may_follow(role: Role, previous: Role) -> bool {
    match role {
        Role::User => matches!(previous, Role::Model),
        Role::Model => matches!(previous, Role::User | Role::Function),
        Role::Function => matches!(previous, Role::Model),
        Role::System => false,
    }
}

/// Stateful chat session owning history and the function registry.
///
/// Created from [`ChatOptions`]; optionally seeded with a pre-validated
/// history via [`ChatSession::seed_history`]. All mutation goes through
/// [`ChatSession::send_message`].
pub struct ChatSession {
    options: ChatOptions,
    transport: Transport,
    history: Vec<Content>,
    registry: FunctionRegistry,
}

impl ChatSession {
    /// Create a session backed by a real HTTP client
    pub fn new(options: ChatOptions) -> Result<Self> {
        let transport = Transport::new(options.credentials.clone(), options.timeout)?;
        Ok(Self {
            options,
            transport,
            history: Vec::new(),
            registry: FunctionRegistry::new(),
        })
    }

    /// Create a session over a caller-supplied executor (used by tests to
    /// script responses)
    pub fn with_executor(options: ChatOptions, executor: Arc<dyn HttpExecutor>) -> Self {
        let transport = Transport::with_executor(options.credentials.clone(), executor);
        Self {
            options,
            transport,
            history: Vec::new(),
            registry: FunctionRegistry::new(),
        }
    }

    /// Replace the history with a caller-supplied one, after validation
    pub fn seed_history(&mut self, history: Vec<Content>) -> Result<()> {
        validate_history(&history)?;
        self.history = history;
        Ok(())
    }

    /// The conversation history accumulated so far
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Drop all accumulated history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Declare a function the model may call, with its local handler
    pub fn register_function<F, Fut>(
        &mut self,
        declaration: FunctionDeclaration,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FunctionReturn>> + Send + 'static,
    {
        self.registry.register(declaration, handler)
    }

    /// Send a message and drive the function-calling loop to completion.
    ///
    /// Accepts a plain string, a part list, or a pre-built turn (see
    /// [`MessageInput`]). Returns when the model produces a final answer,
    /// a terminal function is called, or an args-only function is called;
    /// fails with [`Error::MaxTurnsExceeded`] if the model keeps
    /// requesting calls past the configured bound.
    pub async fn send_message(&mut self, input: impl Into<MessageInput>) -> Result<ChatOutcome> {
        let mut pending = Some(format_content(input.into())?);
        let max_turns = self.options.max_turns.max(1);

        for _ in 0..max_turns {
            let request = self.build_request(pending.as_ref());
            let raw = self
                .transport
                .send(
                    Method::POST,
                    &self.endpoint("generateContent"),
                    Some(serde_json::to_value(&request)?),
                )
                .await?;
            let response: GenerateContentResponse = serde_json::from_value(raw)?;
            response.log_diagnostics();

            let call = response
                .function_calls()
                .and_then(|calls| calls.first().map(|call| (*call).clone()));

            let Some(call) = call else {
                if !response.has_usable_content() {
                    // Fully blocked: leave history untouched so a retry
                    // with the same session stays consistent, and hand the
                    // response back for inspection.
                    log::warn!("response carries no usable content and no function call");
                    return Ok(ChatOutcome::Complete(response));
                }
                if let Some(turn) = pending.take() {
                    self.history.push(turn);
                }
                if let Some(mut answer) = response
                    .candidates
                    .first()
                    .and_then(|candidate| candidate.content.clone())
                {
                    // The wire response may omit the role; history needs one.
                    answer.role.get_or_insert(Role::Model);
                    self.history.push(answer);
                }
                return Ok(ChatOutcome::Complete(response));
            };

            // Record the turn that provoked the call before dispatching,
            // so the call-and-response round trip lands in history.
            if let Some(turn) = pending.take() {
                self.history.push(turn);
            }

            let function = self.registry.get(&call.name).ok_or_else(|| {
                Error::dispatch(format!("function `{}` is not registered", call.name))
            })?;

            if function.declaration().is_terminal() {
                function.invoke(&call.args).await?;
                log::info!(
                    "conversation stopped: terminal function `{}` was called",
                    call.name
                );
                return Ok(ChatOutcome::Complete(response));
            }

            if function.declaration().is_args_only() {
                log::info!(
                    "conversation stopped: `{}` returns arguments only, no function was called",
                    call.name
                );
                return Ok(ChatOutcome::Arguments(call.args.clone()));
            }

            let result = function.invoke(&call.args).await?;
            log::debug!("function `{}` called by the model", call.name);

            self.history
                .push(Content::model(vec![Part::FunctionCall(call.clone())]));
            self.history
                .push(Content::function(vec![Part::FunctionResponse(
                    FunctionResponse {
                        name: call.name.clone(),
                        response: continuation_payload(result),
                    },
                )]));
            // Loop continues with no new user input; the updated history
            // carries the round trip.
        }

        Err(Error::MaxTurnsExceeded { limit: max_turns })
    }

    /// Count tokens for the current history plus the given input
    pub async fn count_tokens(
        &self,
        input: impl Into<MessageInput>,
    ) -> Result<CountTokensResponse> {
        let mut contents = self.history.clone();
        contents.push(format_content(input.into())?);
        let request = CountTokensRequest { contents };
        let raw = self
            .transport
            .send(
                Method::POST,
                &self.endpoint("countTokens"),
                Some(serde_json::to_value(&request)?),
            )
            .await?;
        serde_json::from_value(raw).map_err(Error::Json)
    }

    fn build_request(&self, pending: Option<&Content>) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        if let Some(turn) = pending {
            contents.push(turn.clone());
        }
        let tools = if self.registry.is_empty() {
            Vec::new()
        } else {
            vec![self.registry.to_tool()]
        };
        GenerateContentRequest {
            contents,
            system_instruction: self.options.system_instruction.clone(),
            generation_config: Some(self.options.generation_config.clone()),
            safety_settings: self.options.safety_settings.clone(),
            tools,
            tool_config: self.options.tool_config.clone(),
            cached_content: self.options.cached_content.clone(),
        }
    }

    fn endpoint(&self, operation: &str) -> String {
        let base = self.options.base_url.trim_end_matches('/');
        if self.options.model.contains('/') {
            format!("{base}/{}:{operation}", self.options.model)
        } else {
            format!("{base}/models/{}:{operation}", self.options.model)
        }
    }
}

/// Normalize a function's result into the wire payload echoed back to the
/// model
fn continuation_payload(result: FunctionReturn) -> Value {
    match result {
        FunctionReturn::Structured(value) => value,
        FunctionReturn::Text(text) => json!({ "content": text }),
        FunctionReturn::Empty => json!({ "content": EMPTY_RESULT_MARKER }),
    }
}
