//! Request formatting
//!
//! Normalizes the heterogeneous inputs a caller may hand to
//! [`crate::ChatSession::send_message`] — a plain string, a list of parts,
//! or an already-structured turn — into the provider's content/role schema.
//!
//! The one non-obvious rule lives here: a turn either carries function
//! responses or ordinary content, never both. An all-function-response
//! input gets role `function`; everything else gets role `user`.

use crate::types::{Content, Part, Role};
use crate::{Error, Result};

/// Caller input accepted by `send_message` and `count_tokens`
#[derive(Debug, Clone)]
pub enum MessageInput {
    /// Plain prompt text
    Text(String),
    /// An ordered mix of strings and pre-built parts
    Parts(Vec<PartInput>),
    /// An already-structured turn, passed through without reformatting
    /// (used for pre-built function-response turns)
    Content(Content),
}

/// One element of a [`MessageInput::Parts`] list
#[derive(Debug, Clone)]
pub enum PartInput {
    Text(String),
    Part(Part),
}

impl From<&str> for MessageInput {
    fn from(text: &str) -> Self {
        MessageInput::Text(text.to_string())
    }
}

impl From<String> for MessageInput {
    fn from(text: String) -> Self {
        MessageInput::Text(text)
    }
}

impl From<Vec<PartInput>> for MessageInput {
    fn from(parts: Vec<PartInput>) -> Self {
        MessageInput::Parts(parts)
    }
}

impl From<Content> for MessageInput {
    fn from(content: Content) -> Self {
        MessageInput::Content(content)
    }
}

impl From<&str> for PartInput {
    fn from(text: &str) -> Self {
        PartInput::Text(text.to_string())
    }
}

impl From<String> for PartInput {
    fn from(text: String) -> Self {
        PartInput::Text(text)
    }
}

impl From<Part> for PartInput {
    fn from(part: Part) -> Self {
        PartInput::Part(part)
    }
}

/// Normalize caller input into a single content turn.
///
/// - A string becomes one text part under role `user`.
/// - A part list is collected in order; function-response parts must not
///   mix with any other kind, and the list must not be empty.
/// - A pre-built turn passes through untouched.
pub fn format_content(input: MessageInput) -> Result<Content> {
    match input {
        MessageInput::Text(text) => Ok(Content::user(vec![Part::text(text)])),
        MessageInput::Content(content) => Ok(content),
        MessageInput::Parts(items) => {
            let parts: Vec<Part> = items
                .into_iter()
                .map(|item| match item {
                    PartInput::Text(text) => Part::text(text),
                    PartInput::Part(part) => part,
                })
                .collect();

            let function_responses = parts.iter().filter(|p| p.is_function_response()).count();

            if parts.is_empty() {
                return Err(Error::validation("no content supplied"));
            }
            if function_responses > 0 && function_responses < parts.len() {
                return Err(Error::validation(
                    "cannot mix function responses with other content in one turn",
                ));
            }

            let role = if function_responses == parts.len() {
                Role::Function
            } else {
                Role::User
            };
            Ok(Content::new(role, parts))
        }
    }
}

/// Normalize a system instruction.
///
/// A string becomes `{role: system, parts: [{text}]}`; a pre-shaped turn
/// passes through with a missing role defaulted to `system`.
pub fn format_system_instruction(input: MessageInput) -> Result<Content> {
    match input {
        MessageInput::Text(text) => Ok(Content::system(vec![Part::text(text)])),
        MessageInput::Content(mut content) => {
            content.role.get_or_insert(Role::System);
            Ok(content)
        }
        MessageInput::Parts(items) => {
            let parts: Vec<Part> = items
                .into_iter()
                .map(|item| match item {
                    PartInput::Text(text) => Part::text(text),
                    PartInput::Part(part) => part,
                })
                .collect();
            if parts.is_empty() {
                return Err(Error::validation("no content supplied"));
            }
            Ok(Content::system(parts))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionResponse, Part};
    use serde_json::json;

    #[test]
    fn test_plain_string_becomes_user_text_turn() {
        let content = format_content("Hello".into()).unwrap();
        assert_eq!(content.role, Some(Role::User));
        assert_eq!(content.parts, vec![Part::text("Hello")]);
    }

    #[test]
    fn test_part_list_preserves_order() {
        let content = format_content(MessageInput::Parts(vec![
            "look at this".into(),
            Part::inline_data("image/png", "aGk=").into(),
        ]))
        .unwrap();
        assert_eq!(content.role, Some(Role::User));
        assert_eq!(content.parts.len(), 2);
        assert_eq!(content.parts[0], Part::text("look at this"));
    }

    #[test]
    fn test_all_function_responses_get_function_role() {
        let content = format_content(MessageInput::Parts(vec![
            Part::FunctionResponse(FunctionResponse {
                name: "get_weather".to_string(),
                response: json!({"content": "sunny"}),
            })
            .into(),
        ]))
        .unwrap();
        assert_eq!(content.role, Some(Role::Function));
    }

    #[test]
    fn test_mixed_parts_rejected() {
        let result = format_content(MessageInput::Parts(vec![
            Part::FunctionResponse(FunctionResponse {
                name: "get_weather".to_string(),
                response: json!({"content": "sunny"}),
            })
            .into(),
            "and some text".into(),
        ]));
        assert!(matches!(result, Err(crate::Error::Validation(_))));
    }

    #[test]
    fn test_empty_parts_rejected() {
        let result = format_content(MessageInput::Parts(Vec::new()));
        assert!(matches!(result, Err(crate::Error::Validation(_))));
    }

    #[test]
    fn test_prebuilt_content_passes_through() {
        let turn = Content::function(vec![Part::FunctionResponse(FunctionResponse {
            name: "f".to_string(),
            response: json!({"content": "done"}),
        })]);
        let content = format_content(turn.clone().into()).unwrap();
        assert_eq!(content, turn);
    }

    #[test]
    fn test_system_instruction_from_string() {
        let content = format_system_instruction("You are a cat.".into()).unwrap();
        assert_eq!(content.role, Some(Role::System));
        assert_eq!(content.parts, vec![Part::text("You are a cat.")]);
    }

    #[test]
    fn test_system_instruction_defaults_missing_role() {
        let shaped = Content {
            role: None,
            parts: vec![Part::text("be terse")],
        };
        let content = format_system_instruction(shaped.into()).unwrap();
        assert_eq!(content.role, Some(Role::System));
    }

    #[test]
    fn test_system_instruction_keeps_existing_role() {
        let shaped = Content::user(vec![Part::text("odd but explicit")]);
        let content = format_system_instruction(shaped.into()).unwrap();
        assert_eq!(content.role, Some(Role::User));
    }
}
