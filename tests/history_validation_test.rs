//! Tests for seeded-history validation through the public API

use gemini_chat::{
    ChatOptions, ChatSession, Content, Error, FunctionCall, FunctionResponse, Part,
    ScriptedExecutor, validate_history,
};
use serde_json::json;

fn session() -> ChatSession {
    let options = ChatOptions::builder()
        .model("gemini-1.5-flash")
        .api_key("test-key")
        .build()
        .unwrap();
    ChatSession::with_executor(options, ScriptedExecutor::new(Vec::new()))
}

#[test]
fn test_valid_chat_history_is_accepted() {
    let mut chat = session();
    chat.seed_history(vec![
        Content::user_text("Hello"),
        Content::model_text("Great to meet you. What would you like to know?"),
    ])
    .unwrap();
    assert_eq!(chat.history().len(), 2);
}

#[test]
fn test_valid_function_round_trip_is_accepted() {
    let history = vec![
        Content::user_text("Double 5 for me."),
        Content::model(vec![Part::FunctionCall(FunctionCall {
            name: "double".to_string(),
            args: json!({"input": 5}),
        })]),
        Content::function(vec![Part::FunctionResponse(FunctionResponse {
            name: "double".to_string(),
            response: json!({"content": 10}),
        })]),
        Content::model_text("The answer is 10."),
    ];
    assert!(validate_history(&history).is_ok());
}

#[test]
fn test_history_must_start_with_user() {
    let mut chat = session();
    let err = chat
        .seed_history(vec![Content::model_text("I speak first")])
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(err.to_string().contains("turn 0"));
    // A failed seed leaves the session empty.
    assert!(chat.history().is_empty());
}

#[test]
fn test_history_rejects_empty_turn() {
    let mut chat = session();
    let err = chat
        .seed_history(vec![Content::user_text("hi"), Content::model(Vec::new())])
        .unwrap_err();
    assert!(err.to_string().contains("at least one part"));
}

#[test]
fn test_history_rejects_function_call_in_user_turn() {
    let history = vec![Content::user(vec![Part::FunctionCall(FunctionCall {
        name: "sneaky".to_string(),
        args: json!({}),
    })])];
    let err = validate_history(&history).unwrap_err();
    assert!(err.to_string().contains("not permitted for role"));
}

#[test]
fn test_history_rejects_system_role() {
    let history = vec![
        Content::user_text("hi"),
        Content::system(vec![Part::text("be helpful")]),
    ];
    assert!(validate_history(&history).is_err());
}

#[test]
fn test_history_rejects_consecutive_user_turns() {
    let err = validate_history(&[Content::user_text("a"), Content::user_text("b")]).unwrap_err();
    assert!(err.to_string().contains("may not follow"));
    assert!(err.to_string().contains("turn 1"));
}

#[test]
fn test_history_rejects_function_turn_after_user() {
    let history = vec![
        Content::user_text("hi"),
        Content::function(vec![Part::FunctionResponse(FunctionResponse {
            name: "f".to_string(),
            response: json!({}),
        })]),
    ];
    assert!(validate_history(&history).is_err());
}

#[test]
fn test_error_cites_offending_turn_index() {
    let history = vec![
        Content::user_text("a"),
        Content::model_text("b"),
        Content::user_text("c"),
        Content::model(Vec::new()),
    ];
    let err = validate_history(&history).unwrap_err();
    assert!(err.to_string().contains("turn 3"));
}
