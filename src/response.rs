//! Derived accessors over a parsed `generateContent` response
//!
//! The raw [`GenerateContentResponse`] is a plain wire struct; this module
//! adds the views callers actually want: concatenated text, the ordered
//! list of requested function calls, and JSON-parsed structured output.
//! Bad terminations (safety block, truncation, malformed call, ...) are
//! classified here and surface as [`Error::Blocked`] from `text()` rather
//! than as silently empty strings.

use crate::types::{Candidate, FinishReason, FunctionCall, GenerateContentResponse, Part};
use crate::{Error, Result};

impl GenerateContentResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Concatenated text of the first candidate.
    ///
    /// Executable-code and code-execution-result parts render as fenced
    /// blocks so chat transcripts stay readable. Fails with
    /// [`Error::Blocked`] when the candidate terminated badly, or when no
    /// candidates exist and the prompt feedback reports a block.
    pub fn text(&self) -> Result<String> {
        let candidate = match self.first_candidate() {
            Some(candidate) => candidate,
            None => {
                if let Some(feedback) = &self.prompt_feedback
                    && let Some(reason) = &feedback.block_reason
                {
                    return Err(Error::blocked(format!("prompt was blocked: {reason}")));
                }
                return Ok(String::new());
            }
        };

        if let Some(reason) = candidate.finish_reason
            && reason.is_bad()
        {
            return Err(Error::blocked(format!(
                "candidate terminated with finish reason {reason:?}"
            )));
        }

        let mut text = String::new();
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                match part {
                    Part::Text(t) => text.push_str(t),
                    Part::ExecutableCode(code) => {
                        text.push_str(&format!(
                            "\n```{}\n{}\n```\n",
                            code.language.to_lowercase(),
                            code.code
                        ));
                    }
                    Part::CodeExecutionResult(result) => {
                        text.push_str(&format!("\n```\n{}\n```\n", result.output));
                    }
                    _ => {}
                }
            }
        }
        Ok(text)
    }

    /// The ordered function calls of the first candidate, or `None` when
    /// the model requested none.
    pub fn function_calls(&self) -> Option<Vec<&FunctionCall>> {
        let calls: Vec<&FunctionCall> = self
            .first_candidate()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect();
        if calls.is_empty() { None } else { Some(calls) }
    }

    /// Each text part of the first candidate parsed as JSON.
    ///
    /// Use together with a `response_mime_type` of `application/json` (or
    /// a response schema) in the generation config.
    pub fn structured(&self) -> Result<Vec<serde_json::Value>> {
        let mut values = Vec::new();
        if let Some(candidate) = self.first_candidate()
            && let Some(content) = &candidate.content
        {
            for part in &content.parts {
                if let Part::Text(t) = part {
                    values.push(serde_json::from_str(t).map_err(Error::Json)?);
                }
            }
        }
        Ok(values)
    }

    /// Whether the first candidate carries any parts at all
    pub(crate) fn has_usable_content(&self) -> bool {
        self.first_candidate()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| !content.parts.is_empty())
            .unwrap_or(false)
    }

    /// Emit non-fatal diagnostics: a warning when extra candidates are
    /// discarded and a warning with token counts when the response was
    /// truncated.
    pub(crate) fn log_diagnostics(&self) {
        if self.candidates.len() > 1 {
            log::warn!(
                "{} candidates returned; only the first is used",
                self.candidates.len()
            );
        }
        if let Some(candidate) = self.first_candidate()
            && candidate.finish_reason == Some(FinishReason::MaxTokens)
        {
            let (prompt, total) = self
                .usage_metadata
                .as_ref()
                .map(|usage| {
                    (
                        usage.prompt_token_count.unwrap_or(0),
                        usage.total_token_count.unwrap_or(0),
                    )
                })
                .unwrap_or((0, 0));
            log::warn!(
                "response was truncated (MAX_TOKENS); consider raising maxOutputTokens \
                 (prompt tokens: {prompt}, total tokens: {total})"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_concatenates_parts() {
        let response = response(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(response.text().unwrap(), "Hello world");
    }

    #[test]
    fn test_text_renders_code_parts_as_fences() {
        let response = response(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Result:"},
                    {"executableCode": {"language": "PYTHON", "code": "print(1+1)"}},
                    {"codeExecutionResult": {"outcome": "OUTCOME_OK", "output": "2"}}
                ]},
                "finishReason": "STOP"
            }]
        }));
        let text = response.text().unwrap();
        assert!(text.contains("```python\nprint(1+1)\n```"));
        assert!(text.contains("```\n2\n```"));
    }

    #[test]
    fn test_text_fails_on_bad_finish_reason() {
        for reason in ["SAFETY", "MAX_TOKENS", "RECITATION", "MALFORMED_FUNCTION_CALL"] {
            let response = response(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "partial"}]},
                    "finishReason": reason
                }]
            }));
            assert!(
                matches!(response.text(), Err(Error::Blocked(_))),
                "expected blocked error for {reason}"
            );
        }
    }

    #[test]
    fn test_text_fails_on_blocked_prompt() {
        let response = response(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
        let err = response.text().unwrap_err();
        assert!(matches!(err, Error::Blocked(_)));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_text_empty_when_no_candidates_and_no_block() {
        let response = response(json!({"candidates": []}));
        assert_eq!(response.text().unwrap(), "");
    }

    #[test]
    fn test_function_calls_in_order() {
        let response = response(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "first", "args": {"a": 1}}},
                    {"functionCall": {"name": "second", "args": {}}}
                ]}
            }]
        }));
        let calls = response.function_calls().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "first");
        assert_eq!(calls[1].name, "second");
    }

    #[test]
    fn test_function_calls_none_when_absent() {
        let response = response(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "no calls"}]}
            }]
        }));
        assert!(response.function_calls().is_none());
    }

    #[test]
    fn test_structured_parses_text_parts() {
        let response = response(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"name\": \"Neko\"}"}]},
                "finishReason": "STOP"
            }]
        }));
        let values = response.structured().unwrap();
        assert_eq!(values, vec![json!({"name": "Neko"})]);
    }

    #[test]
    fn test_structured_fails_on_invalid_json() {
        let response = response(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "not json"}]}
            }]
        }));
        assert!(matches!(response.structured(), Err(Error::Json(_))));
    }

    #[test]
    fn test_has_usable_content() {
        let usable = response(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "hi"}]}}]
        }));
        assert!(usable.has_usable_content());

        let empty = response(json!({"candidates": []}));
        assert!(!empty.has_usable_content());

        let no_parts = response(json!({
            "candidates": [{"content": {"role": "model", "parts": []}}]
        }));
        assert!(!no_parts.has_usable_content());
    }
}
