use serde_json::{json, Value};

use outreach_core::errors::CompletionError;
use outreach_core::messages::ChatMessage;
use outreach_core::provider::CompletionOptions;

/// Build an OpenAI-compatible chat-completions request body.
pub fn build_request_body(messages: &[ChatMessage], options: &CompletionOptions, model: &str) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages,
        "max_tokens": options.max_tokens,
        "stream": false,
    });

    if let Some(temp) = options.temperature {
        body["temperature"] = json!(temp);
    }

    body
}

/// Pull the first choice's text out of a chat-completions response.
///
/// OpenRouter reports upstream provider failures as a 200 with an `error`
/// object, so that is checked before the choices.
pub fn extract_text(response: &Value) -> Result<String, CompletionError> {
    if let Some(err) = response.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown upstream error")
            .to_string();
        let status = err.get("code").and_then(Value::as_u64).unwrap_or(502) as u16;
        return Err(CompletionError::from_status(status, message));
    }

    let choice = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| CompletionError::MalformedResponse("response has no choices".into()))?;

    let text = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();

    if text.is_empty() {
        return Err(CompletionError::EmptyCompletion);
    }
    Ok(text.to_string())
}
