//! Completion text extraction tolerant of multiple response shapes.

use serde_json::Value;

/// Pulls the completion text out of a response body, accepting in order:
/// chat-style `choices[0].message.content`, legacy `choices[0].text`,
/// top-level `content`, and top-level `response`. First non-empty wins.
pub fn extract_completion_text(response: &Value) -> Option<String> {
    let candidates = [
        &response["choices"][0]["message"]["content"],
        &response["choices"][0]["text"],
        &response["content"],
        &response["response"],
    ];

    candidates
        .iter()
        .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
        .map(|s| s.to_string())
}
