//! Rejection bodies arrive either as a JSON object (`{"message": ...}`,
//! sometimes `{"error": ...}`), a bare JSON string, or plain text.

use serde_json::Value;

/// Extract a user-facing message from a non-success response body.
///
/// Returns `None` when the body carries nothing worth showing, so callers
/// can substitute their own fallback.
pub fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["message", "error", "detail"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(non_empty_str),
        Ok(Value::String(s)) => non_empty(&s),
        Ok(_) => None,
        Err(_) => non_empty(trimmed),
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().and_then(non_empty)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}
