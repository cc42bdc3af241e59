//! Tolerant parsing of structured model responses.

use serde_json::Value;

/// Extract a JSON object from a model reply.
///
/// Models asked for a JSON object usually return exactly that, but some wrap
/// it in a markdown fence or surround it with prose. Tries, in order: the
/// whole reply, the content of a fenced block, and the outermost
/// `{`..`}` span.
pub fn extract_json_object(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(fenced) = strip_code_fence(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(fenced) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}

/// Strip a surrounding markdown code fence, with or without a language tag.
fn strip_code_fence(s: &str) -> Option<&str> {
    let rest = s.strip_prefix("```")?;
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```")?;
    Some(rest.trim())
}
