//! Builds the bounded textual description of an item for model input.

use serde_json::Value;

/// Default cap on description length, in characters.
pub const DEFAULT_MAX_DESCRIPTION_CHARS: usize = 4000;

/// Render a candidate's name and structured payload as model input text,
/// truncated to `max_chars`.
///
/// The payload is re-serialized compactly when it parses, which strips
/// pretty-printing whitespace so more of the document fits under the cap.
pub fn item_description(name: &str, schema_json: &str, max_chars: usize) -> String {
    let payload = match serde_json::from_str::<Value>(schema_json) {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|_| schema_json.to_string()),
        Err(_) => schema_json.to_string(),
    };

    let description = format!("Item name: {}\nItem data: {}", name, payload);
    truncate_chars(&description, max_chars)
}

/// Truncate a string to a maximum number of characters.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_description_is_untruncated() {
        let description = item_description("Margherita Pizza", r#"{"price": "12.00"}"#, 4000);
        assert_eq!(
            description,
            "Item name: Margherita Pizza\nItem data: {\"price\":\"12.00\"}"
        );
    }

    #[test]
    fn test_pretty_printed_payload_is_compacted() {
        let pretty = "{\n  \"name\": \"Margherita Pizza\",\n  \"price\": \"12.00\"\n}";
        let description = item_description("Margherita Pizza", pretty, 4000);
        assert!(description.contains("{\"name\":\"Margherita Pizza\",\"price\":\"12.00\"}"));
    }

    #[test]
    fn test_long_description_is_truncated() {
        let payload = format!("{{\"text\": \"{}\"}}", "x".repeat(10_000));
        let description = item_description("Item", &payload, 100);
        assert_eq!(description.chars().count(), 103); // 100 + "..."
        assert!(description.ends_with("..."));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let payload = format!("{{\"text\": \"{}\"}}", "é".repeat(200));
        // Must not panic slicing inside a multi-byte character.
        let description = item_description("Crêpe", &payload, 50);
        assert!(description.ends_with("..."));
        assert_eq!(description.chars().count(), 53);
    }

    #[test]
    fn test_invalid_json_payload_is_passed_through() {
        let description = item_description("Item", "not json at all", 4000);
        assert!(description.contains("not json at all"));
    }
}
