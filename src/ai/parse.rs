//! Recovering typed results from free-text model output.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Strip markdown code fences from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Slice out the outermost JSON object or array in `text`, if any.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model output into `T`.
///
/// Models wrap JSON in prose or code fences often enough that the outermost
/// object is extracted before deserializing. Anything that still does not
/// match the schema is an error for the caller's item only.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Result<T> {
    let cleaned = strip_code_blocks(response);
    let json = extract_json(cleaned).context("No JSON found in model response")?;
    serde_json::from_str(json).context("Model response did not match the expected schema")
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        summary: String,
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn test_parse_plain_and_fenced() {
        let plain: Probe = parse_json_response(r#"{"summary":"ok"}"#).unwrap();
        assert_eq!(plain.summary, "ok");

        let fenced: Probe = parse_json_response("```json\n{\"summary\":\"ok\"}\n```").unwrap();
        assert_eq!(fenced, plain);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let response = "Here is the analysis:\n{\"summary\":\"wrapped\"}\nHope this helps.";
        let parsed: Probe = parse_json_response(response).unwrap();
        assert_eq!(parsed.summary, "wrapped");
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_json_response::<Probe>("no json here").is_err());
        assert!(parse_json_response::<Probe>("{\"summary\": ").is_err());
        assert!(parse_json_response::<Probe>("{\"other\":1}").is_err());
    }

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
        assert_eq!(truncate_to_char_boundary("Hello", 100), "Hello");
    }
}
