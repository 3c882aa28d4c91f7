//! Tolerant decoding of raw tool results.
//!
//! Tools are expected to return a JSON object with at least a `success` flag, but
//! in practice results also arrive as the printed form of a dict literal or as free
//! text. [`parse`] tries a fixed sequence of decoders and the first one that yields a
//! mapping wins:
//!
//! 1. strict JSON
//! 2. legacy normalization of a dict literal into JSON, then strict JSON again
//! 3. the closed literal grammar in [`crate::literal`]
//! 4. the raw text, unchanged, as [`ParsedResult::PlainText`]
//!
//! The chain never fails. Stage 2 is textual and only best-effort: an apostrophe
//! inside a single-quoted value defeats it, in which case stage 3 usually still
//! reads the input correctly.
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::literal::parse_literal;
use crate::models::content::ToolResultContent;

lazy_static! {
    static ref SINGLE_QUOTED_KEY: Regex = Regex::new(r"'([^']*)'(\s*):").unwrap();
    static ref SINGLE_QUOTED_VALUE: Regex = Regex::new(r":(\s*)'([^']*)'").unwrap();
    // Quoted runs are matched first so keywords inside string values are left alone
    static ref LITERAL_KEYWORD: Regex = Regex::new(
        r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|\b(True|False|None)\b"#
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
/// A decoded tool result
pub enum ParsedResult {
    Structured(Map<String, Value>),
    PlainText(String),
}

impl ParsedResult {
    pub fn as_structured(&self) -> Option<&Map<String, Value>> {
        match self {
            ParsedResult::Structured(map) => Some(map),
            ParsedResult::PlainText(_) => None,
        }
    }

    pub fn as_plain_text(&self) -> Option<&str> {
        match self {
            ParsedResult::PlainText(text) => Some(text),
            ParsedResult::Structured(_) => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedResult::Structured(_))
    }

    /// Look up a field of a structured result
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_structured().and_then(|map| map.get(key))
    }

    /// The tool's own success flag, when it reported one
    pub fn success(&self) -> Option<bool> {
        self.get("success").and_then(Value::as_bool)
    }

    /// The block stored in the conversation for this result
    pub fn to_content(&self) -> ToolResultContent {
        match self {
            ParsedResult::Structured(map) => ToolResultContent::Json(Value::Object(map.clone())),
            ParsedResult::PlainText(text) => ToolResultContent::Text(text.clone()),
        }
    }
}

/// Decode a raw tool result. Never fails; see the module docs for the stage order.
pub fn parse(raw: &str) -> ParsedResult {
    if let Some(map) = decode_json(raw) {
        debug!(stage = "json", "parsed tool result");
        return ParsedResult::Structured(map);
    }

    if let Some(map) = normalize_legacy(raw).as_deref().and_then(decode_json) {
        debug!(stage = "legacy", "parsed tool result");
        return ParsedResult::Structured(map);
    }

    if let Some(map) = decode_literal(raw) {
        debug!(stage = "literal", "parsed tool result");
        return ParsedResult::Structured(map);
    }

    debug!(stage = "plain_text", len = raw.len(), "tool result is not structured");
    ParsedResult::PlainText(raw.to_string())
}

/// Stage 1: strict JSON, accepted only when it is an object
pub fn decode_json(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Stage 2: rewrite a dict literal into JSON text.
///
/// Returns `None` when the input is not shaped like a mapping, so that free text is
/// never rewritten. Single-quoted keys and values become double-quoted and the
/// keywords `True`, `False` and `None` become their JSON spellings.
pub fn normalize_legacy(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }

    let text = SINGLE_QUOTED_KEY.replace_all(trimmed, "\"$1\"$2:");
    let text = SINGLE_QUOTED_VALUE.replace_all(&text, ":$1\"$2\"");
    let text = LITERAL_KEYWORD.replace_all(&text, |caps: &Captures| match caps.get(1) {
        Some(keyword) => match keyword.as_str() {
            "True" => "true".to_string(),
            "False" => "false".to_string(),
            _ => "null".to_string(),
        },
        None => caps[0].to_string(),
    });
    Some(text.into_owned())
}

/// Stage 3: the closed literal grammar, accepted only when it is a mapping
pub fn decode_literal(raw: &str) -> Option<Map<String, Value>> {
    match parse_literal(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(value: Value) -> ParsedResult {
        match value {
            Value::Object(map) => ParsedResult::Structured(map),
            other => panic!("expected an object, got {}", other),
        }
    }

    #[test]
    fn test_strict_json() {
        let result = parse(r#"{"success": true, "image": "QUJD"}"#);
        assert!(result.is_structured());
        assert_eq!(result.success(), Some(true));
        assert_eq!(result.get("image"), Some(&json!("QUJD")));
    }

    #[test]
    fn test_dict_literal() {
        let result = parse("{'success': True, 'message': 'ok'}");
        assert_eq!(result, structured(json!({"success": true, "message": "ok"})));
    }

    #[test]
    fn test_plain_text() {
        let raw = "not a structured payload at all";
        assert_eq!(parse(raw), ParsedResult::PlainText(raw.to_string()));
    }

    #[test]
    fn test_plain_text_with_keywords_is_untouched() {
        let raw = "None of the True answers were False";
        assert_eq!(normalize_legacy(raw), None);
        assert_eq!(parse(raw), ParsedResult::PlainText(raw.to_string()));
    }

    #[test]
    fn test_legacy_rewrite() {
        let rewritten =
            normalize_legacy("{'success': False, 'error': None, 'retry' : True}").unwrap();
        assert_eq!(
            rewritten,
            r#"{"success": false, "error": null, "retry" : true}"#
        );
        assert_eq!(decode_json(&rewritten).unwrap()["success"], json!(false));
    }

    #[test]
    fn test_keywords_inside_strings_survive() {
        let raw = "{'success': True, 'message': 'None of the styles matched', 'note': \"False alarm\"}";
        assert_eq!(
            normalize_legacy(raw).unwrap(),
            r#"{"success": true, "message": "None of the styles matched", "note": "False alarm"}"#
        );
        assert_eq!(
            parse(raw),
            structured(json!({
                "success": true,
                "message": "None of the styles matched",
                "note": "False alarm"
            }))
        );
    }

    #[test]
    fn test_literal_stage_catches_what_legacy_misses() {
        // the apostrophe breaks the textual rewrite
        let raw = r#"{'success': True, 'message': "it's done", 'images': ('QUJD',)}"#;
        assert_eq!(normalize_legacy(raw).as_deref().and_then(decode_json), None);

        let result = parse(raw);
        assert_eq!(
            result,
            structured(json!({"success": true, "message": "it's done", "images": ["QUJD"]}))
        );
    }

    #[test]
    fn test_unrecoverable_apostrophe_falls_back() {
        let raw = "{'message': 'it's broken'}";
        assert_eq!(parse(raw), ParsedResult::PlainText(raw.to_string()));
    }

    #[test]
    fn test_non_mapping_values_are_plain_text() {
        for raw in ["42", "[1, 2]", "\"quoted\"", "true", "null", "('a', 'b')"] {
            assert_eq!(parse(raw), ParsedResult::PlainText(raw.to_string()), "{}", raw);
        }
    }

    #[test]
    fn test_success_prefix_text() {
        let raw = "SUCCESS: /tmp/canvas/output_1.png";
        let result = parse(raw);
        assert_eq!(result.as_plain_text(), Some(raw));
        assert_eq!(result.success(), None);
    }

    #[test]
    fn test_to_content() {
        let result = parse(r#"{"success": true}"#);
        assert_eq!(
            result.to_content(),
            ToolResultContent::Json(json!({"success": true}))
        );
        assert_eq!(
            parse("done").to_content(),
            ToolResultContent::Text("done".to_string())
        );
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(parse("plain")).unwrap();
        assert_eq!(value, json!({"kind": "plain_text", "value": "plain"}));
    }
}
