use serde_json::{Map, Value};

use crate::error::ScrapeError;
use crate::schema::ExtractionSchema;

/// Decode the model's raw output into a JSON object, validating against the
/// schema when one was supplied.
///
/// Models wrap JSON in Markdown fences or surround it with prose despite
/// being told not to, so this is deliberately lenient about *where* the
/// object sits and strict about *what* it contains: the first balanced
/// `{...}` span that decodes as a JSON object wins, and anything else in the
/// response is ignored. A response with no decodable object, or a top-level
/// array or scalar, is a parse failure carrying the raw text for diagnosis.
pub fn parse_response(
    raw: &str,
    schema: Option<&ExtractionSchema>,
) -> Result<Map<String, Value>, ScrapeError> {
    let stripped = strip_code_fences(raw);

    let data = match serde_json::from_str::<Value>(stripped) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(ScrapeError::Parse {
                message: format!("expected a JSON object, got {}", json_type_name(&other)),
                raw: raw.to_string(),
            });
        }
        Err(_) => find_embedded_object(stripped).ok_or_else(|| ScrapeError::Parse {
            message: "no JSON object found in model output".into(),
            raw: raw.to_string(),
        })?,
    };

    if let Some(schema) = schema.filter(|s| !s.is_empty()) {
        schema.validate(&data)?;
    }

    Ok(data)
}

/// Strip a Markdown code fence wrapper, with or without a language tag.
fn strip_code_fences(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Scan for the first balanced brace span that decodes as a JSON object.
/// Braces inside JSON strings do not count toward nesting.
fn find_embedded_object(text: &str) -> Option<Map<String, Value>> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = balanced_span_end(bytes, open) {
            // `{`, `}`, `"` and `\` are ASCII, so these offsets are always
            // char boundaries.
            let candidate = &text[open..=close];
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
                return Some(map);
            }
        }
        start = open + 1;
    }
    None
}

/// Returns the index of the `}` closing the brace opened at `open`, or
/// `None` if the span never closes.
fn balanced_span_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn parses_bare_object() {
        let data = parse_response(r#"{"title": "Hello", "count": 3}"#, None).unwrap();
        assert_eq!(data["title"], "Hello");
        assert_eq!(data["count"], 3);
    }

    #[test]
    fn parses_fenced_object() {
        let raw = "```json\n{\"title\": \"Hello\"}\n```";
        let data = parse_response(raw, None).unwrap();
        assert_eq!(data["title"], "Hello");
    }

    #[test]
    fn parses_fence_without_language_tag() {
        let raw = "```\n{\"ok\": true}\n```";
        let data = parse_response(raw, None).unwrap();
        assert_eq!(data["ok"], true);
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let raw = "Sure! Here is the extracted data:\n\n{\"title\": \"Hello\"}\n\nLet me know if you need more.";
        let data = parse_response(raw, None).unwrap();
        assert_eq!(data["title"], "Hello");
    }

    #[test]
    fn skips_unbalanced_prose_brace_before_object() {
        let raw = "note: { is an opening brace. {\"value\": 1}";
        let data = parse_response(raw, None).unwrap();
        assert_eq!(data["value"], 1);
    }

    #[test]
    fn braces_inside_strings_do_not_break_scanning() {
        let raw = r#"Result: {"text": "nested {braces} and \"quotes\" inside", "n": 2} done"#;
        let data = parse_response(raw, None).unwrap();
        assert_eq!(data["text"], "nested {braces} and \"quotes\" inside");
        assert_eq!(data["n"], 2);
    }

    #[test]
    fn nested_objects_parse_as_one_span() {
        let raw = r#"{"outer": {"inner": [1, 2, {"deep": true}]}}"#;
        let data = parse_response(raw, None).unwrap();
        assert!(data["outer"]["inner"][2]["deep"].as_bool().unwrap());
    }

    #[test]
    fn top_level_array_is_a_parse_error() {
        let err = parse_response(r#"[{"title": "Hello"}]"#, None).unwrap_err();
        match err {
            ScrapeError::Parse { message, raw } => {
                assert!(message.contains("array"), "message: {message}");
                assert!(raw.contains("title"));
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn plain_prose_is_a_parse_error() {
        let raw = "I could not find any structured data on that page.";
        let err = parse_response(raw, None).unwrap_err();
        match err {
            ScrapeError::Parse { raw: attached, .. } => assert_eq!(attached, raw),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn empty_output_is_a_parse_error() {
        assert!(matches!(
            parse_response("", None),
            Err(ScrapeError::Parse { .. })
        ));
    }

    #[test]
    fn schema_missing_field_is_rejected() {
        let schema = ExtractionSchema::new()
            .field("title", FieldKind::String)
            .field("price", FieldKind::Number);
        let err = parse_response(r#"{"title": "Widget"}"#, Some(&schema)).unwrap_err();
        assert!(matches!(err, ScrapeError::SchemaValidation(ref msg) if msg.contains("price")));
    }

    #[test]
    fn schema_explicit_null_is_accepted() {
        let schema = ExtractionSchema::new()
            .field("title", FieldKind::String)
            .field("price", FieldKind::Number);
        let data =
            parse_response(r#"{"title": "Widget", "price": null}"#, Some(&schema)).unwrap();
        assert!(data["price"].is_null());
    }

    #[test]
    fn schema_type_mismatch_is_rejected() {
        let schema = ExtractionSchema::new().field("price", FieldKind::Number);
        let err = parse_response(r#"{"price": "ten dollars"}"#, Some(&schema)).unwrap_err();
        assert!(matches!(err, ScrapeError::SchemaValidation(_)));
    }

    #[test]
    fn schema_undeclared_key_is_rejected() {
        let schema = ExtractionSchema::new().field("title", FieldKind::String);
        let err =
            parse_response(r#"{"title": "x", "injected": "y"}"#, Some(&schema)).unwrap_err();
        assert!(matches!(err, ScrapeError::SchemaValidation(ref msg) if msg.contains("injected")));
    }

    #[test]
    fn empty_schema_skips_validation() {
        let schema = ExtractionSchema::new();
        let data = parse_response(r#"{"anything": "goes"}"#, Some(&schema)).unwrap();
        assert_eq!(data["anything"], "goes");
    }

    #[test]
    fn fenced_object_with_schema_validates() {
        let schema = ExtractionSchema::new().field("headline", FieldKind::String);
        let raw = "```json\n{\"headline\": \"Breaking news\"}\n```";
        let data = parse_response(raw, Some(&schema)).unwrap();
        assert_eq!(data["headline"], "Breaking news");
    }
}
