//! Locates the structured payload inside free-form model output.
//!
//! Models are told to answer with a bare JSON list, but replies still arrive
//! wrapped in markdown fences or prose. The scanner walks the text looking
//! for balanced `[...]` spans first and `{...}` spans second, tracking string
//! literals so brackets inside quoted names do not unbalance the scan. The
//! first array holding at least one object wins; empty arrays are passed over.

use crate::error::ParseError;
use serde_json::{Map, Value};

pub type CandidateMap = Map<String, Value>;

/// Extracts candidate food items from raw model text.
pub fn extract(raw: &str) -> Result<Vec<CandidateMap>, ParseError> {
    let mut saw_empty_array = false;

    for span in balanced_spans(raw, b'[', b']') {
        let Ok(Value::Array(values)) = serde_json::from_str::<Value>(span) else {
            continue;
        };
        if values.is_empty() {
            saw_empty_array = true;
            continue;
        }
        if let Some(items) = object_elements(values) {
            return Ok(items);
        }
    }

    if let Some(object) = first_object(raw) {
        return Ok(vec![object]);
    }

    if saw_empty_array {
        return Err(ParseError::EmptyResult);
    }
    Err(ParseError::NoStructuredData)
}

/// Keeps the object elements of an array, or `None` if it holds no objects.
fn object_elements(values: Vec<Value>) -> Option<Vec<CandidateMap>> {
    let total = values.len();
    let items: Vec<CandidateMap> = values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    if items.is_empty() {
        return None;
    }
    if items.len() < total {
        tracing::warn!(
            "Dropping {} non-object elements from model output",
            total - items.len()
        );
    }
    Some(items)
}

fn first_object(raw: &str) -> Option<CandidateMap> {
    balanced_spans(raw, b'{', b'}').find_map(|span| match serde_json::from_str(span) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    })
}

/// Yields every balanced span opened by `open`, in order of its start.
fn balanced_spans(raw: &str, open: u8, close: u8) -> impl Iterator<Item = &str> {
    let bytes = raw.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(move |(_, b)| **b == open)
        .filter_map(move |(start, _)| {
            matching_close(&bytes[start..], open, close).map(|len| &raw[start..start + len])
        })
}

/// Length of the balanced span starting at `bytes[0]`, if it closes.
fn matching_close(bytes: &[u8], open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
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
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn as_values(items: Vec<CandidateMap>) -> Vec<Value> {
        items.into_iter().map(Value::Object).collect()
    }

    #[test]
    fn test_clean_array_is_parsed_unchanged() {
        let raw = r#"[{"food_name":"chicken breast","calories":330,"protein":40,"fat":5,"carbs":0},{"food_name":"rice","calories":200,"protein":4,"fat":0,"carbs":45}]"#;

        let items = extract(raw).unwrap();
        let expected: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(Value::Array(as_values(items)), expected);
    }

    #[test]
    fn test_array_inside_markdown_fence() {
        let raw = "Here you go:\n```json\n[{\"food_name\": \"toast\", \"protein\": 3}]\n```\nEnjoy!";
        let items = extract(raw).unwrap();
        assert_eq!(as_values(items), vec![json!({"food_name": "toast", "protein": 3})]);
    }

    #[test]
    fn test_brackets_inside_strings_do_not_unbalance() {
        let raw = r#"[{"food_name": "salad [large] ]", "protein": 2}]"#;
        let items = extract(raw).unwrap();
        assert_eq!(items[0]["food_name"], json!("salad [large] ]"));
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let raw = r#"[{"food_name": "the \"big\" one [x", "fat": 1}]"#;
        let items = extract(raw).unwrap();
        assert_eq!(items[0]["food_name"], json!("the \"big\" one [x"));
    }

    #[test]
    fn test_nested_structures_are_kept_whole() {
        let raw = r#"Result: [{"food_name": "bowl", "parts": [1, [2, 3]], "carbs": 10}] done"#;
        let items = extract(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["parts"], json!([1, [2, 3]]));
    }

    #[test]
    fn test_skips_non_json_bracket_spans() {
        let raw = r#"See [note 1] and [1, 2]. Answer: [{"food_name": "egg"}]"#;
        let items = extract(raw).unwrap();
        assert_eq!(as_values(items), vec![json!({"food_name": "egg"})]);
    }

    #[test]
    fn test_single_object_is_wrapped() {
        let raw = r#"The meal is {"food_name": "omelette", "calories": 9999, "protein": 12, "fat": 10, "carbs": 1}."#;
        let items = extract(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["food_name"], json!("omelette"));
    }

    #[test]
    fn test_prose_without_json_fails() {
        let raw = "I think this is about 500 calories of pasta.";
        assert_eq!(extract(raw).unwrap_err(), ParseError::NoStructuredData);
    }

    #[test]
    fn test_unbalanced_output_fails() {
        let raw = r#"[{"food_name": "truncated", "calories": 12"#;
        assert_eq!(extract(raw).unwrap_err(), ParseError::NoStructuredData);
    }

    #[test]
    fn test_mixed_array_keeps_every_object() {
        let raw = r#"[{"food_name":"egg","protein":6,"fat":5,"carbs":0.5},{"food_name":"rice","protein":4,"fat":0,"carbs":45},null,"n/a"]"#;
        let items = extract(raw).unwrap();
        let names: Vec<&Value> = items.iter().map(|item| &item["food_name"]).collect();
        assert_eq!(names, vec![&json!("egg"), &json!("rice")]);
    }

    #[test]
    fn test_empty_array_before_answer_is_skipped() {
        let raw = r#"Previous: [] Answer: [{"food_name": "toast", "carbs": 14}]"#;
        let items = extract(raw).unwrap();
        assert_eq!(as_values(items), vec![json!({"food_name": "toast", "carbs": 14})]);
    }

    #[test]
    fn test_empty_array_is_empty_result() {
        assert_eq!(extract("[]").unwrap_err(), ParseError::EmptyResult);
        assert_eq!(extract("```json\n[ ]\n```").unwrap_err(), ParseError::EmptyResult);
    }
}
