//! Response normalizer
//!
//! Pure transform reconciling heterogeneous upstream JSON shapes into one
//! contract. Handling is structural, not source-name keyed: any payload
//! whose top-level `data` object wraps a nested `data` object gets the inner
//! object hoisted, so new sources with the same shape need no code change.

use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Normalize a raw upstream payload.
///
/// - A nested `data.data` object is hoisted to become `data`'s contents,
///   inner arrays/objects verbatim; remaining wrapper keys (`message`,
///   `source`, `confidence_score`, anything else the wrapper carried) merge
///   in, inner values winning on collision.
/// - The final data object is completed with `confidence_score = 1.0` and
///   `source = source_name` when absent; pre-existing values are never
///   overwritten. Payloads without a `data` object are completed at the top
///   level.
///
/// Idempotent: normalizing the output again is a no-op.
pub fn normalize(raw: &[u8], source_name: &str) -> Result<Value, NormalizeError> {
    let mut root: Value = serde_json::from_slice(raw)?;
    let Some(root_obj) = root.as_object_mut() else {
        return Err(NormalizeError::NotAnObject);
    };

    match root_obj.get_mut("data") {
        Some(Value::Object(outer)) => {
            hoist_nested(outer);
            complete_fields(outer, source_name);
        }
        _ => {
            // No data wrapper: the whole object is the payload
            complete_fields(root_obj, source_name);
        }
    }

    Ok(root)
}

/// Replace the wrapper's contents with the nested `data` object, merging
/// wrapper-only keys back in (inner wins on collision). Repeats until no
/// object-valued `data` key remains, so a hoisted payload that itself wraps
/// another `data` object is flattened in the same pass.
fn hoist_nested(outer: &mut Map<String, Value>) {
    while matches!(outer.get("data"), Some(Value::Object(_))) {
        let Some(Value::Object(inner)) = outer.remove("data") else {
            return;
        };

        let mut hoisted = inner;
        for (key, value) in std::mem::take(outer) {
            hoisted.entry(key).or_insert(value);
        }
        *outer = hoisted;
    }
}

fn complete_fields(data: &mut Map<String, Value>, source_name: &str) {
    data.entry("confidence_score").or_insert(json!(1.0));
    data.entry("source")
        .or_insert_with(|| Value::String(source_name.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str, source: &str) -> Value {
        normalize(input.as_bytes(), source).unwrap()
    }

    #[test]
    fn test_hoists_nested_data() {
        let input = r#"{
            "data": {
                "message": "ok",
                "source": "wrapper_api",
                "confidence_score": 0.9,
                "data": {
                    "episode_list": [1, 2, 3],
                    "recommendations": {"top": "show"}
                }
            }
        }"#;

        let out = run(input, "wrapper_api");
        let data = &out["data"];

        // Inner payload hoisted verbatim
        assert_eq!(data["episode_list"], json!([1, 2, 3]));
        assert_eq!(data["recommendations"], json!({"top": "show"}));
        // Wrapper keys merged, not discarded
        assert_eq!(data["message"], "ok");
        assert_eq!(data["source"], "wrapper_api");
        assert_eq!(data["confidence_score"], 0.9);
        // No nested data object remains
        assert!(data.get("data").is_none());
    }

    #[test]
    fn test_inner_wins_on_collision() {
        let input = r#"{
            "data": {
                "source": "outer_api",
                "data": {"source": "inner_api", "title": "x"}
            }
        }"#;

        let out = run(input, "whatever");
        assert_eq!(out["data"]["source"], "inner_api");
        assert_eq!(out["data"]["title"], "x");
    }

    #[test]
    fn test_field_completion() {
        let input = r#"{"data": {"title": "show"}}"#;
        let out = run(input, "mock_api");

        assert_eq!(out["data"]["confidence_score"], 1.0);
        assert_eq!(out["data"]["source"], "mock_api");
        assert_eq!(out["data"]["title"], "show");
    }

    #[test]
    fn test_existing_fields_not_overwritten() {
        let input = r#"{"data": {"confidence_score": 0.5, "source": "original"}}"#;
        let out = run(input, "other_api");

        assert_eq!(out["data"]["confidence_score"], 0.5);
        assert_eq!(out["data"]["source"], "original");
    }

    #[test]
    fn test_flat_payload_completed_at_top_level() {
        let input = r#"{"confidence_score": 0.8, "message": "success", "source": "mock_api"}"#;
        let out = run(input, "other");

        assert_eq!(out["confidence_score"], 0.8);
        assert_eq!(out["source"], "mock_api");
        assert_eq!(out["message"], "success");
    }

    #[test]
    fn test_doubly_wrapped_payload_flattened_in_one_pass() {
        // The hoisted inner object carries its own data wrapper
        let input = r#"{
            "data": {
                "message": "ok",
                "data": {"data": {"a": 1}, "b": 2}
            }
        }"#;

        let once = run(input, "api_a");
        assert_eq!(once["data"]["a"], 1);
        assert_eq!(once["data"]["b"], 2);
        assert_eq!(once["data"]["message"], "ok");
        assert!(once["data"].get("data").is_none());

        let twice = normalize(once.to_string().as_bytes(), "api_a").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_idempotent() {
        let input = r#"{
            "data": {
                "message": "ok",
                "data": {"episode_list": [1], "source": "inner"}
            }
        }"#;

        let once = run(input, "api_a");
        let twice = normalize(once.to_string().as_bytes(), "api_a").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_object_data_untouched() {
        let input = r#"{"data": [1, 2, 3], "status": "ok"}"#;
        let out = run(input, "api_a");

        assert_eq!(out["data"], json!([1, 2, 3]));
        // Completion lands at top level since data is not an object
        assert_eq!(out["confidence_score"], 1.0);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            normalize(b"not json", "api_a"),
            Err(NormalizeError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_non_object_root_is_an_error() {
        assert!(matches!(
            normalize(b"[1,2,3]", "api_a"),
            Err(NormalizeError::NotAnObject)
        ));
    }
}
