//! Validate tool call arguments against the declared JSON Schema before execution.

use serde_json::{Map, Value};

use crate::types::message::json_type_name;

/// Top-level validation: required field presence and primitive property types.
///
/// Returns `Err(message)` describing the first violation found. Nested schemas and
/// keywords other than `type`, `required` and `properties` are not checked.
pub fn validate_arguments(args: &Map<String, Value>, schema: &Value) -> Result<(), String> {
    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for name in required.iter().filter_map(|field| field.as_str()) {
            if !args.contains_key(name) {
                return Err(format!("missing required field '{name}'"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) else {
        return Ok(());
    };

    for (key, value) in args {
        let expected = properties
            .get(key)
            .and_then(|prop| prop.get("type"))
            .and_then(|t| t.as_str());
        if let Some(expected) = expected {
            if !value_matches_type(value, expected) {
                return Err(format!(
                    "field '{key}' expected type '{expected}', got {}",
                    json_type_name(value)
                ));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "integer" },
                "b": { "type": "integer" },
                "label": { "type": "string" }
            },
            "required": ["a", "b"]
        })
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn accepts_matching_arguments() {
        assert!(validate_arguments(&args(json!({"a": 2, "b": 3})), &schema()).is_ok());
    }

    #[test]
    fn reports_missing_required_field() {
        let err = validate_arguments(&args(json!({"a": 2})), &schema()).unwrap_err();
        assert_eq!(err, "missing required field 'b'");
    }

    #[test]
    fn reports_type_mismatch() {
        let err = validate_arguments(&args(json!({"a": "2", "b": 3})), &schema()).unwrap_err();
        assert!(err.contains("field 'a' expected type 'integer'"));
    }

    #[test]
    fn unknown_properties_and_untyped_schemas_pass() {
        assert!(validate_arguments(&args(json!({"a": 1, "b": 1, "extra": [1]})), &schema()).is_ok());
        assert!(validate_arguments(&args(json!({"x": 1})), &json!({})).is_ok());
    }
}
