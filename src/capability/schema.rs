//! Structural validation of capability arguments.
//!
//! Capability input schemas use the JSON-Schema object subset the model
//! understands (`properties`, `required`, `type`, `enum`, numeric bounds).
//! Validation rejects missing, mistyped and unknown fields with a
//! field-level message; this is the only user-facing contract for malformed
//! capability arguments.

use serde_json::Value;

/// A validation failure pointing at the offending field.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    pub field: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid argument '{}': {}", self.field, self.message)
    }
}

/// Validate an argument object against a capability's input schema.
pub fn validate(schema: &Value, args: &Value) -> Result<(), SchemaViolation> {
    let args_obj = args
        .as_object()
        .ok_or_else(|| SchemaViolation::new("(arguments)", "expected a JSON object"))?;

    let empty = serde_json::Map::new();
    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .unwrap_or(&empty);

    // Unknown fields are rejected: the schema is the whole contract.
    for key in args_obj.keys() {
        if !properties.contains_key(key) {
            return Err(SchemaViolation::new(key, "unknown field"));
        }
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for name in required.iter().filter_map(|v| v.as_str()) {
            if !args_obj.contains_key(name) {
                return Err(SchemaViolation::new(name, "missing required field"));
            }
        }
    }

    for (name, spec) in properties {
        let Some(value) = args_obj.get(name) else {
            continue;
        };
        check_value(name, spec, value)?;
    }

    Ok(())
}

fn check_value(field: &str, spec: &Value, value: &Value) -> Result<(), SchemaViolation> {
    let expected = spec.get("type").and_then(|t| t.as_str()).unwrap_or("object");

    match expected {
        "string" => {
            let s = value.as_str().ok_or_else(|| {
                SchemaViolation::new(field, format!("expected a string, got {}", type_name(value)))
            })?;
            if let Some(allowed) = spec.get("enum").and_then(|e| e.as_array()) {
                let matches = allowed.iter().any(|v| v.as_str() == Some(s));
                if !matches {
                    let options: Vec<&str> =
                        allowed.iter().filter_map(|v| v.as_str()).collect();
                    return Err(SchemaViolation::new(
                        field,
                        format!("must be one of: {}", options.join(", ")),
                    ));
                }
            }
        }
        "integer" => {
            let n = value.as_i64().ok_or_else(|| {
                SchemaViolation::new(
                    field,
                    format!("expected an integer, got {}", type_name(value)),
                )
            })?;
            check_bounds(field, spec, n as f64)?;
        }
        "number" => {
            let n = value.as_f64().ok_or_else(|| {
                SchemaViolation::new(field, format!("expected a number, got {}", type_name(value)))
            })?;
            check_bounds(field, spec, n)?;
        }
        "boolean" => {
            if !value.is_boolean() {
                return Err(SchemaViolation::new(
                    field,
                    format!("expected a boolean, got {}", type_name(value)),
                ));
            }
        }
        "array" => {
            if !value.is_array() {
                return Err(SchemaViolation::new(
                    field,
                    format!("expected an array, got {}", type_name(value)),
                ));
            }
        }
        "object" => {
            if !value.is_object() {
                return Err(SchemaViolation::new(
                    field,
                    format!("expected an object, got {}", type_name(value)),
                ));
            }
        }
        other => {
            return Err(SchemaViolation::new(
                field,
                format!("schema declares unsupported type '{}'", other),
            ));
        }
    }

    Ok(())
}

fn check_bounds(field: &str, spec: &Value, n: f64) -> Result<(), SchemaViolation> {
    if let Some(min) = spec.get("minimum").and_then(|m| m.as_f64()) {
        if n < min {
            return Err(SchemaViolation::new(field, format!("must be at least {}", min)));
        }
    }
    if let Some(max) = spec.get("maximum").and_then(|m| m.as_f64()) {
        if n > max {
            return Err(SchemaViolation::new(field, format!("must be at most {}", max)));
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
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
    use serde_json::json;

    fn quiz_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": { "type": "string" },
                "question_count": { "type": "integer", "minimum": 1, "maximum": 20 },
                "source": { "type": "string" }
            },
            "required": ["topic"]
        })
    }

    #[test]
    fn test_valid_arguments_pass() {
        let args = json!({ "topic": "ownership", "question_count": 5 });
        assert!(validate(&quiz_schema(), &args).is_ok());
    }

    #[test]
    fn test_missing_required_field_cites_field() {
        let args = json!({ "question_count": 5 });
        let err = validate(&quiz_schema(), &args).unwrap_err();
        assert_eq!(err.field, "topic");
        assert!(err.message.contains("missing"));
    }

    #[test]
    fn test_mistyped_field_cites_field() {
        let args = json!({ "topic": "ownership", "question_count": "five" });
        let err = validate(&quiz_schema(), &args).unwrap_err();
        assert_eq!(err.field, "question_count");
        assert!(err.message.contains("integer"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let args = json!({ "topic": "ownership", "difficulty": "hard" });
        let err = validate(&quiz_schema(), &args).unwrap_err();
        assert_eq!(err.field, "difficulty");
        assert_eq!(err.message, "unknown field");
    }

    #[test]
    fn test_out_of_range_rejected() {
        let args = json!({ "topic": "ownership", "question_count": 50 });
        let err = validate(&quiz_schema(), &args).unwrap_err();
        assert_eq!(err.field, "question_count");
        assert!(err.message.contains("at most"));
    }

    #[test]
    fn test_enum_rejected() {
        let schema = json!({
            "type": "object",
            "properties": {
                "level": { "type": "string", "enum": ["intro", "intermediate", "advanced"] }
            }
        });
        let err = validate(&schema, &json!({ "level": "wizard" })).unwrap_err();
        assert_eq!(err.field, "level");
        assert!(err.message.contains("one of"));

        assert!(validate(&schema, &json!({ "level": "intro" })).is_ok());
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        let err = validate(&quiz_schema(), &json!("just a string")).unwrap_err();
        assert_eq!(err.field, "(arguments)");
    }
}
