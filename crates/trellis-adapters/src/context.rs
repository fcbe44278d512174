//! JSON to render-context conversion.
//!
//! Callers embedding the engine typically receive generation parameters as
//! JSON (request bodies, config files). This adapter maps a JSON object
//! onto a [`RenderContext`], preserving nesting for dotted-path lookups.

use std::collections::BTreeMap;

use serde_json::Value;

use trellis_core::{
    domain::{ContextValue, DomainError, RenderContext},
    error::TrellisResult,
};

/// Build a [`RenderContext`] from a JSON object.
///
/// Mapping rules:
/// - strings, numbers, and booleans map to their typed context values
/// - objects map to nested maps, so `{"features": {"auth": true}}` answers
///   the dotted lookup `features.auth`
/// - `null` entries are dropped (absent, not empty)
/// - arrays are rejected; the conditional language has no list semantics
///
/// # Errors
///
/// Returns [`DomainError::InvalidDefinition`] when the top-level value is
/// not an object or any nested value is an array.
pub fn context_from_json(value: &Value) -> TrellisResult<RenderContext> {
    let Value::Object(map) = value else {
        return Err(DomainError::InvalidDefinition(format!(
            "render context must be a JSON object, got {}",
            json_kind(value)
        ))
        .into());
    };

    let mut ctx = RenderContext::new();
    for (key, entry) in map {
        if entry.is_null() {
            continue;
        }
        ctx.insert(key.clone(), convert(key, entry)?);
    }
    Ok(ctx)
}

fn convert(key: &str, value: &Value) -> Result<ContextValue, DomainError> {
    match value {
        Value::String(s) => Ok(ContextValue::String(s.clone())),
        Value::Bool(b) => Ok(ContextValue::Bool(*b)),
        Value::Number(n) => n.as_f64().map(ContextValue::Number).ok_or_else(|| {
            DomainError::InvalidDefinition(format!(
                "context value '{key}' is not representable as a number"
            ))
        }),
        Value::Object(map) => {
            let mut nested = BTreeMap::new();
            for (nested_key, entry) in map {
                if entry.is_null() {
                    continue;
                }
                nested.insert(nested_key.clone(), convert(nested_key, entry)?);
            }
            Ok(ContextValue::Map(nested))
        }
        // Callers drop nulls before converting; an empty map keeps this
        // total and falsy if one slips through.
        Value::Null => Ok(ContextValue::Map(BTreeMap::new())),
        Value::Array(_) => Err(DomainError::InvalidDefinition(format!(
            "context value '{key}' is an array; lists are not supported"
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
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

    #[test]
    fn flat_values_map_to_typed_entries() {
        let ctx = context_from_json(&json!({
            "name": "demo",
            "workers": 4,
            "verbose": true,
        }))
        .unwrap();

        assert_eq!(ctx.get("name"), Some(&ContextValue::String("demo".into())));
        assert_eq!(ctx.get("workers"), Some(&ContextValue::Number(4.0)));
        assert_eq!(ctx.get("verbose"), Some(&ContextValue::Bool(true)));
    }

    #[test]
    fn nested_objects_answer_dotted_lookups() {
        let ctx = context_from_json(&json!({
            "features": { "auth": true, "metrics": false }
        }))
        .unwrap();

        assert_eq!(ctx.lookup("features.auth"), Some(&ContextValue::Bool(true)));
        assert_eq!(
            ctx.lookup("features.metrics"),
            Some(&ContextValue::Bool(false))
        );
        assert!(ctx.lookup("features.missing").is_none());
    }

    #[test]
    fn nulls_are_absent() {
        let ctx = context_from_json(&json!({ "name": null })).unwrap();
        assert!(ctx.get("name").is_none());
        assert!(ctx.is_empty());
    }

    #[test]
    fn arrays_and_non_objects_are_rejected() {
        assert!(context_from_json(&json!({ "tags": ["a", "b"] })).is_err());
        assert!(context_from_json(&json!("just a string")).is_err());
        assert!(context_from_json(&json!(42)).is_err());
    }
}
