//! `${name}` lexical substitution between workflow steps (§4.3 "Inputs &
//! templating").
//!
//! Resolution is strictly lexical: a `${name}` placeholder found inside a
//! JSON string is looked up in the available outputs/inputs map and, when
//! the whole string is exactly one placeholder, the *referenced value* is
//! substituted in place (preserving its JSON type); when it appears inside a
//! larger string, the value is stringified and interpolated.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::OrchError;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([a-zA-Z0-9_.]+)\}").unwrap());
static WHOLE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\{([a-zA-Z0-9_.]+)\}$").unwrap());

/// Substitutes every `${name}` reference in `config`, recursively, using
/// `available`. Fails with `OrchError::Validation` (mapped to `MissingInput`
/// by the caller) the first time a referenced name isn't in `available`.
pub fn resolve_template(config: &Value, available: &HashMap<String, Value>) -> Result<Value, OrchError> {
    match config {
        Value::String(s) => resolve_string(s, available),
        Value::Array(items) => {
            let resolved: Result<Vec<Value>, OrchError> =
                items.iter().map(|item| resolve_template(item, available)).collect();
            Ok(Value::Array(resolved?))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve_template(v, available)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(s: &str, available: &HashMap<String, Value>) -> Result<Value, OrchError> {
    if let Some(caps) = WHOLE_PLACEHOLDER.captures(s) {
        let name = &caps[1];
        return lookup(name, available).cloned();
    }

    if !PLACEHOLDER.is_match(s) {
        return Ok(Value::String(s.to_string()));
    }

    let mut err = None;
    let interpolated = PLACEHOLDER.replace_all(s, |caps: &regex::Captures| {
        let name = &caps[1];
        match lookup(name, available) {
            Ok(value) => value_to_display(value),
            Err(e) => {
                err = Some(e);
                String::new()
            }
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(Value::String(interpolated.into_owned())),
    }
}

fn lookup<'a>(name: &str, available: &'a HashMap<String, Value>) -> Result<&'a Value, OrchError> {
    available.get(name).ok_or_else(|| OrchError::Validation(format!("MissingInput: no step output named '{name}'")))
}

fn value_to_display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn whole_value_placeholder_preserves_type() {
        let mut available = HashMap::new();
        available.insert("db_port".to_string(), json!(5432));
        let resolved = resolve_template(&json!("${db_port}"), &available).unwrap();
        assert_eq!(resolved, json!(5432));
    }

    #[test]
    fn inline_placeholder_interpolates_as_string() {
        let mut available = HashMap::new();
        available.insert("host".to_string(), json!("db.internal"));
        let resolved = resolve_template(&json!("postgres://${host}:5432/app"), &available).unwrap();
        assert_eq!(resolved, json!("postgres://db.internal:5432/app"));
    }

    #[test]
    fn missing_reference_fails() {
        let available = HashMap::new();
        let err = resolve_template(&json!("${missing}"), &available).unwrap_err();
        assert!(matches!(err, OrchError::Validation(_)));
    }

    #[test]
    fn nested_objects_and_arrays_are_resolved() {
        let mut available = HashMap::new();
        available.insert("name".to_string(), json!("orders-db"));
        let config = json!({"labels": ["${name}", "static"], "nested": {"k": "${name}"}});
        let resolved = resolve_template(&config, &available).unwrap();
        assert_eq!(resolved, json!({"labels": ["orders-db", "static"], "nested": {"k": "orders-db"}}));
    }
}
