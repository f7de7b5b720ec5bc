// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! JSON-Schema validation with a compile-once cache, coercion, default-fill
//! and strip-on-failure (spec §4.6). `jsonschema` does the structural
//! checking; the AJV-style normalization pass is hand-rolled on top since
//! no crate in the pack implements that drift-repair behavior.

use std::sync::Arc;

use dashmap::DashMap;
use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaValidationError {
    #[error("{context}: schema did not compile: {message}")]
    SchemaCompile { context: String, message: String },

    #[error("{context}: {errors:?}")]
    Invalid { context: String, errors: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct ValidateOutcome {
    pub valid: bool,
    /// Coerced/default-filled/stripped data. Always returned, even on
    /// failure, so callers can inspect what survived.
    pub data: Value,
    pub errors: Vec<String>,
}

pub struct SchemaValidator {
    cache: DashMap<String, Arc<Validator>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self { cache: DashMap::new() }
    }

    fn compiled(&self, schema: &Value) -> Result<Arc<Validator>, SchemaValidationError> {
        let normalized = normalize_schema(schema);
        let key = canonical_key(&normalized);
        if let Some(v) = self.cache.get(&key) {
            return Ok(v.clone());
        }
        let validator = jsonschema::validator_for(&normalized).map_err(|e| SchemaValidationError::SchemaCompile {
            context: "compile".into(),
            message: e.to_string(),
        })?;
        let validator = Arc::new(validator);
        self.cache.insert(key, validator.clone());
        Ok(validator)
    }

    /// `validate(schema, data) -> { valid, data, errors? }` (spec §4.6):
    /// coerces, default-fills, then strips unrecognized properties and
    /// retries only if the first pass failed.
    pub fn validate(&self, schema: &Value, data: &Value) -> Result<ValidateOutcome, SchemaValidationError> {
        let validator = self.compiled(schema)?;
        let mut enriched = data.clone();
        coerce_and_fill(schema, &mut enriched);

        if validator.is_valid(&enriched) {
            return Ok(ValidateOutcome { valid: true, data: enriched, errors: Vec::new() });
        }

        let first_pass_errors: Vec<String> = validator.iter_errors(&enriched).map(|e| e.to_string()).collect();
        strip_unknown(schema, &mut enriched);
        if validator.is_valid(&enriched) {
            return Ok(ValidateOutcome { valid: true, data: enriched, errors: Vec::new() });
        }
        Ok(ValidateOutcome { valid: false, data: enriched, errors: first_pass_errors })
    }

    /// Default-fill-only pass, used by the runtime's "enrich defaults"
    /// step (spec §4.1 step 3) to compute the enriched args without
    /// re-raising validation errors that step 2 already surfaced.
    pub fn fill_defaults(&self, schema: &Value, data: &Value) -> Value {
        let mut enriched = data.clone();
        coerce_and_fill(schema, &mut enriched);
        enriched
    }

    pub fn validate_or_throw(&self, schema: &Value, data: &Value, context: &str) -> Result<Value, SchemaValidationError> {
        let outcome = self.validate(schema, data)?;
        if outcome.valid {
            Ok(outcome.data)
        } else {
            Err(SchemaValidationError::Invalid { context: context.to_string(), errors: outcome.errors })
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical cache key: sorted-key JSON text. `serde_json::Map` is a
/// `BTreeMap` by default (no `preserve_order` feature), so two
/// structurally-equal schemas serialize identically regardless of the
/// order their fields were constructed in.
fn canonical_key(schema: &Value) -> String {
    serde_json::to_string(schema).unwrap_or_default()
}

/// Repairs common schema drift (spec §9 design note): `required` as a
/// bare string, `nullable: true` instead of a `null` type member.
fn normalize_schema(schema: &Value) -> Value {
    let mut schema = schema.clone();
    normalize_in_place(&mut schema);
    schema
}

fn normalize_in_place(node: &mut Value) {
    let Value::Object(map) = node else {
        if let Value::Array(items) = node {
            for item in items {
                normalize_in_place(item);
            }
        }
        return;
    };

    if let Some(required) = map.get("required").cloned() {
        if let Value::String(s) = required {
            map.insert("required".into(), Value::Array(vec![Value::String(s)]));
        }
    }

    if map.get("nullable").and_then(Value::as_bool) == Some(true) {
        let existing_type = map.remove("type");
        let mut types = match existing_type {
            Some(Value::String(t)) => vec![Value::String(t)],
            Some(Value::Array(ts)) => ts,
            _ => Vec::new(),
        };
        if !types.iter().any(|t| t.as_str() == Some("null")) {
            types.push(Value::String("null".into()));
        }
        map.insert("type".into(), Value::Array(types));
        map.remove("nullable");
    }

    for key in ["properties", "patternProperties"] {
        if let Some(Value::Object(props)) = map.get_mut(key) {
            for (_, sub) in props.iter_mut() {
                normalize_in_place(sub);
            }
        }
    }
    for key in ["items", "additionalProperties", "contains"] {
        if let Some(sub) = map.get_mut(key) {
            normalize_in_place(sub);
        }
    }
    for key in ["anyOf", "allOf", "oneOf"] {
        if let Some(Value::Array(variants)) = map.get_mut(key) {
            for variant in variants {
                normalize_in_place(variant);
            }
        }
    }
}

/// Best-effort type coercion plus default-fill, walked alongside the
/// schema shape. Unknown shapes are left untouched rather than rejected.
fn coerce_and_fill(schema: &Value, data: &mut Value) {
    let Some(schema) = schema.as_object() else { return };

    if let (Some(Value::Object(props)), Value::Object(data_map)) = (schema.get("properties"), &mut *data) {
        for (key, sub_schema) in props {
            if !data_map.contains_key(key) {
                if let Some(default) = sub_schema.get("default") {
                    data_map.insert(key.clone(), default.clone());
                    continue;
                }
            }
            if let Some(value) = data_map.get_mut(key) {
                coerce_value(sub_schema, value);
                coerce_and_fill(sub_schema, value);
            }
        }
    }

    if let (Some(items_schema), Value::Array(items)) = (schema.get("items"), &mut *data) {
        for item in items {
            coerce_value(items_schema, item);
            coerce_and_fill(items_schema, item);
        }
    }
}

fn coerce_value(schema: &Value, value: &mut Value) {
    let declared = match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => return,
    };

    if declared.contains(&"number") || declared.contains(&"integer") {
        if let Value::String(s) = value {
            if let Ok(n) = s.parse::<f64>() {
                *value = serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::String(s.clone()));
            }
        }
    } else if declared.contains(&"string") {
        match value {
            Value::Number(n) => *value = Value::String(n.to_string()),
            Value::Bool(b) => *value = Value::String(b.to_string()),
            _ => {}
        }
    } else if declared.contains(&"boolean") {
        if let Value::String(s) = value {
            match s.as_str() {
                "true" => *value = Value::Bool(true),
                "false" => *value = Value::Bool(false),
                _ => {}
            }
        }
    }
}

/// Drops object properties not declared in `properties` when the schema
/// explicitly sets `additionalProperties: false`. Called only on the
/// retry path, after the first validation attempt failed.
fn strip_unknown(schema: &Value, data: &mut Value) {
    let Some(schema) = schema.as_object() else { return };
    if schema.get("additionalProperties").and_then(Value::as_bool) != Some(false) {
        return;
    }
    let Some(Value::Object(props)) = schema.get("properties") else { return };
    if let Value::Object(data_map) = data {
        data_map.retain(|k, _| props.contains_key(k));
        for (key, sub_schema) in props {
            if let Some(v) = data_map.get_mut(key) {
                strip_unknown(sub_schema, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_string_to_number_and_fills_default() {
        let validator = SchemaValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {"type": "number"},
                "b": {"type": "number"},
                "op": {"type": "string", "default": "+"}
            },
            "required": ["a", "b"]
        });
        let outcome = validator.validate(&schema, &json!({"a": "10", "b": 5})).unwrap();
        assert!(outcome.valid, "{:?}", outcome.errors);
        assert_eq!(outcome.data["a"], json!(10.0));
        assert_eq!(outcome.data["op"], json!("+"));
    }

    #[test]
    fn strips_unknown_properties_on_failure_only() {
        let validator = SchemaValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "number"}},
            "required": ["a"],
            "additionalProperties": false
        });
        let outcome = validator.validate(&schema, &json!({"a": 1, "extra": "nope"})).unwrap();
        assert!(outcome.valid);
        assert!(outcome.data.get("extra").is_none());
    }

    #[test]
    fn normalizes_string_required_and_nullable() {
        let validator = SchemaValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string", "nullable": true}},
            "required": "a"
        });
        let outcome = validator.validate(&schema, &json!({"a": null})).unwrap();
        assert!(outcome.valid, "{:?}", outcome.errors);
    }

    #[test]
    fn compile_cache_reuses_validator_for_equal_schemas() {
        let validator = SchemaValidator::new();
        let schema_a = json!({"type": "object", "properties": {"x": {"type": "number"}}});
        let schema_b = json!({"type": "object", "properties": {"x": {"type": "number"}}});
        validator.validate(&schema_a, &json!({"x": 1})).unwrap();
        validator.validate(&schema_b, &json!({"x": 2})).unwrap();
        assert_eq!(validator.cache.len(), 1);
    }
}
