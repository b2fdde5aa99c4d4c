//! Schema validation helpers for Scribe JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(
        map,
        &["$schema", "ledger", "operations", "analysis", "cipher"],
        layer,
        "",
    )?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("ledger") {
        validate_ledger(value, layer, "ledger")?;
    }
    if let Some(value) = map.get("operations") {
        validate_operations(value, layer, "operations")?;
    }
    if let Some(value) = map.get("analysis") {
        validate_analysis(value, layer, "analysis")?;
    }
    if let Some(value) = map.get("cipher") {
        let map = expect_object(value, layer, "cipher")?;
        ensure_allowed_keys(map, &["token_prefix"], layer, "cipher")?;
        if let Some(value) = map.get("token_prefix") {
            expect_string(value, layer, "cipher.token_prefix")?;
        }
    }
    Ok(())
}

/// Validate the "ledger" block.
fn validate_ledger(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["backend", "path", "index_key", "record_prefix", "deadline_ms"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("backend") {
        let backend_path = join_path(path, "backend");
        match value.as_str() {
            Some("memory" | "file") => {}
            Some(_) => {
                return Err(invalid_field(
                    layer,
                    &backend_path,
                    "expected one of: memory, file",
                ));
            }
            None => return Err(invalid_field(layer, &backend_path, "expected string")),
        }
    }
    for key in ["path", "index_key", "record_prefix"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("deadline_ms") {
        expect_u64(value, layer, &join_path(path, "deadline_ms"))?;
    }
    Ok(())
}

/// Validate the "operations" block.
fn validate_operations(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["success_display_ms", "error_display_ms"],
        layer,
        path,
    )?;
    for (key, value) in map {
        expect_u64(value, layer, &join_path(path, key))?;
    }
    Ok(())
}

/// Validate the "analysis" block.
fn validate_analysis(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["simulated_latency_ms", "recommendations"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("simulated_latency_ms") {
        expect_u64(value, layer, &join_path(path, "simulated_latency_ms"))?;
    }
    if let Some(value) = map.get("recommendations") {
        validate_string_array(value, layer, &join_path(path, "recommendations"))?;
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid_field(layer, path, "expected object"))
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::String(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected string")),
    }
}

/// Non-negative integers only; durations and deadlines cannot be negative.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Value::Array(entries) = value else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    match entries.iter().position(|entry| !entry.is_string()) {
        Some(idx) => Err(invalid_field(
            layer,
            &format!("{path}[{idx}]"),
            "expected string",
        )),
        None => Ok(()),
    }
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

/// Join nested paths for error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}
