//! Masking of credentials before configurations reach the logs

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Field names whose values are always masked
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "token",
    "access_token",
    "accesstoken",
    "refresh_token",
    "client_secret",
    "clientsecret",
    "api_key",
    "apikey",
    "authorization",
    "secret",
    "private_key",
    "credentials",
];

/// Substrings that mark a field as sensitive (case-insensitive)
const SENSITIVE_PATTERNS: &[&str] = &["_key", "_token", "_secret", "_password", "secret", "password"];

const SANITIZED_PLACEHOLDER: &str = "***REDACTED***";

/// Check if a field name indicates sensitive data
pub fn is_sensitive_field(field_name: &str) -> bool {
    let field_lower = field_name.to_lowercase();
    SENSITIVE_FIELDS.iter().any(|&sensitive| field_lower == sensitive)
        || SENSITIVE_PATTERNS.iter().any(|&pattern| field_lower.contains(pattern))
}

/// Mask sensitive values in a JSON tree.
///
/// Besides plain object fields this also handles property lists such as headers
/// (`{"key": "Authorization", "value": "..."}`), where the sensitive name sits in
/// `key` and the secret in `value`.
pub fn sanitize_json_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let property_is_sensitive = map
                .get("key")
                .and_then(JsonValue::as_str)
                .map(is_sensitive_field)
                .unwrap_or(false);

            let sanitized: Map<String, JsonValue> = map
                .iter()
                .map(|(key, val)| {
                    let masked = (is_sensitive_field(key)
                        || (property_is_sensitive && key == "value"))
                        && !matches!(val, JsonValue::Object(_) | JsonValue::Array(_) | JsonValue::Null);
                    let val = if masked {
                        JsonValue::String(SANITIZED_PLACEHOLDER.to_string())
                    } else {
                        sanitize_json_value(val)
                    };
                    (key.clone(), val)
                })
                .collect();
            JsonValue::Object(sanitized)
        }
        JsonValue::Array(arr) => JsonValue::Array(arr.iter().map(sanitize_json_value).collect()),
        other => other.clone(),
    }
}

/// Serialize and mask a configuration for logging
pub fn sanitized<T: Serialize>(config: &T) -> JsonValue {
    serde_json::to_value(config).map(|v| sanitize_json_value(&v)).unwrap_or(JsonValue::Null)
}
