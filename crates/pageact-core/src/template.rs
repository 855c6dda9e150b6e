//! `{{key}}` placeholder rendering over configuration objects
//!
//! Configurations are walked as JSON trees: every string value (recursively through
//! objects and arrays) has its placeholders replaced from a substitution map.
//! Object keys are never rendered. Unknown keys leave the placeholder untouched,
//! so rendering is best-effort and never fails on missing values.

use crate::error::CoreResult;
use crate::types::Param;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, HashMap};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").unwrap());

/// Build the substitution map for a parameter list.
///
/// Keys are trimmed; for duplicate keys the first-seen value wins. Parameters with a
/// blank key are ignored and absent values render as the empty string.
pub fn substitution_map(params: &[Param]) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(params.len());
    for param in params {
        let key = param.key.trim();
        if key.is_empty() {
            continue;
        }
        map.entry(key.to_string()).or_insert_with(|| param.value.clone().unwrap_or_default());
    }
    map
}

/// Render the placeholders of a single string
pub fn render_str(input: &str, substitutions: &HashMap<String, String>) -> String {
    if !input.contains("{{") {
        return input.to_string();
    }
    PLACEHOLDER
        .replace_all(input, |caps: &Captures<'_>| match substitutions.get(caps[1].trim()) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Render every string inside a JSON value
pub fn resolve_value(value: &JsonValue, substitutions: &HashMap<String, String>) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(render_str(s, substitutions)),
        JsonValue::Object(obj) => JsonValue::Object(
            obj.iter().map(|(k, v)| (k.clone(), resolve_value(v, substitutions))).collect(),
        ),
        JsonValue::Array(arr) => {
            JsonValue::Array(arr.iter().map(|v| resolve_value(v, substitutions)).collect())
        }
        other => other.clone(),
    }
}

/// Render every string field of a typed configuration
pub fn resolve<T>(configuration: &T, substitutions: &HashMap<String, String>) -> CoreResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let tree = serde_json::to_value(configuration)?;
    let rendered = resolve_value(&tree, substitutions);
    Ok(serde_json::from_value(rendered)?)
}

/// Collect the trimmed keys of every placeholder inside a JSON value
pub fn extract_keys_from_value(value: &JsonValue) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    collect_keys(value, &mut keys);
    keys
}

/// Collect the trimmed keys of every placeholder in a typed configuration
pub fn extract_keys<T: Serialize>(configuration: &T) -> BTreeSet<String> {
    match serde_json::to_value(configuration) {
        Ok(tree) => extract_keys_from_value(&tree),
        Err(e) => {
            tracing::warn!(error = %e, "Unable to serialize configuration for key extraction");
            BTreeSet::new()
        }
    }
}

fn collect_keys(value: &JsonValue, keys: &mut BTreeSet<String>) {
    match value {
        JsonValue::String(s) => {
            for caps in PLACEHOLDER.captures_iter(s) {
                let key = caps[1].trim();
                if !key.is_empty() {
                    keys.insert(key.to_string());
                }
            }
        }
        JsonValue::Object(obj) => obj.values().for_each(|v| collect_keys(v, keys)),
        JsonValue::Array(arr) => arr.iter().for_each(|v| collect_keys(v, keys)),
        _ => {}
    }
}
