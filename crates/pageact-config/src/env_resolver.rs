//! Environment variable resolution with whitelist and default value support

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::env;
use thiserror::Error;

static VAR_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").unwrap());

/// Errors that can occur during environment variable resolution
#[derive(Debug, Error)]
pub enum EnvResolverError {
    #[error("Environment variable '{0}' not found and no default provided")]
    VarNotFound(String),
    #[error("Environment variable '{0}' is not in whitelist. Allowed prefixes: {1:?}")]
    VarNotWhitelisted(String, Vec<String>),
    #[error("Recursive variable reference detected in '{0}'")]
    RecursiveReference(String),
}

/// Environment variable resolver with whitelist support
#[derive(Debug, Clone)]
pub struct EnvResolver {
    /// Allowed prefixes for environment variables; empty means no restrictions
    allowed_prefixes: Vec<String>,
    max_depth: usize,
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self {
            allowed_prefixes: vec![
                "PAGEACT_".to_string(),
                "APP_".to_string(),
                "HTTP_".to_string(),
                "DB_".to_string(),
                "PG_".to_string(),
            ],
            max_depth: 10,
        }
    }
}

impl EnvResolver {
    pub fn new(allowed_prefixes: Vec<String>) -> Self {
        Self { allowed_prefixes, ..Self::default() }
    }

    /// Resolve environment variables in a JSON value
    /// Supports ${VAR} and ${VAR:default} syntax
    pub fn resolve(&self, value: &JsonValue) -> Result<JsonValue, EnvResolverError> {
        self.resolve_recursive(value, 0, &mut HashSet::new())
    }

    fn resolve_recursive(
        &self,
        value: &JsonValue,
        depth: usize,
        visited: &mut HashSet<String>,
    ) -> Result<JsonValue, EnvResolverError> {
        if depth > self.max_depth {
            return Err(EnvResolverError::RecursiveReference(
                "Maximum recursion depth exceeded".to_string(),
            ));
        }

        match value {
            JsonValue::String(s) => self.resolve_string(s, visited),
            JsonValue::Object(obj) => {
                let mut resolved_obj = serde_json::Map::new();
                for (key, val) in obj {
                    resolved_obj.insert(key.clone(), self.resolve_recursive(val, depth + 1, visited)?);
                }
                Ok(JsonValue::Object(resolved_obj))
            }
            JsonValue::Array(arr) => arr
                .iter()
                .map(|item| self.resolve_recursive(item, depth + 1, visited))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(
        &self,
        input: &str,
        visited: &mut HashSet<String>,
    ) -> Result<JsonValue, EnvResolverError> {
        if !input.contains("${") {
            return Ok(JsonValue::String(input.to_string()));
        }

        if !visited.insert(input.to_string()) {
            return Err(EnvResolverError::RecursiveReference(input.to_string()));
        }

        let mut result = input.to_string();
        // Values may themselves contain references; bounded by max_depth passes
        for _ in 0..=self.max_depth {
            if !VAR_REF.is_match(&result) {
                break;
            }
            let mut next = result.clone();
            for caps in VAR_REF.captures_iter(&result) {
                let var_name = &caps[1];
                self.validate_var_name(var_name)?;

                let value = match env::var(var_name) {
                    Ok(value) => value,
                    Err(_) => match caps.get(2) {
                        Some(default) => default.as_str().to_string(),
                        None => return Err(EnvResolverError::VarNotFound(var_name.to_string())),
                    },
                };
                next = next.replace(&caps[0], &value);
            }
            if next == result {
                break;
            }
            result = next;
        }

        if VAR_REF.is_match(&result) {
            return Err(EnvResolverError::RecursiveReference(input.to_string()));
        }
        visited.remove(input);

        // Manifest fields such as passwords are typed as strings, so resolved
        // values are never reparsed into numbers or booleans
        Ok(JsonValue::String(result))
    }

    fn validate_var_name(&self, var_name: &str) -> Result<(), EnvResolverError> {
        if self.allowed_prefixes.is_empty()
            || self.allowed_prefixes.iter().any(|prefix| var_name.starts_with(prefix))
        {
            return Ok(());
        }

        Err(EnvResolverError::VarNotWhitelisted(
            var_name.to_string(),
            self.allowed_prefixes.clone(),
        ))
    }
}
