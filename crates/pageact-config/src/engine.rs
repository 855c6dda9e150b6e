//! Engine-wide execution settings

use crate::error::{ConfigError, ConfigResult};
use crate::loader::FileFormat;
use pageact_core::DEFAULT_ACTION_EXECUTION_TIMEOUT_MS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "PAGEACT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout for actions whose configuration does not set one
    pub default_timeout_ms: u64,
    /// Persist successful response bodies into the draft snapshot
    pub cache_response_bodies: bool,
    /// Bodies larger than this are not cached; `None` caches any size
    pub max_cached_body_bytes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_ACTION_EXECUTION_TIMEOUT_MS,
            cache_response_bodies: true,
            max_cached_body_bytes: None,
        }
    }
}

impl EngineConfig {
    /// Load from a YAML or JSON file, format chosen by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content, FileFormat::from_path(path)?)
    }

    pub fn parse(content: &str, format: FileFormat) -> ConfigResult<Self> {
        let config = match format {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        };
        Ok(config)
    }

    /// File settings (or defaults when `path` is `None`) with `PAGEACT_*`
    /// environment overrides applied on top
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup such as `std::env::var`
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(&env_key("DEFAULT_TIMEOUT_MS")) {
            self.default_timeout_ms = parse_override("DEFAULT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup(&env_key("CACHE_RESPONSE_BODIES")) {
            self.cache_response_bodies = parse_override("CACHE_RESPONSE_BODIES", &raw)?;
        }
        if let Some(raw) = lookup(&env_key("MAX_CACHED_BODY_BYTES")) {
            self.max_cached_body_bytes = match raw.trim() {
                "" | "none" => None,
                value => Some(parse_override("MAX_CACHED_BODY_BYTES", value)?),
            };
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::Validation("default_timeout_ms must be greater than zero".into()));
        }
        Ok(())
    }
}

fn env_key(name: &str) -> String {
    format!("{ENV_PREFIX}{name}")
}

fn parse_override<T: std::str::FromStr>(name: &str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: env_key(name),
        value: raw.to_string(),
    })
}
