//! Error types for plugin resolution and backend invocation

use pageact_core::CoreError;
use thiserror::Error;

/// Status codes reported for plugin-level failures
pub mod status_codes {
    /// Generic sentinel for failures that carry no backend-specific code
    pub const PLUGIN_ERROR: &str = "5000";
    pub const CONNECTION_ERROR: &str = "5001";
    pub const INVALID_CONFIG: &str = "5003";
    pub const STALE_CONNECTION: &str = "5005";
    pub const SECONDARY_STALE_CONNECTION: &str = "5006";
    pub const TIMEOUT: &str = "5040";
}

/// Failures raised by a plugin executor or while talking to it
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// The cached connection was closed or invalidated by the backend
    #[error("Stale connection: {0}")]
    StaleConnection(String),

    /// Staleness persisted after the connection context was recreated
    #[error("Secondary stale connection error.")]
    SecondaryStaleConnection,

    #[error("Execution timed out after {0}ms")]
    Timeout(u64),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{message}")]
    Execution { code: Option<String>, message: String },
}

impl PluginError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution { code: None, message: message.into() }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution { code: Some(code.into()), message: message.into() }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, PluginError::StaleConnection(_))
    }

    /// Backend-specific code when present, otherwise the sentinel for the variant
    pub fn status_code(&self) -> String {
        let code = match self {
            PluginError::StaleConnection(_) => status_codes::STALE_CONNECTION,
            PluginError::SecondaryStaleConnection => status_codes::SECONDARY_STALE_CONNECTION,
            PluginError::Timeout(_) => status_codes::TIMEOUT,
            PluginError::Connection(_) => status_codes::CONNECTION_ERROR,
            PluginError::InvalidConfig(_) => status_codes::INVALID_CONFIG,
            PluginError::Execution { code: Some(code), .. } => return code.clone(),
            PluginError::Execution { code: None, .. } => status_codes::PLUGIN_ERROR,
        };
        code.to_string()
    }
}

pub type PluginResult<T> = Result<T, PluginError>;

/// Registry-specific errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unable to find plugin {0}")]
    PluginNotFound(String),

    #[error("Store operation failed: {0}")]
    Store(#[from] CoreError),
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::PluginNotFound(_) => CoreError::not_found("plugin", "").code(),
            RegistryError::Store(e) => e.code(),
        }
    }
}

/// Registry result type
pub type RegistryResult<T> = Result<T, RegistryError>;
