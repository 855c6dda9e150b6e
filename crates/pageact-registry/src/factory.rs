//! Capability traits implemented by backend connectors

use crate::error::PluginResult;
use async_trait::async_trait;
use pageact_core::{ActionConfiguration, DatasourceConfiguration, ExecutionResult};
use serde_json::Value as JsonValue;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait to enable downcasting for trait objects
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

/// Live backend connection or session owned by a connection context
#[async_trait]
pub trait Connection: Send + Sync + AsAny {
    /// Release backend resources; called when the context is invalidated
    async fn close(&self) {}

    /// Connection metadata (for debugging/monitoring)
    fn metadata(&self) -> HashMap<String, JsonValue> {
        HashMap::new()
    }
}

/// Backend-specific executor for one plugin type
#[async_trait]
pub trait PluginExecutor: Send + Sync {
    /// Registry key; matches `Plugin::package_name`
    fn plugin_name(&self) -> &str;

    /// Open a connection for a datasource configuration
    async fn create_connection(
        &self,
        datasource_config: &DatasourceConfiguration,
    ) -> PluginResult<Arc<dyn Connection>>;

    /// Run an action over a live connection.
    ///
    /// Implementations report a closed or invalidated connection with
    /// [`PluginError::StaleConnection`](crate::error::PluginError::StaleConnection)
    /// so the caller can recreate the context and retry.
    async fn execute(
        &self,
        connection: Arc<dyn Connection>,
        datasource_config: &DatasourceConfiguration,
        action_config: &ActionConfiguration,
    ) -> PluginResult<ExecutionResult>;

    /// Describe configuration defects; an empty list means valid
    async fn validate_datasource(&self, datasource_config: &DatasourceConfiguration) -> Vec<String> {
        let _ = datasource_config;
        Vec::new()
    }
}
