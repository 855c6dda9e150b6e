//! Datasource validation ahead of saving or executing

use async_trait::async_trait;
use pageact_core::{store::PluginStore, CoreError, Datasource};
use pageact_registry::PluginExecutorRegistry;
use std::sync::Arc;

/// Reports the defects of a datasource; an empty list means valid
#[async_trait]
pub trait DatasourceValidator: Send + Sync {
    async fn validate(&self, datasource: &Datasource) -> Vec<String>;
}

/// Checks the plugin reference, then lets the plugin's executor inspect the
/// configuration
pub struct PluginDatasourceValidator {
    registry: Arc<PluginExecutorRegistry>,
    plugins: Arc<dyn PluginStore>,
}

impl PluginDatasourceValidator {
    pub fn new(registry: Arc<PluginExecutorRegistry>, plugins: Arc<dyn PluginStore>) -> Self {
        Self { registry, plugins }
    }
}

#[async_trait]
impl DatasourceValidator for PluginDatasourceValidator {
    async fn validate(&self, datasource: &Datasource) -> Vec<String> {
        let Some(plugin_id) = datasource.plugin_id.as_ref() else {
            return vec![CoreError::PluginIdNotGiven.to_string()];
        };

        match self.registry.resolve_by_id(plugin_id, self.plugins.as_ref()).await {
            Ok((_, executor)) => executor.validate_datasource(&datasource.datasource_configuration).await,
            Err(e) => vec![e.to_string()],
        }
    }
}
