//! Plugin executors that stand in for real connectors during CLI dry runs

use async_trait::async_trait;
use pageact_core::{ActionConfiguration, DatasourceConfiguration, ExecutionResult};
use pageact_registry::{Connection, PluginError, PluginExecutor, PluginExecutorRegistry, PluginResult};
use std::sync::Arc;

/// Resolves like a real executor so validation and rendering can run, but
/// never opens a connection
#[derive(Debug, Clone)]
pub struct DryRunExecutor {
    package_name: String,
}

impl DryRunExecutor {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self { package_name: package_name.into() }
    }
}

#[async_trait]
impl PluginExecutor for DryRunExecutor {
    fn plugin_name(&self) -> &str {
        &self.package_name
    }

    async fn create_connection(
        &self,
        _datasource_config: &DatasourceConfiguration,
    ) -> PluginResult<Arc<dyn Connection>> {
        Err(PluginError::Connection(format!(
            "plugin {} has no connector in dry-run mode",
            self.package_name
        )))
    }

    async fn execute(
        &self,
        _connection: Arc<dyn Connection>,
        _datasource_config: &DatasourceConfiguration,
        _action_config: &ActionConfiguration,
    ) -> PluginResult<ExecutionResult> {
        Err(PluginError::Connection(format!(
            "plugin {} has no connector in dry-run mode",
            self.package_name
        )))
    }

    async fn validate_datasource(&self, config: &DatasourceConfiguration) -> Vec<String> {
        if config.url.is_none() && config.endpoints.is_empty() {
            return vec!["Missing endpoint and url".to_string()];
        }
        Vec::new()
    }
}

/// Register a dry-run executor for every package not already served
pub fn register_dry_run<'a>(
    registry: &mut PluginExecutorRegistry,
    packages: impl IntoIterator<Item = &'a str>,
) {
    for package in packages {
        if registry.get(package).is_none() {
            registry.register(Arc::new(DryRunExecutor::new(package)));
        }
    }
}
