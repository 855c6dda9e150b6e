//! Plugin executor registry keyed by plugin package name

use crate::{
    error::{RegistryError, RegistryResult},
    factory::PluginExecutor,
};
use pageact_core::{store::PluginStore, Plugin, PluginId};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps plugin package names to the executors that serve them
#[derive(Default)]
pub struct PluginExecutorRegistry {
    executors: HashMap<String, Arc<dyn PluginExecutor>>,
}

impl PluginExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor under its plugin name, replacing any previous one
    pub fn register(&mut self, executor: Arc<dyn PluginExecutor>) {
        let name = executor.plugin_name().to_string();
        if self.executors.insert(name.clone(), executor).is_some() {
            tracing::warn!(plugin = %name, "Replacing previously registered plugin executor");
        } else {
            tracing::debug!(plugin = %name, "Registered plugin executor");
        }
    }

    /// Get list of registered plugin names
    pub fn registered_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self.executors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, package_name: &str) -> Option<Arc<dyn PluginExecutor>> {
        self.executors.get(package_name).cloned()
    }

    /// Executor for a plugin entity
    pub fn resolve(&self, plugin: &Plugin) -> RegistryResult<Arc<dyn PluginExecutor>> {
        self.get(&plugin.package_name)
            .ok_or_else(|| RegistryError::PluginNotFound(plugin.package_name.clone()))
    }

    /// Load the plugin entity and resolve its executor
    pub async fn resolve_by_id(
        &self,
        plugin_id: &PluginId,
        plugins: &dyn PluginStore,
    ) -> RegistryResult<(Plugin, Arc<dyn PluginExecutor>)> {
        let plugin = plugins
            .find_by_id(plugin_id)
            .await?
            .ok_or_else(|| RegistryError::PluginNotFound(plugin_id.to_string()))?;
        let executor = self.resolve(&plugin)?;
        Ok((plugin, executor))
    }
}
