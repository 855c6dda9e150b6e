//! In-memory engine assembled from a manifest

use crate::dry_run::register_dry_run;
use crate::error::{CliError, CliResult};
use anyhow::Context;
use pageact_config::{EngineConfig, Manifest, ManifestLoader};
use pageact_core::{ActionId, Datasource, Page, Plugin, ViewMode};
use pageact_registry::PluginExecutorRegistry;
use pageact_runtime::{ActionExecutor, ActionService, PluginDatasourceValidator, Stores};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of creating one manifest action
#[derive(Debug, Clone)]
pub struct CreatedAction {
    pub id: ActionId,
    pub page: String,
    pub is_valid: bool,
    pub invalids: Vec<String>,
    pub datasource_invalids: Vec<String>,
    pub template_keys: Vec<String>,
}

/// Stores seeded from a manifest plus the services operating on them
pub struct Workspace {
    pub pages: Vec<Page>,
    pub plugins: Vec<Plugin>,
    pub datasources: Vec<Datasource>,
    pub actions: BTreeMap<String, CreatedAction>,
    pub service: ActionService,
    pub executor: ActionExecutor,
}

impl Workspace {
    /// Load settings and manifest from disk and build the workspace
    pub async fn load(manifest_path: &Path, config_path: Option<&Path>) -> CliResult<Self> {
        if !manifest_path.exists() {
            return Err(CliError::FileNotFound(manifest_path.display().to_string()));
        }
        let config = EngineConfig::load(config_path)
            .with_context(|| format!("Failed to load engine settings from {:?}", config_path))?;

        let loader = ManifestLoader::new();
        let manifest = loader.load_from_file(manifest_path).await?;
        Self::build(&loader, &manifest, config).await
    }

    /// Seed stores, then create and publish every action through the lifecycle
    pub async fn build(
        loader: &ManifestLoader,
        manifest: &Manifest,
        config: EngineConfig,
    ) -> CliResult<Self> {
        let stores = Stores::in_memory();
        let entities = loader
            .seed(manifest, stores.pages.as_ref(), stores.plugins.as_ref(), stores.datasources.as_ref())
            .await?;

        let mut registry = PluginExecutorRegistry::new();
        register_dry_run(&mut registry, entities.plugins.iter().map(|p| p.package_name.as_str()));
        let registry = Arc::new(registry);

        let validator =
            Arc::new(PluginDatasourceValidator::new(registry.clone(), stores.plugins.clone()));
        let service = ActionService::new(stores.clone(), validator);
        let executor = ActionExecutor::new(stores, registry, config);

        let mut actions = BTreeMap::new();
        for (name, action) in entities.actions {
            let page = action.snapshot.page_id.as_ref().map(|p| p.to_string()).unwrap_or_default();
            let created = service.create_action(action).await?;
            let id = created.id.clone().ok_or(pageact_core::CoreError::RepositorySaveFailed)?;
            service.publish_action(&id).await?;
            debug!(action = %name, action_id = %id, valid = ?created.snapshot.is_valid, "Created manifest action");

            let datasource_invalids = created
                .snapshot
                .datasource
                .as_ref()
                .map(|ds| ds.invalids.iter().cloned().collect())
                .unwrap_or_default();
            actions.insert(
                name,
                CreatedAction {
                    id,
                    page,
                    is_valid: created.snapshot.is_valid(),
                    invalids: created.snapshot.invalids.into_iter().collect(),
                    datasource_invalids,
                    template_keys: created.snapshot.json_path_keys.into_iter().collect(),
                },
            );
        }

        info!(actions = actions.len(), "Workspace ready");
        Ok(Self {
            pages: entities.pages,
            plugins: entities.plugins,
            datasources: entities.datasources,
            actions,
            service,
            executor,
        })
    }

    pub fn action(&self, name: &str) -> CliResult<&CreatedAction> {
        self.actions.get(name).ok_or_else(|| CliError::ActionNotFound(name.to_string()))
    }

    /// Snapshot of an action as it is stored now
    pub async fn view(&self, name: &str, view_mode: ViewMode) -> CliResult<pageact_core::Action> {
        let created = self.action(name)?;
        Ok(self.service.get_action(&created.id, view_mode, None).await?)
    }
}
