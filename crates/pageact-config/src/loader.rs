use crate::env_resolver::EnvResolver;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::{ActionConfig, DatasourceConfig, DatasourceRef, Manifest};
use pageact_core::{
    store::{DatasourceStore, PageStore, PluginStore},
    AclPermission, Action, ActionSnapshot, ApplicationId, Datasource, DatasourceId,
    OrganizationId, Page, PageId, Plugin, PluginId, Policy,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Supported file formats for configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Detect file format from extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            Some("json") => Ok(FileFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }
}

/// Entities built from a manifest; manifest names become record ids
#[derive(Debug, Clone, Default)]
pub struct ManifestEntities {
    pub pages: Vec<Page>,
    pub plugins: Vec<Plugin>,
    pub datasources: Vec<Datasource>,
    /// Draft actions keyed by manifest name, ready for creation
    pub actions: Vec<(String, Action)>,
}

/// Loads manifests and turns them into store entities
pub struct ManifestLoader {
    resolver: EnvResolver,
    /// User granted default policies on pages and datasources without any
    owner: String,
}

impl Default for ManifestLoader {
    fn default() -> Self {
        Self { resolver: EnvResolver::default(), owner: "manifest".to_string() }
    }
}

impl ManifestLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, resolver: EnvResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Load a manifest from a file
    pub async fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Manifest> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let format = FileFormat::from_path(path)?;

        self.parse_content(&content, format).await
    }

    /// Parse manifest content, resolving `${VAR}` references first
    pub async fn parse_content(&self, content: &str, format: FileFormat) -> ConfigResult<Manifest> {
        let root: JsonValue = match format {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        };
        let resolved = self.resolver.resolve(&root)?;
        let manifest: Manifest = serde_json::from_value(resolved)?;

        self.validate_manifest(&manifest)?;
        tracing::debug!(
            pages = manifest.pages.len(),
            datasources = manifest.datasources.len(),
            actions = manifest.actions.len(),
            "Loaded manifest"
        );
        Ok(manifest)
    }

    /// Check that every cross reference names an entry of the manifest
    fn validate_manifest(&self, manifest: &Manifest) -> ConfigResult<()> {
        for (name, datasource) in &manifest.datasources {
            self.check_plugin_ref(manifest, &format!("Datasource '{}'", name), datasource)?;
        }

        for (name, action) in &manifest.actions {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation("Empty action name".to_string()));
            }
            if !manifest.pages.contains_key(&action.page) {
                return Err(ConfigError::Validation(format!(
                    "Action '{}' references non-existent page '{}'",
                    name, action.page
                )));
            }
            match &action.datasource {
                Some(DatasourceRef::Named(ds)) if !manifest.datasources.contains_key(ds) => {
                    return Err(ConfigError::Validation(format!(
                        "Action '{}' references non-existent datasource '{}'",
                        name, ds
                    )));
                }
                Some(DatasourceRef::Embedded(embedded)) => {
                    self.check_plugin_ref(manifest, &format!("Action '{}'", name), embedded)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn check_plugin_ref(
        &self,
        manifest: &Manifest,
        owner: &str,
        datasource: &DatasourceConfig,
    ) -> ConfigResult<()> {
        if manifest.plugins.contains_key(&datasource.plugin) {
            return Ok(());
        }
        Err(ConfigError::Validation(format!(
            "{} references non-existent plugin '{}'",
            owner, datasource.plugin
        )))
    }

    /// Convert a manifest to entities
    pub fn to_entities(&self, manifest: &Manifest) -> ManifestEntities {
        let pages = manifest
            .pages
            .iter()
            .map(|(name, page)| Page {
                id: Some(PageId::new(name)),
                application_id: page.application_id.as_deref().map(ApplicationId::new),
                name: name.clone(),
                policies: self.policies_or_default(
                    &page.policies,
                    &[AclPermission::ReadPages, AclPermission::ManagePages],
                ),
            })
            .collect();

        let plugins = manifest
            .plugins
            .iter()
            .map(|(name, plugin)| Plugin {
                id: Some(PluginId::new(name)),
                name: name.clone(),
                plugin_type: plugin.plugin_type,
                package_name: plugin.package_name.clone(),
            })
            .collect();

        let datasources = manifest
            .datasources
            .iter()
            .map(|(name, ds)| {
                let mut datasource = self.datasource(ds);
                datasource.id = Some(DatasourceId::new(name));
                datasource.name = Some(name.clone());
                datasource.policies = self.policies_or_default(
                    &ds.policies,
                    &[AclPermission::ExecuteDatasources, AclPermission::ManageDatasources],
                );
                datasource
            })
            .collect();

        let actions = manifest
            .actions
            .iter()
            .map(|(name, action)| (name.clone(), self.action(name, action)))
            .collect();

        ManifestEntities { pages, plugins, datasources, actions }
    }

    /// Save pages, plugins and datasources; actions are returned for creation
    /// through the action lifecycle so they get validated.
    pub async fn seed(
        &self,
        manifest: &Manifest,
        pages: &dyn PageStore,
        plugins: &dyn PluginStore,
        datasources: &dyn DatasourceStore,
    ) -> ConfigResult<ManifestEntities> {
        let entities = self.to_entities(manifest);

        for page in &entities.pages {
            pages.save(page.clone()).await?;
        }
        for plugin in &entities.plugins {
            plugins.save(plugin.clone()).await?;
        }
        for datasource in &entities.datasources {
            datasources.save(datasource.clone()).await?;
        }

        tracing::info!(
            pages = entities.pages.len(),
            plugins = entities.plugins.len(),
            datasources = entities.datasources.len(),
            "Seeded stores from manifest"
        );
        Ok(entities)
    }

    fn datasource(&self, config: &DatasourceConfig) -> Datasource {
        Datasource {
            plugin_id: Some(PluginId::new(&config.plugin)),
            organization_id: config.organization_id.as_deref().map(OrganizationId::new),
            datasource_configuration: config.datasource_configuration.clone(),
            policies: config.policies.clone(),
            ..Default::default()
        }
    }

    fn action(&self, name: &str, config: &ActionConfig) -> Action {
        let datasource = config.datasource.as_ref().map(|ds| match ds {
            // Only the identity matters; the stored datasource is looked up on save
            DatasourceRef::Named(ds) => {
                Datasource { id: Some(DatasourceId::new(ds)), ..Default::default() }
            }
            DatasourceRef::Embedded(embedded) => self.datasource(embedded),
        });

        Action {
            plugin_type: config.plugin_type,
            documentation: config.description.clone(),
            snapshot: ActionSnapshot {
                name: Some(name.to_string()),
                page_id: Some(PageId::new(&config.page)),
                datasource,
                action_configuration: config.action_configuration.clone(),
                execute_on_load: config.execute_on_load,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn policies_or_default(
        &self,
        policies: &BTreeSet<Policy>,
        defaults: &[AclPermission],
    ) -> BTreeSet<Policy> {
        if !policies.is_empty() {
            return policies.clone();
        }
        defaults.iter().map(|p| Policy::new(*p, [self.owner.as_str()])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageact_core::{PaginationType, PluginType};
    use pageact_store::{MemoryDatasourceStore, MemoryPageStore, MemoryPluginStore};

    const MANIFEST: &str = r#"
version: "1.0"
pages:
  home:
    applicationId: app-1
plugins:
  postgres:
    type: DB
    packageName: postgres-plugin
  rest:
    type: API
    packageName: restapi-plugin
datasources:
  usersDb:
    plugin: postgres
    organizationId: org-1
    datasourceConfiguration:
      url: "postgres://${DB_HOST_FOR_MANIFEST_TEST:localhost}:5432/app"
actions:
  getUsers:
    page: home
    datasource: usersDb
    actionConfiguration:
      body: "select * from users where id = {{Table1.selectedRow.id}}"
  listOrders:
    page: home
    datasource:
      plugin: rest
      organizationId: org-1
      datasourceConfiguration:
        url: https://api.example.com
    actionConfiguration:
      path: /orders
      paginationType: URL
      next: "{{Table2.nextUrl}}"
"#;

    #[tokio::test]
    async fn parses_and_resolves_environment() {
        let loader = ManifestLoader::new();
        let manifest = loader.parse_content(MANIFEST, FileFormat::Yaml).await.unwrap();

        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.actions.len(), 2);
        let ds = &manifest.datasources["usersDb"];
        assert_eq!(
            ds.datasource_configuration.url.as_deref(),
            Some("postgres://localhost:5432/app")
        );
        let orders = manifest.actions["listOrders"].action_configuration.as_ref().unwrap();
        assert_eq!(orders.pagination_type, PaginationType::Url);
    }

    #[tokio::test]
    async fn resolver_whitelist_applies_to_manifest() {
        let loader = ManifestLoader::new().with_resolver(EnvResolver::new(vec!["SHOP_".into()]));

        let err = loader.parse_content(MANIFEST, FileFormat::Yaml).await.unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Env(crate::env_resolver::EnvResolverError::VarNotWhitelisted(ref name, _))
                if name == "DB_HOST_FOR_MANIFEST_TEST"
        ));
    }

    #[tokio::test]
    async fn test_missing_references() {
        let loader = ManifestLoader::new();
        let yaml = r#"
pages: {}
actions:
  getUsers:
    page: nowhere
"#;
        let err = loader.parse_content(yaml, FileFormat::Yaml).await.unwrap_err();
        assert!(err.to_string().contains("non-existent page 'nowhere'"));

        let yaml = r#"
pages: { home: {} }
datasources:
  db: { plugin: mongo }
"#;
        let err = loader.parse_content(yaml, FileFormat::Yaml).await.unwrap_err();
        assert!(err.to_string().contains("non-existent plugin 'mongo'"));
    }

    #[tokio::test]
    async fn entities_use_names_as_ids() {
        let loader = ManifestLoader::new().with_owner("dev");
        let manifest = loader.parse_content(MANIFEST, FileFormat::Yaml).await.unwrap();
        let entities = loader.to_entities(&manifest);

        let page = &entities.pages[0];
        assert_eq!(page.id, Some(PageId::new("home")));
        assert!(pageact_core::types::grants(&page.policies, AclPermission::ReadPages));
        assert!(page.policies.iter().all(|p| p.users.contains("dev")));

        let plugin = entities.plugins.iter().find(|p| p.name == "rest").unwrap();
        assert_eq!(plugin.plugin_type, PluginType::Api);

        let (_, orders) = entities.actions.iter().find(|(n, _)| n == "listOrders").unwrap();
        let embedded = orders.snapshot.datasource.as_ref().unwrap();
        assert!(embedded.is_embedded());
        assert_eq!(embedded.organization_id, Some(OrganizationId::new("org-1")));

        let (_, users) = entities.actions.iter().find(|(n, _)| n == "getUsers").unwrap();
        let named = users.snapshot.datasource.as_ref().unwrap();
        assert_eq!(named.id, Some(DatasourceId::new("usersDb")));
    }

    #[tokio::test]
    async fn seeds_memory_stores() {
        let loader = ManifestLoader::new();
        let manifest = loader.parse_content(MANIFEST, FileFormat::Yaml).await.unwrap();

        let pages = MemoryPageStore::new();
        let plugins = MemoryPluginStore::new();
        let datasources = MemoryDatasourceStore::new();
        loader.seed(&manifest, &pages, &plugins, &datasources).await.unwrap();

        assert!(pages
            .find_by_id(&PageId::new("home"), Some(AclPermission::ReadPages))
            .await
            .unwrap()
            .is_some());
        assert!(plugins.find_by_id(&PluginId::new("postgres")).await.unwrap().is_some());
        assert!(datasources
            .find_by_id(&DatasourceId::new("usersDb"), Some(AclPermission::ExecuteDatasources))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn loads_json_file() {
        use std::io::Write;
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"pages": {{"home": {{}}}}, "actions": {{"runScript": {{"page": "home", "pluginType": "JS"}}}}}}"#
        )
        .unwrap();

        let manifest = ManifestLoader::new().load_from_file(file.path()).await.unwrap();
        assert_eq!(manifest.actions["runScript"].plugin_type, Some(PluginType::Js));
    }
}
