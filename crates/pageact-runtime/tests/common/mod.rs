#![allow(dead_code)]

use async_trait::async_trait;
use pageact_config::EngineConfig;
use pageact_core::{
    store::{ActionRepository, DatasourceStore, PageStore, PluginStore},
    AclPermission, Action, ActionConfiguration, ActionId, ActionSnapshot, ApplicationId,
    Datasource, DatasourceConfiguration, DatasourceId, ExecutionResult, OrganizationId, Page,
    PageId, Plugin, PluginId, PluginType, Policy,
};
use pageact_registry::{
    AsAny, Connection, PluginError, PluginExecutor, PluginExecutorRegistry, PluginResult,
};
use pageact_runtime::{ActionExecutor, ActionService, PluginDatasourceValidator, Stores};
use pageact_store::{
    MemoryActionRepository, MemoryDatasourceStore, MemoryPageStore, MemoryPluginStore,
};
use serde_json::{json, Value as JsonValue};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PLUGIN_PACKAGE: &str = "postgres-plugin";

/// What the scripted executor does on its next `execute` call
pub enum Outcome {
    Body(JsonValue),
    Stale,
    Fail(PluginError),
    Sleep(Duration),
}

pub struct MockConnection {
    pub serial: usize,
    closes: Arc<AtomicUsize>,
}

impl AsAny for MockConnection {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Plugin executor driven by a queue of outcomes; an empty queue succeeds
#[derive(Default)]
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Outcome>>,
    pub creations: AtomicUsize,
    pub executions: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    /// Configurations received by `execute`, in call order
    pub seen: Mutex<Vec<(DatasourceConfiguration, ActionConfiguration)>>,
    /// Serial of the connection used by each `execute` call
    pub connections_used: Mutex<Vec<usize>>,
}

impl ScriptedExecutor {
    pub fn push(&self, outcome: Outcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> (DatasourceConfiguration, ActionConfiguration) {
        self.seen.lock().unwrap().last().cloned().expect("executor was called")
    }
}

#[async_trait]
impl PluginExecutor for ScriptedExecutor {
    fn plugin_name(&self) -> &str {
        PLUGIN_PACKAGE
    }

    async fn create_connection(
        &self,
        _config: &DatasourceConfiguration,
    ) -> PluginResult<Arc<dyn Connection>> {
        let serial = self.creations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(MockConnection { serial, closes: self.closes.clone() }))
    }

    async fn execute(
        &self,
        connection: Arc<dyn Connection>,
        datasource_config: &DatasourceConfiguration,
        action_config: &ActionConfiguration,
    ) -> PluginResult<ExecutionResult> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((datasource_config.clone(), action_config.clone()));
        let serial = connection
            .as_ref()
            .as_any()
            .downcast_ref::<MockConnection>()
            .map(|c| c.serial)
            .unwrap_or(0);
        self.connections_used.lock().unwrap().push(serial);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            None => Ok(ExecutionResult::success(json!([{"id": 1}]))
                .with_status_code("200")
                .with_headers(json!({"rowCount": 1}))),
            Some(Outcome::Body(body)) => Ok(ExecutionResult::success(body)),
            Some(Outcome::Stale) => Err(PluginError::StaleConnection("connection reset".into())),
            Some(Outcome::Fail(e)) => Err(e),
            Some(Outcome::Sleep(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(ExecutionResult::success(json!("late")))
            }
        }
    }

    async fn validate_datasource(&self, config: &DatasourceConfiguration) -> Vec<String> {
        match config.url {
            Some(_) => vec![],
            None => vec!["Missing URL.".to_string()],
        }
    }
}

pub struct Harness {
    pub actions: MemoryActionRepository,
    pub datasources: MemoryDatasourceStore,
    pub plugins: MemoryPluginStore,
    pub pages: MemoryPageStore,
    pub backend: Arc<ScriptedExecutor>,
    pub stores: Stores,
    pub registry: Arc<PluginExecutorRegistry>,
    pub executor: Arc<ActionExecutor>,
    pub service: ActionService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let actions = MemoryActionRepository::new();
        let datasources = MemoryDatasourceStore::new();
        let plugins = MemoryPluginStore::new();
        let pages = MemoryPageStore::new();

        plugins
            .save(Plugin {
                id: Some(PluginId::new("pg")),
                name: "PostgreSQL".into(),
                plugin_type: PluginType::Db,
                package_name: PLUGIN_PACKAGE.into(),
            })
            .await
            .unwrap();
        pages
            .save(Page {
                id: Some(PageId::new("p1")),
                application_id: Some(ApplicationId::new("app-1")),
                name: "Home".into(),
                policies: [
                    Policy::new(AclPermission::ReadPages, ["dev"]),
                    Policy::new(AclPermission::ManagePages, ["dev"]),
                ]
                .into_iter()
                .collect(),
            })
            .await
            .unwrap();
        datasources.save(stored_datasource("ds-1")).await.unwrap();

        let backend = Arc::new(ScriptedExecutor::default());
        let mut registry = PluginExecutorRegistry::new();
        registry.register(backend.clone());
        let registry = Arc::new(registry);

        let stores = Stores::new(
            Arc::new(actions.clone()),
            Arc::new(datasources.clone()),
            Arc::new(plugins.clone()),
            Arc::new(pages.clone()),
        );
        let validator =
            Arc::new(PluginDatasourceValidator::new(registry.clone(), stores.plugins.clone()));
        let executor = Arc::new(ActionExecutor::new(stores.clone(), registry.clone(), config));
        let service = ActionService::new(stores.clone(), validator);

        Self { actions, datasources, plugins, pages, backend, stores, registry, executor, service }
    }

    /// Create a draft through the lifecycle and return its id
    pub async fn create(&self, action: Action) -> ActionId {
        self.service.create_action(action).await.unwrap().id.unwrap()
    }

    /// Wait for the background response cache write
    pub async fn cached_response(&self, id: &ActionId) -> Option<String> {
        for _ in 0..100 {
            let record = self.actions.find_by_id(id, None).await.unwrap();
            if let Some(body) = record.and_then(|r| r.unpublished_action.cache_response) {
                return Some(body);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}

pub fn stored_datasource(id: &str) -> Datasource {
    Datasource {
        id: Some(DatasourceId::new(id)),
        name: Some("Users DB".into()),
        plugin_id: Some(PluginId::new("pg")),
        organization_id: Some(OrganizationId::new("org-1")),
        datasource_configuration: DatasourceConfiguration {
            url: Some("postgres://db.internal:5432/{{dbName}}".into()),
            ..Default::default()
        },
        policies: [
            Policy::new(AclPermission::ExecuteDatasources, ["dev"]),
            Policy::new(AclPermission::ManageDatasources, ["dev"]),
        ]
        .into_iter()
        .collect(),
        ..Default::default()
    }
}

/// A draft on page `p1` using the stored datasource `ds-1`
pub fn draft(name: &str) -> Action {
    Action {
        snapshot: ActionSnapshot {
            name: Some(name.to_string()),
            page_id: Some(PageId::new("p1")),
            datasource: Some(Datasource { id: Some(DatasourceId::new("ds-1")), ..Default::default() }),
            action_configuration: Some(ActionConfiguration {
                body: Some("select * from users where id = {{ id }}".into()),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A draft whose datasource is embedded rather than stored
pub fn embedded_draft(name: &str, url: Option<&str>) -> Action {
    let mut action = draft(name);
    action.snapshot.datasource = Some(Datasource {
        plugin_id: Some(PluginId::new("pg")),
        organization_id: Some(OrganizationId::new("org-1")),
        datasource_configuration: DatasourceConfiguration {
            url: url.map(str::to_string),
            ..Default::default()
        },
        ..Default::default()
    });
    action
}
