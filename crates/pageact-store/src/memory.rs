use async_trait::async_trait;
use chrono::Utc;
use pageact_core::{
    store::{ActionRepository, DatasourceStore, PageStore, PluginStore},
    types::grants,
    AclPermission, ActionId, ActionRecord, CoreResult, Datasource, DatasourceId, Page, PageId,
    Plugin, PluginId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// In-memory implementation of ActionRepository
#[derive(Debug, Clone, Default)]
pub struct MemoryActionRepository {
    data: Arc<RwLock<HashMap<ActionId, ActionRecord>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryActionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl ActionRepository for MemoryActionRepository {
    async fn find_by_id(
        &self,
        id: &ActionId,
        permission: Option<AclPermission>,
    ) -> CoreResult<Option<ActionRecord>> {
        let data = self.data.read().await;
        Ok(data
            .get(id)
            .filter(|record| permission.map_or(true, |p| grants(&record.policies, p)))
            .cloned())
    }

    async fn save(&self, mut record: ActionRecord) -> CoreResult<ActionRecord> {
        let id = record.id.get_or_insert_with(|| ActionId::new(new_id())).clone();
        record.updated_at = Utc::now();

        let mut data = self.data.write().await;
        data.insert(id, record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn find_by_unpublished_name_and_page_id(
        &self,
        name: &str,
        page_id: &PageId,
        permission: Option<AclPermission>,
    ) -> CoreResult<Option<ActionRecord>> {
        let data = self.data.read().await;
        Ok(data
            .values()
            .filter(|record| permission.map_or(true, |p| grants(&record.policies, p)))
            .find(|record| {
                record.unpublished_action.name.as_deref() == Some(name)
                    && record.unpublished_action.page_id.as_ref() == Some(page_id)
            })
            .cloned())
    }
}

/// In-memory implementation of DatasourceStore
#[derive(Debug, Clone, Default)]
pub struct MemoryDatasourceStore {
    data: Arc<RwLock<HashMap<DatasourceId, Datasource>>>,
}

impl MemoryDatasourceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatasourceStore for MemoryDatasourceStore {
    async fn find_by_id(
        &self,
        id: &DatasourceId,
        permission: Option<AclPermission>,
    ) -> CoreResult<Option<Datasource>> {
        let data = self.data.read().await;
        Ok(data
            .get(id)
            .filter(|ds| permission.map_or(true, |p| grants(&ds.policies, p)))
            .cloned())
    }

    async fn save(&self, mut datasource: Datasource) -> CoreResult<Datasource> {
        let id = datasource.id.get_or_insert_with(|| DatasourceId::new(new_id())).clone();
        let mut data = self.data.write().await;
        data.insert(id, datasource.clone());
        Ok(datasource)
    }
}

/// In-memory implementation of PluginStore
#[derive(Debug, Clone, Default)]
pub struct MemoryPluginStore {
    data: Arc<RwLock<HashMap<PluginId, Plugin>>>,
}

impl MemoryPluginStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginStore for MemoryPluginStore {
    async fn find_by_id(&self, id: &PluginId) -> CoreResult<Option<Plugin>> {
        let data = self.data.read().await;
        Ok(data.get(id).cloned())
    }

    async fn save(&self, mut plugin: Plugin) -> CoreResult<Plugin> {
        let id = plugin.id.get_or_insert_with(|| PluginId::new(new_id())).clone();
        let mut data = self.data.write().await;
        data.insert(id, plugin.clone());
        Ok(plugin)
    }
}

/// In-memory implementation of PageStore
#[derive(Debug, Clone, Default)]
pub struct MemoryPageStore {
    data: Arc<RwLock<HashMap<PageId, Page>>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn find_by_id(
        &self,
        id: &PageId,
        permission: Option<AclPermission>,
    ) -> CoreResult<Option<Page>> {
        let data = self.data.read().await;
        Ok(data
            .get(id)
            .filter(|page| permission.map_or(true, |p| grants(&page.policies, p)))
            .cloned())
    }

    async fn save(&self, mut page: Page) -> CoreResult<Page> {
        let id = page.id.get_or_insert_with(|| PageId::new(new_id())).clone();
        let mut data = self.data.write().await;
        data.insert(id, page.clone());
        Ok(page)
    }
}
