use crate::error::CoreResult;
use crate::types::{
    AclPermission, ActionId, ActionRecord, Datasource, DatasourceId, Page, PageId, Plugin,
    PluginId,
};
use async_trait::async_trait;

/// Async trait for storing and retrieving action records
#[async_trait]
pub trait ActionRepository: Send + Sync {
    /// Get an action record by id; with a permission, only records granting it are returned
    async fn find_by_id(
        &self,
        id: &ActionId,
        permission: Option<AclPermission>,
    ) -> CoreResult<Option<ActionRecord>>;
    /// Insert or update a record, assigning an id on first save
    async fn save(&self, record: ActionRecord) -> CoreResult<ActionRecord>;
    /// Find the record whose draft snapshot has the given name on the given page
    async fn find_by_unpublished_name_and_page_id(
        &self,
        name: &str,
        page_id: &PageId,
        permission: Option<AclPermission>,
    ) -> CoreResult<Option<ActionRecord>>;
}

/// Async trait for storing and retrieving shared datasources
#[async_trait]
pub trait DatasourceStore: Send + Sync {
    async fn find_by_id(
        &self,
        id: &DatasourceId,
        permission: Option<AclPermission>,
    ) -> CoreResult<Option<Datasource>>;
    async fn save(&self, datasource: Datasource) -> CoreResult<Datasource>;
}

/// Async trait for plugin metadata lookups
#[async_trait]
pub trait PluginStore: Send + Sync {
    async fn find_by_id(&self, id: &PluginId) -> CoreResult<Option<Plugin>>;
    async fn save(&self, plugin: Plugin) -> CoreResult<Plugin>;
}

/// Async trait for page lookups
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn find_by_id(
        &self,
        id: &PageId,
        permission: Option<AclPermission>,
    ) -> CoreResult<Option<Page>>;
    async fn save(&self, page: Page) -> CoreResult<Page>;
}
