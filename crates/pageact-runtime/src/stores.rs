use pageact_core::store::{ActionRepository, DatasourceStore, PageStore, PluginStore};
use pageact_store::{
    MemoryActionRepository, MemoryDatasourceStore, MemoryPageStore, MemoryPluginStore,
};
use std::sync::Arc;

/// Persistence collaborators shared by the executor and the lifecycle service
#[derive(Clone)]
pub struct Stores {
    pub actions: Arc<dyn ActionRepository>,
    pub datasources: Arc<dyn DatasourceStore>,
    pub plugins: Arc<dyn PluginStore>,
    pub pages: Arc<dyn PageStore>,
}

impl Stores {
    pub fn new(
        actions: Arc<dyn ActionRepository>,
        datasources: Arc<dyn DatasourceStore>,
        plugins: Arc<dyn PluginStore>,
        pages: Arc<dyn PageStore>,
    ) -> Self {
        Self { actions, datasources, plugins, pages }
    }

    /// Fresh in-memory stores
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryActionRepository::new()),
            Arc::new(MemoryDatasourceStore::new()),
            Arc::new(MemoryPluginStore::new()),
            Arc::new(MemoryPageStore::new()),
        )
    }
}
