//! Process-wide cache of live connections keyed by datasource identity

use crate::error::PluginResult;
use crate::factory::{Connection, PluginExecutor};
use pageact_core::{Datasource, DatasourceId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Live handle bound to one datasource
pub struct ConnectionContext {
    /// `None` for embedded datasources, whose contexts are never cached
    pub datasource_id: Option<DatasourceId>,
    pub connection: Arc<dyn Connection>,
    pub created_at: Instant,
}

impl ConnectionContext {
    pub fn new(datasource_id: Option<DatasourceId>, connection: Arc<dyn Connection>) -> Self {
        Self { datasource_id, connection, created_at: Instant::now() }
    }
}

impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("datasource_id", &self.datasource_id)
            .field("age_ms", &self.created_at.elapsed().as_millis())
            .finish()
    }
}

/// Per-datasource slot; its lock serializes creation for one identity only
type ContextSlot = Arc<Mutex<Option<Arc<ConnectionContext>>>>;

/// Connection context cache.
///
/// The outer map lock is held only long enough to fetch or insert a slot, so
/// slow connection setup for one datasource never blocks another.
#[derive(Default)]
pub struct ConnectionContextCache {
    slots: RwLock<HashMap<DatasourceId, ContextSlot>>,
}

impl ConnectionContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached context for the datasource, creating it on first use.
    ///
    /// Embedded datasources have no identity and always get a fresh context.
    pub async fn get_context(
        &self,
        datasource: &Datasource,
        executor: &dyn PluginExecutor,
    ) -> PluginResult<Arc<ConnectionContext>> {
        let config = &datasource.datasource_configuration;

        let Some(id) = datasource.id.as_ref() else {
            tracing::debug!(plugin = executor.plugin_name(), "Creating context for embedded datasource");
            let connection = executor.create_connection(config).await?;
            return Ok(Arc::new(ConnectionContext::new(None, connection)));
        };

        let slot = self.slot(id).await;
        let mut guard = slot.lock().await;
        if let Some(context) = guard.as_ref() {
            return Ok(context.clone());
        }

        tracing::info!(datasource_id = %id, plugin = executor.plugin_name(), "Creating connection context");
        let connection = executor.create_connection(config).await?;
        tracing::debug!(datasource_id = %id, metadata = ?connection.metadata(), "Connection established");
        let context = Arc::new(ConnectionContext::new(Some(id.clone()), connection));
        *guard = Some(context.clone());
        Ok(context)
    }

    /// Drop and close the cached context; returns whether one existed.
    ///
    /// The slot stays in the map, so a creation already running for this
    /// datasource finishes first and later callers queue on the same lock.
    pub async fn invalidate(&self, datasource_id: &DatasourceId) -> bool {
        let Some(slot) = self.slots.read().await.get(datasource_id).cloned() else {
            return false;
        };

        let context = slot.lock().await.take();
        match context {
            Some(context) => {
                tracing::info!(datasource_id = %datasource_id, "Invalidating connection context");
                context.connection.close().await;
                true
            }
            None => false,
        }
    }

    /// Close and drop every cached context
    pub async fn clear(&self) {
        let slots: Vec<ContextSlot> = self.slots.read().await.values().cloned().collect();
        for slot in slots {
            if let Some(context) = slot.lock().await.take() {
                context.connection.close().await;
            }
        }
    }

    /// Number of datasources with a live cached context
    pub async fn cached_contexts(&self) -> usize {
        let slots: Vec<ContextSlot> = self.slots.read().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    async fn slot(&self, id: &DatasourceId) -> ContextSlot {
        if let Some(slot) = self.slots.read().await.get(id) {
            return slot.clone();
        }
        let mut slots = self.slots.write().await;
        slots.entry(id.clone()).or_default().clone()
    }
}
