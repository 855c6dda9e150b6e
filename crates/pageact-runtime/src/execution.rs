//! Action execution: resolve, prepare, invoke with a single stale-connection
//! retry under a hard timeout, and normalize every outcome into a result.

use crate::error::RuntimeResult;
use crate::stores::Stores;
use crate::validator::{DatasourceValidator, PluginDatasourceValidator};
use pageact_config::EngineConfig;
use pageact_core::{
    error::reasons, pagination::prepare_configurations, sanitized, AclPermission, Action,
    ActionConfiguration, ActionId, CoreError, Datasource, DatasourceConfiguration,
    ExecuteRequest, ExecutionResult, ExecutionStatistics, Param, Plugin, PluginType, ViewMode,
};
use pageact_registry::{
    ConnectionContextCache, PluginError, PluginExecutor, PluginExecutorRegistry, PluginResult,
};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything resolved for one execution, up to the backend call
pub struct PreparedExecution {
    pub action: Action,
    pub datasource: Datasource,
    pub plugin: Plugin,
    pub executor: Arc<dyn PluginExecutor>,
    /// Configurations after placeholder rendering, pagination and header cleanup
    pub action_configuration: ActionConfiguration,
    pub datasource_configuration: DatasourceConfiguration,
}

impl fmt::Debug for PreparedExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedExecution")
            .field("action_id", &self.action.id)
            .field("datasource_id", &self.datasource.id)
            .field("plugin", &self.plugin.package_name)
            .finish_non_exhaustive()
    }
}

/// Executes stored actions against their datasources
pub struct ActionExecutor {
    stores: Stores,
    registry: Arc<PluginExecutorRegistry>,
    contexts: Arc<ConnectionContextCache>,
    validator: Arc<dyn DatasourceValidator>,
    config: EngineConfig,
}

impl ActionExecutor {
    pub fn new(stores: Stores, registry: Arc<PluginExecutorRegistry>, config: EngineConfig) -> Self {
        let validator =
            Arc::new(PluginDatasourceValidator::new(registry.clone(), stores.plugins.clone()));
        Self {
            stores,
            registry,
            contexts: Arc::new(ConnectionContextCache::new()),
            validator,
            config,
        }
    }

    /// Share a connection context cache with other executors
    pub fn with_contexts(mut self, contexts: Arc<ConnectionContextCache>) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn DatasourceValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn contexts(&self) -> &Arc<ConnectionContextCache> {
        &self.contexts
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute an action. Never fails: every rejection or backend error comes
    /// back as a result with `is_execution_success == false`.
    pub async fn execute(&self, request: ExecuteRequest) -> ExecutionResult {
        let action_id = request.action_id.clone();

        tracing::info!(action_id = %action_id, published = request.view_mode, "Starting action execution");

        let prepared = match self.prepare(request).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(
                    action_id = %action_id,
                    code = %e.code(),
                    error = %e,
                    "Action rejected before execution"
                );
                return ExecutionResult::failure(e.code(), e.to_string());
            }
        };

        let timeout_ms =
            prepared.action_configuration.timeout_ms_or(self.config.default_timeout_ms);
        let started = Instant::now();
        let mut attempts = 0u32;

        let outcome = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.invoke_with_retry(&prepared, &mut attempts),
        )
        .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(
                    action_id = %action_id,
                    duration_ms = duration_ms,
                    attempts = attempts,
                    error = %e,
                    "Action execution failed"
                );
                ExecutionResult::failure(e.status_code(), e.to_string())
            }
            Err(_) => {
                let e = PluginError::Timeout(timeout_ms);
                tracing::error!(action_id = %action_id, timeout_ms = timeout_ms, "Action execution timed out");
                ExecutionResult::failure(e.status_code(), e.to_string())
            }
        };

        let result = ExecutionResult {
            statistics: Some(ExecutionStatistics { duration_ms, attempts }),
            ..result
        };

        if result.is_execution_success {
            tracing::info!(
                action_id = %action_id,
                duration_ms = duration_ms,
                attempts = attempts,
                "Action execution completed successfully"
            );
            self.cache_response(action_id, &result);
        }

        result
    }

    /// Resolve and prepare an execution without contacting the backend
    pub async fn prepare(&self, request: ExecuteRequest) -> RuntimeResult<PreparedExecution> {
        let view_mode = ViewMode::from_flag(request.view_mode);
        let params = normalize_params(request.params);

        let (action, action_config) = self.load_action(&request.action_id, view_mode).await?;
        let datasource = self.resolve_datasource(&action).await?;

        // Validation and plugin lookup both only need the datasource
        let ((), (plugin, executor)) = tokio::try_join!(
            self.check_datasource(&request.action_id, &datasource),
            self.resolve_plugin(&datasource),
        )?;

        let (action_configuration, datasource_configuration) = prepare_configurations(
            &action_config,
            &datasource.datasource_configuration,
            &params,
            request.pagination_field,
        )?;

        tracing::debug!(
            action_id = %request.action_id,
            page_id = ?action.snapshot.page_id,
            plugin = %plugin.package_name,
            action_configuration = %sanitized(&action_configuration),
            datasource_configuration = %sanitized(&datasource_configuration),
            "Prepared action configurations"
        );

        Ok(PreparedExecution {
            action,
            datasource,
            plugin,
            executor,
            action_configuration,
            datasource_configuration,
        })
    }

    async fn load_action(
        &self,
        action_id: &ActionId,
        view_mode: ViewMode,
    ) -> RuntimeResult<(Action, ActionConfiguration)> {
        let record = self
            .stores
            .actions
            .find_by_id(action_id, Some(AclPermission::ExecuteActions))
            .await?
            .ok_or_else(|| CoreError::not_found("action", action_id))?;

        // A never-published action does not exist in published mode
        let action =
            record.view(view_mode).ok_or_else(|| CoreError::not_found("action", action_id))?;

        if !action.snapshot.is_valid() {
            let invalids = action.snapshot.invalids.iter().map(String::as_str);
            return Err(action_invalid(&action, action_id, invalids).into());
        }

        if record.plugin_type == Some(PluginType::Js) {
            return Err(CoreError::UnsupportedOperation.into());
        }

        let config = action.snapshot.action_configuration.clone().ok_or_else(|| {
            action_invalid(&action, action_id, [reasons::NO_CONFIGURATION_FOUND_IN_ACTION])
        })?;

        Ok((action, config))
    }

    async fn resolve_datasource(&self, action: &Action) -> RuntimeResult<Datasource> {
        let Some(datasource) = action.snapshot.datasource.as_ref() else {
            let name = action.snapshot.name.as_deref().unwrap_or_default();
            return Err(CoreError::not_found("datasource", format!("for action {}", name)).into());
        };

        let Some(id) = datasource.id.as_ref() else {
            return Ok(datasource.clone());
        };

        let stored = self
            .stores
            .datasources
            .find_by_id(id, Some(AclPermission::ExecuteDatasources))
            .await?
            .ok_or_else(|| CoreError::not_found("datasource", id))?;
        Ok(stored)
    }

    /// Embedded datasources are validated on every execution; stored ones
    /// carry the defects recorded when they were saved
    async fn check_datasource(
        &self,
        action_id: &ActionId,
        datasource: &Datasource,
    ) -> RuntimeResult<()> {
        let invalids: Vec<String> = if datasource.is_embedded() {
            self.validator.validate(datasource).await
        } else {
            datasource.invalids.iter().cloned().collect()
        };

        if invalids.is_empty() {
            return Ok(());
        }

        tracing::error!(
            action_id = %action_id,
            invalids = ?invalids,
            "Unable to execute action because its datasource is not valid"
        );
        Err(CoreError::InvalidDatasource(format!("[{}]", invalids.join(", "))).into())
    }

    async fn resolve_plugin(
        &self,
        datasource: &Datasource,
    ) -> RuntimeResult<(Plugin, Arc<dyn PluginExecutor>)> {
        let plugin_id = datasource.plugin_id.as_ref().ok_or(CoreError::PluginIdNotGiven)?;
        let resolved = self.registry.resolve_by_id(plugin_id, self.stores.plugins.as_ref()).await?;
        Ok(resolved)
    }

    /// Invoke once; on staleness invalidate the context and invoke exactly once more
    async fn invoke_with_retry(
        &self,
        prepared: &PreparedExecution,
        attempts: &mut u32,
    ) -> PluginResult<ExecutionResult> {
        *attempts += 1;
        match self.invoke(prepared).await {
            Err(e) if e.is_stale() => {
                tracing::info!(
                    datasource_id = ?prepared.datasource.id,
                    error = %e,
                    "Connection is stale, retrying with a fresh context"
                );
                if let Some(id) = prepared.datasource.id.as_ref() {
                    self.contexts.invalidate(id).await;
                }

                *attempts += 1;
                match self.invoke(prepared).await {
                    Err(e) if e.is_stale() => Err(PluginError::SecondaryStaleConnection),
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn invoke(&self, prepared: &PreparedExecution) -> PluginResult<ExecutionResult> {
        let context =
            self.contexts.get_context(&prepared.datasource, prepared.executor.as_ref()).await?;
        prepared
            .executor
            .execute(
                context.connection.clone(),
                &prepared.datasource_configuration,
                &prepared.action_configuration,
            )
            .await
    }

    /// Persist the body into the draft snapshot in the background. Applies to
    /// published executions too; failures are logged and dropped.
    fn cache_response(&self, action_id: ActionId, result: &ExecutionResult) {
        if !self.config.cache_response_bodies {
            return;
        }
        let Some(body) = result.cacheable_body() else {
            return;
        };
        if let Some(limit) = self.config.max_cached_body_bytes {
            if body.len() > limit {
                tracing::debug!(action_id = %action_id, bytes = body.len(), "Response body too large to cache");
                return;
            }
        }

        let actions = self.stores.actions.clone();
        tokio::spawn(async move {
            let mut record = match actions.find_by_id(&action_id, None).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tracing::warn!(action_id = %action_id, "Action disappeared before caching its response");
                    return;
                }
                Err(e) => {
                    tracing::warn!(action_id = %action_id, error = %e, "Failed to load action for response caching");
                    return;
                }
            };

            record.unpublished_action.cache_response = Some(body);
            if let Err(e) = actions.save(record).await {
                tracing::warn!(action_id = %action_id, error = %e, "Failed to cache action response");
            }
        });
    }
}

/// Absent values of named parameters become empty strings
fn normalize_params(params: Vec<Param>) -> Vec<Param> {
    params
        .into_iter()
        .map(|mut param| {
            if !param.key.is_empty() && param.value.is_none() {
                param.value = Some(String::new());
            }
            param
        })
        .collect()
}

fn action_invalid<'a>(
    action: &Action,
    action_id: &ActionId,
    reasons: impl IntoIterator<Item = &'a str>,
) -> CoreError {
    CoreError::ActionInvalid {
        name: action.snapshot.name.clone().unwrap_or_default(),
        id: action_id.to_string(),
        reasons: format!("[{}]", reasons.into_iter().collect::<Vec<_>>().join(", ")),
    }
}
