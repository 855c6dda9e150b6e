//! Render command: resolve an action and print the configurations its plugin
//! would receive, without connecting to the backend

use crate::{
    cli::PageDirection,
    error::{CliError, CliResult},
    utils::parse_param,
    workspace::Workspace,
};
use pageact_core::{sanitized, ExecuteRequest};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

pub struct RenderCommand;

impl RenderCommand {
    pub async fn run(
        workspace: &Workspace,
        action: &str,
        params: &[String],
        published: bool,
        page: Option<PageDirection>,
        pretty: bool,
    ) -> CliResult<()> {
        let rendered = Self::render(workspace, action, params, published, page).await?;
        let output = if pretty {
            serde_json::to_string_pretty(&rendered)?
        } else {
            serde_json::to_string(&rendered)?
        };
        println!("{}", output);
        Ok(())
    }

    pub async fn render(
        workspace: &Workspace,
        action: &str,
        params: &[String],
        published: bool,
        page: Option<PageDirection>,
    ) -> CliResult<JsonValue> {
        let created = workspace.action(action)?;

        let mut request = ExecuteRequest::new(created.id.clone());
        for raw in params {
            request.params.push(parse_param(raw)?);
        }
        if published {
            request = request.published();
        }
        if let Some(direction) = page {
            request = request.with_pagination(direction.into());
        }
        debug!(action = %action, params = request.params.len(), "Rendering action");

        let prepared = workspace.executor.prepare(request).await.map_err(|e| {
            CliError::InvalidArgument(format!("Action '{}' cannot run ({}): {}", action, e.code(), e))
        })?;

        Ok(json!({
            "action": action,
            "plugin": prepared.plugin.package_name,
            "datasource": prepared.datasource.id,
            "timeoutMs": prepared
                .action_configuration
                .timeout_ms_or(workspace.executor.config().default_timeout_ms),
            "actionConfiguration": sanitized(&prepared.action_configuration),
            "datasourceConfiguration": sanitized(&prepared.datasource_configuration),
        }))
    }
}
