//! Keys command: template keys an action depends on

use crate::{cli::OutputFormat, error::CliResult, utils::ColoredOutput, workspace::Workspace};
use pageact_core::ViewMode;
use pageact_runtime::extract_template_keys;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeSet;

pub struct KeysCommand;

impl KeysCommand {
    pub async fn run(workspace: &Workspace, action: &str, format: OutputFormat) -> CliResult<()> {
        let report = Self::report(workspace, action).await?;

        match format {
            OutputFormat::Table => {
                println!("{} {}", ColoredOutput::info("Keys of"), ColoredOutput::highlight(action));
                for key in report["actionKeys"].as_array().into_iter().flatten() {
                    println!("  {}", key.as_str().unwrap_or_default());
                }
                for key in report["datasourceKeys"].as_array().into_iter().flatten() {
                    println!("  {} {}", key.as_str().unwrap_or_default(), ColoredOutput::dim("(datasource)"));
                }
            }
            _ => println!("{}", format.format_json(&report)?),
        }
        Ok(())
    }

    /// Keys referenced by the action configuration, and those only the
    /// datasource brings in
    pub async fn report(workspace: &Workspace, action: &str) -> CliResult<JsonValue> {
        let view = workspace.view(action, ViewMode::Draft).await?;
        let action_keys = extract_template_keys(view.snapshot.action_configuration.as_ref());
        let datasource_keys: BTreeSet<&String> =
            view.snapshot.json_path_keys.iter().filter(|k| !action_keys.contains(*k)).collect();

        Ok(json!({
            "action": action,
            "actionKeys": action_keys,
            "datasourceKeys": datasource_keys,
        }))
    }
}
