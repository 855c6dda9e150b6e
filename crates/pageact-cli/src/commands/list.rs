//! List command for pages, plugins, datasources and actions

use crate::{
    cli::{ListResource, OutputFormat},
    error::CliResult,
    utils::{truncate_text, ColoredOutput},
    workspace::Workspace,
};
use pageact_core::sanitized;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

pub struct ListCommand;

impl ListCommand {
    pub async fn run(workspace: &Workspace, resource: ListResource) -> CliResult<()> {
        match resource {
            ListResource::Pages { format } => {
                let rows: Vec<JsonValue> = workspace
                    .pages
                    .iter()
                    .map(|page| json!({ "id": page.id, "applicationId": page.application_id }))
                    .collect();
                Self::print(&rows, format, &["id", "applicationId"])
            }
            ListResource::Plugins { format } => {
                let rows: Vec<JsonValue> = workspace
                    .plugins
                    .iter()
                    .map(|plugin| {
                        json!({
                            "id": plugin.id,
                            "type": plugin.plugin_type,
                            "packageName": plugin.package_name,
                        })
                    })
                    .collect();
                Self::print(&rows, format, &["id", "type", "packageName"])
            }
            ListResource::Datasources { format } => {
                let rows: Vec<JsonValue> = workspace
                    .datasources
                    .iter()
                    .map(|ds| {
                        json!({
                            "id": ds.id,
                            "pluginId": ds.plugin_id,
                            "organizationId": ds.organization_id,
                            "datasourceConfiguration": sanitized(&ds.datasource_configuration),
                        })
                    })
                    .collect();
                Self::print(&rows, format, &["id", "pluginId", "organizationId"])
            }
            ListResource::Actions { page, format } => {
                debug!("Listing actions with page filter: {:?}", page);
                let rows: Vec<JsonValue> = workspace
                    .actions
                    .iter()
                    .filter(|(_, action)| page.as_deref().map_or(true, |p| action.page == p))
                    .map(|(name, action)| {
                        json!({
                            "name": name,
                            "page": action.page,
                            "isValid": action.is_valid,
                        })
                    })
                    .collect();
                Self::print(&rows, format, &["name", "page", "isValid"])
            }
        }
    }

    fn print(rows: &[JsonValue], format: OutputFormat, columns: &[&str]) -> CliResult<()> {
        match format {
            OutputFormat::Table => Self::display_table(rows, columns),
            _ => println!("{}", format.format_json(&JsonValue::Array(rows.to_vec()))?),
        }
        Ok(())
    }

    fn display_table(rows: &[JsonValue], columns: &[&str]) {
        if rows.is_empty() {
            println!("{}", ColoredOutput::warning("Nothing found"));
            return;
        }

        let header: Vec<String> = columns.iter().map(|c| format!("{:<24}", c.to_uppercase())).collect();
        println!("{}", header.join(" "));
        println!("{}", "-".repeat(25 * columns.len()));

        for row in rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| {
                    let cell = match &row[*c] {
                        JsonValue::String(s) => s.clone(),
                        JsonValue::Null => "-".to_string(),
                        other => other.to_string(),
                    };
                    format!("{:<24}", truncate_text(&cell, 24))
                })
                .collect();
            println!("{}", cells.join(" "));
        }

        println!();
        println!("{}", ColoredOutput::dim(&format!("{} entries", rows.len())));
    }
}
