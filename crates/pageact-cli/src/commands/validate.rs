//! Validate command: create every manifest action and report what is wrong with it

use crate::{
    cli::OutputFormat,
    error::{CliError, CliResult},
    utils::{truncate_text, ColoredOutput},
    workspace::Workspace,
};
use serde_json::{json, Value as JsonValue};

pub struct ValidateCommand;

impl ValidateCommand {
    pub async fn run(workspace: &Workspace, format: OutputFormat, strict: bool) -> CliResult<()> {
        match format {
            OutputFormat::Table => Self::display_table(workspace),
            _ => println!("{}", format.format_json(&Self::report(workspace))?),
        }

        let invalid = Self::invalid_count(workspace);
        if strict && invalid > 0 {
            return Err(CliError::InvalidActions(invalid, workspace.actions.len()));
        }
        Ok(())
    }

    /// Actions that would be refused at execution time
    pub fn invalid_count(workspace: &Workspace) -> usize {
        workspace
            .actions
            .values()
            .filter(|a| !a.is_valid || !a.datasource_invalids.is_empty())
            .count()
    }

    pub fn report(workspace: &Workspace) -> JsonValue {
        let actions: Vec<JsonValue> = workspace
            .actions
            .iter()
            .map(|(name, action)| {
                json!({
                    "name": name,
                    "id": action.id,
                    "page": action.page,
                    "isValid": action.is_valid,
                    "invalids": action.invalids,
                    "datasourceInvalids": action.datasource_invalids,
                    "jsonPathKeys": action.template_keys,
                })
            })
            .collect();

        json!({
            "actions": actions,
            "total": workspace.actions.len(),
            "invalid": Self::invalid_count(workspace),
        })
    }

    fn display_table(workspace: &Workspace) {
        if workspace.actions.is_empty() {
            println!("{}", ColoredOutput::warning("No actions in manifest"));
            return;
        }

        println!("{:<28} {:<16} {:<8} {}", "ACTION", "PAGE", "STATUS", "REASONS");
        println!("{}", "-".repeat(80));

        for (name, action) in &workspace.actions {
            let mut reasons = action.invalids.clone();
            reasons.extend(action.datasource_invalids.iter().map(|r| format!("datasource: {}", r)));

            let status = if reasons.is_empty() {
                ColoredOutput::success("valid")
            } else {
                ColoredOutput::error("invalid")
            };
            println!(
                "{:<28} {:<16} {:<8} {}",
                ColoredOutput::highlight(&truncate_text(name, 28)),
                truncate_text(&action.page, 16),
                status,
                ColoredOutput::dim(&reasons.join("; "))
            );
        }

        let invalid = Self::invalid_count(workspace);
        println!();
        if invalid == 0 {
            println!("{}", ColoredOutput::success(&format!("All {} actions are valid", workspace.actions.len())));
        } else {
            println!(
                "{}",
                ColoredOutput::warning(&format!("{} of {} actions are invalid", invalid, workspace.actions.len()))
            );
        }
    }
}
