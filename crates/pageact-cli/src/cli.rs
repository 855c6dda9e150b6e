//! CLI argument definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use pageact_core::PaginationField;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pageact",
    about = "PageAct - validate and dry-run page actions from a manifest",
    version,
    author = "PageAct Team"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Manifest with pages, plugins, datasources and actions
    #[arg(
        short,
        long,
        global = true,
        env = "PAGEACT_MANIFEST",
        default_value = "pageact.yaml",
        help = "Path to the manifest file (YAML or JSON)"
    )]
    pub manifest: PathBuf,

    /// Engine settings file
    #[arg(long, global = true, env = "PAGEACT_CONFIG", help = "Path to engine settings (YAML or JSON)")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create every manifest action and report its validity
    Validate {
        /// Output format
        #[arg(long, value_enum, default_value = "table", help = "Output format")]
        format: OutputFormat,

        /// Exit with an error when any action is invalid
        #[arg(long, help = "Fail when any action is invalid")]
        strict: bool,
    },

    /// List the template keys an action depends on
    Keys {
        /// Action name as defined in the manifest
        #[arg(help = "Action name")]
        action: String,

        /// Output format
        #[arg(long, value_enum, default_value = "table", help = "Output format")]
        format: OutputFormat,
    },

    /// Render the configurations an action would execute with
    Render {
        /// Action name as defined in the manifest
        #[arg(help = "Action name")]
        action: String,

        /// Template parameter, repeatable
        #[arg(
            short,
            long = "param",
            value_name = "KEY=VALUE",
            help = "Template parameter (e.g. --param id=7)"
        )]
        params: Vec<String>,

        /// Render the published snapshot instead of the draft
        #[arg(long, help = "Use the published snapshot (the manifest publishes every action)")]
        published: bool,

        /// Pagination direction for URL-paginated actions
        #[arg(long, value_enum, help = "Follow the next or previous page cursor")]
        page: Option<PageDirection>,

        /// Pretty print JSON output
        #[arg(long, help = "Pretty print JSON output")]
        pretty: bool,
    },

    /// List manifest entities
    List {
        #[command(subcommand)]
        resource: ListResource,
    },
}

#[derive(Subcommand)]
pub enum ListResource {
    /// List pages
    Pages {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List plugins and their package names
    Plugins {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List stored datasources
    Datasources {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List actions
    Actions {
        /// Filter by page name
        #[arg(long)]
        page: Option<String>,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PageDirection {
    Next,
    Prev,
}

impl From<PageDirection> for PaginationField {
    fn from(direction: PageDirection) -> Self {
        match direction {
            PageDirection::Next => PaginationField::Next,
            PageDirection::Prev => PaginationField::Prev,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Compact JSON
    Json,
    /// Pretty JSON
    Pretty,
}

impl OutputFormat {
    pub fn format_json(&self, value: &JsonValue) -> Result<String, serde_json::Error> {
        match self {
            OutputFormat::Pretty | OutputFormat::Table => serde_json::to_string_pretty(value),
            OutputFormat::Json => serde_json::to_string(value),
        }
    }
}
