//! PageAct CLI main entry point

use clap::Parser;
use pageact_cli::{
    cli::{Cli, Commands},
    commands::{KeysCommand, ListCommand, RenderCommand, ValidateCommand},
    error::CliResult,
    utils::{init_tracing, ColoredOutput},
    workspace::Workspace,
};
use tracing::info;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", ColoredOutput::error("Error:"), e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    info!("PageAct CLI v{}", env!("CARGO_PKG_VERSION"));

    let workspace = Workspace::load(&cli.manifest, cli.config.as_deref()).await?;

    match cli.command {
        Commands::Validate { format, strict } => {
            ValidateCommand::run(&workspace, format, strict).await
        }

        Commands::Keys { action, format } => KeysCommand::run(&workspace, &action, format).await,

        Commands::Render { action, params, published, page, pretty } => {
            RenderCommand::run(&workspace, &action, &params, published, page, pretty).await
        }

        Commands::List { resource } => ListCommand::run(&workspace, resource).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pageact_cli::cli::{ListResource, OutputFormat, PageDirection};

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["pageact", "--manifest", "/tmp/app.yaml", "validate", "--strict"])
            .unwrap();

        assert_eq!(cli.manifest, std::path::PathBuf::from("/tmp/app.yaml"));
        assert!(matches!(cli.command, Commands::Validate { strict: true, format: OutputFormat::Table }));
    }

    #[test]
    fn test_render_command_parsing() {
        let cli = Cli::try_parse_from([
            "pageact",
            "render",
            "listOrders",
            "--param",
            "id=7",
            "-p",
            "q=shoes",
            "--published",
            "--page",
            "next",
        ])
        .unwrap();

        if let Commands::Render { action, params, published, page, .. } = cli.command {
            assert_eq!(action, "listOrders");
            assert_eq!(params, vec!["id=7", "q=shoes"]);
            assert!(published);
            assert_eq!(page, Some(PageDirection::Next));
        } else {
            panic!("Expected Render command");
        }
    }

    #[test]
    fn test_list_command_parsing() {
        let cli =
            Cli::try_parse_from(["pageact", "list", "actions", "--page", "home", "--format", "json"])
                .unwrap();

        if let Commands::List { resource: ListResource::Actions { page, format } } = cli.command {
            assert_eq!(page.as_deref(), Some("home"));
            assert_eq!(format, OutputFormat::Json);
        } else {
            panic!("Expected List actions command");
        }
    }
}
