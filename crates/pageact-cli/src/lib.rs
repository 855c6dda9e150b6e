pub mod cli;
pub mod commands;
pub mod dry_run;
pub mod error;
pub mod utils;
pub mod workspace;

// Re-export commonly used types
pub use cli::{Cli, Commands};
pub use error::{CliError, CliResult};
pub use utils::{init_tracing, ColoredOutput};
pub use workspace::Workspace;
