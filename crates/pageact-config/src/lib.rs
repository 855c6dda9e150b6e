pub mod engine;
pub mod env_resolver;
pub mod error;
pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use engine::EngineConfig;
pub use env_resolver::{EnvResolver, EnvResolverError};
pub use error::{ConfigError, ConfigResult};
pub use loader::{FileFormat, ManifestEntities, ManifestLoader};
pub use schema::{ActionConfig, DatasourceConfig, DatasourceRef, Manifest, PageConfig, PluginConfig};
