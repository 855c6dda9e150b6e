pub mod context;
pub mod error;
pub mod factory;
pub mod registry;

// Re-export commonly used types
pub use context::{ConnectionContext, ConnectionContextCache};
pub use error::{status_codes, PluginError, PluginResult, RegistryError, RegistryResult};
pub use factory::{AsAny, Connection, PluginExecutor};
pub use registry::PluginExecutorRegistry;
