pub mod error;
pub mod execution;
pub mod lifecycle;
pub mod stores;
pub mod validator;

pub use error::{RuntimeError, RuntimeResult};
pub use execution::{ActionExecutor, PreparedExecution};
pub use lifecycle::{extract_template_keys, is_valid_action_name, merge_snapshot, ActionService};
pub use stores::Stores;
pub use validator::{DatasourceValidator, PluginDatasourceValidator};
