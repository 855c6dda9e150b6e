pub mod error;
pub mod pagination;
pub mod policy;
pub mod sanitization;
pub mod store;
pub mod template;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use policy::{DefaultPolicyGenerator, DocumentKind, PolicyGenerator};
pub use sanitization::{is_sensitive_field, sanitize_json_value, sanitized};
pub use types::{
    AclPermission, Action, ActionConfiguration, ActionId, ActionRecord, ActionSnapshot,
    ApplicationId, Authentication, Datasource, DatasourceConfiguration, DatasourceId, Endpoint,
    ExecuteRequest, ExecutionResult, ExecutionStatistics, OrganizationId, Page, PageId,
    PaginationField, PaginationType, Param, Plugin, PluginId, PluginType, Policy, Property,
    ViewMode, DEFAULT_ACTION_EXECUTION_TIMEOUT_MS,
};
