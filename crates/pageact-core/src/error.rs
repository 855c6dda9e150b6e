use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Framework-level failures surfaced by lifecycle operations and, through the
/// execution coordinator, as failed results carrying [`CoreError::code`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Please enter a valid parameter {0}.")]
    InvalidParameter(String),
    #[error("Unable to find {kind} {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("Missing plugin id. Please enter one.")]
    PluginIdNotGiven,
    #[error("Action {name} with id {id} is invalid: {reasons}")]
    ActionInvalid { name: String, id: String, reasons: String },
    #[error("Invalid datasource configuration: {0}")]
    InvalidDatasource(String),
    #[error("Unsupported operation")]
    UnsupportedOperation,
    #[error("Repository save failed.")]
    RepositorySaveFailed,
    #[error("store: {0}")]
    Store(String),
    #[error("serde: {0}")]
    Serde(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }

    pub fn invalid_parameter(field: impl Into<String>) -> Self {
        Self::InvalidParameter(field.into())
    }

    /// Application error code reported as the result status code
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidParameter(_) => "4000",
            CoreError::UnsupportedOperation => "4003",
            CoreError::PluginIdNotGiven => "4009",
            CoreError::ActionInvalid { .. } => "4018",
            CoreError::InvalidDatasource(_) => "4019",
            CoreError::NotFound { .. } => "4028",
            CoreError::RepositorySaveFailed => "5002",
            CoreError::Store(_) | CoreError::Serde(_) | CoreError::Internal(_) => "5000",
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// Messages recorded in an action's invalid-reason set
pub mod reasons {
    pub const INVALID_ACTION_NAME: &str =
        "Action name must be a valid identifier: letters, digits or underscore, not starting with a digit";
    pub const NO_CONFIGURATION_FOUND_IN_ACTION: &str = "No configurations found in this action";
    pub const DATASOURCE_NOT_GIVEN: &str = "Missing datasource. Please enter one.";

    pub fn no_resource_found(kind: &str, id: &str) -> String {
        format!("Unable to find {} {}", kind, id)
    }
}
