use pageact_core::CoreError;
use pageact_registry::{PluginError, RegistryError};
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl RuntimeError {
    /// Application error code reported as the result status code
    pub fn code(&self) -> String {
        match self {
            RuntimeError::Core(e) => e.code().to_string(),
            RuntimeError::Registry(e) => e.code().to_string(),
            RuntimeError::Plugin(e) => e.status_code(),
        }
    }
}
