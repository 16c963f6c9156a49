//! Error types for registry assembly.

use sq_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModesError {
    /// Invalid run configuration, detected before integration starts.
    #[error("Configuration error in {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type ModesResult<T> = Result<T, ModesError>;

impl ModesError {
    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ModesError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
