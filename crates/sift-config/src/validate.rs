//! Configuration validation errors and results.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    Semantic(Vec<String>),
}

impl From<ValidationError> for sift_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::IoError(msg) => sift_common::Error::Config(msg),
            other => sift_common::Error::InvalidConfig(other.to_string()),
        }
    }
}

/// Outcome of shape validation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into an error if any check failed.
    pub fn into_result(self) -> Result<Vec<String>, ValidationError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ValidationError::Semantic(self.errors))
        }
    }
}
