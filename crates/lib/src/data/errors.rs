//! Error types for value and path operations.
//!
//! This module defines structured error types for the data layer: type
//! mismatches when reading typed values, paths that cannot be written through,
//! and inputs that must be mappings but are not.

use thiserror::Error;

/// Structured error types for value and path operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DataError {
    /// Type mismatch when converting a value
    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A path that cannot be addressed in the current data
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A mapping was required (e.g. to build a template)
    #[error("Expected a mapping, found {actual}")]
    NotAMapping { actual: String },
}

impl DataError {
    /// Check if this error is related to type mismatches
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            DataError::TypeMismatch { .. } | DataError::NotAMapping { .. }
        )
    }

    /// Check if this error is related to path addressing
    pub fn is_path_error(&self) -> bool {
        matches!(self, DataError::InvalidPath { .. })
    }

    /// Get the path if this is a path-related error
    pub fn path(&self) -> Option<&str> {
        match self {
            DataError::InvalidPath { path, .. } => Some(path),
            _ => None,
        }
    }
}

// Conversion from DataError to the main Error type
impl From<DataError> for crate::Error {
    fn from(err: DataError) -> Self {
        crate::Error::Data(err)
    }
}
