//! Error types for node operations.
//!
//! Locked writes, unresolvable removals and unknown snapshot tags passed to
//! `reset`/`revert` are silent no-ops; these errors are only produced by the
//! fallible lookup helpers.

use thiserror::Error;

/// Structured error types for node operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TreeError {
    /// No node is mounted at the path
    #[error("No node at path '{path}'")]
    NodeNotFound { path: String },

    /// The node at the path does not hold a sequence
    #[error("Node at path '{path}' is not a sequence")]
    NotASequence { path: String },

    /// No snapshot carries the tag
    #[error("Unknown snapshot tag '{tag}'")]
    UnknownSnapshot { tag: String },
}

impl TreeError {
    /// Check if this error indicates something was not found
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TreeError::NodeNotFound { .. } | TreeError::UnknownSnapshot { .. }
        )
    }

    /// Check if this error is related to the shape of the data
    pub fn is_type_error(&self) -> bool {
        matches!(self, TreeError::NotASequence { .. })
    }
}

// Conversion from TreeError to the main Error type
impl From<TreeError> for crate::Error {
    fn from(err: TreeError) -> Self {
        crate::Error::Tree(err)
    }
}
