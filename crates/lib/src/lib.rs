//!
//! Objext: a reactive data container.
//! This library provides a path-addressable tree over plain nested data that notifies
//! observers whenever a reachable value changes.
//!
//! ## Core Concepts
//!
//! Objext is built around several key concepts:
//!
//! * **Values (`data::Value`)**: JSON-compatible data (mappings, sequences, scalars). Every objext owns exactly one canonical root value.
//! * **Paths (`data::PathBuf`)**: Normalized sequences of keys and indexes such as `children[0].age`.
//! * **Nodes (`tree::NodeId`, `tree::NodeMut`)**: Every mapping or sequence in the data gets a node that carries its own listeners, validation rules, computed properties and snapshots. Nodes live in an arena and refer to their parent by id.
//! * **Dispatch (`tree::ChangeEvent`)**: Writes notify exact, deep and wildcard listeners on the written node, then bubble to the parent with a re-based path.
//! * **Computed properties (`data::Template`, `tree::Scope`)**: Getters whose reads are recorded as dependencies; they are recomputed eagerly when a dependency changes.
//! * **Snapshots**: Tagged copies of a node's data that can be restored with `reset`.
//! * **Validation (`tree::Rule`)**: Path-scoped checks, synchronous or deferred, run before writes and on demand.
//!
//! ```
//! use objext::Objext;
//! use serde_json::json;
//!
//! let mut objx = Objext::from_json(json!({ "name": "tomy", "age": 32 })).unwrap();
//! objx.set("age", 33).unwrap();
//! assert_eq!(objx.get("age").unwrap(), &33);
//! assert_eq!(objx.to_json_string(), r#"{"name":"tomy","age":33}"#);
//! ```

pub mod config;
pub mod constants;
pub mod data;
pub mod tree;

pub use config::{Config, RevertPolicy};
pub use data::{DataError, PathBuf, Template, Value};
/// Re-export the `Objext` struct for easier access.
pub use tree::Objext;
pub use tree::{ChangeEvent, NodeId, NodeMut, Rule, Scope, TreeError, ValidationError};

/// Result type used throughout the Objext library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Objext library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured value and path errors from the data module
    #[error(transparent)]
    Data(data::DataError),

    /// Structured node errors from the tree module
    #[error(transparent)]
    Tree(tree::TreeError),

    /// A failed validation rule
    #[error(transparent)]
    Validation(tree::ValidationError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Data(_) => "data",
            Error::Tree(_) => "tree",
            Error::Validation(_) => "validation",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a node or snapshot was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a failed validation rule.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this error is type-related.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Data(data_err) => data_err.is_type_error(),
            Error::Tree(tree_err) => tree_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error is related to path addressing.
    pub fn is_path_error(&self) -> bool {
        match self {
            Error::Data(data_err) => data_err.is_path_error(),
            _ => false,
        }
    }

    /// Get the validation error, if this is one.
    pub fn as_validation(&self) -> Option<&tree::ValidationError> {
        match self {
            Error::Validation(err) => Some(err),
            _ => None,
        }
    }
}
