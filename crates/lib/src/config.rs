//! Runtime configuration for an [`Objext`](crate::Objext).
//!
//! All fields have defaults, so a partial JSON document is a valid
//! configuration:
//!
//! ```
//! # use objext::{Config, RevertPolicy};
//! let config = Config::from_json_str(r#"{ "strict": true }"#).unwrap();
//! assert!(config.strict);
//! assert_eq!(config.revert, RevertPolicy::Latest);
//! ```

use serde::{Deserialize, Serialize};

use crate::Result;

/// What `revert(None)` drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevertPolicy {
    /// Drop only the most recent snapshot.
    #[default]
    Latest,
    /// Drop every snapshot.
    All,
}

/// Behavioural switches shared by every node of one objext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Abort writes whose synchronous validation fails.
    pub strict: bool,
    /// Meaning of `revert` without a tag.
    pub revert: RevertPolicy,
    /// Cache the content hash between writes.
    pub hash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict: false,
            revert: RevertPolicy::Latest,
            hash: true,
        }
    }
}

impl Config {
    /// Parses a configuration from JSON text. Missing fields take their
    /// default values.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns a copy with strict validation switched on or off.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns a copy with the given revert policy.
    pub fn revert(mut self, policy: RevertPolicy) -> Self {
        self.revert = policy;
        self
    }
}
