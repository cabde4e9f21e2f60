//! Constants used throughout the Objext library.
//!
//! This module provides central definitions for reserved path tokens.

/// Listener path that matches every change on a node.
///
/// Wildcard listeners always fire after the path-specific listeners of the
/// same event.
pub const WILDCARD: &str = "*";
