//! Plain data handled by an [`Objext`](crate::Objext).
//!
//! This module provides the path codec ([`PathBuf`], [`Segment`]), the
//! JSON-compatible [`Value`] model with its classifier ([`Kind`]), and
//! [`Template`], the input type that can carry computed properties next to
//! plain values.

pub mod errors;
pub mod path;
pub mod template;
pub mod value;

pub use errors::DataError;
pub use path::{PathBuf, Segment, format_path, normalize_path, parse_path};
pub use template::{Field, Getter, Template};
pub use value::{Kind, Map, Value};
