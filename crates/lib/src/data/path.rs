//! Path types for hierarchical value access.
//!
//! A path is a normalized sequence of [`Segment`]s: mapping keys and sequence
//! indexes. Paths are written in dotted/bracketed form (`children[0].age`) and
//! every textual spelling of the same location normalizes to one canonical
//! form, so `children.0.age`, `.children[0]..age` and `children[0].age` are the
//! same path.
//!
//! # Usage
//!
//! ```rust
//! use objext::data::{PathBuf, Segment};
//! use std::str::FromStr;
//!
//! // Construct from string (automatically normalized)
//! let path = PathBuf::from_str("children.0.age").unwrap();
//! assert_eq!(path.to_string(), "children[0].age");
//!
//! // Build incrementally (infallible)
//! let path = PathBuf::new().push("children").push(0usize).push("age");
//! assert_eq!(path.segments()[1], Segment::Index(0));
//! ```

use std::{fmt, str::FromStr};

use crate::constants::WILDCARD;

/// One step of a [`PathBuf`]: a mapping key or a sequence index.
///
/// Any token made only of ASCII digits is an index; everything else is a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

impl Segment {
    /// Classifies a single raw token.
    fn from_token(token: &str) -> Self {
        match digits_index(token) {
            Some(index) => Segment::Index(index),
            None => Segment::Key(token.to_string()),
        }
    }

    /// The form this segment takes after a round trip through text: a key
    /// made only of digits becomes the index it spells.
    pub fn canonical(self) -> Self {
        match &self {
            Segment::Key(k) => match digits_index(k) {
                Some(index) => Segment::Index(index),
                None => self,
            },
            Segment::Index(_) => self,
        }
    }

    /// Returns true if this segment is a sequence index.
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }

    /// Returns the index, if this segment is one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(_) => None,
        }
    }

    /// Returns the segment as a mapping key. Indexes render as their digits.
    pub fn as_key(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Segment::Key(k) => std::borrow::Cow::Borrowed(k),
            Segment::Index(i) => std::borrow::Cow::Owned(i.to_string()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) if digits_index(k).is_none() => write!(f, "{k}"),
            Segment::Key(k) => write!(f, "[{k}]"),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

fn digits_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

impl From<&str> for Segment {
    fn from(token: &str) -> Self {
        Segment::from_token(token)
    }
}

impl From<String> for Segment {
    fn from(token: String) -> Self {
        Segment::from_token(&token)
    }
}

/// Splits a textual path into segments.
///
/// Splits on `.`, `[` and `]` and drops empty tokens. The empty string yields
/// no segments and denotes "self".
pub fn parse_path(text: &str) -> Vec<Segment> {
    text.split(['.', '[', ']'])
        .filter(|token| !token.is_empty())
        .map(Segment::from_token)
        .collect()
}

/// Joins segments back into text, rendering indexes in bracket form.
///
/// A key made only of digits is rendered in bracket form too, since it parses
/// back as that index.
pub fn format_path(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(k) if digits_index(k).is_none() => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(k);
            }
            Segment::Key(k) => {
                out.push('[');
                out.push_str(k);
                out.push(']');
            }
            Segment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Normalizes a path string.
///
/// ```rust
/// # use objext::data::path::normalize_path;
/// assert_eq!(normalize_path(""), "");
/// assert_eq!(normalize_path(".user"), "user");
/// assert_eq!(normalize_path("user..profile"), "user.profile");
/// assert_eq!(normalize_path("name.0..body[0].head"), "name[0].body[0].head");
/// ```
pub fn normalize_path(input: &str) -> String {
    format_path(&parse_path(input))
}

/// An owned, normalized path.
///
/// Two paths are equal iff their segment sequences are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathBuf {
    segments: Vec<Segment>,
}

impl PathBuf {
    /// Creates a new empty path ("self").
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Creates a path from already split segments.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().map(Segment::canonical).collect(),
        }
    }

    /// Parses and normalizes a textual path.
    pub fn normalize(path: &str) -> Self {
        Self {
            segments: parse_path(path),
        }
    }

    /// Appends another path (or anything convertible into one).
    ///
    /// ```rust
    /// # use objext::data::PathBuf;
    /// let path = PathBuf::new().push("user").push("profile.name");
    /// assert_eq!(path.to_string(), "user.profile.name");
    /// ```
    pub fn push(mut self, path: impl Into<PathBuf>) -> Self {
        self.segments.extend(path.into().segments);
        self
    }

    /// Appends a single segment.
    pub fn push_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment.canonical());
        self
    }

    /// Joins this path with another path.
    pub fn join(&self, other: &PathBuf) -> PathBuf {
        let mut segments = Vec::with_capacity(self.segments.len() + other.segments.len());
        segments.extend_from_slice(&self.segments);
        segments.extend_from_slice(&other.segments);
        PathBuf { segments }
    }

    /// Returns the segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the number of segments in the path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the parent path, or `None` if this is the empty path.
    pub fn parent(&self) -> Option<PathBuf> {
        let (_, init) = self.segments.split_last()?;
        Some(PathBuf {
            segments: init.to_vec(),
        })
    }

    /// Returns the first segment.
    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    /// Returns the last segment.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns true if `prefix`'s segments are a (non-strict) prefix of this path.
    pub fn starts_with(&self, prefix: &PathBuf) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns true if this path lies strictly below `ancestor`.
    ///
    /// Comparison is by whole segments, so `hobbits.x` is not below `hob`.
    pub fn is_descendant_of(&self, ancestor: &PathBuf) -> bool {
        self.segments.len() > ancestor.segments.len() && self.starts_with(ancestor)
    }

    /// Returns the remainder of this path after `prefix`, if it is a prefix.
    pub fn strip_prefix(&self, prefix: &PathBuf) -> Option<PathBuf> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| PathBuf {
                segments: rest.to_vec(),
            })
    }

    /// Returns true if either path is a prefix of the other.
    pub fn overlaps(&self, other: &PathBuf) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }

    /// Returns true for the catch-all listener path `*`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.segments.as_slice(), [Segment::Key(k)] if k == WILDCARD)
    }
}

impl fmt::Display for PathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_path(&self.segments))
    }
}

impl FromStr for PathBuf {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::normalize(s))
    }
}

impl From<&str> for PathBuf {
    fn from(path: &str) -> Self {
        Self::normalize(path)
    }
}

impl From<String> for PathBuf {
    fn from(path: String) -> Self {
        Self::normalize(&path)
    }
}

impl From<&String> for PathBuf {
    fn from(path: &String) -> Self {
        Self::normalize(path)
    }
}

impl From<&PathBuf> for PathBuf {
    fn from(path: &PathBuf) -> Self {
        path.clone()
    }
}

impl From<usize> for PathBuf {
    fn from(index: usize) -> Self {
        PathBuf {
            segments: vec![Segment::Index(index)],
        }
    }
}

impl From<Segment> for PathBuf {
    fn from(segment: Segment) -> Self {
        PathBuf {
            segments: vec![segment.canonical()],
        }
    }
}

impl From<Vec<Segment>> for PathBuf {
    fn from(segments: Vec<Segment>) -> Self {
        PathBuf::from_segments(segments)
    }
}

/// Constructs a path from mixed components.
///
/// - `path!()` - Empty path
/// - `path!("user.profile.name")` - Parsed and normalized
/// - `path!("children", 0usize, "age")` - Keys, indexes and sub-paths mixed
#[macro_export]
macro_rules! path {
    () => {
        $crate::data::PathBuf::new()
    };

    ($($part:expr),+ $(,)?) => {{
        $crate::data::PathBuf::new()$(.push($part))+
    }};
}
