//! Value types stored inside an [`Objext`](crate::Objext).
//!
//! This module provides the [`Value`] enum, the JSON-compatible data model
//! that backs every node's storage. Mappings keep insertion order, so the
//! rendered output lists keys in the order they were first written.
//!
//! Values can be addressed by [`PathBuf`]. Reading through a path never
//! creates anything; writing through a path creates the missing containers
//! along the way (a list when the next segment is an index, a mapping
//! otherwise).

use std::cmp::Ordering;
use std::fmt;
use std::fmt::Write as _;

use indexmap::IndexMap;

use super::errors::DataError;
use super::path::{PathBuf, Segment};

/// Ordered mapping from keys to values.
pub type Map = IndexMap<String, Value>;

/// Classification of a value as seen by the tree.
///
/// Mappings and sequences get their own child nodes when mounted; scalars
/// are stored in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Mapping,
    Sequence,
    Scalar,
}

/// Values that can be stored in an objext.
///
/// # Direct Comparisons
///
/// `Value` implements `PartialEq` with primitive types for ergonomic comparisons:
///
/// ```
/// # use objext::Value;
/// let text = Value::Text("hello".to_string());
/// let number = Value::Int(42);
/// let flag = Value::Bool(true);
///
/// assert!(text == "hello");
/// assert!(number == 42);
/// assert!(flag == true);
///
/// assert!("hello" == text);
/// assert!(42 == number);
///
/// // Type mismatches return false
/// assert!(!(text == 42));
/// ```
///
/// # Serialization
///
/// Values serialize as plain JSON (`untagged`), so any JSON document can be
/// deserialized straight into a `Value`.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/empty value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text string value
    Text(String),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// Mapping from keys to values
    Map(Map),
}

impl Value {
    /// Creates an empty mapping.
    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    /// Creates an empty sequence.
    pub fn list() -> Self {
        Value::List(Vec::new())
    }

    /// Classifies this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Map(_) => Kind::Mapping,
            Value::List(_) => Kind::Sequence,
            _ => Kind::Scalar,
        }
    }

    /// Returns true if this value is a mapping or a sequence
    pub fn is_container(&self) -> bool {
        !matches!(self.kind(), Kind::Scalar)
    }

    /// Returns true if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Attempts to convert to a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to convert to an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to convert to a string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to convert to a string, returning empty string if not text
    pub fn as_text_or_empty(&self) -> &str {
        self.as_text().unwrap_or("")
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Looks up a direct child by segment.
    ///
    /// An index segment on a mapping looks up the key spelled by the index,
    /// so `"0"` and `[0]` address the same entry of a mapping.
    pub fn child(&self, segment: &Segment) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(segment.as_key().as_ref()),
            Value::List(list) => segment.as_index().and_then(|i| list.get(i)),
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &Segment) -> Option<&mut Value> {
        match self {
            Value::Map(map) => map.get_mut(segment.as_key().as_ref()),
            Value::List(list) => segment.as_index().and_then(|i| list.get_mut(i)),
            _ => None,
        }
    }

    /// Reads the value at `path`. The empty path addresses `self`.
    pub fn get_path(&self, path: &PathBuf) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(self, |current, segment| current.child(segment))
    }

    /// Mutable counterpart of [`Value::get_path`].
    pub fn get_path_mut(&mut self, path: &PathBuf) -> Option<&mut Value> {
        let mut current = self;
        for segment in path.segments() {
            current = current.child_mut(segment)?;
        }
        Some(current)
    }

    /// Returns true if something is stored at `path`.
    pub fn contains_path(&self, path: &PathBuf) -> bool {
        self.get_path(path).is_some()
    }

    /// Writes `value` at `path`, creating intermediate containers.
    ///
    /// Scalars found along the way are replaced by a fresh container.
    /// Writing past the end of a sequence pads it with nulls. Writing through
    /// a key into a sequence is an error. Returns the value previously stored
    /// at `path`, if any.
    pub fn assign(&mut self, path: &PathBuf, value: Value) -> Result<Option<Value>, DataError> {
        let segments = path.segments();
        let Some((last, init)) = segments.split_last() else {
            return Ok(Some(std::mem::replace(self, value)));
        };

        let mut current = self;
        for (i, segment) in init.iter().enumerate() {
            let next = &segments[i + 1];
            current = current.slot_for(segment, next, path)?;
        }
        current.put_child(last, value, path)
    }

    /// Returns the child slot for `segment`, making sure it holds a
    /// container suitable for `next`.
    fn slot_for(
        &mut self,
        segment: &Segment,
        next: &Segment,
        path: &PathBuf,
    ) -> Result<&mut Value, DataError> {
        let slot = match self {
            Value::Map(map) => map
                .entry(segment.as_key().into_owned())
                .or_insert_with(|| empty_container_for(next)),
            Value::List(list) => {
                let Some(index) = segment.as_index() else {
                    return Err(key_into_list(path, segment));
                };
                if index > list.len() {
                    return Err(past_the_end(path, index, list.len()));
                }
                if index == list.len() {
                    list.push(empty_container_for(next));
                }
                &mut list[index]
            }
            other => return Err(through_scalar(path, other)),
        };
        if !slot.is_container() {
            *slot = empty_container_for(next);
        }
        Ok(slot)
    }

    fn put_child(
        &mut self,
        segment: &Segment,
        value: Value,
        path: &PathBuf,
    ) -> Result<Option<Value>, DataError> {
        match self {
            Value::Map(map) => Ok(map.insert(segment.as_key().into_owned(), value)),
            Value::List(list) => {
                let Some(index) = segment.as_index() else {
                    return Err(key_into_list(path, segment));
                };
                match index.cmp(&list.len()) {
                    Ordering::Less => Ok(Some(std::mem::replace(&mut list[index], value))),
                    Ordering::Equal => {
                        list.push(value);
                        Ok(None)
                    }
                    Ordering::Greater => Err(past_the_end(path, index, list.len())),
                }
            }
            other => Err(through_scalar(path, other)),
        }
    }

    /// Removes the value at `path` and returns it.
    ///
    /// Removing a sequence element shifts the following elements down.
    /// The empty path cannot be removed.
    pub fn remove_path(&mut self, path: &PathBuf) -> Option<Value> {
        let (last, _) = path.segments().split_last()?;
        let parent = self.get_path_mut(&path.parent()?)?;
        match parent {
            Value::Map(map) => map.shift_remove(last.as_key().as_ref()),
            Value::List(list) => {
                let index = last.as_index()?;
                (index < list.len()).then(|| list.remove(index))
            }
            _ => None,
        }
    }

    /// Renders this value as compact JSON, keys in insertion order.
    ///
    /// ```
    /// # use objext::Value;
    /// let value = Value::Text("hello".to_string());
    /// assert_eq!(value.to_json_string(), "\"hello\"");
    /// ```
    pub fn to_json_string(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out, false);
        out
    }

    /// Renders this value as compact JSON with mapping keys sorted.
    ///
    /// Two values with the same content render identically regardless of
    /// the order their keys were written in.
    pub fn to_canonical_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out, true);
        out
    }

    fn write_json(&self, out: &mut String, sorted: bool) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Value::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Float(n) => match serde_json::Number::from_f64(*n) {
                Some(number) => {
                    let _ = write!(out, "{number}");
                }
                None => out.push_str("null"),
            },
            Value::Text(s) => write_json_str(out, s),
            Value::List(list) => {
                out.push('[');
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_json(out, sorted);
                }
                out.push(']');
            }
            Value::Map(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                if sorted {
                    entries.sort_by(|a, b| a.0.cmp(b.0));
                }
                out.push('{');
                for (i, (key, item)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_json_str(out, key);
                    out.push(':');
                    item.write_json(out, sorted);
                }
                out.push('}');
            }
        }
    }
}

fn write_json_str(out: &mut String, s: &str) {
    let _ = write!(out, "{}", serde_json::Value::String(s.to_string()));
}

fn empty_container_for(next: &Segment) -> Value {
    if next.is_index() {
        Value::list()
    } else {
        Value::map()
    }
}

fn key_into_list(path: &PathBuf, segment: &Segment) -> DataError {
    DataError::InvalidPath {
        path: path.to_string(),
        reason: format!("key '{segment}' cannot address a list"),
    }
}

fn past_the_end(path: &PathBuf, index: usize, len: usize) -> DataError {
    DataError::InvalidPath {
        path: path.to_string(),
        reason: format!("index {index} is past the end of a list of length {len}"),
    }
}

fn through_scalar(path: &PathBuf, found: &Value) -> DataError {
    DataError::InvalidPath {
        path: path.to_string(),
        reason: format!("cannot write through a {}", found.type_name()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations for common types
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, Value::from(item)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::from(n),
            Value::Float(n) => serde_json::Number::from_f64(n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, item.into()))
                    .collect(),
            ),
        }
    }
}

// TryFrom implementations for typed reads
impl TryFrom<&Value> for String {
    type Error = DataError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(DataError::TypeMismatch {
                expected: "String".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }
}

impl<'a> TryFrom<&'a Value> for &'a str {
    type Error = DataError;

    fn try_from(value: &'a Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(s),
            _ => Err(DataError::TypeMismatch {
                expected: "&str".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }
}

impl TryFrom<&Value> for i64 {
    type Error = DataError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(n) => Ok(*n),
            _ => Err(DataError::TypeMismatch {
                expected: "i64".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }
}

impl TryFrom<&Value> for f64 {
    type Error = DataError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_float().ok_or_else(|| DataError::TypeMismatch {
            expected: "f64".to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

impl TryFrom<&Value> for bool {
    type Error = DataError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(DataError::TypeMismatch {
                expected: "bool".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }
}

impl TryFrom<&Value> for Map {
    type Error = DataError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Map(map) => Ok(map.clone()),
            _ => Err(DataError::TypeMismatch {
                expected: "map".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }
}

// PartialEq implementations for comparing Value with other types
impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        matches!(self, Value::Text(s) if s == other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<String> for Value {
    fn eq(&self, other: &String) -> bool {
        self == other.as_str()
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Value::Int(n) if n == other)
    }
}

impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        matches!(self, Value::Int(n) if *n == *other as i64)
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        matches!(self, Value::Float(n) if n == other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Value::Bool(b) if b == other)
    }
}

impl PartialEq<Value> for str {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}

impl PartialEq<Value> for &str {
    fn eq(&self, other: &Value) -> bool {
        other == *self
    }
}

impl PartialEq<Value> for String {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}

impl PartialEq<Value> for i64 {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}

impl PartialEq<Value> for i32 {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}

impl PartialEq<Value> for bool {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}
