//! Input data that may carry computed properties.
//!
//! A [`Template`] is an ordered list of fields, each of which is a plain
//! [`Value`], a nested template, or a computed getter. Plain data can be turned
//! into a template directly; computed fields are added with the builder
//! methods.
//!
//! ```
//! # use objext::{Template, Value};
//! # use serde_json::json;
//! let template = Template::try_from(json!({ "age": 32 }))
//!     .unwrap()
//!     .with_computed("adult", |scope| {
//!         Value::Bool(scope.get_as::<i64>("age").is_some_and(|age| age >= 18))
//!     });
//! assert_eq!(template.len(), 2);
//! ```

use std::fmt;
use std::rc::Rc;

use super::errors::DataError;
use super::value::{Map, Value};
use crate::tree::Scope;

/// A computed property getter.
///
/// Every read made through the [`Scope`] while the getter runs becomes a
/// dependency of the computed property.
#[derive(Clone)]
pub struct Getter(Rc<dyn Fn(&Scope<'_>) -> Value>);

impl Getter {
    pub fn new(getter: impl Fn(&Scope<'_>) -> Value + 'static) -> Self {
        Self(Rc::new(getter))
    }

    pub(crate) fn call(&self, scope: &Scope<'_>) -> Value {
        (self.0)(scope)
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Getter(..)")
    }
}

/// One field of a [`Template`].
#[derive(Debug, Clone)]
pub enum Field {
    Value(Value),
    Nested(Template),
    Computed(Getter),
}

/// Ordered fields used to populate a node with `put`/`update`.
#[derive(Debug, Clone, Default)]
pub struct Template {
    fields: Vec<(String, Field)>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a plain value field.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_field(key, Field::Value(value.into()))
    }

    /// Adds (or replaces) a nested template field.
    pub fn with_template(self, key: impl Into<String>, template: Template) -> Self {
        self.with_field(key, Field::Nested(template))
    }

    /// Adds (or replaces) a computed field.
    pub fn with_computed(
        self,
        key: impl Into<String>,
        getter: impl Fn(&Scope<'_>) -> Value + 'static,
    ) -> Self {
        self.with_field(key, Field::Computed(Getter::new(getter)))
    }

    /// Adds a field, replacing an existing field with the same key in place.
    pub fn with_field(mut self, key: impl Into<String>, field: Field) -> Self {
        let key = key.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((key, field)),
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true if this template or any nested template has computed fields.
    pub fn has_computed(&self) -> bool {
        self.fields.iter().any(|(_, field)| match field {
            Field::Computed(_) => true,
            Field::Nested(nested) => nested.has_computed(),
            Field::Value(_) => false,
        })
    }

    /// Plain projection of the template. Computed fields are left out.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len());
        for (key, field) in &self.fields {
            match field {
                Field::Value(value) => {
                    map.insert(key.clone(), value.clone());
                }
                Field::Nested(nested) => {
                    map.insert(key.clone(), nested.to_value());
                }
                Field::Computed(_) => {}
            }
        }
        Value::Map(map)
    }
}

impl IntoIterator for Template {
    type Item = (String, Field);
    type IntoIter = std::vec::IntoIter<(String, Field)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl From<Map> for Template {
    fn from(map: Map) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, Field::Value(value)))
                .collect(),
        }
    }
}

impl TryFrom<Value> for Template {
    type Error = DataError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Map(map) => Ok(Template::from(map)),
            other => Err(DataError::NotAMapping {
                actual: other.type_name().to_string(),
            }),
        }
    }
}

impl TryFrom<serde_json::Value> for Template {
    type Error = DataError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Template::try_from(Value::from(value))
    }
}
