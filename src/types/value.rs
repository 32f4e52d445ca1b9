//! Runtime values of securable objects and the shapes subjects can take.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

/// Declared type of a schema field.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    StrumDisplay,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldType {
    Text,
    Char,
    Integer,
    Float,
    Bool,
    /// Ordered collection; element types are inspected at runtime.
    Sequence,
    Array,
    /// A nested record of any registered type.
    Object,
}

impl FieldType {
    /// Types whose values can serve as a stable object key.
    pub fn is_key(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::Char | FieldType::Integer)
    }

    /// The subject resolution strategy for a field of this type, if any.
    pub fn shape(&self) -> Option<ValueShape> {
        match self {
            FieldType::Text | FieldType::Char | FieldType::Integer | FieldType::Float => {
                Some(ValueShape::Scalar)
            }
            FieldType::Sequence => Some(ValueShape::Sequence),
            FieldType::Array => Some(ValueShape::Array),
            FieldType::Object => Some(ValueShape::Nested),
            FieldType::Bool => None,
        }
    }
}

/// How a subject value is laid out, which decides the resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay)]
pub enum ValueShape {
    Scalar,
    Sequence,
    Array,
    Nested,
}

impl ValueShape {
    /// Classify a runtime value. `Null` and `Bool` have no shape.
    pub fn classify(value: &Value) -> Option<Self> {
        match value {
            Value::Text(_) | Value::Char(_) | Value::Integer(_) | Value::Float(_) => {
                Some(ValueShape::Scalar)
            }
            Value::Sequence(_) => Some(ValueShape::Sequence),
            Value::Array(_) => Some(ValueShape::Array),
            Value::Record(_) => Some(ValueShape::Nested),
            Value::Null | Value::Bool(_) => None,
        }
    }
}

/// A field value of a securable object.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Text(String),
    Char(char),
    Integer(i64),
    Float(f64),
    #[schema(no_recursion)]
    Sequence(Vec<Value>),
    #[schema(no_recursion)]
    Array(Vec<Value>),
    #[schema(no_recursion)]
    Record(Record),
}

impl Value {
    pub fn sequence<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_scalar(&self) -> bool {
        ValueShape::classify(self) == Some(ValueShape::Scalar)
    }

    /// Render a scalar as a subject identifier.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Char(c) => Some(c.to_string()),
            Value::Integer(n) => Some(n.to_string()),
            Value::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// A short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Char(_) => "char",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Sequence(_) => "sequence",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A runtime object: its type tag plus named field values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Record {
    type_tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[schema(no_recursion)]
    fields: BTreeMap<String, Value>,
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}{{", self.type_tag)?;
        for (i, name) in self.fields.keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "}}")
    }
}

impl Record {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, returning the updated record.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Follow a chain of field names through nested records.
    ///
    /// An absent or null link yields `Ok(None)`. A link holding anything other
    /// than a record is returned as the error.
    pub fn get_path<'a, I>(&self, path: I) -> Result<Option<&Value>, &Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut segments = path.into_iter();
        let Some(mut current) = segments.next().and_then(|first| self.get(first)) else {
            return Ok(None);
        };
        for segment in segments {
            current = match current {
                Value::Null => return Ok(None),
                Value::Record(record) => match record.get(segment) {
                    Some(value) => value,
                    None => return Ok(None),
                },
                other => return Err(other),
            };
        }
        Ok(Some(current))
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}
