//! Stable identities of securable objects.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::value::Value;

/// The serializable key part of an [`ObjectIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ObjectKey {
    Integer(i64),
    Text(String),
}

impl ObjectKey {
    /// Convert an identity field value into a key. Only text, char and integer values qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(n) => Some(ObjectKey::Integer(*n)),
            Value::Text(s) => Some(ObjectKey::Text(s.clone())),
            Value::Char(c) => Some(ObjectKey::Text(c.to_string())),
            _ => None,
        }
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ObjectKey::Integer(n) => write!(f, "{n}"),
            ObjectKey::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ObjectKey {
    fn from(n: i64) -> Self {
        ObjectKey::Integer(n)
    }
}

impl From<i32> for ObjectKey {
    fn from(n: i32) -> Self {
        ObjectKey::Integer(i64::from(n))
    }
}

impl From<&str> for ObjectKey {
    fn from(s: &str) -> Self {
        ObjectKey::Text(s.to_string())
    }
}

impl From<String> for ObjectKey {
    fn from(s: String) -> Self {
        ObjectKey::Text(s)
    }
}

/// Uniquely names a securable object: its type tag plus its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct ObjectIdentity {
    type_tag: String,
    key: ObjectKey,
}

impl ObjectIdentity {
    pub fn new(type_tag: impl Into<String>, key: impl Into<ObjectKey>) -> Self {
        Self {
            type_tag: type_tag.into(),
            key: key.into(),
        }
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }
}

/// Renders as `Type::"key"`.
impl Display for ObjectIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, r#"{}::"{}""#, self.type_tag, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use yare::parameterized;

    #[parameterized(
        integer = { Value::Integer(42), Some(ObjectKey::Integer(42)) },
        text = { Value::from("doc-1"), Some(ObjectKey::Text("doc-1".to_string())) },
        character = { Value::Char('a'), Some(ObjectKey::Text("a".to_string())) },
        float = { Value::Float(1.0), None },
        boolean = { Value::Bool(true), None },
        null = { Value::Null, None },
        sequence = { Value::sequence([1]), None },
    )]
    fn test_object_key_from_value(value: Value, expected: Option<ObjectKey>) {
        assert_eq!(ObjectKey::from_value(&value), expected);
    }

    #[test]
    fn test_identity_display() {
        let identity = ObjectIdentity::new("Document", 42);
        assert_snapshot!(identity.to_string(), @r#"Document::"42""#);
        let identity = ObjectIdentity::new("Folder", "inbox");
        assert_snapshot!(identity.to_string(), @r#"Folder::"inbox""#);
    }

    #[test]
    fn test_identity_equality_includes_type() {
        assert_ne!(
            ObjectIdentity::new("Document", 1),
            ObjectIdentity::new("Folder", 1)
        );
        assert_ne!(
            ObjectIdentity::new("Document", 1),
            ObjectIdentity::new("Document", "1")
        );
    }

    #[test]
    fn test_identity_serialization() {
        let identity = ObjectIdentity::new("Document", 42);
        let serialized = serde_json::to_value(&identity).unwrap();
        assert_eq!(serialized, serde_json::json!({"type_tag": "Document", "key": 42}));
        let deserialized: ObjectIdentity = serde_json::from_value(serialized).unwrap();
        assert_eq!(identity, deserialized);
    }
}
