//! Declarative schema markers and the registry that holds them.
//!
//! A [`TypeSchema`] describes one object type as plain data: its fields, their
//! declared types, and the markers attached to each field. Types are registered
//! once through a [`SchemaRegistryBuilder`]; the resulting [`SchemaRegistry`] is
//! immutable and is shared by every resolver for the life of the process.
//!
//! ```rust
//! use aclsynth_core::{
//!     FieldSchema, FieldType, SchemaRegistryBuilder, SubjectDecl, SubjectKind, TypeSchema,
//! };
//!
//! let registry = SchemaRegistryBuilder::new()
//!     .register(
//!         TypeSchema::securable("Document")
//!             .with_field(FieldSchema::new("id", FieldType::Integer).object_identity())
//!             .with_field(
//!                 FieldSchema::new("editors", FieldType::Sequence)
//!                     .subject(SubjectDecl::new(["WRITE"]).kind(SubjectKind::Authority)),
//!             ),
//!     )
//!     .build()
//!     .unwrap();
//! assert!(registry.is_securable("Document"));
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::types::{FieldType, SubjectKind};

fn default_true() -> bool {
    true
}

/// Permissions granted (or denied) to the subjects found in a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDecl {
    pub permissions: Vec<String>,
    #[serde(default = "default_true")]
    pub granting: bool,
    /// Required when the field holds scalar subject identifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_kind: Option<SubjectKind>,
}

impl SubjectDecl {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            granting: true,
            subject_kind: None,
        }
    }

    pub fn kind(mut self, kind: SubjectKind) -> Self {
        self.subject_kind = Some(kind);
        self
    }

    pub fn denying(mut self) -> Self {
        self.granting = false;
        self
    }
}

/// A marker attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "marker", rename_all = "snake_case")]
pub enum FieldMarker {
    /// The field holding the object's key. Exactly one per securable type.
    ObjectIdentity,
    /// The field holds the subjects that receive entries.
    Subject(SubjectDecl),
    /// The field references the object whose ACL becomes the parent.
    ParentLink {
        #[serde(default = "default_true")]
        inheriting: bool,
    },
    /// On a nested type: the field holding the ultimate subject identifier.
    SubjectMarker {
        #[serde(default)]
        subject_kind: SubjectKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<FieldMarker>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            markers: Vec::new(),
        }
    }

    pub fn object_identity(self) -> Self {
        self.marker(FieldMarker::ObjectIdentity)
    }

    pub fn subject(self, decl: SubjectDecl) -> Self {
        self.marker(FieldMarker::Subject(decl))
    }

    pub fn parent_link(self, inheriting: bool) -> Self {
        self.marker(FieldMarker::ParentLink { inheriting })
    }

    pub fn subject_marker(self, subject_kind: SubjectKind) -> Self {
        self.marker(FieldMarker::SubjectMarker { subject_kind })
    }

    pub fn marker(mut self, marker: FieldMarker) -> Self {
        self.markers.push(marker);
        self
    }
}

/// A type-level subject rule that reads its value through a dotted field path, e.g. `folder.owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPathRule {
    pub path: String,
    #[serde(flatten)]
    pub decl: SubjectDecl,
}

/// The declared schema of one object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    pub type_tag: String,
    /// The supertype whose fields this type inherits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Type-level marker: only securable types get ACLs. Not inherited.
    #[serde(default)]
    pub securable: bool,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_paths: Vec<SubjectPathRule>,
}

impl TypeSchema {
    pub fn securable(type_tag: impl Into<String>) -> Self {
        Self {
            securable: true,
            ..Self::plain(type_tag)
        }
    }

    /// A type that is not securable itself, e.g. a user type referenced from subject fields.
    pub fn plain(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            extends: None,
            securable: false,
            fields: Vec::new(),
            subject_paths: Vec::new(),
        }
    }

    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.extends = Some(supertype.into());
        self
    }

    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_subject_path(mut self, path: impl Into<String>, decl: SubjectDecl) -> Self {
        self.subject_paths.push(SubjectPathRule {
            path: path.into(),
            decl,
        });
        self
    }
}

/// Collects type schemas and validates them into a [`SchemaRegistry`].
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    types: Vec<TypeSchema>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, schema: TypeSchema) -> Self {
        self.types.push(schema);
        self
    }

    pub fn register_all(mut self, schemas: impl IntoIterator<Item = TypeSchema>) -> Self {
        self.types.extend(schemas);
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, ConfigurationError> {
        let mut types: HashMap<String, TypeSchema> = HashMap::with_capacity(self.types.len());

        for schema in self.types {
            if schema.type_tag.trim().is_empty() {
                return Err(ConfigurationError::InvalidSchema(
                    "type tag must not be empty".to_string(),
                ));
            }

            let mut seen = HashSet::new();
            for field in &schema.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(ConfigurationError::InvalidSchema(format!(
                        "type '{}' declares field '{}' twice",
                        schema.type_tag, field.name
                    )));
                }
            }

            if types.contains_key(&schema.type_tag) {
                return Err(ConfigurationError::InvalidSchema(format!(
                    "type '{}' is registered twice",
                    schema.type_tag
                )));
            }
            types.insert(schema.type_tag.clone(), schema);
        }

        for schema in types.values() {
            let mut visited = HashSet::from([schema.type_tag.as_str()]);
            let mut current = schema;
            while let Some(parent) = current.extends.as_deref() {
                let Some(next) = types.get(parent) else {
                    return Err(ConfigurationError::InvalidSchema(format!(
                        "type '{}' extends unknown type '{parent}'",
                        current.type_tag
                    )));
                };
                if !visited.insert(parent) {
                    return Err(ConfigurationError::InvalidSchema(format!(
                        "type '{}' has a cyclic supertype chain",
                        schema.type_tag
                    )));
                }
                current = next;
            }
        }

        debug!(event = "Schema", phase = "Registered", types = types.len());

        Ok(SchemaRegistry { types })
    }
}

/// The immutable set of registered type schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: HashMap<String, TypeSchema>,
}

impl SchemaRegistry {
    pub fn get(&self, type_tag: &str) -> Option<&TypeSchema> {
        self.types.get(type_tag)
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.types.contains_key(type_tag)
    }

    pub fn is_securable(&self, type_tag: &str) -> bool {
        self.get(type_tag).is_some_and(|schema| schema.securable)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The type itself followed by its supertypes, nearest first.
    pub fn ancestry(&self, type_tag: &str) -> Vec<&TypeSchema> {
        let mut chain = Vec::new();
        let mut next = self.get(type_tag);
        while let Some(schema) = next {
            chain.push(schema);
            next = schema.extends.as_deref().and_then(|parent| self.get(parent));
        }
        chain
    }

    /// All fields visible on a type: its own first, then inherited ones.
    ///
    /// An inherited field shadowed by a nearer field of the same name is skipped.
    /// Returns `None` when the type is not registered.
    pub fn fields(&self, type_tag: &str) -> Option<Vec<&FieldSchema>> {
        if !self.contains(type_tag) {
            return None;
        }
        let mut seen = HashSet::new();
        let fields = self
            .ancestry(type_tag)
            .into_iter()
            .flat_map(|schema| schema.fields.iter())
            .filter(|field| seen.insert(field.name.as_str()))
            .collect();
        Some(fields)
    }
}
