//! Per-type ACL metadata derived from the schema registry.
//!
//! [`MetadataResolver::resolve`] flattens a type's declared markers (including
//! those inherited from supertypes) into a [`TypeMetadata`], validates it, and
//! publishes it into a process-wide cache so later calls never rescan the schema.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::cache::PublishOnceCache;
use crate::error::ConfigurationError;
use crate::schema::{FieldMarker, SchemaRegistry, SubjectDecl};
use crate::types::{FieldType, Record, SubjectKind, Value, ValueShape};

static SUBJECT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("static regex is valid")
});

/// Where a subject rule reads its value from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubjectLocator {
    /// A field declared with a subject marker.
    Field(String),
    /// A type-level rule reading through nested records.
    Path(Vec<String>),
}

impl SubjectLocator {
    /// The value behind the rule. `Err` carries a non-record value met partway along a path.
    pub fn locate<'a>(&self, record: &'a Record) -> Result<Option<&'a Value>, &'a Value> {
        match self {
            SubjectLocator::Field(name) => Ok(record.get(name)),
            SubjectLocator::Path(segments) => record.get_path(segments.iter().map(String::as_str)),
        }
    }

    /// The dotted name used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            SubjectLocator::Field(name) => name.clone(),
            SubjectLocator::Path(segments) => segments.join("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRule {
    pub field: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectFieldRule {
    pub locator: SubjectLocator,
    /// Upper-case permission names, in declaration order.
    pub permissions: Vec<String>,
    pub granting: bool,
    pub subject_kind: Option<SubjectKind>,
    /// Known from the declared field type; `None` for path rules, which are
    /// classified from the runtime value.
    pub shape: Option<ValueShape>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentLinkRule {
    pub field: String,
    pub inheriting: bool,
}

/// Everything the synthesizer needs to know about one securable type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMetadata {
    pub type_tag: String,
    pub identity: IdentityRule,
    pub subject_rules: Vec<SubjectFieldRule>,
    pub parent_link: Option<ParentLinkRule>,
}

/// Resolves and caches [`TypeMetadata`] per type tag.
#[derive(Debug)]
pub struct MetadataResolver {
    registry: Arc<SchemaRegistry>,
    cache: PublishOnceCache<Arc<TypeMetadata>>,
}

impl MetadataResolver {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            cache: PublishOnceCache::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn resolve(&self, type_tag: &str) -> Result<Arc<TypeMetadata>, ConfigurationError> {
        self.cache.get_or_try_insert_with(type_tag, || {
            let metadata = self.compute(type_tag)?;
            debug!(
                event = "Metadata",
                phase = "Published",
                type_tag,
                identity = %metadata.identity.field,
                subject_rules = metadata.subject_rules.len(),
                parent_link = metadata.parent_link.is_some()
            );
            Ok(Arc::new(metadata))
        })
    }

    /// Number of types whose metadata has been published.
    pub fn cached_types(&self) -> usize {
        self.cache.len()
    }

    fn compute(&self, type_tag: &str) -> Result<TypeMetadata, ConfigurationError> {
        let schema = self
            .registry
            .get(type_tag)
            .ok_or_else(|| ConfigurationError::UnknownType(type_tag.to_string()))?;
        if !schema.securable {
            return Err(ConfigurationError::NotSecurable(type_tag.to_string()));
        }
        let fields = self
            .registry
            .fields(type_tag)
            .ok_or_else(|| ConfigurationError::UnknownType(type_tag.to_string()))?;

        let mut identities = Vec::new();
        let mut parents = Vec::new();
        let mut subject_rules = Vec::new();

        for field in &fields {
            for marker in &field.markers {
                match marker {
                    FieldMarker::ObjectIdentity => identities.push(*field),
                    FieldMarker::ParentLink { inheriting } => parents.push((*field, *inheriting)),
                    FieldMarker::Subject(decl) => {
                        let shape = field.field_type.shape().ok_or_else(|| {
                            ConfigurationError::InvalidSubjectFieldType {
                                type_tag: type_tag.to_string(),
                                field: field.name.clone(),
                                found: field.field_type,
                            }
                        })?;
                        subject_rules.push(subject_rule(
                            type_tag,
                            SubjectLocator::Field(field.name.clone()),
                            decl,
                            Some(shape),
                        )?);
                    }
                    FieldMarker::SubjectMarker { .. } => {}
                }
            }
        }

        for rule in &schema.subject_paths {
            if !SUBJECT_PATH.is_match(&rule.path) {
                return Err(ConfigurationError::InvalidSubjectPath {
                    type_tag: type_tag.to_string(),
                    path: rule.path.clone(),
                });
            }
            let segments = rule.path.split('.').map(str::to_string).collect();
            subject_rules.push(subject_rule(
                type_tag,
                SubjectLocator::Path(segments),
                &rule.decl,
                None,
            )?);
        }

        let identity = match identities.as_slice() {
            [] => return Err(ConfigurationError::MissingIdentityField(type_tag.to_string())),
            [field] if field.field_type.is_key() => IdentityRule {
                field: field.name.clone(),
                field_type: field.field_type,
            },
            [field] => {
                return Err(ConfigurationError::InvalidIdentityType {
                    type_tag: type_tag.to_string(),
                    field: field.name.clone(),
                    found: field.field_type,
                });
            }
            many => {
                return Err(ConfigurationError::DuplicateIdentityField {
                    type_tag: type_tag.to_string(),
                    fields: many.iter().map(|f| f.name.clone()).collect(),
                });
            }
        };

        let parent_link = match parents.as_slice() {
            [] => None,
            [(field, inheriting)] if field.field_type == FieldType::Object => Some(ParentLinkRule {
                field: field.name.clone(),
                inheriting: *inheriting,
            }),
            [(field, _)] => {
                return Err(ConfigurationError::InvalidParentLinkType {
                    type_tag: type_tag.to_string(),
                    field: field.name.clone(),
                    found: field.field_type,
                });
            }
            many => {
                return Err(ConfigurationError::DuplicateParentLink {
                    type_tag: type_tag.to_string(),
                    fields: many.iter().map(|(f, _)| f.name.clone()).collect(),
                });
            }
        };

        Ok(TypeMetadata {
            type_tag: type_tag.to_string(),
            identity,
            subject_rules,
            parent_link,
        })
    }
}

fn subject_rule(
    type_tag: &str,
    locator: SubjectLocator,
    decl: &SubjectDecl,
    shape: Option<ValueShape>,
) -> Result<SubjectFieldRule, ConfigurationError> {
    if decl.permissions.is_empty() {
        return Err(ConfigurationError::EmptyPermissions {
            type_tag: type_tag.to_string(),
            field: locator.describe(),
        });
    }
    Ok(SubjectFieldRule {
        locator,
        permissions: decl
            .permissions
            .iter()
            .map(|p| crate::permissions::normalize_permission_name(p))
            .collect(),
        granting: decl.granting,
        subject_kind: decl.subject_kind,
        shape,
    })
}
