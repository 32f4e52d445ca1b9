use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{FieldType, ObjectIdentity};

/// Errors raised while resolving schema metadata or loading configuration.
///
/// These are always detected before the ACL store is touched.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("type '{0}' is not registered in the schema")]
    UnknownType(String),

    #[error("type '{0}' is not marked securable")]
    NotSecurable(String),

    #[error("type '{0}' declares no object identity field")]
    MissingIdentityField(String),

    #[error("type '{type_tag}' declares more than one object identity field: {fields:?}")]
    DuplicateIdentityField { type_tag: String, fields: Vec<String> },

    #[error("identity field '{field}' of type '{type_tag}' has non-serializable type {found}")]
    InvalidIdentityType {
        type_tag: String,
        field: String,
        found: FieldType,
    },

    #[error("identity field '{field}' of '{type_tag}' has no value")]
    MissingIdentityValue { type_tag: String, field: String },

    #[error("identity field '{field}' of '{type_tag}' holds a non-serializable value")]
    InvalidIdentityValue { type_tag: String, field: String },

    #[error("subject rule '{field}' of type '{type_tag}' declares no permissions")]
    EmptyPermissions { type_tag: String, field: String },

    #[error("subject field '{field}' of type '{type_tag}' has unsupported type {found}")]
    InvalidSubjectFieldType {
        type_tag: String,
        field: String,
        found: FieldType,
    },

    #[error("type '{type_tag}' declares more than one parent link field: {fields:?}")]
    DuplicateParentLink { type_tag: String, fields: Vec<String> },

    #[error("parent link field '{field}' of type '{type_tag}' must be an object, found {found}")]
    InvalidParentLinkType {
        type_tag: String,
        field: String,
        found: FieldType,
    },

    #[error("invalid subject path '{path}' on type '{type_tag}'")]
    InvalidSubjectPath { type_tag: String, path: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors reported by an [`AclStore`](crate::AclStore) implementation.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoreError {
    #[error("no ACL found for {0}")]
    NotFound(ObjectIdentity),

    #[error("an ACL already exists for {0}")]
    AlreadyExists(ObjectIdentity),

    #[error("ACL for {0} has dependent children")]
    HasChildren(ObjectIdentity),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// The engine-level error. Every failed synthesis or delete call surfaces one of these.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum AclError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    #[error("unable to resolve subject for field '{field}' of '{type_tag}': {reason}")]
    UnresolvableSubject {
        type_tag: String,
        field: String,
        reason: String,
    },

    #[error("field '{field}' of '{type_tag}' holds scalar subjects but declares no subject kind")]
    AmbiguousSubjectKind { type_tag: String, field: String },

    #[error("parent link field '{field}' of '{type_tag}' must hold a record, found {found}")]
    InvalidParentLink {
        type_tag: String,
        field: String,
        found: String,
    },

    #[error("parent ACL {0} does not exist")]
    MissingParentAcl(ObjectIdentity),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AclError {
    /// True for errors caused by the schema or permission setup rather than the object's data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AclError::Configuration(_) | AclError::UnknownPermission(_)
        )
    }

    pub(crate) fn unresolvable(
        type_tag: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AclError::UnresolvableSubject {
            type_tag: type_tag.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}
