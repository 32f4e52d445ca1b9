// src/lib.rs
pub use engine::AclSynthesizer;
pub use error::{AclError, ConfigurationError, StoreError};
pub use lifecycle::LifecycleEvent;
pub use loader::{AclConfig, load_config};
pub use metadata::{
    IdentityRule, MetadataResolver, ParentLinkRule, SubjectFieldRule, SubjectLocator, TypeMetadata,
};
pub use permissions::{
    BasePermissionRegistry, PermissionRegistry, PermissionResolver, normalize_permission_name,
};
pub use schema::{
    FieldMarker, FieldSchema, SchemaRegistry, SchemaRegistryBuilder, SubjectDecl, SubjectPathRule,
    TypeSchema,
};
pub use sid::{SidResolver, SubjectMarker};
pub use store::{AclStore, InMemoryAclStore};
pub use traits::AclObject;
pub use types::{
    AccessControlEntry, Acl, BasePermission, FieldType, ObjectIdentity, ObjectKey, Permission,
    Record, Subject, SubjectKind, Value, ValueShape,
};

mod cache;
mod engine;
mod error;
mod lifecycle;
mod loader;
mod metadata;
mod permissions;
mod schema;
mod sid;
mod store;
mod traits;
pub mod types;
