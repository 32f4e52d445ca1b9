//! Data model types for ACL synthesis.
//!
//! Canonical string forms:
//! - ObjectIdentity: `Document::"42"`
//! - Subject: `principal:alice` or `authority:editors`
//! - Permission: `WRITE(2)`

mod acl;
mod identity;
mod permission;
mod subject;
mod value;

pub use acl::{AccessControlEntry, Acl};
pub use identity::{ObjectIdentity, ObjectKey};
pub use permission::{BasePermission, Permission};
pub use subject::{Subject, SubjectKind};
pub use value::{FieldType, Record, Value, ValueShape};
