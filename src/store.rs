//! The ACL store contract and an in-memory, parent-aware implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use itertools::Itertools;
use tracing::debug;

use crate::error::StoreError;
use crate::types::{Acl, ObjectIdentity};

/// A backing store of ACLs keyed by object identity.
///
/// The engine reads an ACL into a transient [`Acl`] handle, mutates the
/// handle, and writes it back with a single [`update`](AclStore::update).
pub trait AclStore: Send + Sync {
    /// Fails with [`StoreError::NotFound`] when no ACL exists for `identity`.
    fn read_by_id(&self, identity: &ObjectIdentity) -> Result<Acl, StoreError>;

    /// Create an empty ACL for `identity`.
    fn create(&self, identity: &ObjectIdentity) -> Result<Acl, StoreError>;

    /// Replace the stored ACL with `acl`, including its entries and parent.
    fn update(&self, acl: &Acl) -> Result<(), StoreError>;

    /// With `cascade_check`, fails with [`StoreError::HasChildren`] if other
    /// ACLs name this one as their parent.
    fn delete_by_id(&self, identity: &ObjectIdentity, cascade_check: bool)
    -> Result<(), StoreError>;
}

impl<S: AclStore + ?Sized> AclStore for Arc<S> {
    fn read_by_id(&self, identity: &ObjectIdentity) -> Result<Acl, StoreError> {
        (**self).read_by_id(identity)
    }

    fn create(&self, identity: &ObjectIdentity) -> Result<Acl, StoreError> {
        (**self).create(identity)
    }

    fn update(&self, acl: &Acl) -> Result<(), StoreError> {
        (**self).update(acl)
    }

    fn delete_by_id(
        &self,
        identity: &ObjectIdentity,
        cascade_check: bool,
    ) -> Result<(), StoreError> {
        (**self).delete_by_id(identity, cascade_check)
    }
}

/// An in-process store. Useful for tests and for callers that persist ACLs elsewhere.
#[derive(Debug, Default)]
pub struct InMemoryAclStore {
    acls: RwLock<HashMap<ObjectIdentity, Acl>>,
}

impl InMemoryAclStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored ACL for `identity`, if any.
    pub fn get(&self, identity: &ObjectIdentity) -> Option<Acl> {
        self.read().get(identity).cloned()
    }

    pub fn contains(&self, identity: &ObjectIdentity) -> bool {
        self.read().contains_key(identity)
    }

    /// Identities of the ACLs whose parent is `identity`, sorted.
    pub fn children_of(&self, identity: &ObjectIdentity) -> Vec<ObjectIdentity> {
        self.read()
            .values()
            .filter(|acl| acl.parent() == Some(identity))
            .map(|acl| acl.identity().clone())
            .sorted()
            .collect()
    }

    /// Every stored ACL, sorted by identity.
    pub fn snapshot(&self) -> Vec<Acl> {
        self.read()
            .values()
            .cloned()
            .sorted_by(|a, b| a.identity().cmp(b.identity()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObjectIdentity, Acl>> {
        self.acls.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ObjectIdentity, Acl>> {
        self.acls.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AclStore for InMemoryAclStore {
    fn read_by_id(&self, identity: &ObjectIdentity) -> Result<Acl, StoreError> {
        self.get(identity)
            .ok_or_else(|| StoreError::NotFound(identity.clone()))
    }

    fn create(&self, identity: &ObjectIdentity) -> Result<Acl, StoreError> {
        let mut acls = self.write();
        if acls.contains_key(identity) {
            return Err(StoreError::AlreadyExists(identity.clone()));
        }
        let acl = Acl::new(identity.clone());
        acls.insert(identity.clone(), acl.clone());
        debug!(event = "Store", phase = "Created", identity = %identity);
        Ok(acl)
    }

    fn update(&self, acl: &Acl) -> Result<(), StoreError> {
        let mut acls = self.write();
        if !acls.contains_key(acl.identity()) {
            return Err(StoreError::NotFound(acl.identity().clone()));
        }
        if let Some(parent) = acl.parent() {
            if !acls.contains_key(parent) {
                return Err(StoreError::NotFound(parent.clone()));
            }
        }
        acls.insert(acl.identity().clone(), acl.clone());
        debug!(
            event = "Store",
            phase = "Updated",
            identity = %acl.identity(),
            entries = acl.entries().len()
        );
        Ok(())
    }

    fn delete_by_id(
        &self,
        identity: &ObjectIdentity,
        cascade_check: bool,
    ) -> Result<(), StoreError> {
        let mut acls = self.write();
        let has_children = acls.values().any(|acl| acl.parent() == Some(identity));
        if cascade_check && has_children {
            return Err(StoreError::HasChildren(identity.clone()));
        }
        if acls.remove(identity).is_none() {
            return Ok(());
        }
        if has_children {
            for acl in acls.values_mut() {
                if acl.parent() == Some(identity) {
                    acl.set_parent(None);
                }
            }
        }
        debug!(event = "Store", phase = "Deleted", identity = %identity);
        Ok(())
    }
}
