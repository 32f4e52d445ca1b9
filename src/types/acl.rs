//! In-memory ACL handles and their entries.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::ObjectIdentity;
use super::permission::Permission;
use super::subject::Subject;

/// One (subject, permission, granting) triple, at position `index` in its ACL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct AccessControlEntry {
    index: usize,
    subject: Subject,
    permission: Permission,
    granting: bool,
}

impl AccessControlEntry {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    pub fn is_granting(&self) -> bool {
        self.granting
    }
}

impl Display for AccessControlEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let effect = if self.granting { "grant" } else { "deny" };
        write!(
            f,
            "#{} {} {} {}",
            self.index,
            effect,
            self.permission.name(),
            self.subject
        )
    }
}

/// An access control list: ordered entries scoped to one object, plus an
/// optional parent it may inherit from.
///
/// This is a transient handle. Changes only become visible once the handle is
/// passed to [`AclStore::update`](crate::AclStore::update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Acl {
    identity: ObjectIdentity,
    entries: Vec<AccessControlEntry>,
    parent: Option<ObjectIdentity>,
    entries_inheriting: bool,
}

impl Acl {
    /// A fresh ACL with no entries and no parent. Entries inherit by default.
    pub fn new(identity: ObjectIdentity) -> Self {
        Self {
            identity,
            entries: Vec::new(),
            parent: None,
            entries_inheriting: true,
        }
    }

    pub fn identity(&self) -> &ObjectIdentity {
        &self.identity
    }

    pub fn entries(&self) -> &[AccessControlEntry] {
        &self.entries
    }

    pub fn parent(&self) -> Option<&ObjectIdentity> {
        self.parent.as_ref()
    }

    pub fn is_entries_inheriting(&self) -> bool {
        self.entries_inheriting
    }

    /// Append an entry at the end of the list.
    pub fn push_ace(&mut self, permission: Permission, subject: Subject, granting: bool) {
        self.entries.push(AccessControlEntry {
            index: self.entries.len(),
            subject,
            permission,
            granting,
        });
    }

    /// Remove the entry at `index`, renumbering the entries after it.
    pub fn delete_ace(&mut self, index: usize) -> Option<AccessControlEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);
        for (i, entry) in self.entries.iter_mut().enumerate().skip(index) {
            entry.index = i;
        }
        Some(removed)
    }

    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }

    pub fn set_parent(&mut self, parent: Option<ObjectIdentity>) {
        self.parent = parent;
    }

    pub fn set_entries_inheriting(&mut self, inheriting: bool) {
        self.entries_inheriting = inheriting;
    }

    /// The entries as (subject, permission mask, granting) triples, ignoring order.
    pub fn entry_set(&self) -> std::collections::BTreeSet<(Subject, u32, bool)> {
        self.entries
            .iter()
            .map(|e| (e.subject.clone(), e.permission.mask(), e.granting))
            .collect()
    }
}
