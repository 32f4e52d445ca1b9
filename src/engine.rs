use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{AclError, ConfigurationError, StoreError};
use crate::loader::AclConfig;
use crate::metadata::{MetadataResolver, TypeMetadata};
use crate::permissions::{PermissionRegistry, PermissionResolver};
use crate::schema::SchemaRegistry;
use crate::sid::SidResolver;
use crate::store::AclStore;
use crate::traits::AclObject;
use crate::types::{Acl, ObjectIdentity, ObjectKey, Permission, Record, Subject, Value};

/// The synthesis engine handle. Thread-safe when the store is; share it behind an `Arc`.
///
/// Calls for different identities may run in parallel. Calls for the same
/// identity are not serialized here; callers needing that must lock per identity.
pub struct AclSynthesizer<S: AclStore> {
    metadata: MetadataResolver,
    sids: SidResolver,
    permissions: PermissionResolver,
    store: S,
}

/// What the parent-link field asks for.
enum ParentPlan {
    /// The type declares no parent link.
    Unchanged,
    /// The link is null or absent. Inheritance returns to the default.
    Detach,
    Attach {
        parent: ObjectIdentity,
        inheriting: bool,
    },
}

struct RulePlan {
    subjects: Vec<Subject>,
    permissions: Vec<Permission>,
    granting: bool,
}

/// Everything derived from the object itself, computed before the store is touched.
struct SynthesisPlan {
    identity: ObjectIdentity,
    parent: ParentPlan,
    rules: Vec<RulePlan>,
}

impl<S: AclStore> AclSynthesizer<S> {
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        permissions: Arc<dyn PermissionRegistry>,
        store: S,
    ) -> Self {
        Self {
            metadata: MetadataResolver::new(Arc::clone(&schemas)),
            sids: SidResolver::new(schemas),
            permissions: PermissionResolver::new(permissions),
            store,
        }
    }

    pub fn from_config(config: &AclConfig, store: S) -> Result<Self, ConfigurationError> {
        let (schemas, permissions) = config.registries()?;
        Ok(Self::new(schemas, permissions, store))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        self.metadata.registry()
    }

    pub fn metadata(&self) -> &MetadataResolver {
        &self.metadata
    }

    /// Derive the object identity of a securable object without touching the store.
    pub fn identity_of(&self, object: &impl AclObject) -> Result<ObjectIdentity, AclError> {
        let record = object.acl_record();
        let metadata = self.metadata.resolve(record.type_tag())?;
        Ok(identity_from(&metadata, &record)?)
    }

    /// Create or rebuild the ACL of one object and persist it.
    ///
    /// Existing entries are always replaced by the ones derived from the object.
    /// A linked parent must already have an ACL; otherwise nothing is created.
    pub fn synthesize(&self, object: &impl AclObject) -> Result<Acl, AclError> {
        let record = object.acl_record();
        let plan = self.plan(&record)?;

        debug!(
            event = "Synthesize",
            phase = "ResolveIdentity",
            identity = %plan.identity,
            rules = plan.rules.len()
        );

        if let ParentPlan::Attach { parent, .. } = &plan.parent {
            match self.store.read_by_id(parent) {
                Ok(_) => {}
                Err(StoreError::NotFound(_)) => {
                    return Err(AclError::MissingParentAcl(parent.clone()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut acl = match self.store.read_by_id(&plan.identity) {
            Ok(acl) => acl,
            Err(StoreError::NotFound(_)) => self.store.create(&plan.identity)?,
            Err(e) => return Err(e.into()),
        };
        debug!(
            event = "Synthesize",
            phase = "LoadOrCreateAcl",
            identity = %plan.identity,
            existing_entries = acl.entries().len()
        );

        acl.clear_entries();
        debug!(event = "Synthesize", phase = "ClearEntries", identity = %plan.identity);

        match &plan.parent {
            ParentPlan::Unchanged => {}
            ParentPlan::Detach => {
                acl.set_parent(None);
                acl.set_entries_inheriting(true);
            }
            ParentPlan::Attach { parent, inheriting } => {
                acl.set_parent(Some(parent.clone()));
                acl.set_entries_inheriting(*inheriting);
            }
        }
        debug!(
            event = "Synthesize",
            phase = "ResolveParent",
            identity = %plan.identity,
            parent = %acl.parent().map(ToString::to_string).unwrap_or_default()
        );

        let mut seen: HashSet<(&Subject, u32)> = HashSet::new();
        for rule in &plan.rules {
            for subject in &rule.subjects {
                for permission in &rule.permissions {
                    if seen.insert((subject, permission.mask())) {
                        acl.push_ace(permission.clone(), subject.clone(), rule.granting);
                    }
                }
            }
        }
        debug!(
            event = "Synthesize",
            phase = "ComputeEntries",
            identity = %plan.identity,
            entries = acl.entries().len()
        );

        self.store.update(&acl)?;
        info!(
            event = "Synthesize",
            phase = "Persist",
            identity = %plan.identity,
            entries = acl.entries().len(),
            parent = %acl.parent().map(ToString::to_string).unwrap_or_default()
        );

        Ok(acl)
    }

    /// Synthesize each object in order, stopping at the first failure.
    ///
    /// Objects processed before the failure stay persisted. Returns the number processed.
    pub fn synthesize_all<I>(&self, objects: I) -> Result<usize, AclError>
    where
        I: IntoIterator,
        I::Item: AclObject,
    {
        let mut processed = 0;
        for object in objects {
            if let Err(e) = self.synthesize(&object) {
                warn!(event = "Synthesize", phase = "BatchAborted", processed, error = %e);
                return Err(e);
            }
            processed += 1;
        }
        Ok(processed)
    }

    /// Remove the ACL of one object.
    ///
    /// Returns `Ok(false)` when the store keeps the ACL because other ACLs depend on it.
    pub fn delete(&self, object: &impl AclObject) -> Result<bool, AclError> {
        let identity = self.identity_of(object)?;
        match self.store.delete_by_id(&identity, true) {
            Ok(()) => {
                info!(event = "Delete", phase = "Deleted", identity = %identity);
                Ok(true)
            }
            Err(StoreError::HasChildren(_)) => {
                debug!(event = "Delete", phase = "Retained", identity = %identity);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete each object in order, stopping at the first failure. Returns the number processed.
    pub fn delete_all<I>(&self, objects: I) -> Result<usize, AclError>
    where
        I: IntoIterator,
        I::Item: AclObject,
    {
        let mut processed = 0;
        for object in objects {
            if let Err(e) = self.delete(&object) {
                warn!(event = "Delete", phase = "BatchAborted", processed, error = %e);
                return Err(e);
            }
            processed += 1;
        }
        Ok(processed)
    }

    fn plan(&self, record: &Record) -> Result<SynthesisPlan, AclError> {
        let metadata = self.metadata.resolve(record.type_tag())?;
        let identity = identity_from(&metadata, record)?;

        let permissions = metadata
            .subject_rules
            .iter()
            .map(|rule| self.permissions.resolve_all(&rule.permissions))
            .collect::<Result<Vec<_>, _>>()?;

        let parent = match &metadata.parent_link {
            None => ParentPlan::Unchanged,
            Some(link) => match record.get(&link.field) {
                None | Some(Value::Null) => ParentPlan::Detach,
                Some(Value::Record(parent)) => ParentPlan::Attach {
                    parent: self.identity_of(parent)?,
                    inheriting: link.inheriting,
                },
                Some(other) => {
                    return Err(AclError::InvalidParentLink {
                        type_tag: metadata.type_tag.clone(),
                        field: link.field.clone(),
                        found: other.kind().to_string(),
                    });
                }
            },
        };

        let rules = metadata
            .subject_rules
            .iter()
            .zip(permissions)
            .map(|(rule, permissions)| {
                Ok(RulePlan {
                    subjects: self.sids.resolve(record, rule)?,
                    permissions,
                    granting: rule.granting,
                })
            })
            .collect::<Result<Vec<_>, AclError>>()?;

        Ok(SynthesisPlan {
            identity,
            parent,
            rules,
        })
    }
}

impl<S: AclStore + std::fmt::Debug> std::fmt::Debug for AclSynthesizer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclSynthesizer")
            .field("metadata", &self.metadata)
            .field("permissions", &self.permissions)
            .field("store", &self.store)
            .finish()
    }
}

fn identity_from(
    metadata: &TypeMetadata,
    record: &Record,
) -> Result<ObjectIdentity, ConfigurationError> {
    let field = &metadata.identity.field;
    let value = record
        .get(field)
        .filter(|value| !value.is_null())
        .ok_or_else(|| ConfigurationError::MissingIdentityValue {
            type_tag: metadata.type_tag.clone(),
            field: field.clone(),
        })?;
    let key =
        ObjectKey::from_value(value).ok_or_else(|| ConfigurationError::InvalidIdentityValue {
            type_tag: metadata.type_tag.clone(),
            field: field.clone(),
        })?;
    Ok(ObjectIdentity::new(metadata.type_tag.clone(), key))
}

#[cfg(test)]
mod tests;
