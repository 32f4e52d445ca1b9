use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::*;
use crate::permissions::BasePermissionRegistry;
use crate::schema::{FieldSchema, SchemaRegistryBuilder, SubjectDecl, TypeSchema};
use crate::store::InMemoryAclStore;
use crate::types::{FieldType, SubjectKind};
use itertools::Itertools;

mod concurrency;
mod delete;

/// Store call counters, read after a scenario.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct Calls {
    pub reads: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

/// An in-memory store that counts every call and can be told to fail updates.
#[derive(Debug, Default)]
pub(super) struct RecordingStore {
    pub inner: InMemoryAclStore,
    reads: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
    fail_updates: AtomicBool,
}

impl RecordingStore {
    pub fn calls(&self) -> Calls {
        Calls {
            reads: self.reads.load(Ordering::SeqCst),
            creates: self.creates.load(Ordering::SeqCst),
            updates: self.updates.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
        }
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

impl AclStore for RecordingStore {
    fn read_by_id(&self, identity: &ObjectIdentity) -> Result<Acl, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_by_id(identity)
    }

    fn create(&self, identity: &ObjectIdentity) -> Result<Acl, StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(identity)
    }

    fn update(&self, acl: &Acl) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.update(acl)
    }

    fn delete_by_id(
        &self,
        identity: &ObjectIdentity,
        cascade_check: bool,
    ) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_id(identity, cascade_check)
    }
}

pub(super) fn schemas() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistryBuilder::new()
        .register(
            TypeSchema::plain("User").with_field(
                FieldSchema::new("name", FieldType::Text).subject_marker(SubjectKind::Principal),
            ),
        )
        .register(
            TypeSchema::securable("Folder")
                .with_field(FieldSchema::new("id", FieldType::Integer).object_identity())
                .with_field(
                    FieldSchema::new("owner", FieldType::Text).subject(
                        SubjectDecl::new(["ADMINISTRATION"]).kind(SubjectKind::Principal),
                    ),
                ),
        )
        .register(
            TypeSchema::securable("Document")
                .with_field(FieldSchema::new("id", FieldType::Integer).object_identity())
                .with_field(
                    FieldSchema::new("owners", FieldType::Sequence)
                        .subject(SubjectDecl::new(["READ", "WRITE"])),
                )
                .with_field(
                    FieldSchema::new("editors", FieldType::Sequence)
                        .subject(SubjectDecl::new(["write"]).kind(SubjectKind::Authority)),
                )
                .with_field(
                    FieldSchema::new("reviewers", FieldType::Array)
                        .subject(SubjectDecl::new(["READ"]).kind(SubjectKind::Principal)),
                )
                .with_field(
                    FieldSchema::new("banned", FieldType::Sequence).subject(
                        SubjectDecl::new(["DELETE"])
                            .kind(SubjectKind::Principal)
                            .denying(),
                    ),
                )
                .with_field(FieldSchema::new("folder", FieldType::Object).parent_link(true)),
        )
        .register(
            TypeSchema::securable("Draft")
                .with_field(FieldSchema::new("slug", FieldType::Text).object_identity())
                .with_field(FieldSchema::new("folder", FieldType::Object).parent_link(false)),
        )
        .register(
            TypeSchema::securable("Note").with_field(
                FieldSchema::new("author", FieldType::Text)
                    .subject(SubjectDecl::new(["READ"]).kind(SubjectKind::Principal)),
            ),
        )
        .register(
            TypeSchema::securable("Flight")
                .with_field(FieldSchema::new("id", FieldType::Integer).object_identity())
                .with_field(
                    FieldSchema::new("pilots", FieldType::Sequence)
                        .subject(SubjectDecl::new(["FLY"]).kind(SubjectKind::Principal)),
                ),
        )
        .register(
            TypeSchema::securable("Ticket")
                .with_field(FieldSchema::new("id", FieldType::Integer).object_identity())
                .with_subject_path(
                    "assignee.name",
                    SubjectDecl::new(["WRITE"]).kind(SubjectKind::Principal),
                ),
        )
        .build()
        .unwrap();
    Arc::new(registry)
}

pub(super) fn synthesizer() -> AclSynthesizer<Arc<RecordingStore>> {
    AclSynthesizer::new(
        schemas(),
        Arc::new(BasePermissionRegistry::new()),
        Arc::new(RecordingStore::default()),
    )
}

pub(super) fn user(name: &str) -> Record {
    Record::new("User").with("name", name)
}

pub(super) fn folder(id: i64, owner: &str) -> Record {
    Record::new("Folder").with("id", id).with("owner", owner)
}

pub(super) fn document(id: i64) -> Record {
    Record::new("Document").with("id", id)
}

/// The document from the canonical alice/bob/carol scenario.
pub(super) fn shared_document(id: i64) -> Record {
    document(id)
        .with("owners", Value::sequence([user("alice")]))
        .with("editors", Value::sequence(["bob", "carol"]))
}

pub(super) fn doc_id(id: i64) -> ObjectIdentity {
    ObjectIdentity::new("Document", id)
}

pub(super) fn folder_id(id: i64) -> ObjectIdentity {
    ObjectIdentity::new("Folder", id)
}

pub(super) fn render(acl: &Acl) -> String {
    acl.entries().iter().join("\n")
}
