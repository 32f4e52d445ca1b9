use super::*;

#[test]
fn test_delete_removes_acl() {
    let engine = synthesizer();
    engine.synthesize(&shared_document(42)).unwrap();

    assert_eq!(engine.delete(&shared_document(42)), Ok(true));
    assert!(!engine.store().inner.contains(&doc_id(42)));
}

#[test]
fn test_delete_with_children_is_benign() {
    let engine = synthesizer();
    let parent = folder(1, "olivia");
    engine.synthesize(&parent).unwrap();
    engine
        .synthesize(&shared_document(42).with("folder", parent.clone()))
        .unwrap();
    let before = engine.store().inner.snapshot();

    assert_eq!(engine.delete(&parent), Ok(false));
    assert_eq!(engine.store().inner.snapshot(), before);
    assert_eq!(engine.store().calls().deletes, 1);
}

#[test]
fn test_delete_without_acl_is_ok() {
    let engine = synthesizer();
    assert_eq!(engine.delete(&document(99)), Ok(true));
}

#[test]
fn test_delete_requires_identity() {
    let engine = synthesizer();
    let note = Record::new("Note").with("author", "alice");
    assert!(engine.delete(&note).unwrap_err().is_configuration());
    assert_eq!(engine.store().calls().deletes, 0);
}

#[test]
fn test_delete_then_synthesize_recreates() {
    let engine = synthesizer();
    engine.synthesize(&shared_document(42)).unwrap();
    engine.delete(&shared_document(42)).unwrap();

    let acl = engine.synthesize(&shared_document(42)).unwrap();
    assert_eq!(acl.entries().len(), 4);
    assert_eq!(engine.store().calls().creates, 2);
}
