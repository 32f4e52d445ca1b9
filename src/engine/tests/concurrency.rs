use std::thread;

use super::*;

#[test]
fn test_concurrent_synthesis_of_distinct_identities() {
    let engine = Arc::new(synthesizer());
    let mut handles = vec![];

    for i in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for round in 0..10 {
                let doc = shared_document(i)
                    .with("editors", Value::sequence([format!("editor-{round}")]));
                engine.synthesize(&doc).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.store().inner.len(), 8);
    for i in 0..8 {
        let acl = engine.store().inner.get(&doc_id(i)).unwrap();
        assert_eq!(acl.entries().len(), 3);
        assert!(acl
            .entries()
            .iter()
            .any(|e| e.subject() == &Subject::authority("editor-9")));
    }
    assert_eq!(engine.store().calls().creates, 8);
}

#[test]
fn test_metadata_is_resolved_once_per_type() {
    let engine = Arc::new(synthesizer());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.synthesize(&shared_document(i)).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.metadata().cached_types(), 1);
    let first = engine.metadata().resolve("Document").unwrap();
    let second = engine.metadata().resolve("Document").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_synthesizer_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AclSynthesizer<InMemoryAclStore>>();
    assert_send_sync::<AclSynthesizer<Arc<RecordingStore>>>();
}
