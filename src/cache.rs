//! Process-wide, publish-once caches for per-type metadata.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A concurrent map from a string key to a computed value.
///
/// Values are computed outside the lock, so concurrent misses on the same key
/// may both compute. The first value published wins and every later caller
/// observes it. Failed computations are not cached.
#[derive(Debug)]
pub(crate) struct PublishOnceCache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Clone> PublishOnceCache<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<V> {
        // Entries are immutable once inserted; poisoning is ignored.
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(key).cloned()
    }

    pub(crate) fn get_or_try_insert_with<E, F>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }

        let computed = compute()?;

        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.entry(key.to_string()).or_insert(computed).clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_computes_once_when_sequential() {
        let cache: PublishOnceCache<u32> = PublishOnceCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("k", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(7)
                })
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: PublishOnceCache<u32> = PublishOnceCache::new();
        assert_eq!(cache.get_or_try_insert_with("k", || Err("boom")), Err("boom"));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.get_or_try_insert_with("k", || Ok::<_, &str>(3)), Ok(3));
    }

    #[test]
    fn test_first_published_value_wins() {
        let cache: PublishOnceCache<u32> = PublishOnceCache::new();
        cache.get_or_try_insert_with("k", || Ok::<_, ()>(1)).unwrap();
        let value = cache.get_or_try_insert_with("k", || Ok::<_, ()>(2)).unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn test_concurrent_readers_observe_one_value() {
        let cache = Arc::new(PublishOnceCache::<Arc<String>>::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache
                        .get_or_try_insert_with("Document", || {
                            Ok::<_, ()>(Arc::new(format!("computed-by-{i}")))
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let published = cache.get("Document").unwrap();
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &published)));
    }
}
