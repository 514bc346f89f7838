//! Last-delivered value store used for change deduplication.

use crate::core::{ElementState, EntityRef};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_id: String,
    set_id: String,
    key: String,
}

/// Concurrent map from cache key to the last value that produced a callback.
///
/// Keys are scoped by `(source_id, set_id)` so several subscriptions can
/// share one cache without seeing each other's values.
///
/// # Examples
///
/// ```rust
/// use element_monitor::{ElementState, subscription::ChangeCache};
///
/// let cache = ChangeCache::new();
/// assert!(cache.replace_if_different("src", "set", "Result_1/2", ElementState::Active));
/// assert!(!cache.replace_if_different("src", "set", "Result_1/2", ElementState::Active));
/// assert!(cache.replace_if_different("src", "set", "Result_1/2", ElementState::Stopped));
/// ```
#[derive(Debug)]
pub struct ChangeCache<V = ElementState> {
    entries: DashMap<CacheKey, V>,
}

impl<V: PartialEq> ChangeCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cache key for results about `entity`: `"Result_{owner}/{entity}"`.
    pub fn result_key(entity: &EntityRef) -> String {
        format!("Result_{}", entity.key())
    }

    /// Store `candidate` unless it equals the cached value.
    ///
    /// Returns `true` when the value was absent or different, meaning the
    /// caller must fire. Compare and store happen under the entry lock, so
    /// concurrent callers racing on one transition see exactly one `true`.
    pub fn replace_if_different(&self, source_id: &str, set_id: &str, key: &str, candidate: V) -> bool {
        let cache_key = CacheKey {
            source_id: source_id.to_string(),
            set_id: set_id.to_string(),
            key: key.to_string(),
        };

        match self.entries.entry(cache_key) {
            Entry::Occupied(mut occ) => {
                if *occ.get() == candidate {
                    false
                } else {
                    occ.insert(candidate);
                    true
                }
            }
            Entry::Vacant(vac) => {
                vac.insert(candidate);
                true
            }
        }
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V: PartialEq + Clone> ChangeCache<V> {
    /// Cached value for `key` within `(source_id, set_id)`.
    pub fn get(&self, source_id: &str, set_id: &str, key: &str) -> Option<V> {
        let cache_key = CacheKey {
            source_id: source_id.to_string(),
            set_id: set_id.to_string(),
            key: key.to_string(),
        };
        self.entries.get(&cache_key).map(|v| v.value().clone())
    }
}

impl<V: PartialEq> Default for ChangeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_result_key() {
        let key = ChangeCache::<ElementState>::result_key(&EntityRef::new(12, 34));
        assert_eq!(key, "Result_12/34");
    }

    #[test]
    fn test_replace_if_different() {
        let cache = ChangeCache::new();
        assert!(cache.replace_if_different("s", "set", "k", ElementState::Active));
        assert!(!cache.replace_if_different("s", "set", "k", ElementState::Active));
        assert!(cache.replace_if_different("s", "set", "k", ElementState::Paused));
        assert_eq!(cache.get("s", "set", "k"), Some(ElementState::Paused));
    }

    #[test]
    fn test_scoped_by_source_and_set() {
        let cache = ChangeCache::new();
        assert!(cache.replace_if_different("a", "set", "k", ElementState::Active));
        assert!(cache.replace_if_different("b", "set", "k", ElementState::Active));
        assert!(cache.replace_if_different("a", "other", "k", ElementState::Active));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_clear() {
        let cache = ChangeCache::new();
        cache.replace_if_different("s", "set", "k", ElementState::Active);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.replace_if_different("s", "set", "k", ElementState::Active));
    }

    #[test]
    fn test_generic_values() {
        let cache: ChangeCache<String> = ChangeCache::new();
        assert!(cache.replace_if_different("s", "set", "k", "one".to_string()));
        assert!(!cache.replace_if_different("s", "set", "k", "one".to_string()));
    }

    #[test]
    fn test_concurrent_single_winner() {
        let cache = Arc::new(ChangeCache::new());
        let winners = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let winners = Arc::clone(&winners);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..100 {
                        if cache.replace_if_different("s", "set", "k", ElementState::Stopped) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
