//! Write-once chain cache

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::types::{MethodRef, TypeRef};

use super::InterceptorChain;

/// Cache key: target type and method, compared by value
pub type ChainKey = (TypeRef, MethodRef);

/// Per-key chain cache with at most one build per key
///
/// Concurrent callers asking for the same missing key block on the same
/// cell; exactly one of them runs the build and all observe its result.
#[derive(Default)]
pub struct ChainCache {
    entries: DashMap<ChainKey, Arc<OnceCell<Arc<InterceptorChain>>>>,
    builds: AtomicUsize,
}

impl ChainCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the chain for `key`, building it on first use
    pub fn get_or_build<F>(&self, key: ChainKey, build: F) -> Arc<InterceptorChain>
    where
        F: FnOnce() -> InterceptorChain,
    {
        // Clone the cell out so the shard lock is not held while building
        let cell = Arc::clone(self.entries.entry(key).or_default().value());
        let chain = cell.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            Arc::new(build())
        });
        Arc::clone(chain)
    }

    /// Get a chain that was already built
    pub fn get(&self, key: &ChainKey) -> Option<Arc<InterceptorChain>> {
        self.entries
            .get(key)
            .and_then(|cell| cell.get().map(Arc::clone))
    }

    /// Drop every cached chain
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total chains built over the cache's lifetime
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Method, TypeDescriptor};
    use std::sync::Barrier;
    use std::thread;

    fn key(name: &'static str) -> ChainKey {
        (TypeDescriptor::new("Store").into_ref(), Method::new("IStore", name).into_ref())
    }

    #[test]
    fn test_builds_once_per_key() {
        let cache = ChainCache::new();
        let a = cache.get_or_build(key("Load"), InterceptorChain::empty);
        let b = cache.get_or_build(key("Load"), || panic!("rebuilt"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.build_count(), 1);

        cache.get_or_build(key("Save"), InterceptorChain::empty);
        assert_eq!(cache.build_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_types_with_same_name_are_distinct_keys() {
        let cache = ChainCache::new();
        let load = Method::new("IStore", "Load").into_ref();
        let audited = TypeDescriptor::new("Store").with_attribute("Audited").into_ref();

        cache.get_or_build(key("Load"), InterceptorChain::empty);
        cache.get_or_build((audited, load), InterceptorChain::empty);
        assert_eq!(cache.build_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear_forces_rebuild() {
        let cache = ChainCache::new();
        cache.get_or_build(key("Load"), InterceptorChain::empty);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&key("Load")).is_none());
        cache.get_or_build(key("Load"), InterceptorChain::empty);
        assert_eq!(cache.build_count(), 2);
    }

    #[test]
    fn test_concurrent_callers_share_one_build() {
        let cache = Arc::new(ChainCache::new());
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_build(key("Load"), || {
                        thread::sleep(std::time::Duration::from_millis(5));
                        InterceptorChain::empty()
                    })
                })
            })
            .collect();

        let chains: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.build_count(), 1);
        assert!(chains.iter().all(|c| Arc::ptr_eq(c, &chains[0])));
    }
}
