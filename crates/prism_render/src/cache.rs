//! Once-per-hash Cache
//!
//! The storage shared by [`ShaderCache`](crate::ShaderCache) and
//! [`InstanceCache`](crate::InstanceCache).
//!
//! # Concurrency
//!
//! - A hit takes the map's read lock only.
//! - A miss inserts an empty slot under the write lock, releases it, then
//!   populates the slot under that slot's own mutex. Exactly one thread runs
//!   the conversion for a given hash; other threads asking for the same hash
//!   wait on that slot, threads asking for other hashes do not wait at all.
//! - A failed conversion leaves the slot empty so a later call can retry.

use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use prism_core::{Hash128, Result};
use rustc_hash::FxHashMap;

struct Slot<V> {
    value: OnceLock<Arc<V>>,
    init: Mutex<()>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            value: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// `true` while anything besides the cache holds the slot or its value.
    fn in_use(self: &Arc<Self>) -> bool {
        Arc::strong_count(self) > 1 || self.value.get().is_some_and(|v| Arc::strong_count(v) > 1)
    }
}

pub(crate) struct OnceCache<V> {
    slots: RwLock<FxHashMap<Hash128, Arc<Slot<V>>>>,
}

impl<V> Default for OnceCache<V> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<V> OnceCache<V> {
    /// Returns the value cached for `key`, running `init` to create it on
    /// a miss.
    pub fn get_or_try_insert(&self, key: Hash128, init: impl FnOnce() -> Result<V>) -> Result<Arc<V>> {
        let slot = {
            let existing = self.slots.read().get(&key).cloned();
            match existing {
                Some(slot) => slot,
                None => self.slots.write().entry(key).or_insert_with(|| Arc::new(Slot::new())).clone(),
            }
        };

        if let Some(value) = slot.value.get() {
            return Ok(value.clone());
        }

        let _guard = slot.init.lock();
        if let Some(value) = slot.value.get() {
            return Ok(value.clone());
        }
        let value = Arc::new(init()?);
        let _ = slot.value.set(value.clone());
        Ok(value)
    }

    /// The cached value for `key`, if populated.
    pub fn get(&self, key: Hash128) -> Option<Arc<V>> {
        self.slots.read().get(&key).and_then(|slot| slot.value.get().cloned())
    }

    /// Drops every entry the cache holds the only reference to. Returns the
    /// number of entries removed.
    ///
    /// Must not run concurrently with entity creation.
    pub fn clear_unused(&self) -> usize {
        let removed: Vec<Arc<Slot<V>>> = {
            let mut slots = self.slots.write();
            slots.extract_if(|_, slot| !slot.in_use()).map(|(_, slot)| slot).collect()
        };
        // Values are dropped outside the map lock; dropping may destroy nodes.
        removed.len()
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.slots.read().values().filter(|s| s.value.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let slots = std::mem::take(&mut *self.slots.write());
        drop(slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::PrismError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hit_returns_same_arc() {
        let cache = OnceCache::default();
        let a = cache.get_or_try_insert(Hash128(1), || Ok(String::from("a"))).unwrap();
        let b = cache
            .get_or_try_insert(Hash128(1), || -> Result<String> { panic!("converted twice") })
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_init_can_retry() {
        let cache: OnceCache<u32> = OnceCache::default();
        let err = cache.get_or_try_insert(Hash128(7), || Err(PrismError::UnsupportedObject("x".into())));
        assert!(err.is_err());
        assert!(cache.get(Hash128(7)).is_none());
        assert_eq!(*cache.get_or_try_insert(Hash128(7), || Ok(3)).unwrap(), 3);
    }

    #[test]
    fn test_clear_unused_keeps_referenced_entries() {
        let cache = OnceCache::default();
        let kept = cache.get_or_try_insert(Hash128(1), || Ok(1u32)).unwrap();
        drop(cache.get_or_try_insert(Hash128(2), || Ok(2u32)).unwrap());

        assert_eq!(cache.clear_unused(), 1);
        assert!(cache.get(Hash128(1)).is_some());
        assert!(cache.get(Hash128(2)).is_none());
        drop(kept);
        assert_eq!(cache.clear_unused(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_misses_convert_once() {
        let cache = Arc::new(OnceCache::default());
        let conversions = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let conversions = conversions.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_try_insert(Hash128(42), || {
                            conversions.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(5));
                            Ok(42u32)
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(conversions.load(Ordering::SeqCst), 1);
        assert!(values.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
