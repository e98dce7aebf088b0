//! Shape-keyed compile caches.
//!
//! Readers load an immutable snapshot of the map and never block. A miss
//! takes the compile lock, checks again, compiles, and publishes a new
//! snapshot with the entry added. At most one compile runs per key no
//! matter how many threads miss on it at once.
//!
//! When an insert would grow the map past its capacity the whole map is
//! dropped first. Shapes are cheap to recompile and hot ones come back on
//! the next call.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub compiles: u64,
    pub evictions: u64,
}

pub struct ShapeCache<K, V> {
    name: &'static str,
    capacity: usize,
    entries: ArcSwap<FxHashMap<K, Arc<V>>>,
    compile_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> ShapeCache<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            entries: ArcSwap::from_pointee(FxHashMap::default()),
            compile_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a compiled value without compiling.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.load().get(key).cloned()
    }

    /// Return the value for `key`, compiling it under the lock on a miss.
    ///
    /// A failed compile publishes nothing; the next caller tries again.
    pub fn get_or_compile<E>(
        &self,
        key: &K,
        compile: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(value) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let _guard = self.compile_lock.lock();
        // another thread may have compiled it while we waited
        let current = self.entries.load_full();
        if let Some(value) = current.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(value));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let value = Arc::new(compile(key)?);
        self.compiles.fetch_add(1, Ordering::Relaxed);

        let mut next = if current.len() >= self.capacity {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            info!(
                cache = self.name,
                capacity = self.capacity,
                dropped = current.len(),
                "cache reached capacity; cleared"
            );
            FxHashMap::default()
        } else {
            (*current).clone()
        };
        next.insert(key.clone(), Arc::clone(&value));
        debug!(cache = self.name, entries = next.len(), "compiled new entry");
        self.entries.store(Arc::new(next));
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let _guard = self.compile_lock.lock();
        self.entries.store(Arc::new(FxHashMap::default()));
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
