//! # Least Recently Used (LRU) Cache with Eviction Callbacks
//!
//! Bounded in-memory key-value cache for an agent's hot paths (symbol
//! lookups, derived profiling artifacts). Every entry that leaves the cache
//! by capacity pressure, explicit removal, or purge is handed to an optional
//! eviction callback exactly once.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                        ConcurrentLruCache<K, V>                          │
//!   │                 Arc<parking_lot::Mutex<LruCache<K, V>>>                  │
//!   └──────────────────────────────────┬───────────────────────────────────────┘
//!                                      ▼
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                           LruCache<K, V>                                 │
//!   │                                                                          │
//!   │   index: FxHashMap<K, SlotId>          (KeyIndex)                        │
//!   │     page_1 ───────────────┐                                              │
//!   │     page_2 ─────────┐     │                                              │
//!   │     page_3 ───┐     │     │                                              │
//!   │               ▼     ▼     ▼                                              │
//!   │   order: RecencyList<Entry<K, V>>      (RecencyOrder, SlotArena-backed)  │
//!   │     head ──► [id_3] ◄──► [id_2] ◄──► [id_1] ◄── tail                     │
//!   │      (MRU)                                (LRU)                          │
//!   │                                                                          │
//!   │   on_evicted: Option<Box<dyn FnMut(K, V) + Send>>                        │
//!   │   metrics:    CacheMetrics (shared atomic counters)                      │
//!   │   registration: Option<(Arc<dyn Registerer>, CollectorId)>               │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Method           | Complexity | Recency | Counters             | Callback |
//! |------------------|------------|---------|----------------------|----------|
//! | `add(k, v)` new  | O(1)*      | → MRU   | evictions (if full)  | on evict |
//! | `add(k, v)` dup  | O(1)       | → MRU   | -                    | never    |
//! | `get(&k)`        | O(1)       | → MRU   | hits / misses        | -        |
//! | `peek(&k)`       | O(1)       | -       | -                    | -        |
//! | `remove(&k)`     | O(1)       | -       | evictions            | yes      |
//! | `purge()`        | O(n)       | -       | -                    | each     |
//! | `close()`        | O(n)       | -       | -                    | each     |
//!
//! `*` amortized over hash-map growth. Capacity `0` means unbounded.
//!
//! ## Eviction Flow
//!
//! ```text
//!   Before (capacity = 3):
//!     head ──► [A] ◄──► [B] ◄──► [C] ◄── tail
//!
//!   add(D):
//!     1. Link [D] at head                   (len = 4 > capacity)
//!     2. Unlink tail [C], drop it from the index
//!     3. evictions += 1, on_evicted(C, value_c)
//!
//!   After:
//!     head ──► [D] ◄──► [A] ◄──► [B] ◄── tail
//! ```
//!
//! ## Thread Safety
//!
//! - `LruCache`: **not** synchronized. Single owner, or wrap it.
//! - `ConcurrentLruCache`: every public operation runs inside one
//!   `parking_lot::Mutex` critical section; nothing in it blocks.
//! - Counters are atomics shared with the registry, so scrapes never take
//!   the cache lock.
//!
//! ## Reentrancy
//!
//! The eviction callback runs synchronously on the caller's thread while
//! the cache is mutably borrowed (and, for `ConcurrentLruCache`, while the
//! lock is held). It must not call back into the same cache: for
//! `LruCache` the borrow checker rejects it, for `ConcurrentLruCache` it
//! deadlocks.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

#[cfg(feature = "concurrency")]
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::ds::recency_list::RecencyList;
use crate::ds::slot_arena::SlotId;
use crate::error::{CloseError, InvariantError};
use crate::metrics::cache_metrics::CacheMetrics;
use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::{
    CollectorId, LruMetricsRecorder, MetricsSnapshotProvider, Registerer,
};

/// Function invoked with each evicted entry.
pub type EvictionCallback<K, V> = Box<dyn FnMut(K, V) + Send>;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Live registration of this cache's metrics with an external registry.
pub(crate) struct Registration {
    pub(crate) registry: Arc<dyn Registerer>,
    pub(crate) id: CollectorId,
}

/// Single-threaded LRU cache core.
///
/// Keys are cloned once on insert (one copy lives in the index, one in the
/// recency list so eviction from the tail can find its index entry).
pub struct LruCache<K, V> {
    index: FxHashMap<K, SlotId>,
    order: RecencyList<Entry<K, V>>,
    capacity: usize,
    on_evicted: Option<EvictionCallback<K, V>>,
    metrics: CacheMetrics,
    registration: Option<Registration>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `capacity` entries (`0` = unbounded),
    /// with no eviction callback and no metric registration.
    ///
    /// # Example
    /// ```
    /// use evictkit::policy::lru::LruCache;
    ///
    /// let mut cache: LruCache<u64, String> = LruCache::new(2);
    /// cache.add(1, "a".to_string());
    /// assert_eq!(cache.get(&1).map(String::as_str), Some("a"));
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self::from_parts(capacity, None, CacheMetrics::default(), None)
    }

    /// Creates a cache that hands every evicted entry to `on_evicted`.
    ///
    /// The callback must not call back into this cache.
    ///
    /// # Example
    /// ```
    /// use evictkit::policy::lru::LruCache;
    /// use std::sync::{Arc, Mutex};
    ///
    /// let evicted = Arc::new(Mutex::new(Vec::new()));
    /// let sink = Arc::clone(&evicted);
    /// let mut cache = LruCache::with_eviction_callback(1, move |k: u32, v: &'static str| {
    ///     sink.lock().unwrap().push((k, v));
    /// });
    /// cache.add(1, "one");
    /// cache.add(2, "two");
    /// assert_eq!(*evicted.lock().unwrap(), vec![(1, "one")]);
    /// ```
    pub fn with_eviction_callback<F>(capacity: usize, on_evicted: F) -> Self
    where
        F: FnMut(K, V) + Send + 'static,
    {
        Self::from_parts(
            capacity,
            Some(Box::new(on_evicted)),
            CacheMetrics::default(),
            None,
        )
    }

    pub(crate) fn from_parts(
        capacity: usize,
        on_evicted: Option<EvictionCallback<K, V>>,
        metrics: CacheMetrics,
        registration: Option<Registration>,
    ) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            order: RecencyList::with_capacity(capacity),
            capacity,
            on_evicted,
            metrics,
            registration,
        }
    }

    /// Inserts or updates `key`, making it the most recently used entry.
    ///
    /// Updating an existing key is not an eviction: the old value is
    /// returned and the callback is not invoked. Inserting a new key into a
    /// full cache evicts exactly one entry, the least recently used.
    #[doc(alias = "insert")]
    pub fn add(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&id) = self.index.get(&key) {
            let previous = self
                .order
                .get_mut(id)
                .map(|entry| std::mem::replace(&mut entry.value, value));
            self.order.move_to_front(id);
            self.debug_validate();
            return previous;
        }

        let id = self.order.push_front(Entry {
            key: key.clone(),
            value,
        });
        self.index.insert(key, id);

        if self.capacity > 0 && self.order.len() > self.capacity {
            self.evict_lru();
        }

        self.debug_validate();
        None
    }

    /// Looks up `key`, promoting it to most recently used on a hit.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&id) = self.index.get(key) else {
            self.metrics.record_get_miss();
            return None;
        };
        self.metrics.record_get_hit();
        self.order.move_to_front(id);
        self.order.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key` without touching recency order or counters.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let &id = self.index.get(key)?;
        self.order.get(id).map(|entry| &entry.value)
    }

    /// Returns `true` if `key` is cached. Does not touch recency or counters.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Removes `key`, handing the entry to the eviction callback.
    ///
    /// Returns `false` (and does nothing) when `key` is absent.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(id) = self.index.remove(key) else {
            return false;
        };
        if let Some(entry) = self.order.remove(id) {
            self.metrics.record_eviction();
            self.notify_evicted(entry);
        }
        self.debug_validate();
        true
    }

    /// Empties the cache, invoking the eviction callback once per entry in
    /// unspecified order. Counters are left untouched.
    pub fn purge(&mut self) {
        let purged = self.order.len();
        self.index.clear();
        for entry in self.order.drain() {
            if let Some(on_evicted) = self.on_evicted.as_mut() {
                on_evicted(entry.key, entry.value);
            }
        }
        if purged > 0 {
            tracing::trace!(cache = self.metrics.name(), purged, "purged cache");
        }
        self.debug_validate();
    }

    /// Purges the cache, then releases its metric registration.
    ///
    /// Idempotent: later calls find nothing to purge and nothing to
    /// unregister. If unregistering fails the purge has still happened and
    /// the registration is not retried.
    pub fn close(&mut self) -> Result<(), CloseError> {
        self.purge();
        if let Some(Registration { registry, id }) = self.registration.take() {
            registry.unregister(id)?;
            tracing::debug!(cache = self.metrics.name(), collector = %id, "released cache metrics");
        }
        Ok(())
    }

    /// Least recently used entry, i.e. the next one capacity pressure evicts.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.order.back().map(|entry| (&entry.key, &entry.value))
    }

    /// Iterates entries from most to least recently used without promoting.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().map(|entry| (&entry.key, &entry.value))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Configured capacity; `0` means unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handles to this cache's hit/miss/eviction counters.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// `true` while a metric registration is held (until `close`).
    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.metrics.hits(),
            misses: self.metrics.misses(),
            evictions: self.metrics.evictions(),
            cache_len: self.len(),
            capacity: self.capacity,
        }
    }

    /// Verifies the KeyIndex/RecencyOrder bijection and the capacity bound.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let reachable = self.order.validate()?;
        if reachable != self.index.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but recency order holds {} entries",
                self.index.len(),
                reachable
            )));
        }
        for (key, &id) in &self.index {
            match self.order.get(id) {
                Some(entry) if entry.key == *key => {},
                _ => {
                    return Err(InvariantError::new(format!(
                        "index entry points at slot {} holding a different key",
                        id.index()
                    )));
                },
            }
        }
        if self.capacity > 0 && self.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "{} entries exceed capacity {}",
                self.len(),
                self.capacity
            )));
        }
        Ok(())
    }

    fn evict_lru(&mut self) {
        let Some(entry) = self.order.pop_back() else {
            return;
        };
        self.index.remove(&entry.key);
        self.metrics.record_eviction();
        tracing::trace!(cache = self.metrics.name(), len = self.order.len(), "evicted lru entry");
        self.notify_evicted(entry);
    }

    fn notify_evicted(&mut self, entry: Entry<K, V>) {
        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(entry.key, entry.value);
        }
    }

    #[inline]
    fn debug_validate(&self) {
        #[cfg(debug_assertions)]
        {
            if let Err(err) = self.check_invariants() {
                panic!("lru invariant violated: {err}");
            }
        }
    }
}

impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("name", &self.metrics.name())
            .field("len", &self.order.len())
            .field("capacity", &self.capacity)
            .field("registered", &self.registration.is_some())
            .finish_non_exhaustive()
    }
}

impl<K, V> Extend<(K, V)> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.add(key, value);
        }
    }
}

/// Thread-safe LRU cache: one `parking_lot::Mutex` around an [`LruCache`].
///
/// Cloning yields another handle to the same cache. `get`/`peek` return
/// clones of the value; store `Arc<T>` to keep that cheap.
#[cfg(feature = "concurrency")]
pub struct ConcurrentLruCache<K, V> {
    inner: Arc<Mutex<LruCache<K, V>>>,
}

#[cfg(feature = "concurrency")]
impl<K, V> Clone for ConcurrentLruCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(feature = "concurrency")]
impl<K, V> From<LruCache<K, V>> for ConcurrentLruCache<K, V> {
    fn from(cache: LruCache<K, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }
}

#[cfg(feature = "concurrency")]
impl<K, V> ConcurrentLruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a shared cache holding at most `capacity` entries
    /// (`0` = unbounded).
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::ConcurrentLruCache;
    ///
    /// let cache: ConcurrentLruCache<u32, String> = ConcurrentLruCache::new(100);
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        LruCache::new(capacity).into()
    }

    /// Creates a shared cache with an eviction callback.
    ///
    /// The callback runs with the cache lock held and must not touch this
    /// cache (it would deadlock).
    pub fn with_eviction_callback<F>(capacity: usize, on_evicted: F) -> Self
    where
        F: FnMut(K, V) + Send + 'static,
    {
        LruCache::with_eviction_callback(capacity, on_evicted).into()
    }

    pub fn add(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().add(key, value)
    }

    /// Gets a clone of the value, promoting the entry to most recently used.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::ConcurrentLruCache;
    ///
    /// let cache: ConcurrentLruCache<u32, &str> = ConcurrentLruCache::new(2);
    /// cache.add(1, "one");
    /// cache.add(2, "two");
    /// assert_eq!(cache.get(&1), Some("one"));
    ///
    /// // Key 2 is now LRU and goes first.
    /// cache.add(3, "three");
    /// assert!(!cache.contains(&2));
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.lock().peek(key).cloned()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().contains(key)
    }

    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().remove(key)
    }

    pub fn purge(&self) {
        self.inner.lock().purge();
    }

    pub fn close(&self) -> Result<(), CloseError> {
        self.inner.lock().close()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Shared counter handles; reading them never takes the cache lock.
    pub fn metrics(&self) -> CacheMetrics {
        self.inner.lock().metrics().clone()
    }

    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.lock().metrics_snapshot()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

#[cfg(feature = "concurrency")]
impl<K, V> fmt::Debug for ConcurrentLruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.lock();
        f.debug_struct("ConcurrentLruCache")
            .field("len", &cache.order.len())
            .field("capacity", &cache.capacity)
            .finish_non_exhaustive()
    }
}
