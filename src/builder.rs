//! Builder for LRU caches with optional eviction callbacks and metric
//! registration.
//!
//! The plain constructors on [`LruCache`] cover the common case. The builder
//! adds the pieces that need validation: a cache name (the `cache` label on
//! every metric) and an injected [`Registerer`] the cache's counters are
//! registered with at construction and released from on `close()`.
//!
//! ## Example
//!
//! ```rust
//! use evictkit::builder::LruBuilder;
//! use evictkit::metrics::registry::Registry;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! let mut cache = LruBuilder::new(100)
//!     .name("symbols")
//!     .registry(registry.clone())
//!     .build()
//!     .unwrap();
//!
//! cache.add(1u64, "main".to_string());
//! assert_eq!(cache.get(&1).map(String::as_str), Some("main"));
//! assert_eq!(registry.len(), 1);
//!
//! cache.close().unwrap();
//! assert!(registry.is_empty());
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{BuildError, ConfigError};
use crate::metrics::cache_metrics::CacheMetrics;
use crate::metrics::traits::Registerer;
#[cfg(feature = "concurrency")]
use crate::policy::lru::ConcurrentLruCache;
use crate::policy::lru::{EvictionCallback, LruCache, Registration};

/// Configures and constructs an [`LruCache`].
pub struct LruBuilder<K, V> {
    capacity: usize,
    name: Option<String>,
    registry: Option<Arc<dyn Registerer>>,
    on_evicted: Option<EvictionCallback<K, V>>,
}

impl<K, V> LruBuilder<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Starts a builder for a cache of `capacity` entries (`0` = unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            name: None,
            registry: None,
            on_evicted: None,
        }
    }

    /// Sets the `cache` label value for this cache's metrics.
    ///
    /// Defaults to `"lru"`. Must be non-empty when a registry is attached.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers the cache's counters with `registry` on `build()`.
    pub fn registry(mut self, registry: Arc<dyn Registerer>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Hands every evicted entry to `on_evicted`.
    pub fn on_evicted<F>(mut self, on_evicted: F) -> Self
    where
        F: FnMut(K, V) + Send + 'static,
    {
        self.on_evicted = Some(Box::new(on_evicted));
        self
    }

    /// Validates the configuration and constructs the cache.
    ///
    /// # Errors
    ///
    /// - [`BuildError::Config`] if a registry is attached and the name is
    ///   empty.
    /// - [`BuildError::Registry`] if the registry rejects the cache's
    ///   metrics (e.g. another cache already registered under this name).
    pub fn build(self) -> Result<LruCache<K, V>, BuildError> {
        let name = self.name.unwrap_or_else(|| "lru".to_string());
        let metrics = CacheMetrics::new(name.as_str());

        let registration = match self.registry {
            Some(registry) => {
                if name.is_empty() {
                    return Err(ConfigError::new(
                        "cache name must not be empty when a registry is attached",
                    )
                    .into());
                }
                let id = registry.register(Arc::new(metrics.clone()))?;
                tracing::debug!(cache = %name, collector = %id, capacity = self.capacity, "registered cache metrics");
                Some(Registration { registry, id })
            },
            None => None,
        };

        Ok(LruCache::from_parts(
            self.capacity,
            self.on_evicted,
            metrics,
            registration,
        ))
    }

    /// Like [`build`](Self::build), wrapped for shared use across threads.
    #[cfg(feature = "concurrency")]
    pub fn build_concurrent(self) -> Result<ConcurrentLruCache<K, V>, BuildError> {
        self.build().map(ConcurrentLruCache::from)
    }
}

impl<K, V> fmt::Debug for LruBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruBuilder")
            .field("capacity", &self.capacity)
            .field("name", &self.name)
            .field("registry", &self.registry.is_some())
            .field("on_evicted", &self.on_evicted.is_some())
            .finish()
    }
}
