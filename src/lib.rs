//! evictkit: bounded LRU caching with eviction callbacks and pull-based
//! metrics for profiling agents.
//!
//! - [`policy::lru`]: the eviction engine (`LruCache`, `ConcurrentLruCache`).
//! - [`builder`]: named, registry-attached caches.
//! - [`metrics`]: counters, collectors, an in-process registry and a
//!   Prometheus text exporter.
//! - [`stats`]: the statistics adapter over external unwinder/map counters.

pub mod builder;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod stats;

pub use crate::builder::LruBuilder;
pub use crate::ds::{RecencyList, SlotArena, SlotId};
pub use crate::error::{
    BuildError, CloseError, ConfigError, InvariantError, RegistryError, SourceError,
};
pub use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "concurrency")]
pub use crate::policy::lru::ConcurrentLruCache;
pub use crate::policy::lru::{EvictionCallback, LruCache};
pub use crate::stats::{CounterSnapshot, CounterSource, StatsCollector};
