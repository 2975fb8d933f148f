//! Per-cache hit/miss/eviction counters and their collector.
//!
//! Each cache instance owns one [`CacheMetrics`]. Its counters are shared
//! [`Counter`] handles: the engine increments them under whatever exclusion
//! it runs with, and a registry scrape reads them without touching the
//! engine at all.
//!
//! Every sample carries a constant `cache="<name>"` label, which scopes the
//! three metric names to this cache instance.

use std::sync::Arc;

use crate::metrics::counter::Counter;
use crate::metrics::desc::{Desc, MetricKind, Sample};
use crate::metrics::traits::{Collector, LruMetricsRecorder};

pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
pub const CACHE_EVICTIONS_TOTAL: &str = "cache_evictions_total";

/// Label scoping cache metrics to one instance.
pub const CACHE_LABEL: &str = "cache";

#[derive(Debug, Clone)]
pub struct CacheMetrics {
    name: Arc<str>,
    hits: Counter,
    misses: Counter,
    evictions: Counter,
}

impl CacheMetrics {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            hits: Counter::new(),
            misses: Counter::new(),
            evictions: Counter::new(),
        }
    }

    /// Value of the `cache` label.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.get()
    }

    fn descs(&self) -> [Desc; 3] {
        let scoped = |name: &str, help: &str| {
            Desc::new(name, help, MetricKind::Counter).const_label(CACHE_LABEL, &*self.name)
        };
        [
            scoped(CACHE_HITS_TOTAL, "Total number of cache hits."),
            scoped(CACHE_MISSES_TOTAL, "Total number of cache misses."),
            scoped(CACHE_EVICTIONS_TOTAL, "Total number of cache evictions."),
        ]
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new("lru")
    }
}

impl LruMetricsRecorder for CacheMetrics {
    #[inline]
    fn record_get_hit(&self) {
        self.hits.inc();
    }

    #[inline]
    fn record_get_miss(&self) {
        self.misses.inc();
    }

    #[inline]
    fn record_eviction(&self) {
        self.evictions.inc();
    }
}

impl Collector for CacheMetrics {
    fn describe(&self) -> Vec<Desc> {
        self.descs().into()
    }

    fn collect(&self) -> Vec<Sample> {
        let [hits, misses, evictions] = self.descs();
        // Constant labels only, so every sample builds.
        [
            (hits, self.hits()),
            (misses, self.misses()),
            (evictions, self.evictions()),
        ]
        .iter()
        .filter_map(|(desc, value)| Sample::new(desc, *value as f64, &[]).ok())
        .collect()
    }
}
