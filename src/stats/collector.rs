//! # Statistics Adapter
//!
//! [`StatsCollector`] bridges an external [`CounterSource`] (and, optionally,
//! the counters of one or more caches) to a pull-based registry.
//!
//! ```text
//!   Registry::gather()
//!        │
//!        ▼
//!   StatsCollector::collect()
//!        │
//!        ├─► attached CacheMetrics ──► cache_{hits,misses,evictions}_total{cache}
//!        │       (atomic loads, never fails)
//!        │
//!        └─► source.read_snapshot()
//!                 │
//!                 ├─ Ok  ──► bpf_map_{memlock,key_size,value_size,max_entries}{map}
//!                 │          native_unwinder_{samples,success}_total{unwinder}
//!                 │          native_unwinder_error_total{reason} x 8
//!                 │
//!                 └─ Err ──► error! logged, external samples omitted this cycle
//! ```
//!
//! `describe()` is fixed at build time and does not depend on the source
//! ever having been read.
//!
//! Attaching a cache here and also building that cache with the same
//! registry describes its metrics twice; the registry rejects the second
//! registration. Pick one path per cache.

use std::fmt;

use crate::error::{ConfigError, RegistryError};
use crate::metrics::cache_metrics::CacheMetrics;
use crate::metrics::desc::{Desc, MetricKind, Sample};
use crate::metrics::traits::Collector;
use crate::stats::source::{CounterSnapshot, CounterSource};
use crate::stats::unwinder::UnwindErrorReason;

pub const BPF_MAP_MEMLOCK: &str = "bpf_map_memlock";
pub const BPF_MAP_KEY_SIZE: &str = "bpf_map_key_size";
pub const BPF_MAP_VALUE_SIZE: &str = "bpf_map_value_size";
pub const BPF_MAP_MAX_ENTRIES: &str = "bpf_map_max_entries";
pub const NATIVE_UNWINDER_SAMPLES_TOTAL: &str = "native_unwinder_samples_total";
pub const NATIVE_UNWINDER_SUCCESS_TOTAL: &str = "native_unwinder_success_total";
pub const NATIVE_UNWINDER_ERROR_TOTAL: &str = "native_unwinder_error_total";

pub const MAP_LABEL: &str = "map";
pub const UNWINDER_LABEL: &str = "unwinder";
pub const REASON_LABEL: &str = "reason";

/// Default value of the `unwinder` label.
pub const DEFAULT_UNWINDER: &str = "dwarf";

#[derive(Debug, Clone)]
struct ExternalDescs {
    memlock: Desc,
    key_size: Desc,
    value_size: Desc,
    max_entries: Desc,
    samples_total: Desc,
    success_total: Desc,
    error_total: Desc,
}

impl ExternalDescs {
    fn new() -> Self {
        let map_gauge = |name: &str, help: &str| {
            Desc::new(name, help, MetricKind::Gauge).variable_labels(&[MAP_LABEL])
        };
        Self {
            memlock: map_gauge(BPF_MAP_MEMLOCK, "Memlock value held by BPF map"),
            key_size: map_gauge(BPF_MAP_KEY_SIZE, "Key size for BPF map"),
            value_size: map_gauge(BPF_MAP_VALUE_SIZE, "Value size BPF map"),
            max_entries: map_gauge(BPF_MAP_MAX_ENTRIES, "Maximum entries in BPF map"),
            samples_total: Desc::new(
                NATIVE_UNWINDER_SAMPLES_TOTAL,
                "Total samples.",
                MetricKind::Counter,
            )
            .variable_labels(&[UNWINDER_LABEL]),
            success_total: Desc::new(
                NATIVE_UNWINDER_SUCCESS_TOTAL,
                "Samples that unwound successfully reaching the bottom frame.",
                MetricKind::Counter,
            )
            .variable_labels(&[UNWINDER_LABEL]),
            error_total: Desc::new(
                NATIVE_UNWINDER_ERROR_TOTAL,
                "There was an error while unwinding the stack.",
                MetricKind::Counter,
            )
            .variable_labels(&[REASON_LABEL]),
        }
    }

    fn all(&self) -> [&Desc; 7] {
        [
            &self.memlock,
            &self.key_size,
            &self.value_size,
            &self.max_entries,
            &self.samples_total,
            &self.success_total,
            &self.error_total,
        ]
    }
}

/// Read-only collector of external unwinder/map counters and cache counters.
pub struct StatsCollector<S> {
    source: S,
    unwinder: String,
    caches: Vec<CacheMetrics>,
    descs: ExternalDescs,
}

impl<S: CounterSource> StatsCollector<S> {
    /// Collector over `source` with default settings.
    pub fn new(source: S) -> Self {
        Self {
            source,
            unwinder: DEFAULT_UNWINDER.to_string(),
            caches: Vec::new(),
            descs: ExternalDescs::new(),
        }
    }

    pub fn builder(source: S) -> StatsCollectorBuilder<S> {
        StatsCollectorBuilder {
            source,
            unwinder: DEFAULT_UNWINDER.to_string(),
            caches: Vec::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Value of the `unwinder` label on unwinder samples.
    pub fn unwinder(&self) -> &str {
        &self.unwinder
    }

    fn snapshot_samples(&self, snapshot: &CounterSnapshot) -> Result<Vec<Sample>, RegistryError> {
        let d = &self.descs;
        let mut out = Vec::with_capacity(snapshot.maps.len() * 4 + 2 + UnwindErrorReason::ALL.len());
        for map in &snapshot.maps {
            let label = [map.name.as_str()];
            out.push(Sample::new(&d.memlock, map.memlock as f64, &label)?);
            out.push(Sample::new(&d.key_size, map.key_size as f64, &label)?);
            out.push(Sample::new(&d.value_size, map.value_size as f64, &label)?);
            out.push(Sample::new(&d.max_entries, map.max_entries as f64, &label)?);
        }

        let stats = &snapshot.unwinder;
        let unwinder = [self.unwinder.as_str()];
        out.push(Sample::new(
            &d.samples_total,
            stats.total_samples as f64,
            &unwinder,
        )?);
        out.push(Sample::new(
            &d.success_total,
            stats.success_dwarf as f64,
            &unwinder,
        )?);
        for reason in UnwindErrorReason::ALL {
            out.push(Sample::new(
                &d.error_total,
                stats.error_count(reason) as f64,
                &[reason.label()],
            )?);
        }
        Ok(out)
    }
}

impl<S: CounterSource> Collector for StatsCollector<S> {
    fn describe(&self) -> Vec<Desc> {
        let mut descs: Vec<Desc> = self.descs.all().into_iter().cloned().collect();
        for cache in &self.caches {
            descs.extend(cache.describe());
        }
        descs
    }

    fn collect(&self) -> Vec<Sample> {
        let mut samples = Vec::new();
        for cache in &self.caches {
            samples.extend(cache.collect());
        }

        match self.source.read_snapshot() {
            Ok(snapshot) => {
                if !snapshot.unwinder.is_consistent() {
                    tracing::debug!(
                        total = snapshot.unwinder.total_samples,
                        success = snapshot.unwinder.success_dwarf,
                        errors = snapshot.unwinder.total_errors(),
                        "unwinder counters read mid-update"
                    );
                }
                match self.snapshot_samples(&snapshot) {
                    Ok(external) => samples.extend(external),
                    Err(err) => {
                        tracing::error!(error = %err, "failed to build unwinder and map samples");
                    },
                }
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to read unwinder and map statistics");
            },
        }
        samples
    }
}

impl<S> fmt::Debug for StatsCollector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let caches: Vec<&str> = self.caches.iter().map(CacheMetrics::name).collect();
        f.debug_struct("StatsCollector")
            .field("unwinder", &self.unwinder)
            .field("caches", &caches)
            .finish_non_exhaustive()
    }
}

/// Configures a [`StatsCollector`].
pub struct StatsCollectorBuilder<S> {
    source: S,
    unwinder: String,
    caches: Vec<CacheMetrics>,
}

impl<S: CounterSource> StatsCollectorBuilder<S> {
    /// Sets the `unwinder` label value (default `"dwarf"`).
    pub fn unwinder(mut self, unwinder: impl Into<String>) -> Self {
        self.unwinder = unwinder.into();
        self
    }

    /// Also reports `metrics`' counters on every collection.
    pub fn with_cache(mut self, metrics: CacheMetrics) -> Self {
        self.caches.push(metrics);
        self
    }

    /// # Errors
    ///
    /// [`ConfigError`] if the unwinder label is empty or two attached caches
    /// share a name.
    pub fn build(self) -> Result<StatsCollector<S>, ConfigError> {
        if self.unwinder.is_empty() {
            return Err(ConfigError::new("unwinder label must not be empty"));
        }
        for (i, cache) in self.caches.iter().enumerate() {
            if self.caches[..i].iter().any(|c| c.name() == cache.name()) {
                return Err(ConfigError::new(format!(
                    "cache {:?} is attached more than once",
                    cache.name()
                )));
            }
        }
        Ok(StatsCollector {
            source: self.source,
            unwinder: self.unwinder,
            caches: self.caches,
            descs: ExternalDescs::new(),
        })
    }
}

impl<S> fmt::Debug for StatsCollectorBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsCollectorBuilder")
            .field("unwinder", &self.unwinder)
            .field("caches", &self.caches.len())
            .finish_non_exhaustive()
    }
}
