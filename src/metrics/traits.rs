//! # Metrics Trait Hierarchy
//!
//! Recording, collection, registration, and export are split into small
//! traits so the cache engine never depends on a concrete metrics backend.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────┐  record_*   ┌──────────────────────────────┐
//!   │     LruCache         │ ──────────► │ LruMetricsRecorder           │
//!   └──────────────────────┘             │ (CacheMetrics: shared        │
//!                                        │  atomic Counters)            │
//!                                        └──────────────┬───────────────┘
//!                                                       │ Collector
//!   ┌──────────────────────┐  Collector                 ▼
//!   │   StatsCollector     │ ──────────► ┌──────────────────────────────┐
//!   │ (external counters)  │             │ Registerer (e.g. Registry)   │
//!   └──────────────────────┘             │ register / unregister        │
//!                                        └──────────────┬───────────────┘
//!                                                       │ gather()
//!                                                       ▼
//!                                        ┌──────────────────────────────┐
//!                                        │ MetricsExporter<S>           │
//!                                        │ (Prometheus text, ...)       │
//!                                        └──────────────────────────────┘
//! ```
//!
//! ## Design Goals
//! - **Injected, not global**: the engine receives an `Arc<dyn Registerer>`
//!   at construction and hands it back on close; nothing registers itself
//!   with process-wide state.
//! - **Pull-based**: collectors are asked for samples on the registry's
//!   cadence. `describe` is independent of current data.
//! - **Never fail a scrape**: `collect` returns samples, not a `Result`;
//!   collectors log and omit what they could not read.

use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::metrics::desc::{Desc, Sample};

/// Counters an LRU engine bumps on its hot path.
pub trait LruMetricsRecorder {
    fn record_get_hit(&self);
    fn record_get_miss(&self);
    fn record_eviction(&self);
}

/// A source of measurements harvested by a pull-based registry.
pub trait Collector: Send + Sync {
    /// Every metric this collector may emit, independent of current data.
    fn describe(&self) -> Vec<Desc>;

    /// Current samples. Must not fail; omit what cannot be read.
    fn collect(&self) -> Vec<Sample>;
}

impl<C: Collector + ?Sized> Collector for Arc<C> {
    fn describe(&self) -> Vec<Desc> {
        (**self).describe()
    }

    fn collect(&self) -> Vec<Sample> {
        (**self).collect()
    }
}

/// Handle returned by [`Registerer::register`], used to unregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectorId(pub(crate) u64);

impl fmt::Display for CollectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability to register and unregister metric sources.
pub trait Registerer: Send + Sync {
    fn register(&self, collector: Arc<dyn Collector>) -> Result<CollectorId, RegistryError>;
    fn unregister(&self, id: CollectorId) -> Result<(), RegistryError>;
}

/// Snapshot provider for tests and benches.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Export/publish metrics to a monitoring backend.
pub trait MetricsExporter<S: ?Sized> {
    fn export(&self, snapshot: &S) -> std::io::Result<()>;
}
