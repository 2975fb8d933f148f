pub use crate::builder::LruBuilder;
pub use crate::error::{BuildError, CloseError, ConfigError, RegistryError, SourceError};
pub use crate::metrics::{
    CacheMetrics, CacheMetricsSnapshot, Collector, MetricsExporter, PrometheusTextExporter,
    Registerer, Registry,
};
#[cfg(feature = "concurrency")]
pub use crate::policy::lru::ConcurrentLruCache;
pub use crate::policy::lru::LruCache;
pub use crate::stats::{
    CounterSnapshot, CounterSource, MapStats, StatsCollector, UnwindErrorReason, UnwinderStats,
};
