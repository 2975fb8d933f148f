//! Metrics recording, registration, and export.
//!
//! See [`traits`] for how the pieces fit together.

pub mod cache_metrics;
pub mod counter;
pub mod desc;
pub mod exporter;
pub mod registry;
pub mod snapshot;
pub mod traits;

pub use cache_metrics::CacheMetrics;
pub use counter::Counter;
pub use desc::{Desc, MetricKind, Sample};
pub use exporter::PrometheusTextExporter;
pub use registry::{MetricFamily, Registry};
pub use snapshot::CacheMetricsSnapshot;
pub use traits::{Collector, CollectorId, MetricsExporter, Registerer};
