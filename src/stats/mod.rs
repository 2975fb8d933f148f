//! Statistics adapter over the agent's external counters.

pub mod collector;
pub mod maps;
pub mod source;
pub mod unwinder;

pub use collector::{StatsCollector, StatsCollectorBuilder};
pub use maps::MapStats;
pub use source::{CounterSnapshot, CounterSource};
pub use unwinder::{UnwindErrorReason, UnwinderStats};
