//! Contract of the external counter source.
//!
//! How a source obtains its figures (map lookups, shared memory, IPC) is
//! its own business. The collector calls [`CounterSource::read_snapshot`]
//! once per collection cycle and treats an `Err` as "no data this cycle".

use crate::error::SourceError;
use crate::stats::maps::MapStats;
use crate::stats::unwinder::UnwinderStats;

/// One read of the external counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub unwinder: UnwinderStats,
    pub maps: Vec<MapStats>,
}

/// Supplier of [`CounterSnapshot`]s.
///
/// Implementations may race with the producers updating the counters; a
/// snapshot is not required to be consistent across fields.
///
/// Any `Fn() -> Result<CounterSnapshot, SourceError>` closure is a source:
///
/// ```
/// use evictkit::error::SourceError;
/// use evictkit::stats::source::{CounterSnapshot, CounterSource};
///
/// let offline = || Err::<CounterSnapshot, _>(SourceError::Unavailable("maps not loaded".into()));
/// assert!(offline.read_snapshot().is_err());
/// ```
pub trait CounterSource: Send + Sync {
    fn read_snapshot(&self) -> Result<CounterSnapshot, SourceError>;
}

impl<F> CounterSource for F
where
    F: Fn() -> Result<CounterSnapshot, SourceError> + Send + Sync,
{
    fn read_snapshot(&self) -> Result<CounterSnapshot, SourceError> {
        self()
    }
}
