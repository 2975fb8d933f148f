//! Error types for the evictkit library.
//!
//! ## Key Components
//!
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (`check_invariants` methods).
//! - [`ConfigError`]: Returned when builder parameters are invalid
//!   (e.g. an empty cache name with a registry attached).
//! - [`RegistryError`]: Registration or unregistration with a metrics
//!   registry failed.
//! - [`SourceError`]: The external counter source could not produce a
//!   snapshot.
//! - [`BuildError`] / [`CloseError`]: What `build()` and `close()` surface.
//!
//! Not-found is never an error: lookups return `Option`.
//!
//! ## Example Usage
//!
//! ```
//! use evictkit::builder::LruBuilder;
//! use evictkit::error::BuildError;
//! use evictkit::metrics::registry::Registry;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! let bad = LruBuilder::<u64, u64>::new(8)
//!     .name("")
//!     .registry(registry)
//!     .build();
//! assert!(matches!(bad, Err(BuildError::Config(_))));
//! ```

use thiserror::Error;

use crate::metrics::traits::CollectorId;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by [`LruCache::check_invariants`](crate::policy::lru::LruCache::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache or collector configuration is invalid.
///
/// # Example
///
/// ```
/// use evictkit::error::SourceError;
/// use evictkit::stats::collector::StatsCollector;
/// use evictkit::stats::source::CounterSnapshot;
///
/// let source = || Ok::<_, SourceError>(CounterSnapshot::default());
/// let err = StatsCollector::builder(source)
///     .unwinder("")
///     .build()
///     .unwrap_err();
/// assert!(err.to_string().contains("unwinder"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Failure to register or unregister a metric source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another collector already describes this metric with the same
    /// constant labels.
    #[error("metric {name} is already registered with the same constant labels")]
    AlreadyRegistered { name: String },

    /// The collector id is unknown to the registry (never registered, or
    /// already unregistered).
    #[error("collector {id} is not registered")]
    NotRegistered { id: CollectorId },

    /// A descriptor failed validation (bad metric or label name).
    #[error("invalid metric descriptor: {0}")]
    InvalidDescriptor(String),

    /// A sample's label values do not line up with its descriptor's
    /// variable labels.
    #[error("metric {name} expects {expected} label values, got {got}")]
    LabelCountMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Failure of the external counter source to produce a snapshot.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source is not reachable (e.g. maps not loaded yet).
    #[error("counter source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with data that cannot be decoded.
    #[error("counter source returned inconsistent data: {0}")]
    Inconsistent(String),

    #[error("counter source read failed")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// BuildError / CloseError
// ---------------------------------------------------------------------------

/// Error returned by [`LruBuilder::build`](crate::builder::LruBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to register cache metrics")]
    Registry(#[from] RegistryError),
}

/// Error returned by `close()` when releasing metric registrations fails.
///
/// The purge half of `close()` has already completed when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to release cache metrics registration")]
pub struct CloseError(#[from] pub RegistryError);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
