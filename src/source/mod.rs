//! Snapshot sources
//!
//! A snapshot source retrieves one aggregated health snapshot per call and
//! fails cleanly on transport, status, or schema errors. Retry policy is
//! deliberately not a source concern; the poll loop owns scheduling.

use crate::error::FetchError;
use crate::snapshot::HealthSnapshot;
use std::future::Future;
use std::pin::Pin;

/// HTTP snapshot source
pub mod http;

/// Mock snapshot source for tests and development
pub mod mock;

pub use http::HttpSource;
pub use mock::MockSource;

/// Contract for fetching one complete health snapshot
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current snapshot, or fail with a `FetchError`
    ///
    /// No internal retries: each call is one attempt.
    fn fetch(&self)
        -> Pin<Box<dyn Future<Output = Result<HealthSnapshot, FetchError>> + Send + '_>>;
}
