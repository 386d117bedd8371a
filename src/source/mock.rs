//! Mock snapshot source for tests and development
//!
//! Provides canned snapshot sequences, simulated failures, and optional
//! per-call delays, plus call-count tracking so tests can assert how often
//! the poll loop actually fetched.

use crate::error::FetchError;
use crate::snapshot::HealthSnapshot;
use crate::source::SnapshotSource;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Snapshot source returning preconfigured responses
///
/// Responses are returned in order; after the last one the source cycles
/// back to the first. Errors are stored as messages and materialize as
/// `FetchError::SourceError` on each call.
pub struct MockSource {
    responses: Vec<Result<HealthSnapshot, String>>,
    current_index: Arc<Mutex<usize>>,
    call_count: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockSource {
    /// Create a mock source that always yields the given snapshot
    pub fn with_snapshot(snapshot: HealthSnapshot) -> Self {
        Self::with_responses(vec![Ok(snapshot)])
    }

    /// Create a mock source that always fails with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_responses(vec![Err(message.into())])
    }

    /// Create a mock source with a sequence of responses
    pub fn with_responses(responses: Vec<Result<HealthSnapshot, String>>) -> Self {
        Self {
            responses,
            current_index: Arc::new(Mutex::new(0)),
            call_count: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    /// Add a delay before every response (for in-flight cancellation tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `fetch` has been called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Shared handle to the call counter, usable after the source is moved
    pub fn call_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.call_count)
    }
}

impl SnapshotSource for MockSource {
    fn fetch(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<HealthSnapshot, FetchError>> + Send + '_>> {
        Box::pin(async move {
            *self.call_count.lock().unwrap() += 1;

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let mut index = self.current_index.lock().unwrap();
            let response_index = *index % self.responses.len();
            *index += 1;
            drop(index);

            match &self.responses[response_index] {
                Ok(snapshot) => Ok(snapshot.clone()),
                Err(message) => Err(FetchError::SourceError(message.clone())),
            }
        })
    }
}
