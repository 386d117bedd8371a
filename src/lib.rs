/// Error types for the health monitor
pub mod error;

/// Aggregated health snapshot data model
pub mod snapshot;

/// Configuration management
pub mod config;

/// Snapshot sources (HTTP endpoint and mock)
pub mod source;

/// Threshold evaluation, deduplication and notifications
pub mod alerts;

/// Side-effect dispatch through the email relay
pub mod dispatch;

/// Latest-snapshot store with change subscriptions
pub mod store;

/// Interval-driven poll loop
pub mod poller;

// Re-export commonly used types
pub use error::{ConfigError, DispatchError, FetchError, ScheduleError};
