//! Core collector traits and types.

use std::time::Duration;

use thiserror::Error;

/// Minimum allowed interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that can occur while registering or running a collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

/// Core collector trait for implementing scheduled scrape tasks.
///
/// # Error Handling Philosophy
///
/// The `collect()` method distinguishes between **target failures** and
/// **collector errors**:
///
/// - **Target failures** (unreachable, timeout, bad status, malformed body) are
///   valid observations. They are written to the cache as a failure snapshot and
///   `collect()` returns `Ok(())`.
///
/// - **Collector errors** mean the collector itself cannot work. They are
///   returned as `Err(CollectorError)` and logged by the registry; the job stays
///   scheduled.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Unique name of this collector instance.
    fn name(&self) -> &str;

    /// Fixed interval between invocations.
    fn interval(&self) -> Duration;

    /// Perform one collection cycle.
    async fn collect(&self) -> Result<(), CollectorError>;
}
