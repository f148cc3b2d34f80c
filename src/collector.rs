//! Collector Layer
//!
//! Scheduled scrape tasks that write their results to the target cache.
//! Each registered collector runs as its own repeated job.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for scheduled tasks (name, interval, one entry point)
//! - [`RunState`]: Liveness flag used to skip overlapping invocations
//! - [`CollectorRegistry`]: Manages job lifecycle and graceful shutdown
//! - [`FlussonicCollector`]: Scrapes one Flussonic instance
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use flussonic_exporter::{CollectorRegistry, FlussonicCollector, TargetCache, TargetConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(TargetCache::new());
//! let target = TargetConfig::new("http://flussonic.local:8080")
//!     .with_credentials("admin", "secret")
//!     .into_target(Duration::from_secs(10))?;
//!
//! let registry = CollectorRegistry::new().await?;
//! registry.spawn(FlussonicCollector::from_target(target, cache)?).await?;
//! registry.start().await?;
//! # Ok(())
//! # }
//! ```

mod flussonic;
mod registry;
mod run_state;
mod traits;

pub use flussonic::FlussonicCollector;
pub use registry::{CollectorRegistry, DEFAULT_SHUTDOWN_TIMEOUT, JobInfo};
pub use run_state::{RunGuard, RunState};
pub use traits::{Collector, CollectorError, MIN_INTERVAL};
