//! Flussonic Exporter Library
//!
//! Polls a fleet of Flussonic media servers over their HTTP API and exposes the
//! latest result of every target to a Prometheus pull endpoint.
//!
//! # Architecture
//!
//! - **Catalog**: fixed set of metric descriptors
//! - **Flussonic**: API client and payload types
//! - **Collectors**: per-target scrape jobs with overlap-skip scheduling
//! - **Storage**: latest snapshot per target behind isolated locks
//! - **Exposition**: Prometheus text rendering of the cache
//! - **Server**: HTTP endpoints
//!
//! Data flow: scheduler → scrape worker → target cache ⇉ exposition → HTTP.

pub mod catalog;
pub mod collector;
pub mod config;
pub mod exposition;
pub mod flussonic;
pub mod logging;
pub mod server;
pub mod storage;

pub use collector::{Collector, CollectorError, CollectorRegistry, FlussonicCollector, JobInfo};
pub use config::{AppConfig, ConfigError, Target, TargetConfig};
pub use exposition::{Exposition, ExpositionError};
pub use flussonic::{FetchError, FlussonicClient, StatSource};
pub use server::{AppState, create_router};
pub use storage::{MetricSample, Snapshot, SnapshotBuilder, TargetCache};
