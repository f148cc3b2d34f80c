//! Collector registry for managing collector lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::run_state::RunState;
use super::traits::{Collector, CollectorError};

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata about a registered job.
#[derive(Debug, Clone)]
pub struct JobInfo {
    /// Job UUID.
    pub id: uuid::Uuid,
    /// Collector name.
    pub name: String,
    /// Interval between invocations.
    pub interval: Duration,
    /// Whether an invocation is currently in flight.
    pub running: bool,
}

#[derive(Debug)]
struct JobEntry {
    name: String,
    interval: Duration,
    state: RunState,
}

/// Registry for managing multiple collector tasks.
///
/// Uses `tokio-cron-scheduler` repeated jobs, one per collector. A trigger that
/// fires while the previous invocation of the same job is still running is
/// skipped, so a job never overlaps with itself. Jobs never wait on each other.
pub struct CollectorRegistry {
    scheduler: JobScheduler,
    jobs: Arc<RwLock<HashMap<uuid::Uuid, JobEntry>>>,
}

impl CollectorRegistry {
    /// Create a new collector registry.
    pub async fn new() -> Result<Self, CollectorError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| CollectorError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        })
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field(
                "job_count",
                &self.jobs.try_read().map(|j| j.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

impl CollectorRegistry {
    /// Register and schedule a collector.
    pub async fn spawn<C: Collector>(&self, collector: C) -> Result<uuid::Uuid, CollectorError> {
        let name = collector.name().to_string();
        let interval = collector.interval();
        if interval < super::MIN_INTERVAL {
            return Err(CollectorError::Config(format!(
                "collector '{name}' interval {interval:?} is below {:?}",
                super::MIN_INTERVAL
            )));
        }

        let state = RunState::new();
        let job = create_job(Arc::new(collector), &name, interval, state.clone())
            .inspect_err(|e| tracing::error!(collector = %name, error = %e, "Job create failed"))?;

        let job_id = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| CollectorError::Scheduler(e.to_string()))
            .inspect_err(|e| tracing::error!(collector = %name, error = %e, "Job register failed"))?;

        self.jobs.write().await.insert(
            job_id,
            JobEntry {
                name: name.clone(),
                interval,
                state,
            },
        );

        tracing::info!(collector = %name, job_id = %job_id, interval = ?interval, "Collector registered");
        Ok(job_id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), CollectorError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| CollectorError::Scheduler(e.to_string()))?;
        tracing::info!("Collector scheduler started");
        Ok(())
    }

    /// List all registered jobs, ordered by name.
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self
            .jobs
            .read()
            .await
            .iter()
            .map(|(id, entry)| JobInfo {
                id: *id,
                name: entry.name.clone(),
                interval: entry.interval,
                running: entry.state.is_running(),
            })
            .collect();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        jobs
    }

    /// Get the number of registered jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Gracefully shutdown the scheduler with default timeout.
    pub async fn shutdown(self) -> Result<(), CollectorError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Shutdown with custom timeout.
    pub async fn shutdown_with_timeout(mut self, timeout: Duration) -> Result<(), CollectorError> {
        let job_count = self.jobs.read().await.len();
        let shutdown_result = tokio::time::timeout(timeout, async {
            self.scheduler
                .shutdown()
                .await
                .map_err(|e| CollectorError::Scheduler(e.to_string()))
        })
        .await;

        match shutdown_result {
            Ok(Ok(())) => {
                tracing::info!(job_count, "Collector scheduler shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(job_count, error = %e, "Collector scheduler shutdown failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(job_count, timeout = ?timeout, "Collector scheduler shutdown timed out");
                Ok(())
            }
        }
    }

    /// Remove a specific collector job by ID.
    pub async fn remove(&self, job_id: &uuid::Uuid) -> Result<(), CollectorError> {
        let job_name = self.jobs.read().await.get(job_id).map(|j| j.name.clone());

        self.scheduler
            .remove(job_id)
            .await
            .map_err(|e| CollectorError::Scheduler(e.to_string()))
            .inspect_err(|e| {
                tracing::error!(job_id = %job_id, collector = ?job_name, error = %e, "Job remove failed");
            })?;

        self.jobs.write().await.remove(job_id);

        tracing::info!(job_id = %job_id, collector = ?job_name, "Collector removed");
        Ok(())
    }
}

fn create_job<C: Collector>(
    collector: Arc<C>,
    name: &str,
    interval: Duration,
    state: RunState,
) -> Result<Job, CollectorError> {
    let name = name.to_owned();

    let make_callback = move || {
        move |_: uuid::Uuid, _: JobScheduler| {
            let (collector, name, state) = (Arc::clone(&collector), name.clone(), state.clone());
            Box::pin(async move {
                run_collection(collector.as_ref(), &name, &state).await;
            })
                as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        }
    };

    Job::new_repeated_async(interval, make_callback())
        .map_err(|e| CollectorError::Scheduler(e.to_string()))
}

/// Execute a single collection cycle unless the previous one is still running.
///
/// Returns `false` when the trigger was skipped.
async fn run_collection<C: Collector>(collector: &C, name: &str, state: &RunState) -> bool {
    let Some(_guard) = state.try_begin() else {
        tracing::info!(collector = %name, "Previous run still in progress, skipping trigger");
        return false;
    };

    let start = std::time::Instant::now();
    tracing::debug!(collector = %name, "Running collection");

    match collector.collect().await {
        Ok(()) => {
            let duration_ms = start.elapsed().as_millis();
            tracing::debug!(collector = %name, duration_ms, "Collection completed");
        }
        Err(e) => {
            tracing::error!(collector = %name, error = %e, "Collection failed");
        }
    }
    true
}
