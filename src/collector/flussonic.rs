//! Flussonic scrape worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog;
use crate::collector::{Collector, CollectorError};
use crate::config::Target;
use crate::flussonic::{
    ApiMethod, ApiResponse, FetchError, FlussonicClient, Media, ServerInfo, Sessions, StatSource,
    Stream,
};
use crate::storage::{Snapshot, SnapshotBuilder, TargetCache};

/// Scrapes one Flussonic instance and stores the result in the cache.
///
/// Every invocation of [`scrape`](Self::scrape) performs exactly one cache
/// write: a full snapshot when all three API calls succeed, otherwise a
/// failure snapshot carrying only `success=0` and the elapsed duration.
pub struct FlussonicCollector<S: StatSource = FlussonicClient> {
    name: String,
    target: Target,
    source: S,
    cache: Arc<TargetCache>,
}

impl FlussonicCollector<FlussonicClient> {
    /// Create a collector backed by the HTTP API client.
    pub fn from_target(target: Target, cache: Arc<TargetCache>) -> Result<Self, CollectorError> {
        let client = FlussonicClient::new(&target)
            .map_err(|e| CollectorError::Config(format!("{}: {e}", target.url)))?;
        Ok(Self::new(target, client, cache))
    }
}

impl<S: StatSource> FlussonicCollector<S> {
    pub fn new(target: Target, source: S, cache: Arc<TargetCache>) -> Self {
        Self {
            name: format!("Scrape {}", target.instance_name),
            target,
            source,
            cache,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Run one scrape cycle. Returns whether it succeeded.
    pub async fn scrape(&self) -> bool {
        tracing::debug!(instance = %self.target.instance_name, "Start scraping");
        let start = Instant::now();

        let (snapshot, success) = match self.fetch_all().await {
            Ok((server, media, sessions)) => (
                build_snapshot(&self.target.instance_name, &server, &media, &sessions, start),
                true,
            ),
            Err((method, err)) => {
                tracing::error!(
                    server = %self.target.url,
                    method = %method,
                    error = %err,
                    "Error scraping flussonic API"
                );
                (
                    Snapshot::failure(&self.target.instance_name, start.elapsed()),
                    false,
                )
            }
        };

        self.cache.put(self.target.key(), snapshot);
        success
    }

    async fn fetch_all(
        &self,
    ) -> Result<
        (
            ApiResponse<ServerInfo>,
            ApiResponse<Media>,
            ApiResponse<Sessions>,
        ),
        (ApiMethod, FetchError),
    > {
        let server = self
            .source
            .server()
            .await
            .map_err(|e| (ApiMethod::Server, e))?;
        let media = self
            .source
            .media()
            .await
            .map_err(|e| (ApiMethod::Media, e))?;
        let sessions = self
            .source
            .sessions()
            .await
            .map_err(|e| (ApiMethod::Sessions, e))?;
        Ok((server, media, sessions))
    }
}

impl<S: StatSource> std::fmt::Debug for FlussonicCollector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlussonicCollector")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<S: StatSource> Collector for FlussonicCollector<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.target.scrape_interval
    }

    async fn collect(&self) -> Result<(), CollectorError> {
        self.scrape().await;
        Ok(())
    }
}

fn bool_value(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Label values following `server` for every per-stream metric.
fn stream_labels(stream: &Stream) -> [String; 5] {
    [
        stream.name.clone(),
        stream.options.title.clone(),
        stream.options.comment.clone(),
        stream.stats.dvr_enabled.to_string(),
        stream.stats.running_transcoder.to_string(),
    ]
}

fn build_snapshot(
    server: &str,
    info: &ApiResponse<ServerInfo>,
    media: &ApiResponse<Media>,
    sessions: &ApiResponse<Sessions>,
    start: Instant,
) -> Snapshot {
    let mut builder = SnapshotBuilder::new(server);

    for (url, duration) in [
        (info.url, info.request_duration),
        (media.url, media.request_duration),
        (sessions.url, sessions.request_duration),
    ] {
        builder.push(&catalog::REQUEST_DURATION, duration.as_secs_f64(), [url]);
    }

    builder.push(
        &catalog::TOTAL_CLIENTS,
        info.data.total_clients,
        None::<String>,
    );
    builder.push(
        &catalog::TOTAL_DVR_CLIENTS,
        sessions.data.total_dvr_clients(),
        None::<String>,
    );

    for stream in media.data.streams.values() {
        let labels = stream_labels(stream);
        let stats = &stream.stats;
        builder.push(&catalog::STREAM_BITRATE, stats.bitrate, labels.clone());
        builder.push(&catalog::STREAM_RETRY_COUNT, stats.retry_count, labels.clone());
        builder.push(&catalog::STREAM_ALIVE, bool_value(stats.alive), labels.clone());
        builder.push(&catalog::STREAM_INPUT_ERROR_RATE, stats.input_error_rate, labels);
    }

    for agg in sessions.data.streams.values() {
        let fallback;
        let stream = match media.data.streams.get(&agg.name) {
            Some(stream) => stream,
            None => {
                fallback = Stream::not_found(&agg.name);
                &fallback
            }
        };
        let labels = stream_labels(stream);
        builder.push(&catalog::STREAM_CLIENTS, agg.total_clients, labels.clone());
        builder.push(&catalog::STREAM_DVR_CLIENTS, agg.dvr_clients, labels);
    }

    builder.finish(true, start.elapsed())
}
