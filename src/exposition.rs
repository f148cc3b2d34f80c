//! Prometheus exposition of the cached snapshots.
//!
//! Each pull copies the current snapshot of every target out of the cache and
//! turns them into metric families. A pull never triggers a scrape.

use std::collections::HashMap;
use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, LabelPair, MetricFamily, MetricType};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

use crate::catalog::{self, MetricDesc, MetricKind};
use crate::storage::{MetricSample, TargetCache};

/// Errors that can occur while serving a pull.
#[derive(Debug, Error)]
pub enum ExpositionError {
    /// A catalog entry is not a valid Prometheus descriptor.
    #[error("invalid metric descriptor: {0}")]
    Descriptor(#[source] prometheus::Error),

    /// Registry rejected a collector.
    #[error("failed to register collector: {0}")]
    Registration(#[source] prometheus::Error),

    /// Text encoding failed.
    #[error("failed to encode metrics: {0}")]
    Encode(#[source] prometheus::Error),

    /// Encoded output is not valid UTF-8.
    #[error("encoded metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Reads the target cache on every `collect()`.
#[derive(Clone)]
struct CacheCollector {
    cache: Arc<TargetCache>,
    descs: Arc<Vec<Desc>>,
}

impl CacheCollector {
    fn new(cache: Arc<TargetCache>) -> Result<Self, ExpositionError> {
        let descs = catalog::ALL
            .iter()
            .map(|d| to_desc(d))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            cache,
            descs: Arc::new(descs),
        })
    }
}

impl Collector for CacheCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families: Vec<MetricFamily> = Vec::new();
        let mut index: HashMap<&'static str, usize> = HashMap::new();

        for (_, snapshot) in self.cache.read_all() {
            for sample in snapshot.samples() {
                let desc = sample.desc();
                let idx = *index.entry(desc.name).or_insert_with(|| {
                    families.push(new_family(desc));
                    families.len() - 1
                });
                families[idx].mut_metric().push(to_metric(sample));
            }
        }

        families
    }
}

fn to_desc(desc: &MetricDesc) -> Result<Desc, ExpositionError> {
    let const_labels = desc
        .const_labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Desc::new(
        desc.name.to_string(),
        desc.help.to_string(),
        desc.labels.iter().map(|l| l.to_string()).collect(),
        const_labels,
    )
    .map_err(ExpositionError::Descriptor)
}

fn new_family(desc: &MetricDesc) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(desc.name.to_string());
    family.set_help(desc.help.to_string());
    family.set_field_type(match desc.kind {
        MetricKind::Gauge => MetricType::GAUGE,
        MetricKind::Counter => MetricType::COUNTER,
    });
    family
}

fn label_pair(name: &str, value: &str) -> LabelPair {
    let mut pair = LabelPair::default();
    pair.set_name(name.to_string());
    pair.set_value(value.to_string());
    pair
}

fn to_metric(sample: &MetricSample) -> proto::Metric {
    let desc = sample.desc();
    let mut labels: Vec<LabelPair> = desc
        .labels
        .iter()
        .zip(sample.label_values())
        .map(|(name, value)| label_pair(name, value))
        .chain(desc.const_labels.iter().map(|(k, v)| label_pair(k, v)))
        .collect();
    labels.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let mut metric = proto::Metric::default();
    for label in labels {
        metric.mut_label().push(label);
    }
    match desc.kind {
        MetricKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(sample.value());
            metric.set_gauge(gauge);
        }
        MetricKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(sample.value());
            metric.set_counter(counter);
        }
    }
    metric
}

/// The exporter's own metrics: pull endpoint counters plus process metrics.
#[derive(Clone)]
struct ExporterMetrics {
    registry: Registry,
    requests: IntCounterVec,
    in_flight: IntGauge,
}

/// Marks one pull as in flight until dropped.
#[must_use]
pub struct InFlight(Option<IntGauge>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(gauge) = &self.0 {
            gauge.dec();
        }
    }
}

/// Serves the Prometheus text format for the cache.
#[derive(Clone)]
pub struct Exposition {
    collector: CacheCollector,
    exporter: Option<ExporterMetrics>,
}

impl Exposition {
    /// Build the exposition. With `exporter_metrics` the output also carries
    /// pull endpoint counters and, where the platform supports them, the
    /// exporter's own process metrics.
    pub fn new(cache: Arc<TargetCache>, exporter_metrics: bool) -> Result<Self, ExpositionError> {
        let collector = CacheCollector::new(cache)?;
        let exporter = if exporter_metrics {
            Some(ExporterMetrics::new()?)
        } else {
            None
        };
        Ok(Self {
            collector,
            exporter,
        })
    }

    /// Content type of [`render`](Self::render) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Gather every metric family for one pull.
    pub fn gather(&self) -> Result<Vec<MetricFamily>, ExpositionError> {
        let registry = Registry::new();
        registry
            .register(Box::new(self.collector.clone()))
            .map_err(ExpositionError::Registration)?;

        let mut families = registry.gather();
        if let Some(exporter) = &self.exporter {
            families.extend(exporter.registry.gather());
        }
        Ok(families)
    }

    /// Render one pull in the Prometheus text format.
    pub fn render(&self) -> Result<String, ExpositionError> {
        let families = self.gather()?;
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(ExpositionError::Encode)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Exposition {
    /// Count one pull in flight. A no-op without exporter metrics.
    pub fn track_in_flight(&self) -> InFlight {
        InFlight(self.exporter.as_ref().map(|e| {
            e.in_flight.inc();
            e.in_flight.clone()
        }))
    }

    /// Count a served pull by HTTP status code. A no-op without exporter metrics.
    pub fn observe_request(&self, code: u16) {
        if let Some(exporter) = &self.exporter {
            exporter
                .requests
                .with_label_values(&[code.to_string().as_str()])
                .inc();
        }
    }
}

impl std::fmt::Debug for Exposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exposition")
            .field("targets", &self.collector.cache.len())
            .field("exporter_metrics", &self.exporter.is_some())
            .finish()
    }
}

impl ExporterMetrics {
    fn new() -> Result<Self, ExpositionError> {
        let requests = IntCounterVec::new(
            Opts::new(
                "promhttp_metric_handler_requests_total",
                "Total number of scrapes by HTTP status code.",
            ),
            &["code"],
        )
        .map_err(ExpositionError::Descriptor)?;
        // Common codes are exported as zero before the first pull.
        for code in ["200", "500", "503"] {
            requests.with_label_values(&[code]);
        }
        let in_flight = IntGauge::new(
            "promhttp_metric_handler_requests_in_flight",
            "Current number of scrapes being served.",
        )
        .map_err(ExpositionError::Descriptor)?;

        let registry = Registry::new();
        registry
            .register(Box::new(requests.clone()))
            .map_err(ExpositionError::Registration)?;
        registry
            .register(Box::new(in_flight.clone()))
            .map_err(ExpositionError::Registration)?;
        register_process_collector(&registry)?;

        Ok(Self {
            registry,
            requests,
            in_flight,
        })
    }
}

#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) -> Result<(), ExpositionError> {
    registry
        .register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))
        .map_err(ExpositionError::Registration)
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) -> Result<(), ExpositionError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Snapshot, SnapshotBuilder};
    use std::time::Duration;

    fn success_snapshot(server: &str, total_clients: f64) -> Snapshot {
        let mut builder = SnapshotBuilder::new(server);
        builder.push(
            &catalog::REQUEST_DURATION,
            0.015,
            ["/flussonic/api/server"],
        );
        builder.push(&catalog::TOTAL_CLIENTS, total_clients, None::<String>);
        builder.push(&catalog::TOTAL_DVR_CLIENTS, 1.0, None::<String>);
        let labels = ["cam1", "Camera 1", "", "false", "true"];
        builder.push(&catalog::STREAM_BITRATE, 1200.0, labels);
        builder.push(&catalog::STREAM_RETRY_COUNT, 2.0, labels);
        builder.finish(true, Duration::from_millis(40))
    }

    fn exposition(cache: &Arc<TargetCache>) -> Exposition {
        Exposition::new(Arc::clone(cache), false).unwrap()
    }

    #[test]
    fn test_empty_cache_renders_nothing() {
        let cache = Arc::new(TargetCache::new());
        let body = exposition(&cache).render().unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_success_snapshot_rendered() {
        let cache = Arc::new(TargetCache::new());
        cache.put("http://a/", success_snapshot("A", 5.0));

        let body = exposition(&cache).render().unwrap();

        assert!(body.contains("# HELP flussonic_clients_total flussonic_exporter: Total clients count.\n"));
        assert!(body.contains("# TYPE flussonic_clients_total gauge\n"));
        assert!(body.contains("flussonic_clients_total{server=\"A\",type=\"total\"} 5\n"));
        assert!(body.contains("flussonic_clients_total{server=\"A\",type=\"dvr\"} 1\n"));
        assert!(body.contains("flussonic_scrape_collector_success{server=\"A\"} 1\n"));
        assert!(body.contains(
            "flussonic_scrape_api_request_duration_sec{server=\"A\",url=\"/flussonic/api/server\"} 0.015\n"
        ));
        assert!(body.contains("# TYPE flussonic_stream_retry_count counter\n"));
        assert!(body.contains(
            "flussonic_stream_bitrate{comment=\"\",dvr_enabled=\"false\",name=\"cam1\",server=\"A\",title=\"Camera 1\",transcoder_enabled=\"true\"} 1200\n"
        ));
        // Families without samples are not emitted.
        assert!(!body.contains("flussonic_stream_is_alive"));
    }

    #[test]
    fn test_failure_snapshot_rendered() {
        let cache = Arc::new(TargetCache::new());
        cache.put("http://a/", success_snapshot("A", 5.0));
        cache.put("http://b/", Snapshot::failure("B", Duration::from_millis(3)));

        let families = exposition(&cache).gather().unwrap();
        let success = families
            .iter()
            .find(|f| f.get_name() == catalog::SCRAPE_SUCCESS.name)
            .unwrap();
        assert_eq!(success.get_metric().len(), 2);

        let clients = families
            .iter()
            .find(|f| f.get_name() == catalog::TOTAL_CLIENTS.name)
            .unwrap();
        // Only A reports clients; B failed.
        assert_eq!(clients.get_metric().len(), 2);
        for metric in clients.get_metric() {
            assert!(
                metric
                    .get_label()
                    .iter()
                    .any(|l| l.get_name() == "server" && l.get_value() == "A")
            );
        }

        let body = exposition(&cache).render().unwrap();
        assert!(body.contains("flussonic_scrape_collector_success{server=\"B\"} 0\n"));
    }

    #[test]
    fn test_pull_sees_latest_snapshot() {
        let cache = Arc::new(TargetCache::new());
        let exposition = exposition(&cache);

        cache.put("http://a/", success_snapshot("A", 5.0));
        assert!(exposition.render().unwrap().contains("type=\"total\"} 5\n"));

        cache.put("http://a/", success_snapshot("A", 9.0));
        let body = exposition.render().unwrap();
        assert!(body.contains("type=\"total\"} 9\n"));
        assert!(!body.contains("type=\"total\"} 5\n"));
    }

    #[test]
    fn test_content_type() {
        let cache = Arc::new(TargetCache::new());
        assert!(exposition(&cache).content_type().starts_with("text/plain"));
    }

    #[test]
    fn test_pull_requests_counted() {
        let cache = Arc::new(TargetCache::new());
        let exposition = Exposition::new(Arc::clone(&cache), true).unwrap();

        let body = {
            let _in_flight = exposition.track_in_flight();
            exposition.render().unwrap()
        };
        assert!(body.contains("promhttp_metric_handler_requests_in_flight 1\n"));
        assert!(body.contains("promhttp_metric_handler_requests_total{code=\"200\"} 0\n"));
        assert!(body.contains("promhttp_metric_handler_requests_total{code=\"500\"} 0\n"));

        exposition.observe_request(200);
        exposition.observe_request(500);
        let body = exposition.render().unwrap();
        assert!(body.contains("promhttp_metric_handler_requests_in_flight 0\n"));
        assert!(body.contains("promhttp_metric_handler_requests_total{code=\"200\"} 1\n"));
        assert!(body.contains("promhttp_metric_handler_requests_total{code=\"500\"} 1\n"));
    }

    #[test]
    fn test_pull_counters_disabled() {
        let cache = Arc::new(TargetCache::new());
        let exposition = exposition(&cache);
        let _in_flight = exposition.track_in_flight();
        exposition.observe_request(200);
        assert!(exposition.render().unwrap().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_exporter_metrics_included() {
        let cache = Arc::new(TargetCache::new());
        cache.put("http://a/", Snapshot::failure("A", Duration::ZERO));

        let body = Exposition::new(Arc::clone(&cache), true)
            .unwrap()
            .render()
            .unwrap();
        assert!(body.contains("process_cpu_seconds_total"));
        assert!(body.contains("flussonic_scrape_collector_success{server=\"A\"} 0\n"));
    }
}
