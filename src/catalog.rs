//! Metric descriptor catalog.
//!
//! A fixed, process-wide set of metric definitions. Every [`MetricSample`]
//! references one of these descriptors, and the exposition layer turns them
//! into Prometheus descriptors at registration time.
//!
//! Descriptors that share a fully-qualified name (for example the `type="total"`
//! and `type="dvr"` variants of `flussonic_clients_total`) differ only in their
//! constant labels and must keep an identical help string and label schema.
//!
//! [`MetricSample`]: crate::storage::MetricSample

use strum_macros::{AsRefStr, Display};

/// Metric namespace prefix shared by every descriptor.
pub const NAMESPACE: &str = "flussonic";

/// Label schema attached to every per-stream metric.
pub const STREAM_LABELS: &[&str] = &[
    "server",
    "name",
    "title",
    "comment",
    "dvr_enabled",
    "transcoder_enabled",
];

/// Prometheus value kind of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// Definition of one exported metric.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDesc {
    /// Fully-qualified metric name.
    pub name: &'static str,
    /// Help text.
    pub help: &'static str,
    /// Variable label names, in the order sample label values are given.
    pub labels: &'static [&'static str],
    /// Constant label pairs.
    pub const_labels: &'static [(&'static str, &'static str)],
    /// Value kind.
    pub kind: MetricKind,
}

impl MetricDesc {
    /// Number of label values a sample of this descriptor must carry.
    pub fn arity(&self) -> usize {
        self.labels.len()
    }
}

pub static SCRAPE_DURATION: MetricDesc = MetricDesc {
    name: "flussonic_scrape_collector_duration_seconds",
    help: "flussonic_exporter: Duration of a collector scrape.",
    labels: &["server"],
    const_labels: &[],
    kind: MetricKind::Gauge,
};

pub static SCRAPE_SUCCESS: MetricDesc = MetricDesc {
    name: "flussonic_scrape_collector_success",
    help: "flussonic_exporter: Whether a collector succeeded.",
    labels: &["server"],
    const_labels: &[],
    kind: MetricKind::Gauge,
};

pub static TOTAL_CLIENTS: MetricDesc = MetricDesc {
    name: "flussonic_clients_total",
    help: "flussonic_exporter: Total clients count.",
    labels: &["server"],
    const_labels: &[("type", "total")],
    kind: MetricKind::Gauge,
};

pub static TOTAL_DVR_CLIENTS: MetricDesc = MetricDesc {
    name: "flussonic_clients_total",
    help: "flussonic_exporter: Total clients count.",
    labels: &["server"],
    const_labels: &[("type", "dvr")],
    kind: MetricKind::Gauge,
};

pub static REQUEST_DURATION: MetricDesc = MetricDesc {
    name: "flussonic_scrape_api_request_duration_sec",
    help: "flussonic_exporter: API request duration.",
    labels: &["server", "url"],
    const_labels: &[],
    kind: MetricKind::Gauge,
};

pub static STREAM_BITRATE: MetricDesc = MetricDesc {
    name: "flussonic_stream_bitrate",
    help: "flussonic_exporter: Stream bitrate.",
    labels: STREAM_LABELS,
    const_labels: &[],
    kind: MetricKind::Gauge,
};

pub static STREAM_RETRY_COUNT: MetricDesc = MetricDesc {
    name: "flussonic_stream_retry_count",
    help: "flussonic_exporter: Stream input retry count.",
    labels: STREAM_LABELS,
    const_labels: &[],
    kind: MetricKind::Counter,
};

pub static STREAM_ALIVE: MetricDesc = MetricDesc {
    name: "flussonic_stream_is_alive",
    help: "flussonic_exporter: Whether the stream is alive.",
    labels: STREAM_LABELS,
    const_labels: &[],
    kind: MetricKind::Gauge,
};

pub static STREAM_INPUT_ERROR_RATE: MetricDesc = MetricDesc {
    name: "flussonic_stream_input_error_rate",
    help: "flussonic_exporter: Stream input error rate.",
    labels: STREAM_LABELS,
    const_labels: &[],
    kind: MetricKind::Gauge,
};

pub static STREAM_CLIENTS: MetricDesc = MetricDesc {
    name: "flussonic_stream_clients_count",
    help: "flussonic_exporter: Stream clients count.",
    labels: STREAM_LABELS,
    const_labels: &[("type", "total")],
    kind: MetricKind::Gauge,
};

pub static STREAM_DVR_CLIENTS: MetricDesc = MetricDesc {
    name: "flussonic_stream_clients_count",
    help: "flussonic_exporter: Stream clients count.",
    labels: STREAM_LABELS,
    const_labels: &[("type", "dvr")],
    kind: MetricKind::Gauge,
};

/// Every descriptor the exporter can emit.
pub static ALL: &[&MetricDesc] = &[
    &SCRAPE_DURATION,
    &SCRAPE_SUCCESS,
    &TOTAL_CLIENTS,
    &TOTAL_DVR_CLIENTS,
    &REQUEST_DURATION,
    &STREAM_BITRATE,
    &STREAM_RETRY_COUNT,
    &STREAM_ALIVE,
    &STREAM_INPUT_ERROR_RATE,
    &STREAM_CLIENTS,
    &STREAM_DVR_CLIENTS,
];
