//! Metric sample and snapshot types.
//!
//! - [`MetricSample`]: one observation of a catalog descriptor
//! - [`Snapshot`]: the immutable result of one scrape cycle for one target
//! - [`SnapshotBuilder`]: assembles a snapshot and closes it with the
//!   success and duration samples every snapshot must carry

use std::time::Duration;

use crate::catalog::{self, MetricDesc};

/// One emitted observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    desc: &'static MetricDesc,
    value: f64,
    label_values: Vec<String>,
}

impl MetricSample {
    /// Create a sample. Label values follow the descriptor's label schema.
    pub fn new(desc: &'static MetricDesc, value: f64, label_values: Vec<String>) -> Self {
        debug_assert_eq!(
            desc.arity(),
            label_values.len(),
            "label cardinality mismatch for {}",
            desc.name
        );
        Self {
            desc,
            value,
            label_values,
        }
    }

    pub fn desc(&self) -> &'static MetricDesc {
        self.desc
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Look up a label value by name, including constant labels.
    pub fn label(&self, name: &str) -> Option<&str> {
        if let Some(idx) = self.desc.labels.iter().position(|l| *l == name) {
            return self.label_values.get(idx).map(String::as_str);
        }
        self.desc
            .const_labels
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
    }
}

/// Complete result of one scrape cycle for one target.
///
/// Never mutated after construction; the cache swaps whole snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    samples: Vec<MetricSample>,
}

impl Snapshot {
    /// Minimal snapshot for an aborted cycle: `success=0` plus the duration.
    pub fn failure(server: &str, elapsed: Duration) -> Self {
        SnapshotBuilder::new(server).finish(false, elapsed)
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples of the given descriptor.
    pub fn samples_of<'a>(
        &'a self,
        desc: &'static MetricDesc,
    ) -> impl Iterator<Item = &'a MetricSample> + 'a {
        self.samples.iter().filter(move |s| s.desc == desc)
    }

    /// Outcome recorded by the success indicator, if present.
    pub fn succeeded(&self) -> Option<bool> {
        self.samples_of(&catalog::SCRAPE_SUCCESS)
            .next()
            .map(|s| s.value == 1.0)
    }
}

/// Accumulates the samples of one cycle.
#[derive(Debug)]
pub struct SnapshotBuilder {
    server: String,
    samples: Vec<MetricSample>,
}

impl SnapshotBuilder {
    /// Start a snapshot for the target identified by `server` (its instance name).
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            samples: Vec::new(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Add a sample whose first label is the server name.
    pub fn push<I, S>(&mut self, desc: &'static MetricDesc, value: f64, extra_labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels = Vec::with_capacity(desc.arity());
        labels.push(self.server.clone());
        labels.extend(extra_labels.into_iter().map(Into::into));
        self.samples.push(MetricSample::new(desc, value, labels));
    }

    /// Append the success indicator and the cycle duration, then seal.
    pub fn finish(mut self, success: bool, elapsed: Duration) -> Snapshot {
        let success = if success { 1.0 } else { 0.0 };
        self.push(&catalog::SCRAPE_SUCCESS, success, None::<String>);
        self.push(
            &catalog::SCRAPE_DURATION,
            elapsed.as_secs_f64(),
            None::<String>,
        );
        Snapshot {
            samples: self.samples,
        }
    }
}
