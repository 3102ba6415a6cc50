//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Own the process-wide Prometheus recorder
//! - Register metrics once, rejecting duplicate names
//! - Render the text exposition format for `/metrics`
//!
//! # Metrics
//! - `http_requests_duration_seconds` (histogram): public API latency by
//!   method, endpoint and status code
//!
//! # Design Decisions
//! - No global recorder is installed; the registry is passed explicitly
//! - Histogram buckets are fixed when the registry is built
//! - Updates are atomic inside the recorder, callers never lock

use std::sync::Arc;

use dashmap::DashSet;
use metrics::{Histogram, Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

static METADATA: Metadata<'static> =
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Error type for metric registration.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metric `{0}` is already registered")]
    DuplicateMetric(String),
    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(String),
    #[error("failed to build recorder: {0}")]
    Build(#[from] BuildError),
}

/// Exponential bucket bounds: `start`, `start * factor`, ... (`count` values).
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>, MetricsError> {
    if count < 1 {
        return Err(MetricsError::InvalidBuckets("count must be positive".into()));
    }
    if start <= 0.0 {
        return Err(MetricsError::InvalidBuckets("start must be positive".into()));
    }
    if factor <= 1.0 {
        return Err(MetricsError::InvalidBuckets("factor must be greater than 1".into()));
    }

    let mut bounds = Vec::with_capacity(count);
    let mut next = start;
    for _ in 0..count {
        bounds.push(next);
        next *= factor;
    }
    Ok(bounds)
}

/// Builder that fixes histogram bucket layouts before the recorder exists.
pub struct MetricsRegistryBuilder {
    inner: PrometheusBuilder,
}

impl MetricsRegistryBuilder {
    pub fn new() -> Self {
        Self {
            inner: PrometheusBuilder::new(),
        }
    }

    /// Use `buckets` for the histogram named exactly `name`.
    pub fn histogram_buckets(mut self, name: &str, buckets: &[f64]) -> Result<Self, MetricsError> {
        self.inner = self
            .inner
            .set_buckets_for_metric(Matcher::Full(name.to_string()), buckets)?;
        Ok(self)
    }

    pub fn build(self) -> MetricsRegistry {
        let recorder = self.inner.build_recorder();
        let handle = recorder.handle();
        MetricsRegistry {
            inner: Arc::new(RegistryInner {
                recorder,
                handle,
                registered: DashSet::new(),
            }),
        }
    }
}

impl Default for MetricsRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct RegistryInner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    registered: DashSet<String>,
}

/// Shared metrics registry. Cheap to clone.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<RegistryInner>,
}

impl MetricsRegistry {
    pub fn builder() -> MetricsRegistryBuilder {
        MetricsRegistryBuilder::new()
    }

    /// Register a labeled histogram family.
    pub fn register_histogram(
        &self,
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Result<HistogramFamily, MetricsError> {
        if !self.inner.registered.insert(name.to_string()) {
            return Err(MetricsError::DuplicateMetric(name.to_string()));
        }

        self.inner
            .recorder
            .describe_histogram(KeyName::from_const_str(name), None, SharedString::const_str(help));

        Ok(HistogramFamily {
            registry: self.clone(),
            name,
            label_names,
        })
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }
}

/// A histogram metric with a fixed label schema.
#[derive(Clone)]
pub struct HistogramFamily {
    registry: MetricsRegistry,
    name: &'static str,
    label_names: &'static [&'static str],
}

impl HistogramFamily {
    /// Get the series for `values`, given in label-name order.
    pub fn with_label_values(&self, values: &[&str]) -> Histogram {
        debug_assert_eq!(values.len(), self.label_names.len());

        let labels: Vec<Label> = self
            .label_names
            .iter()
            .zip(values)
            .map(|(name, value)| Label::new(*name, value.to_string()))
            .collect();
        let key = Key::from_parts(self.name, labels);

        self.registry
            .inner
            .recorder
            .register_histogram(&key, &METADATA)
    }
}
