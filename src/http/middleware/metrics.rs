//! Request duration metrics middleware.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::{Request, Response};
use tower::{Layer, Service};

use crate::http::middleware::status::StatusCapture;
use crate::observability::metrics::{
    exponential_buckets, HistogramFamily, MetricsError, MetricsRegistry, MetricsRegistryBuilder,
};

pub const REQUEST_DURATION_METRIC: &str = "http_requests_duration_seconds";
const REQUEST_DURATION_HELP: &str = "Duration of HTTP requests in seconds.";
const REQUEST_DURATION_LABELS: &[&str] = &["method", "endpoint", "status_code"];

/// Layer recording `http_requests_duration_seconds` for every request.
///
/// The `endpoint` label is the raw request path. Unbounded path sets produce
/// unbounded series; only mount this in front of routers with a fixed set of
/// paths.
#[derive(Clone)]
pub struct HttpMetricsLayer {
    histogram: HistogramFamily,
}

impl HttpMetricsLayer {
    /// Configure the histogram buckets (0.05s doubling, 8 buckets) on `builder`.
    pub fn configure(builder: MetricsRegistryBuilder) -> Result<MetricsRegistryBuilder, MetricsError> {
        let buckets = exponential_buckets(0.05, 2.0, 8)?;
        builder.histogram_buckets(REQUEST_DURATION_METRIC, &buckets)
    }

    /// Register the histogram on `registry`. Fails if it is already registered.
    pub fn new(registry: &MetricsRegistry) -> Result<Self, MetricsError> {
        let histogram = registry.register_histogram(
            REQUEST_DURATION_METRIC,
            REQUEST_DURATION_HELP,
            REQUEST_DURATION_LABELS,
        )?;
        Ok(Self { histogram })
    }
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetrics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetrics {
            inner,
            histogram: self.histogram.clone(),
        }
    }
}

#[derive(Clone)]
pub struct HttpMetrics<S> {
    inner: S,
    histogram: HistogramFamily,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for HttpMetrics<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let started = Instant::now();
        let method = request.method().clone();
        let endpoint = request.uri().path().to_string();
        let histogram = self.histogram.clone();
        let future = self.inner.call(request);

        Box::pin(async move {
            let mut status = StatusCapture::new();
            let response = status.observe(future.await?);

            let status_code = status.status().as_u16().to_string();
            histogram
                .with_label_values(&[method.as_str(), &endpoint, &status_code])
                .record(started.elapsed().as_secs_f64());

            Ok(response)
        })
    }
}
