//! Access log middleware.
//!
//! Emits one structured record per request on the `access` target:
//! `method`, `url`, `proto`, `status_code`, `duration_ns`, `remote_addr`, `ua`.
//! Server errors (status > 499) are logged at `error`, everything else at
//! `info`.
//!
//! The record is written when a per-request guard is dropped. The guard is
//! created in `call`, so a request whose future panics or is dropped before
//! completing is still logged exactly once.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, Response, Version};
use tower::{Layer, Service};

use crate::http::middleware::status::StatusCapture;
use crate::observability::logging::ACCESS_TARGET;

/// Layer producing [`AccessLog`] services.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogLayer;

impl AccessLogLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLog { inner }
    }
}

/// Service wrapper that writes an access record for every request.
#[derive(Debug, Clone)]
pub struct AccessLog<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AccessLog<S>
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
        let mut record = AccessRecord::start(&request);
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            Ok(record.observe(response))
        })
    }
}

/// Per-request state; logs itself on drop.
struct AccessRecord {
    method: Method,
    url: String,
    proto: Version,
    remote_addr: String,
    user_agent: String,
    started: Instant,
    status: StatusCapture,
}

impl AccessRecord {
    fn start<B>(request: &Request<B>) -> Self {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();
        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Self {
            method: request.method().clone(),
            url: request.uri().path().to_string(),
            proto: request.version(),
            remote_addr,
            user_agent,
            started: Instant::now(),
            status: StatusCapture::new(),
        }
    }

    /// Take the status from `response`. The record is written when `self` drops.
    fn observe<B>(&mut self, response: Response<B>) -> Response<B> {
        self.status.observe(response)
    }
}

impl Drop for AccessRecord {
    fn drop(&mut self) {
        let status_code = self.status.status().as_u16();
        let duration_ns = u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX);

        macro_rules! emit {
            ($level:ident) => {
                tracing::$level!(
                    target: ACCESS_TARGET,
                    method = %self.method,
                    url = %self.url,
                    proto = ?self.proto,
                    status_code,
                    duration_ns,
                    remote_addr = %self.remote_addr,
                    ua = %self.user_agent
                )
            };
        }

        if status_code > 499 {
            emit!(error);
        } else {
            emit!(info);
        }
    }
}
