//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the public API router with its middleware stack
//! - Accept connections and serve them with hyper (HTTP/1.1 and HTTP/2)
//! - Apply per-connection timeouts (header read, write stall, idle)
//! - Stop accepting on shutdown and drain open connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tower::{ServiceBuilder, ServiceExt};
use tower_http::catch_panic::CatchPanicLayer;

use crate::http::middleware::{AccessLogLayer, HttpMetricsLayer};
use crate::http::spin::{spin_handler, SpinState};
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::connection::{ConnectionActivity, ConnectionTracker};
use crate::net::io::WriteTimeoutStream;
use crate::net::listener::{self, ListenerError};
use crate::observability::metrics::{MetricsError, MetricsRegistry};
use crate::workload::SyntheticWorkload;

/// Build the public API: `/spin` behind access logging and request metrics.
///
/// Registers the request duration histogram on `registry`, so this can only
/// succeed once per registry.
pub fn public_router(
    workload: Arc<dyn SyntheticWorkload>,
    registry: &MetricsRegistry,
) -> Result<Router, MetricsError> {
    let router = Router::new()
        .route("/spin", get(spin_handler))
        .with_state(SpinState { workload });
    instrument(router, registry)
}

/// Wrap `router` in the public middleware stack, outermost first: access
/// log, request metrics, panic guard. A panicking handler is answered with
/// a 500, which both the access record and the histogram see.
pub fn instrument(router: Router, registry: &MetricsRegistry) -> Result<Router, MetricsError> {
    let metrics = HttpMetricsLayer::new(registry)?;

    Ok(router.layer(
        ServiceBuilder::new()
            .layer(AccessLogLayer::new())
            .layer(metrics)
            .layer(CatchPanicLayer::new()),
    ))
}

/// Per-connection timeouts.
#[derive(Debug, Clone, Copy)]
pub struct ServerSettings {
    /// Limit for receiving request headers.
    pub read_timeout: Duration,
    /// Limit for a write to the client to make progress.
    pub write_timeout: Duration,
    /// Keep-alive connections without a request for this long are closed.
    pub idle_timeout: Duration,
}

/// One HTTP listener and the router it serves.
pub struct HttpServer {
    name: &'static str,
    address: String,
    router: Router,
    settings: ServerSettings,
}

impl HttpServer {
    pub fn new(name: &'static str, address: impl Into<String>, router: Router, settings: ServerSettings) -> Self {
        Self {
            name,
            address: address.into(),
            router,
            settings,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ListenerError> {
        listener::bind(&self.address).await
    }

    /// Serve connections from `listener` until `shutdown` fires, then wait
    /// for every open connection to finish.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(server = self.name, address = %addr, "HTTP server starting");

        let tracker = ConnectionTracker::new();
        let mut builder = auto::Builder::new(TokioExecutor::new());
        // hyper only bounds header reads on HTTP/1. HTTP/2 connections are
        // limited by the write and idle timeouts alone.
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.settings.read_timeout)
            .keep_alive(true);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let connection = Connection {
                            server: self.name,
                            stream,
                            peer,
                            router: self.router.clone(),
                            builder: builder.clone(),
                            settings: self.settings,
                            shutdown: shutdown.clone(),
                        };
                        let guard = tracker.track();
                        tokio::spawn(async move {
                            tracing::trace!(connection_id = %guard.id(), peer = %connection.peer, "Connection accepted");
                            connection.serve().await;
                            drop(guard);
                        });
                    }
                    Err(e) => {
                        tracing::warn!(server = self.name, error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                },
            }
        }

        drop(listener);
        tracing::info!(
            server = self.name,
            open_connections = tracker.active_count(),
            "HTTP server draining"
        );
        tracker.wait_for_drain().await;
        tracing::info!(server = self.name, "HTTP server stopped");
        Ok(())
    }
}

/// A single accepted connection.
struct Connection {
    server: &'static str,
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    builder: auto::Builder<TokioExecutor>,
    settings: ServerSettings,
    shutdown: ShutdownSignal,
}

impl Connection {
    async fn serve(self) {
        let Connection {
            server,
            stream,
            peer,
            router,
            builder,
            settings,
            mut shutdown,
        } = self;

        let activity = ConnectionActivity::new();
        let service = {
            let activity = activity.clone();
            hyper::service::service_fn(move |mut request: Request<Incoming>| {
                let in_flight = activity.begin();
                request.extensions_mut().insert(ConnectInfo(peer));
                let router = router.clone();
                async move {
                    let response = router.oneshot(request).await;
                    drop(in_flight);
                    response
                }
            })
        };

        let io = TokioIo::new(WriteTimeoutStream::new(stream, settings.write_timeout));
        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);

        let result = tokio::select! {
            result = conn.as_mut() => result,
            _ = activity.idle_for(settings.idle_timeout) => {
                tracing::trace!(server, peer = %peer, "Closing idle connection");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
            _ = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        };

        if let Err(e) = result {
            tracing::debug!(server, peer = %peer, error = %e, "Connection error");
        }
    }
}
