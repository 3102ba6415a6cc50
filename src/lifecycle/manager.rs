//! Dual-server lifecycle.
//!
//! # Responsibilities
//! - Bind the public and management listeners and serve each from its own task
//! - Stop both servers on request and wait for them against one deadline
//! - Report how shutdown went
//!
//! # Design Decisions
//! - A listener that fails to bind is logged and treated as stopped; the other
//!   server keeps running
//! - Both servers drain concurrently, so the deadline bounds the whole
//!   shutdown rather than each server separately
//! - A server still draining at the deadline is aborted
//!
//! # Data Flow
//! ```text
//! Created ── start() ──▶ Running ── shutdown() ──▶ ShuttingDown ──▶ Stopped
//!                          │                           │
//!                     bind + spawn               trigger signal,
//!                     both servers            join both until deadline
//! ```

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::http::server::HttpServer;
use crate::lifecycle::shutdown::Shutdown;

/// Error type for lifecycle transitions.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("servers did not stop within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("{server} server failed: {source}")]
    Server {
        server: &'static str,
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    ShuttingDown,
    Stopped,
}

/// One of the two servers.
enum Branch {
    Pending(HttpServer),
    Serving {
        name: &'static str,
        address: SocketAddr,
        task: JoinHandle<io::Result<()>>,
    },
    Stopped,
}

impl Branch {
    fn address(&self) -> Option<SocketAddr> {
        match self {
            Branch::Serving { address, .. } => Some(*address),
            _ => None,
        }
    }

    async fn start(self, shutdown: &Shutdown) -> Branch {
        let server = match self {
            Branch::Pending(server) => server,
            other => return other,
        };

        let listener = match server.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(server = server.name(), error = %e, "Server failed to start");
                return Branch::Stopped;
            }
        };
        let address = match listener.local_addr() {
            Ok(address) => address,
            Err(e) => {
                tracing::error!(server = server.name(), error = %e, "Server failed to start");
                return Branch::Stopped;
            }
        };

        let name = server.name();
        let task = tokio::spawn(server.run(listener, shutdown.subscribe()));
        Branch::Serving { name, address, task }
    }

    /// Wait for the server to finish draining, at most until `deadline`.
    async fn stop(self, deadline: Instant, limit: Duration) -> Result<(), LifecycleError> {
        let (name, mut task) = match self {
            Branch::Serving { name, task, .. } => (name, task),
            _ => return Ok(()),
        };

        let result = match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(Ok(()))) => return Ok(()),
            Ok(Ok(Err(source))) => LifecycleError::Server { server: name, source },
            Ok(Err(join)) => LifecycleError::Server {
                server: name,
                source: io::Error::other(join),
            },
            Err(_) => {
                task.abort();
                LifecycleError::ShutdownTimeout(limit)
            }
        };
        tracing::error!(server = name, error = %result, "Server shutdown failed");
        Err(result)
    }
}

/// Owns the public and management servers from startup to shutdown.
pub struct ServerLifecycle {
    state: LifecycleState,
    shutdown: Shutdown,
    deadline: Duration,
    public: Branch,
    management: Branch,
}

impl ServerLifecycle {
    pub fn new(public: HttpServer, management: HttpServer, deadline: Duration) -> Self {
        Self {
            state: LifecycleState::Created,
            shutdown: Shutdown::new(),
            deadline,
            public: Branch::Pending(public),
            management: Branch::Pending(management),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Bound address of the public server, if it is serving.
    pub fn public_addr(&self) -> Option<SocketAddr> {
        self.public.address()
    }

    /// Bound address of the management server, if it is serving.
    pub fn management_addr(&self) -> Option<SocketAddr> {
        self.management.address()
    }

    /// Bind both listeners concurrently and start serving.
    ///
    /// Only has an effect on a freshly created lifecycle.
    pub async fn start(&mut self) {
        if self.state != LifecycleState::Created {
            return;
        }

        let public = std::mem::replace(&mut self.public, Branch::Stopped);
        let management = std::mem::replace(&mut self.management, Branch::Stopped);
        let (public, management) = tokio::join!(
            public.start(&self.shutdown),
            management.start(&self.shutdown)
        );
        self.public = public;
        self.management = management;
        self.state = LifecycleState::Running;

        if self.public_addr().is_none() && self.management_addr().is_none() {
            tracing::warn!("No server is running");
        }
    }

    /// Stop both servers and wait for them, sharing one deadline.
    ///
    /// Returns the first failure after both servers have been dealt with.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        if self.state == LifecycleState::Stopped {
            return Ok(());
        }

        self.state = LifecycleState::ShuttingDown;
        tracing::info!(deadline = ?self.deadline, "Shutting down");
        self.shutdown.trigger();

        let deadline = Instant::now() + self.deadline;
        let public = std::mem::replace(&mut self.public, Branch::Stopped);
        let management = std::mem::replace(&mut self.management, Branch::Stopped);
        let (public, management) = tokio::join!(
            public.stop(deadline, self.deadline),
            management.stop(deadline, self.deadline)
        );

        self.state = LifecycleState::Stopped;
        public?;
        management?;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::server::ServerSettings;
    use axum::routing::get;
    use axum::Router;

    fn settings() -> ServerSettings {
        ServerSettings {
            read_timeout: Duration::from_millis(100),
            write_timeout: Duration::from_millis(100),
            idle_timeout: Duration::from_secs(5),
        }
    }

    fn server(name: &'static str, address: &str) -> HttpServer {
        let router = Router::new().route("/", get(|| async { "hi" }));
        HttpServer::new(name, address, router, settings())
    }

    #[tokio::test]
    async fn walks_through_states() {
        let mut lifecycle = ServerLifecycle::new(
            server("public", "127.0.0.1:0"),
            server("management", "127.0.0.1:0"),
            Duration::from_millis(100),
        );
        assert_eq!(lifecycle.state(), LifecycleState::Created);
        assert!(lifecycle.public_addr().is_none());

        lifecycle.start().await;
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        assert!(lifecycle.public_addr().is_some());
        assert!(lifecycle.management_addr().is_some());

        lifecycle.shutdown().await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert!(lifecycle.public_addr().is_none());

        // Idempotent once stopped.
        lifecycle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn bind_failure_stops_only_that_branch() {
        let mut lifecycle = ServerLifecycle::new(
            server("public", "not-an-address"),
            server("management", "127.0.0.1:0"),
            Duration::from_millis(100),
        );

        lifecycle.start().await;
        assert!(lifecycle.public_addr().is_none());
        assert!(lifecycle.management_addr().is_some());

        lifecycle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_before_start_succeeds() {
        let mut lifecycle = ServerLifecycle::new(
            server("public", "127.0.0.1:0"),
            server("management", "127.0.0.1:0"),
            Duration::from_millis(100),
        );
        lifecycle.shutdown().await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);

        lifecycle.start().await;
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }
}
