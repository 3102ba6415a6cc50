//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared metrics registry
//! - Assemble the public and management servers from configuration
//! - Hand both to a [`ServerLifecycle`]
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Log levels are created by the caller, since the subscriber needs them
//!   before anything else runs

use std::sync::Arc;

use crate::admin::{management_router, AdminState};
use crate::config::{ConfigError, SpinnerConfig};
use crate::http::middleware::HttpMetricsLayer;
use crate::http::server::{public_router, HttpServer, ServerSettings};
use crate::lifecycle::manager::{LifecycleError, ServerLifecycle};
use crate::observability::logging::{LogLevels, LoggingError};
use crate::observability::metrics::{MetricsError, MetricsRegistry};
use crate::workload::{ScryptWorkload, SyntheticWorkload};

/// Anything that ends the process with a failure.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Build both servers with the scrypt workload.
pub fn build_lifecycle(config: &SpinnerConfig, levels: LogLevels) -> Result<ServerLifecycle, MetricsError> {
    let workload = Arc::new(ScryptWorkload::new(config.workload.max_memory_bytes));
    build_lifecycle_with(config, levels, workload)
}

/// Build both servers around `workload`.
pub fn build_lifecycle_with(
    config: &SpinnerConfig,
    levels: LogLevels,
    workload: Arc<dyn SyntheticWorkload>,
) -> Result<ServerLifecycle, MetricsError> {
    let metrics = HttpMetricsLayer::configure(MetricsRegistry::builder())?.build();

    let public = HttpServer::new(
        "public",
        config.public.bind_address(),
        public_router(workload, &metrics)?,
        ServerSettings {
            read_timeout: config.timeouts.read(),
            write_timeout: config.timeouts.write(),
            idle_timeout: config.public.idle_timeout(),
        },
    );

    let management = HttpServer::new(
        "management",
        config.management.bind_address(),
        management_router(AdminState { metrics, levels }),
        ServerSettings {
            read_timeout: config.timeouts.read(),
            write_timeout: config.timeouts.write(),
            idle_timeout: config.management.idle_timeout(),
        },
    );

    tracing::info!(
        public = %public.address(),
        management = %management.address(),
        deadline = ?config.shutdown.deadline(),
        "Servers configured"
    );

    Ok(ServerLifecycle::new(public, management, config.shutdown.deadline()))
}
