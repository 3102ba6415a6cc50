//! Fidget spinner
//!
//! A synthetic CPU load generator for exercising autoscalers, schedulers and
//! dashboards.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                  FIDGET SPINNER                  │
//!                   │                                                  │
//!   GET /spin ──────┼─▶ public server ─▶ access log ─▶ metrics ─▶ spin │
//!   (:8080)         │                       │            │        │    │
//!                   │                       ▼            ▼        ▼    │
//!                   │                    stdout      registry   scrypt │
//!                   │                                   │              │
//!   /metrics ───────┼─▶ management server ◀─────────────┘              │
//!   /livez          │        │                                         │
//!   /servicelog     │        └──▶ log levels (service, access)         │
//!   /accesslog      │                                                  │
//!   (:9090)         │  lifecycle: SIGINT/SIGTERM → drain both servers  │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use fidget_spinner::config::load_config;
use fidget_spinner::lifecycle::{build_lifecycle, StartupError, TerminationSignals};
use fidget_spinner::observability::logging::{self, LogLevels};

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthetic CPU load generator", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let levels = LogLevels::default();

    if let Err(e) = logging::init(&levels) {
        eprintln!("fidget-spinner: {e}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli, levels));

    // Spins still hashing on the blocking pool are abandoned, not awaited.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting with failure");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, levels: LogLevels) -> Result<(), StartupError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fidget-spinner starting");

    let config = load_config(cli.config.as_deref())?;
    let mut signals = TerminationSignals::install().map_err(StartupError::Signals)?;
    let mut lifecycle = build_lifecycle(&config, levels)?;

    lifecycle.start().await;

    match signals.recv().await {
        Ok(signal) => tracing::info!(%signal, "Received termination signal"),
        Err(e) => tracing::error!(error = %e, "Signal handling failed, shutting down"),
    }

    lifecycle.shutdown().await?;
    Ok(())
}
