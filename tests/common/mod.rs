//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fidget_spinner::config::SpinnerConfig;
use fidget_spinner::lifecycle::{build_lifecycle, build_lifecycle_with, ServerLifecycle};
use fidget_spinner::observability::logging::LogLevels;
use fidget_spinner::workload::{SyntheticWorkload, WorkloadError};

/// Configuration with both listeners on ephemeral loopback ports.
pub fn test_config() -> SpinnerConfig {
    let mut config = SpinnerConfig::default();
    config.public.host = "127.0.0.1".into();
    config.public.port = 0;
    config.management.host = "127.0.0.1".into();
    config.management.port = 0;
    config
}

/// A running service and the handles tests need to drive it.
pub struct TestService {
    pub lifecycle: ServerLifecycle,
    pub levels: LogLevels,
}

impl TestService {
    pub async fn start(config: SpinnerConfig) -> Self {
        let levels = LogLevels::default();
        let lifecycle = build_lifecycle(&config, levels.clone()).unwrap();
        Self::running(lifecycle, levels).await
    }

    pub async fn start_with(config: SpinnerConfig, workload: Arc<dyn SyntheticWorkload>) -> Self {
        let levels = LogLevels::default();
        let lifecycle = build_lifecycle_with(&config, levels.clone(), workload).unwrap();
        Self::running(lifecycle, levels).await
    }

    async fn running(mut lifecycle: ServerLifecycle, levels: LogLevels) -> Self {
        lifecycle.start().await;
        Self { lifecycle, levels }
    }

    pub fn public_url(&self, path: &str) -> String {
        url(self.lifecycle.public_addr().expect("public server running"), path)
    }

    pub fn management_url(&self, path: &str) -> String {
        url(self.lifecycle.management_addr().expect("management server running"), path)
    }
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

/// Client that opens a fresh connection per request.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}

/// Workload that blocks for a fixed time instead of hashing.
pub struct SleepWorkload(pub Duration);

impl SyntheticWorkload for SleepWorkload {
    fn run(&self, _cost: u64) -> Result<Vec<u8>, WorkloadError> {
        std::thread::sleep(self.0);
        Ok(Vec::new())
    }
}

/// Value of the first sample line starting with `prefix` in a text exposition.
pub fn sample(exposition: &str, prefix: &str) -> Option<f64> {
    exposition
        .lines()
        .find(|line| line.starts_with(prefix))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
