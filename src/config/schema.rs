//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files and
//! default to the values the service runs with out of the box.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpinnerConfig {
    /// Public API listener (the `/spin` endpoint).
    pub public: ListenerConfig,

    /// Management API listener (metrics, liveness, log levels).
    pub management: ListenerConfig,

    /// Per-connection I/O timeouts shared by both listeners.
    pub timeouts: TimeoutConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Synthetic workload limits.
    pub workload: WorkloadConfig,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            public: ListenerConfig {
                host: default_host(),
                port: 8080,
                idle_timeout_secs: 5,
            },
            management: ListenerConfig {
                host: default_host(),
                port: 9090,
                idle_timeout_secs: 60,
            },
            timeouts: TimeoutConfig::default(),
            shutdown: ShutdownConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}

/// Listener configuration.
///
/// When a listener table is present in a config file, `port` and
/// `idle_timeout_secs` must both be given.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port. 0 picks an ephemeral port.
    pub port: u16,

    /// Keep-alive connections idle for this long are closed.
    pub idle_timeout_secs: u64,
}

impl ListenerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Per-connection timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Limit for receiving a request's headers (milliseconds).
    pub read_ms: u64,

    /// Limit for a stalled write to the client (milliseconds).
    pub write_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_ms: 100,
            write_ms: 100,
        }
    }
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn write(&self) -> Duration {
        Duration::from_millis(self.write_ms)
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Deadline shared by both servers to drain (milliseconds).
    pub deadline_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { deadline_ms: 100 }
    }
}

impl ShutdownConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Synthetic workload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Largest scratch allocation a single spin may make. 0 disables the check.
    pub max_memory_bytes: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 4 * 1024 * 1024 * 1024,
        }
    }
}
