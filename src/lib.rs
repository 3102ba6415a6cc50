//! Fidget spinner: a synthetic CPU load generator behind an HTTP API.
//!
//! `GET /spin?speed=N` burns CPU with scrypt at cost `2^N`. A second listener
//! serves the management API: Prometheus metrics, liveness and runtime log
//! levels. Never expose the public listener to untrusted clients.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod workload;

pub use config::SpinnerConfig;
pub use http::HttpServer;
pub use lifecycle::{ServerLifecycle, Shutdown};
