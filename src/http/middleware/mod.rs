//! Observability middleware for the public API.
//!
//! # Data Flow
//! ```text
//! request
//!     → access_log.rs (timer + guard, one record per request)
//!     → metrics.rs (latency histogram by method/endpoint/status)
//!     → handler
//! ```
//!
//! Both layers read the final status through `status.rs`.

pub mod access_log;
pub mod metrics;
pub mod status;

pub use access_log::AccessLogLayer;
pub use metrics::{HttpMetricsLayer, REQUEST_DURATION_METRIC};
pub use status::StatusCapture;
