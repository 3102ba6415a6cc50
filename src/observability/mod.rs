//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (service log events, stderr)
//!
//! Public API middleware produces:
//!     → logging.rs (access records, stdout)
//!     → metrics.rs (request latency histogram)
//!
//! Consumers:
//!     → Log aggregation (JSON lines)
//!     → Management API (/metrics scrape, /servicelog, /accesslog)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Log levels and the metrics registry are values passed to whoever needs
//!   them, not globals

pub mod logging;
pub mod metrics;
