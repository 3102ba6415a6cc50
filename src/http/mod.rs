//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, timeouts, graceful close)
//!     → middleware/ (access log, request metrics, panic guard)
//!     → spin.rs (synthetic workload)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;
pub mod spin;

pub use server::{instrument, public_router, HttpServer, ServerSettings};
