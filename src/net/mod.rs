//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind)
//!     → io.rs (write timeout)
//!     → connection.rs (tracking, idle detection)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Active → Idle → Draining → Closed
//! ```
//!
//! # Design Decisions
//! - Each connection tracked for graceful shutdown
//! - Idle means no request in flight, not no bytes on the wire

pub mod connection;
pub mod io;
pub mod listener;
