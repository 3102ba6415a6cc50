//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → metrics registry → routers → servers → ServerLifecycle
//!
//! Running (manager.rs):
//!     Bind both listeners → serve each from its own task
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → ServerLifecycle::shutdown
//!
//! Shutdown (shutdown.rs, manager.rs):
//!     Trigger signal → stop accepting → drain connections → deadline check
//! ```
//!
//! # Design Decisions
//! - Shutdown has a single deadline shared by both servers
//! - A failed shutdown is reported to the caller, which exits non-zero

pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use manager::{LifecycleError, LifecycleState, ServerLifecycle};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{Termination, TerminationSignals};
pub use startup::{build_lifecycle, build_lifecycle_with, StartupError};
