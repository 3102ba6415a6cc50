//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → TIME_SERVER_PORT / MGMT_SERVER_PORT overrides
//!     → validation.rs (semantic checks)
//!     → SpinnerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All sections have defaults, so no file is needed at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ListenerConfig, ShutdownConfig, SpinnerConfig, TimeoutConfig, WorkloadConfig};
