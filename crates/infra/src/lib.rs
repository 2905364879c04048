//! # HomeVoice Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Configuration loading (TOML/JSON files plus environment overrides)
//! - The breaker-guarded messaging client and the in-process loopback hub
//! - Logging and Prometheus telemetry setup
//! - The assembled execution stack
//!
//! ## Architecture
//! - Implements traits defined in `homevoice-core`
//! - Depends on `homevoice-common`, `homevoice-domain` and `homevoice-core`
//! - Contains all "impure" code (I/O, global subscribers, environment)

pub mod config;
pub mod messaging;
pub mod observability;
pub mod services;

// Re-export commonly used items
pub use config::{load, load_from_file};
pub use messaging::{LoopbackHub, MessagingClient};
pub use observability::{init_tracing, BreakerTelemetry};
pub use services::ExecutionStack;
