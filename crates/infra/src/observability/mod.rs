//! Observability infrastructure for logging and breaker metrics
//!
//! - [`logging`]: process-wide `tracing` subscriber setup
//! - [`metrics`]: breaker observers wired to a Prometheus registry

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::BreakerTelemetry;
