//! Prometheus export of circuit breaker events
//!
//! [`PrometheusBreakerObserver`] is a [`BreakerObserver`] that registers its
//! collectors on a caller-owned [`Registry`], so tests and embedders can keep
//! isolated registries instead of relying on the process-global default.

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

use super::circuit_breaker::CircuitState;
use super::observer::{BreakerObserver, OperationStatus};

/// Prometheus metrics exporter for circuit breakers
#[derive(Debug, Clone)]
pub struct PrometheusBreakerObserver {
    /// Gauge for circuit breaker state (0=closed, 1=open, 2=half-open)
    state: GaugeVec,
    /// Counter for circuit breaker transitions
    transitions: CounterVec,
    /// Counter for guarded calls by outcome
    operations: CounterVec,
    /// Histogram for time from open back to closed
    recovery_time: HistogramVec,
}

impl PrometheusBreakerObserver {
    /// Create the collectors and register them on `registry`
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let state = GaugeVec::new(
            Opts::new(
                "circuit_breaker_state",
                "Current state of circuit breaker (0=closed, 1=open, 2=half-open)",
            ),
            &["breaker_name"],
        )?;
        registry.register(Box::new(state.clone()))?;

        let transitions = CounterVec::new(
            Opts::new(
                "circuit_breaker_transitions_total",
                "Total number of circuit breaker state transitions",
            ),
            &["breaker_name", "from", "to"],
        )?;
        registry.register(Box::new(transitions.clone()))?;

        let operations = CounterVec::new(
            Opts::new(
                "circuit_breaker_operations_total",
                "Total number of calls made through circuit breakers",
            ),
            &["breaker_name", "operation_type", "status"],
        )?;
        registry.register(Box::new(operations.clone()))?;

        let recovery_time = HistogramVec::new(
            HistogramOpts::new(
                "circuit_breaker_recovery_time_seconds",
                "Time from a circuit breaker opening until it closed again",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
            &["breaker_name"],
        )?;
        registry.register(Box::new(recovery_time.clone()))?;

        Ok(Self { state, transitions, operations, recovery_time })
    }

    /// Set the state gauge without a transition (e.g. when a breaker is
    /// first created)
    pub fn record_state(&self, breaker: &str, state: CircuitState) {
        self.state.with_label_values(&[breaker]).set(state.as_metric_value() as f64);
    }
}

impl BreakerObserver for PrometheusBreakerObserver {
    fn on_state_change(&self, breaker: &str, from: CircuitState, to: CircuitState) {
        self.record_state(breaker, to);
        self.transitions.with_label_values(&[breaker, from.as_str(), to.as_str()]).inc();
    }

    fn on_operation_result(&self, breaker: &str, operation: &str, status: OperationStatus) {
        self.operations.with_label_values(&[breaker, operation, status.as_str()]).inc();
    }

    fn on_recovery(&self, breaker: &str, duration: Duration) {
        self.recovery_time.with_label_values(&[breaker]).observe(duration.as_secs_f64());
    }
}

/// Render every metric in `registry` in the Prometheus text format
pub fn render_text(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|error| prometheus::Error::Msg(error.to_string()))
}
