//! Breaker telemetry wiring
//!
//! Bundles a Prometheus registry with the observer handed to every circuit
//! breaker: transitions are logged through `tracing` and exported as
//! Prometheus series.

use std::sync::Arc;

use homevoice_common::resilience::{
    render_text, BreakerObserver, CompositeObserver, PrometheusBreakerObserver, TracingObserver,
};
use homevoice_domain::{HomeVoiceError, Result};
use prometheus::Registry;

/// Prometheus registry plus the observer that feeds it
pub struct BreakerTelemetry {
    registry: Registry,
    observer: Arc<dyn BreakerObserver>,
}

impl BreakerTelemetry {
    /// Register breaker metrics in a fresh registry
    ///
    /// # Errors
    /// Returns `HomeVoiceError::Internal` if metric registration fails.
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Register breaker metrics in `registry`
    ///
    /// # Errors
    /// Returns `HomeVoiceError::Internal` if the metrics are already
    /// registered there.
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let prometheus = PrometheusBreakerObserver::new(&registry).map_err(|e| {
            HomeVoiceError::Internal(format!("Failed to register breaker metrics: {}", e))
        })?;
        let observer =
            CompositeObserver::default().with(Arc::new(TracingObserver)).with(Arc::new(prometheus));
        Ok(Self { registry, observer: Arc::new(observer) })
    }

    /// Observer to install on the breaker registry
    pub fn observer(&self) -> Arc<dyn BreakerObserver> {
        Arc::clone(&self.observer)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered metric
    ///
    /// # Errors
    /// Returns `HomeVoiceError::Internal` if encoding fails.
    pub fn render(&self) -> Result<String> {
        render_text(&self.registry)
            .map_err(|e| HomeVoiceError::Internal(format!("Failed to encode metrics: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use homevoice_common::resilience::CircuitState;

    use super::*;

    #[test]
    fn test_observer_feeds_registry() {
        let telemetry = BreakerTelemetry::new().expect("register metrics");

        telemetry.observer().on_state_change("publish", CircuitState::Closed, CircuitState::Open);

        let text = telemetry.render().expect("render metrics");
        assert!(text.contains("circuit_breaker_state{breaker_name=\"publish\"} 1"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        BreakerTelemetry::with_registry(registry.clone()).expect("first registration");

        let second = BreakerTelemetry::with_registry(registry);
        assert!(matches!(second, Err(HomeVoiceError::Internal(_))));
    }
}
