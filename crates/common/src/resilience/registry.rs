//! Registry of named circuit breakers
//!
//! One registry is built at startup and injected wherever breakers are
//! needed; there is no process-wide singleton. Breakers are created lazily
//! on first lookup, from the default configuration or a per-name override,
//! and share the registry's observer and clock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics};
use super::clock::{Clock, SystemClock};
use super::error::ConfigResult;
use super::observer::{BreakerObserver, NoOpObserver};

/// Get-or-create store of circuit breakers keyed by name
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
    overrides: HashMap<String, CircuitBreakerConfig>,
    observer: Arc<dyn BreakerObserver>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for BreakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerRegistry")
            .field("breakers", &self.names())
            .field("default_config", &self.default_config)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self {
            breakers: DashMap::new(),
            default_config: CircuitBreakerConfig::default(),
            overrides: HashMap::new(),
            observer: Arc::new(NoOpObserver),
            clock: Arc::new(SystemClock),
        }
    }
}

impl BreakerRegistry {
    /// Create a registry whose breakers default to `default_config`
    pub fn new(default_config: CircuitBreakerConfig) -> ConfigResult<Self> {
        default_config.validate()?;
        Ok(Self { default_config, ..Self::default() })
    }

    /// Use `config` for the breaker called `name` instead of the default
    pub fn with_override(
        mut self,
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> ConfigResult<Self> {
        config.validate()?;
        self.overrides.insert(name.into(), config);
        Ok(self)
    }

    /// Observer handed to every breaker created from now on
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BreakerObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Clock handed to every breaker created from now on
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Configuration a breaker named `name` is (or would be) built with
    pub fn config_for(&self, name: &str) -> &CircuitBreakerConfig {
        self.overrides.get(name).unwrap_or(&self.default_config)
    }

    /// Return the breaker called `name`, creating it on first use
    pub fn get_or_create(&self, name: &str) -> ConfigResult<Arc<CircuitBreaker>> {
        if let Some(breaker) = self.breakers.get(name) {
            return Ok(Arc::clone(breaker.value()));
        }

        // Double-check under the shard lock; another task may have won.
        match self.breakers.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let breaker = CircuitBreaker::with_shared_clock(
                    name,
                    self.config_for(name).clone(),
                    Arc::clone(&self.clock),
                )?
                .with_observer(Arc::clone(&self.observer));
                let breaker = Arc::clone(entry.insert(Arc::new(breaker)).value());
                info!(breaker = name, "created circuit breaker");
                Ok(breaker)
            }
        }
    }

    /// Existing breaker called `name`, without creating one
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|breaker| Arc::clone(breaker.value()))
    }

    /// Names of all created breakers, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.breakers.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Metrics for every created breaker, sorted by name
    pub fn snapshot(&self) -> Vec<CircuitBreakerMetrics> {
        let mut metrics: Vec<CircuitBreakerMetrics> =
            self.breakers.iter().map(|entry| entry.value().metrics()).collect();
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        metrics
    }

    /// Force every breaker closed
    pub fn reset_all(&self) {
        for breaker in self.all() {
            breaker.reset();
        }
        info!(count = self.breakers.len(), "reset all circuit breakers");
    }

    /// Force every breaker open (emergency stop)
    pub fn force_open_all(&self) {
        warn!(count = self.breakers.len(), "forcing all circuit breakers open");
        for breaker in self.all() {
            breaker.force_open();
        }
    }

    /// Drop the breaker called `name`; the next lookup creates a fresh one
    pub fn remove(&self, name: &str) -> bool {
        self.breakers.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    // Collected first so no shard lock is held while observers run.
    fn all(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}
