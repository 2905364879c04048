//! Breaker registry construction from configuration

use std::sync::Arc;

use homevoice_common::resilience::{
    BreakerObserver, BreakerRegistry, CircuitBreakerConfig, ConfigError,
};
use homevoice_domain::constants::MESSAGING_BREAKERS;
use homevoice_domain::{BreakerSettings, BreakersConfig, HomeVoiceError, Result};
use tracing::warn;

/// Translate one configured breaker section into a validated config
///
/// # Errors
/// Returns `HomeVoiceError::Config` if the settings are inconsistent.
pub fn breaker_config(settings: &BreakerSettings) -> Result<CircuitBreakerConfig> {
    CircuitBreakerConfig::builder()
        .open_timeout(settings.open_timeout())
        .success_threshold(settings.success_threshold)
        .max_retries(settings.max_retries)
        .max_elapsed(settings.max_elapsed())
        .backoff(settings.initial_backoff(), settings.max_backoff())
        .build()
        .map_err(config_error)
}

/// Build the breaker registry described by `config`, reporting to `observer`
///
/// # Errors
/// Returns `HomeVoiceError::Config` if the defaults or any override are
/// invalid.
pub fn registry_from_config(
    config: &BreakersConfig,
    observer: Arc<dyn BreakerObserver>,
) -> Result<BreakerRegistry> {
    let mut registry = BreakerRegistry::new(breaker_config(&config.defaults)?)
        .map_err(config_error)?
        .with_observer(observer);
    for name in config.overrides.keys() {
        if !MESSAGING_BREAKERS.contains(&name.as_str()) {
            warn!(breaker = %name, "override configured for a breaker no client uses");
        }
        let settings = config.settings_for(name);
        registry = registry
            .with_override(name.as_str(), breaker_config(&settings)?)
            .map_err(config_error)?;
    }
    Ok(registry)
}

fn config_error(error: ConfigError) -> HomeVoiceError {
    HomeVoiceError::Config(error.to_string())
}
