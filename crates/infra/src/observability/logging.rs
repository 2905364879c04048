//! Tracing subscriber initialisation
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` built from
//! [`LoggingConfig::level`] and a human-readable or JSON `fmt` layer.
//! Initialisation happens at most once per process; later calls are no-ops.

use std::io::IsTerminal;
use std::sync::OnceLock;

use homevoice_domain::{HomeVoiceError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global tracing subscriber described by `config`
///
/// Returns `Ok(false)` when a subscriber was already installed, by this
/// function or by someone else.
///
/// # Errors
/// Returns `HomeVoiceError::Config` if `config.level` is not a valid
/// `EnvFilter` directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(&config.level)?;
    if TRACING_INITIALIZED.get().is_some() {
        return Ok(false);
    }

    let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
        fmt::layer().json().with_target(true).with_current_span(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_ansi(std::io::stdout().is_terminal())
            .boxed()
    };

    let installed =
        tracing_subscriber::registry().with(layer.with_filter(filter)).try_init().is_ok();
    TRACING_INITIALIZED.get_or_init(|| ());

    if installed {
        tracing::info!(level = %config.level, json = config.json, "logging initialized");
    } else {
        tracing::debug!("global tracing subscriber already initialized");
    }
    Ok(installed)
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| HomeVoiceError::Config(format!("Invalid log level '{}': {}", level, e)))
}
