//! Configuration loader
//!
//! Loads application configuration from a file, then layers environment
//! variable overrides on top.
//!
//! ## Loading Strategy
//! 1. Probes multiple paths for a config file (defaults if none is found)
//! 2. Supports JSON and TOML formats
//! 3. Applies `HOMEVOICE_*` environment overrides
//! 4. Validates the result
//!
//! ## Environment Variables
//! - `HOMEVOICE_HUB_HOST`: Hub host name
//! - `HOMEVOICE_HUB_PORT`: Hub port
//! - `HOMEVOICE_HUB_CLIENT_ID`: Client id presented to the hub
//! - `HOMEVOICE_HUB_TOPIC_PREFIX`: Prefix for device topics
//! - `HOMEVOICE_HUB_AUTO_RECONNECT`: Connect on demand (true/false)
//! - `HOMEVOICE_ALWAYS_CONFIRM`: Require confirmation for every action
//! - `HOMEVOICE_MAX_CONCURRENCY`: Actions in flight per batch
//! - `HOMEVOICE_DEADLINE_MS`: Batch deadline in milliseconds
//! - `HOMEVOICE_LOG_LEVEL`: `EnvFilter` directive
//! - `HOMEVOICE_LOG_JSON`: JSON log output (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./homevoice.json` or `./homevoice.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use homevoice_domain::constants::ENV_PREFIX;
use homevoice_domain::{AssistantConfig, HomeVoiceError, Result};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["config.json", "config.toml", "homevoice.json", "homevoice.toml"];

/// Load configuration: probed file (or defaults), then environment overrides
///
/// # Errors
/// Returns `HomeVoiceError::Config` if:
/// - A config file was found but cannot be read or parsed
/// - An environment override has an invalid value
/// - The resulting configuration fails validation
pub fn load() -> Result<AssistantConfig> {
    let mut config = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::info!("No config file found, using defaults");
            AssistantConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `HomeVoiceError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or the configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<AssistantConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(HomeVoiceError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            HomeVoiceError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| HomeVoiceError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AssistantConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| HomeVoiceError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| HomeVoiceError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(HomeVoiceError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Apply `HOMEVOICE_*` environment variables on top of `config`
///
/// Unset variables leave the corresponding field untouched.
///
/// # Errors
/// Returns `HomeVoiceError::Config` if a variable is set to an unparsable
/// value.
pub fn apply_env_overrides(config: &mut AssistantConfig) -> Result<()> {
    if let Some(host) = env_string("HUB_HOST") {
        config.hub.host = host;
    }
    if let Some(port) = env_parse("HUB_PORT")? {
        config.hub.port = port;
    }
    if let Some(client_id) = env_string("HUB_CLIENT_ID") {
        config.hub.client_id = client_id;
    }
    if let Some(prefix) = env_string("HUB_TOPIC_PREFIX") {
        config.hub.topic_prefix = prefix;
    }
    config.hub.auto_reconnect = env_bool("HUB_AUTO_RECONNECT", config.hub.auto_reconnect);
    config.approval.always_require_confirmation =
        env_bool("ALWAYS_CONFIRM", config.approval.always_require_confirmation);
    if let Some(max_concurrency) = env_parse("MAX_CONCURRENCY")? {
        config.execution.max_concurrency = max_concurrency;
    }
    if let Some(deadline_ms) = env_parse("DEADLINE_MS")? {
        config.execution.deadline_ms = Some(deadline_ms);
    }
    if let Some(level) = env_string("LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("LOG_JSON", config.logging.json);
    Ok(())
}

fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

fn env_string(suffix: &str) -> Option<String> {
    std::env::var(env_key(suffix)).ok().filter(|value| !value.is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `HomeVoiceError::Config` if the variable is set but invalid.
fn env_parse<T>(suffix: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(suffix)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| {
                HomeVoiceError::Config(format!("Invalid value for {}: {}", env_key(suffix), e))
            })
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(suffix: &str, default: bool) -> bool {
    env_string(suffix)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
