//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Breaker names, one per messaging category
pub const BREAKER_PUBLISH: &str = "publish";
pub const BREAKER_SUBSCRIBE: &str = "subscribe";
pub const BREAKER_QUERY_STATUS: &str = "query_status";
pub const MESSAGING_BREAKERS: [&str; 3] =
    [BREAKER_PUBLISH, BREAKER_SUBSCRIBE, BREAKER_QUERY_STATUS];

// Hub connection defaults
pub const DEFAULT_HUB_HOST: &str = "localhost";
pub const DEFAULT_HUB_PORT: u16 = 1883;
pub const DEFAULT_KEEPALIVE_SECS: u64 = 60;
pub const DEFAULT_CLIENT_ID: &str = "homevoice";
pub const DEFAULT_TOPIC_PREFIX: &str = "homey/";

// Command topic layout: {prefix}{device}/{capability}/set and {prefix}{device}/status
pub const COMMAND_TOPIC_SUFFIX: &str = "set";
pub const STATUS_TOPIC_SUFFIX: &str = "status";

// Circuit breaker defaults
pub const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_ELAPSED_MS: u64 = 2_000;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 1_000;

// Executor defaults
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

// Per-action failure messages
pub const MISSING_PARAMETERS_MESSAGE: &str = "missing required parameters";
pub const DEADLINE_EXCEEDED_MESSAGE: &str = "batch deadline exceeded";

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const ENV_PREFIX: &str = "HOMEVOICE_";
