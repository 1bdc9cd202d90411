//! Client configuration.

use std::time::Duration;

/// Default game server API root.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Backoff policy for the status poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Poll interval while the server is reachable.
    pub base_interval: Duration,
    /// Ceiling for the backed-off interval.
    pub max_interval: Duration,
    /// Consecutive failures before the interval starts doubling.
    pub error_threshold: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(1_000),
            max_interval: Duration::from_millis(10_000),
            error_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Upper bound on any single HTTP request (native only).
    pub request_timeout: Duration,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            poll: PollConfig::default(),
        }
    }
}
