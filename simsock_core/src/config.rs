use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_LISTEN_BACKLOG: i32 = 5;

/// Runtime knobs for one endpoint.
///
/// The defaults reproduce the plain blocking behavior: retry once per second,
/// forever, with no I/O timeout.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct EndpointConfig {
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// `None` keeps reconnecting until a peer shows up.
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub io_timeout_ms: Option<u64>,
    #[serde(default = "default_listen_backlog")]
    pub listen_backlog: i32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            max_retries: None,
            io_timeout_ms: None,
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
        }
    }
}

impl EndpointConfig {
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        // a zero timeout is rejected by the OS setters, treat it as "none"
        self.io_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

fn default_retry_interval_ms() -> u64 {
    DEFAULT_RETRY_INTERVAL_MS
}

fn default_listen_backlog() -> i32 {
    DEFAULT_LISTEN_BACKLOG
}
