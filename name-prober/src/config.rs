use std::time::Duration;
use serde::Deserialize;
use shared::protocol::{
    CONFLICT_BACKOFF_MS, FIRST_QUERY_DELAY_MS, INITIAL_DELAY_MAX_MS, MAX_PROBE_ATTEMPTS,
    PROBE_TIMEOUT_SECS, QUERIES_PER_ROUND, QUERY_INTERVAL_MS,
};

/// Timing and limits of a probing session
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_first_query_delay")]
    pub first_query_delay_ms: u64,
    #[serde(default = "default_query_interval")]
    pub query_interval_ms: u64,
    #[serde(default = "default_queries_per_round")]
    pub queries_per_round: u32,
    /// Wait after an attempt that left an unhandled conflict
    #[serde(default = "default_conflict_backoff")]
    pub conflict_backoff_ms: u64,
    /// Wait after an attempt whose conflicts were all handled by renaming
    #[serde(default = "default_query_interval")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_initial_delay_max")]
    pub initial_delay_max_ms: u64,
}

fn default_timeout() -> u64 {
    PROBE_TIMEOUT_SECS
}

fn default_max_attempts() -> u32 {
    MAX_PROBE_ATTEMPTS
}

fn default_first_query_delay() -> u64 {
    FIRST_QUERY_DELAY_MS
}

fn default_query_interval() -> u64 {
    QUERY_INTERVAL_MS
}

fn default_queries_per_round() -> u32 {
    QUERIES_PER_ROUND
}

fn default_conflict_backoff() -> u64 {
    CONFLICT_BACKOFF_MS
}

fn default_initial_delay_max() -> u64 {
    INITIAL_DELAY_MAX_MS
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            first_query_delay_ms: default_first_query_delay(),
            query_interval_ms: default_query_interval(),
            queries_per_round: default_queries_per_round(),
            conflict_backoff_ms: default_conflict_backoff(),
            retry_delay_ms: default_query_interval(),
            initial_delay_max_ms: default_initial_delay_max(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn first_query_delay(&self) -> Duration {
        Duration::from_millis(self.first_query_delay_ms)
    }

    pub fn query_interval(&self) -> Duration {
        Duration::from_millis(self.query_interval_ms)
    }

    pub fn conflict_backoff(&self) -> Duration {
        Duration::from_millis(self.conflict_backoff_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
