//! Configuration for the job scheduler and workers.

use crate::utils::get_env_with_prefix;
use serde::{Deserialize, Serialize};

/// Configuration for background notification jobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Number of worker tasks to spawn.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Attempt budget for retryable notification jobs.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry backoff in seconds, doubled per failed attempt.
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: u64,

    /// Ceiling on a single backoff step, in seconds.
    #[serde(default = "default_max_backoff_seconds")]
    pub max_backoff_seconds: u64,

    /// How long a claimed job may run before it is presumed lost.
    #[serde(default = "default_stall_timeout_seconds")]
    pub stall_timeout_seconds: u64,

    /// How long an idle worker sleeps between polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            max_attempts: default_max_attempts(),
            retry_backoff_seconds: default_retry_backoff_seconds(),
            max_backoff_seconds: default_max_backoff_seconds(),
            stall_timeout_seconds: default_stall_timeout_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl JobsConfig {
    /// Load jobs configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(count) = get_env_with_prefix("JOBS_WORKER_COUNT") {
            if let Ok(c) = count.parse() {
                config.worker_count = c;
            }
        }

        if let Some(attempts) = get_env_with_prefix("JOBS_MAX_ATTEMPTS") {
            if let Ok(a) = attempts.parse() {
                config.max_attempts = a;
            }
        }

        if let Some(backoff) = get_env_with_prefix("JOBS_RETRY_BACKOFF_SECONDS") {
            if let Ok(b) = backoff.parse() {
                config.retry_backoff_seconds = b;
            }
        }

        if let Some(max) = get_env_with_prefix("JOBS_MAX_BACKOFF_SECONDS") {
            if let Ok(m) = max.parse() {
                config.max_backoff_seconds = m;
            }
        }

        if let Some(timeout) = get_env_with_prefix("JOBS_STALL_TIMEOUT_SECONDS") {
            if let Ok(t) = timeout.parse() {
                config.stall_timeout_seconds = t;
            }
        }

        if let Some(interval) = get_env_with_prefix("JOBS_POLL_INTERVAL_MS") {
            if let Ok(i) = interval.parse() {
                config.poll_interval_ms = i;
            }
        }

        config
    }
}

fn default_worker_count() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_seconds() -> u64 {
    60
}

fn default_max_backoff_seconds() -> u64 {
    3600
}

fn default_stall_timeout_seconds() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    100
}
