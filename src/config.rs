//! Top-level configuration.
//!
//! Every value has a working default; `from_env` overrides from
//! `PLEDGEWAVE_`-prefixed (or bare) environment variables.

use crate::gateway::DEFAULT_SUCCESS_RATE;
use crate::jobs::JobsConfig;
use crate::utils::get_env_with_prefix;
use serde::{Deserialize, Serialize};

/// Configuration for the simulated payment gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Probability in [0, 1] that an authorization is approved.
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,

    /// Simulated processing latency in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            success_rate: default_success_rate(),
            latency_ms: default_latency_ms(),
        }
    }
}

/// Configuration for outgoing email.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    /// Sender address stamped on every notification.
    #[serde(default = "default_email_from")]
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: default_email_from(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "pledgewave=debug".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted log lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self {
            jobs: JobsConfig::from_env(),
            ..Self::default()
        };

        if let Some(rate) = get_env_with_prefix("GATEWAY_SUCCESS_RATE") {
            if let Ok(r) = rate.parse::<f64>() {
                config.gateway.success_rate = r.clamp(0.0, 1.0);
            }
        }

        if let Some(latency) = get_env_with_prefix("GATEWAY_LATENCY_MS") {
            if let Ok(l) = latency.parse() {
                config.gateway.latency_ms = l;
            }
        }

        if let Some(from) = get_env_with_prefix("EMAIL_FROM") {
            config.email.from = from;
        }

        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            config.logging.json = json.parse().unwrap_or(false);
        }

        config
    }
}

fn default_success_rate() -> f64 {
    DEFAULT_SUCCESS_RATE
}

fn default_latency_ms() -> u64 {
    250
}

fn default_email_from() -> String {
    "billing@pledgewave.example".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
