//! Pledgewave - subscription billing with delayed notification scheduling
//!
//! Pledgewave handles recurring-donation billing for funding platforms:
//! donors subscribe to funding plans, charges are authorized through a
//! pluggable payment gateway, and confirmation/reminder emails flow
//! through a delayed job scheduler with retries and backoff.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pledgewave::billing::{
//!     BillingOrchestrator, InMemoryPlanStore, InMemorySubscriptionStore, PlanFundingTracker,
//!     SubscriptionManager,
//! };
//! use pledgewave::clock::SystemClock;
//! use pledgewave::email::ConsoleMailer;
//! use pledgewave::gateway::SimulatedGateway;
//! use pledgewave::jobs::{JobRegistry, JobScheduler, JobStats, WorkerPool};
//! use pledgewave::notify::NotificationDispatcher;
//! use pledgewave::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     pledgewave::init_tracing();
//!     let config = Config::from_env();
//!
//!     let clock = Arc::new(SystemClock);
//!     let stats = Arc::new(JobStats::new());
//!     let scheduler = Arc::new(JobScheduler::new(clock.clone()).with_observer(stats.clone()));
//!
//!     let registry = Arc::new(JobRegistry::new());
//!     let mailer = Arc::new(ConsoleMailer::new());
//!     let dispatcher = Arc::new(NotificationDispatcher::new(mailer, config.email.from.clone()));
//!     dispatcher.register(&registry).await;
//!
//!     let manager = SubscriptionManager::new(
//!         InMemorySubscriptionStore::new(),
//!         SimulatedGateway::new(),
//!         PlanFundingTracker::new(InMemoryPlanStore::new()),
//!         clock.clone(),
//!     );
//!     let orchestrator = BillingOrchestrator::new(
//!         manager,
//!         scheduler.clone(),
//!         stats,
//!         clock,
//!         config.jobs.max_attempts,
//!     );
//!
//!     let pool = WorkerPool::new(
//!         scheduler,
//!         registry,
//!         config.jobs.worker_count,
//!         std::time::Duration::from_millis(config.jobs.poll_interval_ms),
//!     );
//!
//!     // ... create subscriptions through the orchestrator
//!     let _ = orchestrator;
//!     pool.shutdown().await;
//! }
//! ```

pub mod billing;
pub mod clock;
mod config;
mod error;
pub mod email;
pub mod gateway;
pub mod jobs;
pub mod notify;
pub mod utils;

pub use config::{Config, EmailConfig, GatewayConfig, LoggingConfig};
pub use error::{PledgewaveError, Result};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults.
///
/// Call early, before building the scheduler or workers.
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directive (e.g. "info", "pledgewave=debug")
/// - `PLEDGEWAVE_LOG_JSON`: set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("PLEDGEWAVE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing from a loaded [`Config`].
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
