//! Background job scheduling for delayed notifications.
//!
//! The [`JobScheduler`] holds delayed jobs until they are due; a
//! [`WorkerPool`] claims due jobs and runs them through the handlers in
//! a [`JobRegistry`]. Observers receive every lifecycle transition, with
//! [`JobStats`] keeping the total/completed/failed counters.

pub mod config;
pub mod job;
pub mod registry;
pub mod scheduler;
pub mod stats;
pub mod worker;

pub use config::JobsConfig;
pub use job::{JobData, JobKind, JobStatus, NotificationPayload};
pub use registry::JobRegistry;
pub use scheduler::{FailDisposition, JobScheduler};
pub use stats::{JobEvent, JobObserver, JobStats, JobStatsSnapshot, TracingObserver};
pub use worker::{JobWorker, WorkerPool};
