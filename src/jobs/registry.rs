//! Registry mapping job kinds to handler functions.

use crate::error::{PledgewaveError, Result};
use crate::jobs::job::{JobData, JobKind};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// Handler for one job kind. Receives the full [`JobData`] and is
/// responsible for deserializing the payload.
type JobHandler = Arc<dyn Fn(JobData) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Maps job kinds to their handlers.
///
/// Thread-safe and cheap to clone; share one registry across workers.
#[derive(Clone, Default)]
pub struct JobRegistry {
    handlers: Arc<tokio::sync::RwLock<HashMap<JobKind, JobHandler>>>,
}

impl JobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a job kind, replacing any existing one.
    pub async fn register<F>(&self, kind: JobKind, handler: F)
    where
        F: Fn(JobData) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        let handler: JobHandler = Arc::new(handler);
        let mut handlers = self.handlers.write().await;
        handlers.insert(kind, handler);
    }

    /// Execute a job through its registered handler.
    ///
    /// Errors if the kind has no handler.
    pub async fn execute(&self, data: JobData) -> Result<()> {
        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&data.kind).cloned().ok_or_else(|| {
                PledgewaveError::internal(format!(
                    "No handler registered for job kind: {}",
                    data.kind
                ))
            })?
        };

        handler(data).await
    }

    pub async fn is_registered(&self, kind: JobKind) -> bool {
        let handlers = self.handlers.read().await;
        handlers.contains_key(&kind)
    }

    /// All kinds with a registered handler.
    pub async fn registered_kinds(&self) -> Vec<JobKind> {
        let handlers = self.handlers.read().await;
        handlers.keys().copied().collect()
    }
}
