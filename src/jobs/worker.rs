//! Workers that drive the scheduler.
//!
//! Workers poll the scheduler for due jobs and execute them through the
//! registry, reporting completion or failure back so retry bookkeeping
//! stays with the scheduler.

use crate::jobs::registry::JobRegistry;
use crate::jobs::scheduler::JobScheduler;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// A single worker that processes jobs from the scheduler.
pub struct JobWorker {
    scheduler: Arc<JobScheduler>,
    registry: Arc<JobRegistry>,
    worker_id: String,
    poll_interval: Duration,
    shutdown_tx: mpsc::Sender<()>,
}

impl JobWorker {
    pub fn new(
        scheduler: Arc<JobScheduler>,
        registry: Arc<JobRegistry>,
        worker_id: String,
        poll_interval: Duration,
    ) -> (Self, mpsc::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (
            Self {
                scheduler,
                registry,
                worker_id,
                poll_interval,
                shutdown_tx,
            },
            shutdown_rx,
        )
    }

    /// Run until a shutdown signal arrives.
    pub async fn start(self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(worker_id = %self.worker_id, "Job worker started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!(worker_id = %self.worker_id, "Shutdown signal received, finishing current job");
                    break;
                }
                result = self.process_next_job() => {
                    match result {
                        Ok(true) => {
                            // Processed a job, poll again immediately
                        }
                        Ok(false) => {
                            tokio::select! {
                                _ = shutdown_rx.recv() => break,
                                _ = sleep(self.poll_interval) => {},
                            }
                        }
                        Err(e) => {
                            tracing::error!(worker_id = %self.worker_id, error = %e, "Error processing job");
                            tokio::select! {
                                _ = shutdown_rx.recv() => break,
                                _ = sleep(Duration::from_secs(1)) => {},
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(worker_id = %self.worker_id, "Job worker stopped");
    }

    /// Claim and execute one due job. Returns `Ok(false)` when nothing
    /// was due.
    async fn process_next_job(&self) -> crate::error::Result<bool> {
        self.scheduler.reap_stalled().await?;

        let job = match self.scheduler.claim_due().await? {
            Some(job) => job,
            None => return Ok(false),
        };

        let job_id = job.id.clone();
        tracing::debug!(
            worker_id = %self.worker_id,
            job_id = %job_id,
            kind = %job.kind,
            attempt = job.attempts_made,
            "Processing job"
        );

        match self.registry.execute(job).await {
            Ok(()) => {
                self.scheduler.complete(&job_id).await?;
            }
            Err(e) => {
                // Retry bookkeeping happens in the scheduler
                self.scheduler.fail(&job_id, &e.to_string()).await?;
            }
        }
        Ok(true)
    }

    /// Request shutdown of this worker.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Pool of workers processing jobs concurrently.
pub struct WorkerPool {
    workers: Vec<tokio::task::JoinHandle<()>>,
    shutdown_txs: Vec<mpsc::Sender<()>>,
}

impl WorkerPool {
    pub fn new(
        scheduler: Arc<JobScheduler>,
        registry: Arc<JobRegistry>,
        worker_count: usize,
        poll_interval: Duration,
    ) -> Self {
        let mut workers = Vec::new();
        let mut shutdown_txs = Vec::new();

        for i in 0..worker_count {
            let worker_id = format!("worker-{}", i);
            let (worker, shutdown_rx) = JobWorker::new(
                scheduler.clone(),
                registry.clone(),
                worker_id,
                poll_interval,
            );
            let shutdown_tx = worker.shutdown_tx.clone();

            let handle = tokio::spawn(async move {
                worker.start(shutdown_rx).await;
            });

            workers.push(handle);
            shutdown_txs.push(shutdown_tx);
        }

        Self {
            workers,
            shutdown_txs,
        }
    }

    /// Signal every worker and wait for each to finish its current job.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down worker pool");

        for shutdown_tx in self.shutdown_txs {
            let _ = shutdown_tx.send(()).await;
        }

        for worker in self.workers {
            let _ = worker.await;
        }

        tracing::info!("Worker pool shut down");
    }
}
