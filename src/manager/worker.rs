//! Worker loop - consumes the job channel and spawns one detached job per task.

use tokio::sync::mpsc;

use super::{Job, TaskManager};

/// Error recorded on tasks still queued when the worker stops
pub(crate) const SHUTDOWN_MESSAGE: &str = "acquisition cancelled by service shutdown";

impl TaskManager {
    /// Start the worker loop
    ///
    /// The loop runs until shutdown and, for each received job:
    /// 1. Acquires a permit when `tasks.max_concurrent_jobs` is set
    /// 2. Spawns the job on the manager's task tracker
    ///
    /// Jobs are not ordered relative to each other. Jobs still queued when shutdown starts
    /// are failed rather than started.
    pub(crate) fn start_worker(&self, mut job_rx: mpsc::UnboundedReceiver<Job>) {
        let manager = self.clone();
        let shutdown = self.queue_state.shutdown.clone();

        self.queue_state.tracker.spawn(async move {
            loop {
                let job = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    job = job_rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };

                let permit = match &manager.queue_state.concurrent_limit {
                    Some(limit) => tokio::select! {
                        _ = shutdown.cancelled() => {
                            manager.fail_job(&job, SHUTDOWN_MESSAGE).await;
                            break;
                        }
                        permit = limit.clone().acquire_owned() => permit.ok(),
                    },
                    None => None,
                };

                tracing::debug!(task_id = job.task_id.0, "Dispatching acquisition job");

                let job_manager = manager.clone();
                manager.queue_state.tracker.spawn(async move {
                    let _permit = permit;
                    job_manager.execute_job(job).await;
                });
            }

            // No more jobs will be started; fail whatever is still queued
            job_rx.close();
            let mut dropped = 0usize;
            while let Ok(job) = job_rx.try_recv() {
                manager.fail_job(&job, SHUTDOWN_MESSAGE).await;
                dropped += 1;
            }

            tracing::info!(dropped, "Worker loop stopped");
        });
    }
}
