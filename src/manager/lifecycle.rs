//! Startup reconciliation, staleness sweeper and shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::db::TaskRow;
use crate::error::Result;
use crate::types::Event;

use super::TaskManager;

/// Error recorded on tasks left unfinished by a previous session
pub const RESTART_MESSAGE: &str = "acquisition interrupted by service restart";

/// Error recorded on tasks failed by the staleness sweeper
pub const STALE_MESSAGE: &str = "acquisition timed out (stale task)";

/// Upper bound on waiting for in-flight jobs during shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl TaskManager {
    /// Fail every task that has not reached a terminal state
    ///
    /// The job queue lives in memory, so after a restart nothing can still be working on
    /// such a task.
    pub(crate) async fn reconcile_unfinished(&self) -> Result<usize> {
        let rows = self.db.list_unfinished_tasks().await?;
        let count = self.fail_rows(rows, RESTART_MESSAGE).await;

        if count > 0 {
            tracing::warn!(count, "Failed tasks interrupted by the previous session");
        }
        Ok(count)
    }

    /// Fail non-terminal tasks older than `tasks.stale_after`
    ///
    /// Age is measured from the start time, or the creation time for tasks that never
    /// started. Returns the number of tasks failed.
    pub async fn sweep_stale_tasks(&self) -> Result<usize> {
        let stale_after =
            i64::try_from(self.config.tasks.stale_after.as_secs()).unwrap_or(i64::MAX);
        let cutoff = chrono::Utc::now().timestamp().saturating_sub(stale_after);

        let rows = self.db.list_stale_tasks(cutoff).await?;
        let count = self.fail_rows(rows, STALE_MESSAGE).await;

        if count > 0 {
            tracing::warn!(count, "Failed stale tasks");
        }
        Ok(count)
    }

    /// Start the staleness sweeper (runs every `tasks.sweep_interval` until shutdown)
    pub(crate) fn start_sweeper(&self) {
        let manager = self.clone();
        let shutdown = self.queue_state.shutdown.clone();
        let period = self.config.tasks.sweep_interval;

        self.queue_state.tracker.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; startup already reconciled
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = manager.sweep_stale_tasks().await {
                            tracing::error!(error = %e, "Stale task sweep failed");
                        }
                    }
                }
            }

            tracing::debug!("Stale task sweeper stopped");
        });
    }

    async fn fail_rows(&self, rows: Vec<TaskRow>, message: &str) -> usize {
        let mut failed = 0;
        for row in rows {
            // Conditional update: a task finishing concurrently is left alone
            match self.db.fail_task(row.id, message).await {
                Ok(()) => {
                    tracing::debug!(task_id = row.id.0, message, "Task failed");
                    self.emit_event(Event::Failed {
                        task_id: row.id,
                        user_id: row.user_id,
                        error: message.to_string(),
                    });
                    failed += 1;
                }
                Err(e) => {
                    tracing::debug!(task_id = row.id.0, error = %e, "Task already terminal");
                }
            }
        }
        failed
    }

    /// Gracefully shut down the manager
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Stops the worker loop (queued jobs that never started are failed) and the sweeper
    /// 3. Waits for in-flight jobs with a timeout (30 seconds)
    /// 4. Marks a clean shutdown in the database
    ///
    /// Jobs still running after the timeout are left to finish on their own; their tasks
    /// are reconciled on the next startup if the process exits first.
    ///
    /// # Errors
    ///
    /// Never fails today; database errors while marking the clean shutdown are logged.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new submissions
        self.queue_state.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new submissions");

        // 2. Stop the worker loop and the sweeper
        self.queue_state.shutdown.cancel();
        self.queue_state.tracker.close();

        // 3. Wait for in-flight jobs with timeout
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.queue_state.tracker.wait()).await {
            Ok(()) => {
                tracing::info!("All in-flight jobs finished");
            }
            Err(_) => {
                tracing::warn!(
                    remaining = self.queue_state.tracker.len(),
                    "Timeout waiting for in-flight jobs, proceeding with shutdown"
                );
            }
        }

        // 4. Mark clean shutdown in database
        if let Err(e) = self.db.set_clean_shutdown().await {
            tracing::error!(error = %e, "Failed to mark clean shutdown in database");
        } else {
            tracing::info!("Marked clean shutdown in database");
        }

        // 5. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
