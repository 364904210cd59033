//! Submission - validation, task creation and enqueueing.

use std::sync::atomic::Ordering;

use crate::db::NewTask;
use crate::error::{Error, Result};
use crate::platform;
use crate::types::{
    Caller, Event, SourcePlatform, SubmitReceipt, TASK_TYPE_DOWNLOAD, TaskId, TaskStatus, UserId,
};

use super::fixtures;
use super::{Job, TaskManager};

impl TaskManager {
    /// Submit a source URL for acquisition
    ///
    /// The URL is classified before anything is written; unrecognized or empty URLs are
    /// rejected with [`Error::Validation`] and create no task. Exactly one task row is
    /// created per successful call.
    ///
    /// Regular submissions return immediately with the task in `PENDING`; the acquisition
    /// runs in the background. `test://` URLs, and Jamendo URLs from test-mode callers,
    /// are resolved synchronously with a fixture song and return `COMPLETED`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has started
    /// - [`Error::Validation`] for empty or unsupported URLs
    /// - [`Error::NotFound`] when the caller has no user record
    pub async fn submit(&self, caller: &Caller, url: &str) -> Result<SubmitReceipt> {
        if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let platform = platform::require_platform(url)?;
        let url = url.trim();
        let user_id = self.resolve_user(caller).await?;

        let task_id = self
            .db
            .insert_task(&NewTask {
                user_id,
                task_type: TASK_TYPE_DOWNLOAD.to_string(),
                source_url: url.to_string(),
                source_type: platform,
            })
            .await?;

        tracing::info!(
            task_id = task_id.0,
            user_id = user_id.0,
            platform = %platform,
            "Task created"
        );

        if fixtures::is_fixture(platform, caller.test_mode) {
            return self.complete_with_fixture(task_id, user_id, url, platform).await;
        }

        self.emit_event(Event::Queued {
            task_id,
            user_id,
            platform,
        });

        let job = Job {
            task_id,
            user_id,
            source_url: url.to_string(),
            platform,
        };

        if let Err(rejected) = self.queue_state.job_tx.send(job) {
            // The worker loop has stopped; shutdown raced with this submission
            self.fail_job(&rejected.0, super::worker::SHUTDOWN_MESSAGE)
                .await;
            return Err(Error::ShuttingDown);
        }

        Ok(SubmitReceipt {
            task_id,
            status: TaskStatus::Pending,
            message: "download task created".to_string(),
            song_id: None,
        })
    }

    /// Drive a fresh task through PROCESSING to COMPLETED with a fixture song
    async fn complete_with_fixture(
        &self,
        task_id: TaskId,
        user_id: UserId,
        url: &str,
        platform: SourcePlatform,
    ) -> Result<SubmitReceipt> {
        self.db.mark_task_processing(task_id).await?;

        let song = fixtures::fixture_song(url, platform, chrono::Utc::now().timestamp_millis());
        let completed = match self.db.create_song_for_user(user_id, &song).await {
            Ok(song_id) => self
                .db
                .complete_task(task_id, song_id)
                .await
                .map(|()| song_id),
            Err(e) => Err(e),
        };
        let song_id = match completed {
            Ok(song_id) => song_id,
            Err(e) => {
                if let Err(fail_err) = self.db.fail_task(task_id, &e.to_string()).await {
                    tracing::warn!(task_id = task_id.0, error = %fail_err, "Could not mark task failed");
                }
                return Err(e);
            }
        };

        tracing::info!(
            task_id = task_id.0,
            song_id = song_id.0,
            "Fixture task completed synchronously"
        );
        self.emit_event(Event::Completed {
            task_id,
            user_id,
            song_id,
        });

        Ok(SubmitReceipt {
            task_id,
            status: TaskStatus::Completed,
            message: "test download task completed".to_string(),
            song_id: Some(song_id),
        })
    }
}
