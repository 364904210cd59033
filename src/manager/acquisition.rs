//! Acquisition job - the background half of a task's lifecycle.
//!
//! A job drives its task `PENDING → PROCESSING → {COMPLETED | FAILED}`:
//!
//! | Step | Progress |
//! |------|----------|
//! | marked processing | 10 |
//! | metadata probed | 30 |
//! | media downloaded | 70 |
//! | uploaded to object storage | 90 |
//! | song created, task completed | 100 |
//!
//! The job's scratch directory is a [`tempfile::TempDir`] and is removed on every exit
//! path, including timeouts.

use std::path::Path;

use crate::db::NewSong;
use crate::error::{Error, Result, TaskError};
use crate::fetcher::MediaMetadata;
use crate::storage::{self, AUDIO_CONTENT_TYPE, ObjectMetadata};
use crate::types::{Event, SongId};

use super::{Job, TaskManager};

/// Fallback for missing title/artist metadata
const UNKNOWN: &str = "Unknown";

impl TaskManager {
    /// Run a job to a terminal state
    ///
    /// Errors never escape: they are recorded on the task and broadcast as
    /// [`Event::Failed`].
    pub(crate) async fn execute_job(&self, job: Job) {
        let id = job.task_id;

        if let Err(e) = self.db.mark_task_processing(id).await {
            // Already failed by the sweeper or by shutdown
            tracing::warn!(task_id = id.0, error = %e, "Task could not start, skipping job");
            return;
        }

        tracing::info!(
            task_id = id.0,
            user_id = job.user_id.0,
            platform = %job.platform,
            "Acquisition started"
        );
        self.emit_event(Event::Started {
            task_id: id,
            user_id: job.user_id,
        });

        let budget = self.config.tasks.job_timeout;
        let outcome = match tokio::time::timeout(budget, self.run_acquisition(&job)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                secs: budget.as_secs(),
            }),
        };

        let song_id = match outcome {
            Ok(song_id) => song_id,
            Err(e) => {
                tracing::warn!(task_id = id.0, error = %e, "Acquisition failed");
                self.fail_job(&job, &e.to_string()).await;
                return;
            }
        };

        match self.db.complete_task(id, song_id).await {
            Ok(()) => {
                tracing::info!(task_id = id.0, song_id = song_id.0, "Acquisition completed");
                self.emit_event(Event::Completed {
                    task_id: id,
                    user_id: job.user_id,
                    song_id,
                });
            }
            Err(e @ Error::Task(TaskError::InvalidTransition { .. })) => {
                // The song exists but the task was failed underneath us
                tracing::warn!(
                    task_id = id.0,
                    song_id = song_id.0,
                    error = %e,
                    "Task reached a terminal state before completion"
                );
            }
            Err(e) => {
                tracing::error!(task_id = id.0, error = %e, "Failed to complete task");
                self.fail_job(&job, &e.to_string()).await;
            }
        }
    }

    /// Move a task to FAILED and broadcast it
    ///
    /// A task that is already terminal is left alone.
    pub(crate) async fn fail_job(&self, job: &Job, message: &str) {
        match self.db.fail_task(job.task_id, message).await {
            Ok(()) => self.emit_event(Event::Failed {
                task_id: job.task_id,
                user_id: job.user_id,
                error: message.to_string(),
            }),
            Err(e) => {
                tracing::warn!(task_id = job.task_id.0, error = %e, "Could not mark task failed");
            }
        }
    }

    /// Fetch, upload and record the song; returns the new song id
    async fn run_acquisition(&self, job: &Job) -> Result<SongId> {
        let scratch = tempfile::Builder::new()
            .prefix(&format!("task-{}-", job.task_id))
            .tempdir_in(&self.config.acquisition.temp_dir)?;

        let metadata = self.fetcher.probe(&job.source_url).await?;
        self.advance(job, 30).await?;

        let file = self
            .fetcher
            .download(&job.source_url, scratch.path())
            .await?;
        self.advance(job, 70).await?;

        let bytes = tokio::fs::read(&file).await?;
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let now_millis = chrono::Utc::now().timestamp_millis();
        let key = storage::object_key(job.user_id, now_millis, &file_name);
        let object_metadata = object_metadata(job, &metadata);

        tracing::debug!(
            task_id = job.task_id.0,
            key = %key,
            size = bytes.len(),
            "Uploading audio"
        );
        let stored = self
            .store
            .put(&key, bytes, AUDIO_CONTENT_TYPE, &object_metadata)
            .await?;
        self.advance(job, 90).await?;

        let song = NewSong {
            title: metadata
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| file_stem(&file_name)),
            artist: metadata.artist().unwrap_or(UNKNOWN).to_string(),
            duration: metadata.duration_secs(),
            source_url: Some(job.source_url.clone()),
            source_type: job.platform,
            source_id: metadata
                .id
                .clone()
                .unwrap_or_else(|| now_millis.to_string()),
            file_url: stored.url,
            storage_key: Some(stored.key),
            thumbnail_url: metadata.thumbnail.clone(),
            is_processed: false,
        };

        let song_id = self.db.create_song_for_user(job.user_id, &song).await?;

        // Removes the downloaded file; errors are only logged
        if let Err(e) = scratch.close() {
            tracing::warn!(task_id = job.task_id.0, error = %e, "Failed to remove scratch directory");
        }

        Ok(song_id)
    }

    /// Record a progress milestone and broadcast it
    async fn advance(&self, job: &Job, progress: u8) -> Result<()> {
        self.db.update_task_progress(job.task_id, progress).await?;
        tracing::debug!(task_id = job.task_id.0, progress, "Task progress");
        self.emit_event(Event::Progress {
            task_id: job.task_id,
            user_id: job.user_id,
            progress,
        });
        Ok(())
    }
}

fn object_metadata(job: &Job, metadata: &MediaMetadata) -> ObjectMetadata {
    let mut object_metadata = ObjectMetadata::new();
    object_metadata.insert("user-id".to_string(), job.user_id.to_string());
    object_metadata.insert("source-url".to_string(), job.source_url.clone());
    object_metadata.insert("source-type".to_string(), job.platform.to_string());
    object_metadata.insert(
        "title".to_string(),
        metadata.title.clone().unwrap_or_else(|| UNKNOWN.to_string()),
    );
    object_metadata.insert(
        "artist".to_string(),
        metadata.artist().unwrap_or(UNKNOWN).to_string(),
    );
    object_metadata
}

/// File name without its extension
fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
        .to_string()
}
