//! Database layer for tunefetch
//!
//! Handles SQLite persistence for users, songs, their links, and acquisition tasks.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`tasks`] - Task rows and the conditional status transitions
//! - [`songs`] - Songs and user/song links
//! - [`users`] - Users keyed by external identity
//! - [`state`] - Runtime state (shutdown tracking)

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

use crate::error::DatabaseError;
use crate::types::{SongId, SongInfo, SourcePlatform, TaskId, TaskInfo, TaskStatus, UserId};
use crate::{Error, Result};

mod migrations;
mod songs;
mod state;
mod tasks;
mod users;

/// New task to be inserted into the database (always starts `PENDING`)
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Owning user
    pub user_id: UserId,
    /// Task type label
    pub task_type: String,
    /// Submitted source URL
    pub source_url: String,
    /// Classified platform
    pub source_type: SourcePlatform,
}

/// Task record from database
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    /// Unique database ID
    pub id: TaskId,
    /// Owning user
    pub user_id: UserId,
    /// Task type label
    pub task_type: String,
    /// Status code (see [`TaskStatus::from_i32`])
    pub status: i32,
    /// Progress percentage (0-100)
    pub progress: i64,
    /// Submitted source URL
    pub source_url: String,
    /// Platform tag
    pub source_type: String,
    /// Song produced by a completed task
    pub result_song_id: Option<SongId>,
    /// Error message of a failed task
    pub error_message: Option<String>,
    /// Unix timestamp when the task was created
    pub created_at: i64,
    /// Unix timestamp when processing started
    pub started_at: Option<i64>,
    /// Unix timestamp when the task reached a terminal state
    pub completed_at: Option<i64>,
}

impl TaskRow {
    /// Decoded status
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_i32(self.status)
    }
}

impl TryFrom<TaskRow> for TaskInfo {
    type Error = Error;

    fn try_from(row: TaskRow) -> Result<Self> {
        let source_type = parse_platform(&row.source_type)?;
        Ok(TaskInfo {
            id: row.id,
            task_type: row.task_type,
            status: TaskStatus::from_i32(row.status),
            progress: row.progress.clamp(0, 100) as u8,
            source_url: row.source_url,
            source_type,
            result_song_id: row.result_song_id,
            error_message: row.error_message,
            created_at: from_unix(row.created_at),
            started_at: row.started_at.map(from_unix),
            completed_at: row.completed_at.map(from_unix),
        })
    }
}

/// New song to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewSong {
    /// Track title
    pub title: String,
    /// Artist or uploader
    pub artist: String,
    /// Duration in seconds
    pub duration: u32,
    /// URL the song was acquired from
    pub source_url: Option<String>,
    /// Platform the song was acquired from
    pub source_type: SourcePlatform,
    /// Platform-side identifier
    pub source_id: String,
    /// Retrievable location of the audio bytes
    pub file_url: String,
    /// Object storage key of the audio bytes (None for fixture songs)
    pub storage_key: Option<String>,
    /// Cover art
    pub thumbnail_url: Option<String>,
    /// Whether analysis has already run
    pub is_processed: bool,
}

/// Song record from database
#[derive(Debug, Clone, FromRow)]
pub struct SongRow {
    /// Unique database ID
    pub id: SongId,
    /// Track title
    pub title: String,
    /// Artist or uploader
    pub artist: String,
    /// Duration in seconds
    pub duration: i64,
    /// URL the song was acquired from
    pub source_url: Option<String>,
    /// Platform tag
    pub source_type: String,
    /// Platform-side identifier
    pub source_id: String,
    /// Retrievable location of the audio bytes
    pub file_url: String,
    /// Object storage key of the audio bytes
    pub storage_key: Option<String>,
    /// Cover art
    pub thumbnail_url: Option<String>,
    /// Whether analysis has run (0 = no, 1 = yes)
    pub is_processed: i32,
    /// Analysis payload as JSON text
    pub analysis: Option<String>,
    /// Unix timestamp when the song was created
    pub created_at: i64,
}

impl TryFrom<SongRow> for SongInfo {
    type Error = Error;

    fn try_from(row: SongRow) -> Result<Self> {
        let source_type = parse_platform(&row.source_type)?;
        let analysis = row
            .analysis
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(SongInfo {
            id: row.id,
            title: row.title,
            artist: row.artist,
            duration: row.duration.max(0) as u32,
            source_url: row.source_url,
            source_type,
            source_id: row.source_id,
            file_url: row.file_url,
            thumbnail_url: row.thumbnail_url,
            is_processed: row.is_processed != 0,
            analysis,
            created_at: from_unix(row.created_at),
        })
    }
}

/// User to be inserted or updated, keyed by external identity
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// Opaque identity assigned by the authentication provider
    pub external_id: String,
    /// Primary email address
    pub email: Option<String>,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
}

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    /// Unique database ID
    pub id: UserId,
    /// Opaque identity assigned by the authentication provider
    pub external_id: String,
    /// Primary email address
    pub email: Option<String>,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Unix timestamp when the user was created
    pub created_at: i64,
    /// Unix timestamp of the last profile update
    pub updated_at: i64,
}

/// Database handle for tunefetch
pub struct Database {
    pool: SqlitePool,
}

fn parse_platform(tag: &str) -> Result<SourcePlatform> {
    SourcePlatform::from_tag(tag).ok_or_else(|| {
        Error::Database(DatabaseError::QueryFailed(format!(
            "Unknown platform tag in database: {}",
            tag
        )))
    })
}

/// Map a failed write, keeping constraint violations apart from other query failures
fn write_error(context: &str, e: sqlx::Error) -> Error {
    let message = format!("{}: {}", context, e);
    let violated = e.as_database_error().is_some_and(|db| {
        db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation()
    });
    if violated {
        Error::Database(DatabaseError::ConstraintViolation(message))
    } else {
        Error::Database(DatabaseError::QueryFailed(message))
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
