//! Acquisition task rows and their conditional status transitions.
//!
//! Every status change is a single-row `UPDATE ... WHERE status = <expected>`. When no row
//! is affected the task was not in the expected state and the update is reported as
//! [`TaskError::InvalidTransition`]; terminal rows therefore never change again.

use crate::error::{DatabaseError, TaskError};
use crate::types::{SongId, TaskId, TaskStatus, UserId};
use crate::{Error, Result};

use super::{Database, NewTask, TaskRow, write_error};

const TASK_COLUMNS: &str = r#"
    id, user_id, task_type, status, progress, source_url, source_type,
    result_song_id, error_message, created_at, started_at, completed_at
"#;

impl Database {
    /// Insert a new task in `PENDING` with progress 0
    pub async fn insert_task(&self, task: &NewTask) -> Result<TaskId> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (
                user_id, task_type, status, progress, source_url, source_type, created_at
            ) VALUES (?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(task.user_id)
        .bind(&task.task_type)
        .bind(TaskStatus::Pending.to_i32())
        .bind(&task.source_url)
        .bind(task.source_type.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to insert task", e))?;

        Ok(TaskId(result.last_insert_rowid()))
    }

    /// Get a task by ID regardless of owner
    pub async fn get_task(&self, id: TaskId) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get task: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Get a task only if it belongs to `user_id`
    pub async fn get_task_for_user(&self, id: TaskId, user_id: UserId) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get task: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Most recent tasks of a user, newest first
    pub async fn list_recent_tasks(&self, user_id: UserId, limit: u32) -> Result<Vec<TaskRow>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list recent tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Count the tasks owned by a user
    pub async fn count_tasks_for_user(&self, user_id: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count tasks: {}",
                    e
                )))
            })?;

        Ok(count)
    }

    /// `PENDING → PROCESSING`: record the start time and set progress to 10
    pub async fn mark_task_processing(&self, id: TaskId) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, progress = 10, started_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(TaskStatus::Processing.to_i32())
        .bind(now)
        .bind(id)
        .bind(TaskStatus::Pending.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark task processing: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(invalid_transition(id, TaskStatus::Processing));
        }
        Ok(())
    }

    /// Raise the progress of a `PROCESSING` task
    ///
    /// Progress never moves backwards; a lower value is rejected with
    /// [`TaskError::ProgressRegression`].
    pub async fn update_task_progress(&self, id: TaskId, progress: u8) -> Result<()> {
        let progress = progress.min(100);

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET progress = ?
            WHERE id = ? AND status = ? AND progress <= ?
            "#,
        )
        .bind(i64::from(progress))
        .bind(id)
        .bind(TaskStatus::Processing.to_i32())
        .bind(i64::from(progress))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update task progress: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            // Distinguish a wrong state from a backwards move
            return match self.get_task(id).await? {
                Some(row) if row.status() == TaskStatus::Processing => {
                    Err(Error::Task(TaskError::ProgressRegression { id, progress }))
                }
                _ => Err(Error::Task(TaskError::InvalidTransition {
                    id,
                    expected: TaskStatus::Processing.to_string(),
                    to: TaskStatus::Processing,
                })),
            };
        }
        Ok(())
    }

    /// `PROCESSING → COMPLETED`: attach the song, progress 100, record completion time
    pub async fn complete_task(&self, id: TaskId, song_id: SongId) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, progress = 100, result_song_id = ?, error_message = NULL,
                completed_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(TaskStatus::Completed.to_i32())
        .bind(song_id)
        .bind(now)
        .bind(id)
        .bind(TaskStatus::Processing.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to complete task: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(invalid_transition(id, TaskStatus::Completed));
        }
        Ok(())
    }

    /// `PENDING | PROCESSING → FAILED` with an error message
    pub async fn fail_task(&self, id: TaskId, message: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, error_message = ?, result_song_id = NULL, completed_at = ?
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(TaskStatus::Failed.to_i32())
        .bind(message)
        .bind(now)
        .bind(id)
        .bind(TaskStatus::Pending.to_i32())
        .bind(TaskStatus::Processing.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fail task: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(invalid_transition(id, TaskStatus::Failed));
        }
        Ok(())
    }

    /// All tasks that have not reached a terminal state
    pub async fn list_unfinished_tasks(&self) -> Result<Vec<TaskRow>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status IN (?, ?) ORDER BY id ASC"
        ))
        .bind(TaskStatus::Pending.to_i32())
        .bind(TaskStatus::Processing.to_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list unfinished tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Non-terminal tasks whose start (or creation, if never started) precedes `cutoff`
    pub async fn list_stale_tasks(&self, cutoff: i64) -> Result<Vec<TaskRow>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE status IN (?, ?) AND COALESCE(started_at, created_at) < ?
            ORDER BY id ASC
            "#
        ))
        .bind(TaskStatus::Pending.to_i32())
        .bind(TaskStatus::Processing.to_i32())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list stale tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}

/// Rejection for a conditional update that matched no row, naming the legal source states
fn invalid_transition(id: TaskId, to: TaskStatus) -> Error {
    let expected = TaskStatus::sources_of(to)
        .iter()
        .map(TaskStatus::as_str)
        .collect::<Vec<_>>()
        .join(" or ");
    Error::Task(TaskError::InvalidTransition { id, expected, to })
}
