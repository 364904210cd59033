//! Lookups scoped to the caller.
//!
//! A task or song that exists but belongs to someone else is reported exactly like one that
//! does not exist.

use crate::error::{Error, Result};
use crate::types::{Caller, Pagination, SongId, SongInfo, SongPage, TaskId, TaskInfo};

use super::TaskManager;

/// Largest accepted page size for song listings
pub const MAX_PAGE_LIMIT: u32 = 100;

impl TaskManager {
    /// Get a task owned by the caller
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the task is missing or not owned by the caller.
    pub async fn get_status(&self, caller: &Caller, task_id: TaskId) -> Result<TaskInfo> {
        let user_id = self.resolve_user(caller).await?;

        let row = self
            .db
            .get_task_for_user(task_id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))?;

        TaskInfo::try_from(row)
    }

    /// The caller's most recent tasks, newest first (`tasks.recent_limit` of them)
    pub async fn list_recent(&self, caller: &Caller) -> Result<Vec<TaskInfo>> {
        let user_id = self.resolve_user(caller).await?;

        self.db
            .list_recent_tasks(user_id, self.config.tasks.recent_limit)
            .await?
            .into_iter()
            .map(TaskInfo::try_from)
            .collect()
    }

    /// A page of the caller's songs, most recently linked first
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] unless `page >= 1` and `1 <= limit <= 100`.
    pub async fn list_songs(&self, caller: &Caller, page: u32, limit: u32) -> Result<SongPage> {
        if page == 0 {
            return Err(Error::Validation("page must be at least 1".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(Error::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }

        let user_id = self.resolve_user(caller).await?;
        let offset = u64::from(page - 1) * u64::from(limit);

        let rows = self.db.list_songs_for_user(user_id, limit, offset).await?;
        let total = self.db.count_songs_for_user(user_id).await?;

        let data = rows
            .into_iter()
            .map(SongInfo::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(SongPage {
            data,
            pagination: Pagination::new(page, limit, total.max(0) as u64),
        })
    }

    /// Get a song linked to the caller
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the song is missing or not linked to the caller.
    pub async fn get_song(&self, caller: &Caller, song_id: SongId) -> Result<SongInfo> {
        let user_id = self.resolve_user(caller).await?;

        let row = self
            .db
            .get_song_for_user(song_id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {}", song_id)))?;

        SongInfo::try_from(row)
    }
}
