//! Songs and their links to users.

use crate::error::DatabaseError;
use crate::types::{SongId, UserId};
use crate::{Error, Result};

use super::{Database, NewSong, SongRow, write_error};

const SONG_COLUMNS: &str = r#"
    s.id, s.title, s.artist, s.duration, s.source_url, s.source_type, s.source_id,
    s.file_url, s.storage_key, s.thumbnail_url, s.is_processed, s.analysis, s.created_at
"#;

impl Database {
    /// Insert a song and link it to its creator in one transaction
    pub async fn create_song_for_user(&self, user_id: UserId, song: &NewSong) -> Result<SongId> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO songs (
                title, artist, duration, source_url, source_type, source_id,
                file_url, storage_key, thumbnail_url, is_processed, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(i64::from(song.duration))
        .bind(&song.source_url)
        .bind(song.source_type.as_str())
        .bind(&song.source_id)
        .bind(&song.file_url)
        .bind(&song.storage_key)
        .bind(&song.thumbnail_url)
        .bind(song.is_processed)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("Failed to insert song", e))?;

        let song_id = SongId(result.last_insert_rowid());

        sqlx::query(
            r#"
            INSERT INTO user_songs (user_id, song_id, status, created_at)
            VALUES (?, ?, 'ACTIVE', ?)
            "#,
        )
        .bind(user_id)
        .bind(song_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("Failed to link song to user", e))?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit song creation: {}",
                e
            )))
        })?;

        Ok(song_id)
    }

    /// Get a song by ID regardless of links
    pub async fn get_song(&self, id: SongId) -> Result<Option<SongRow>> {
        let row = sqlx::query_as::<_, SongRow>(&format!(
            "SELECT {SONG_COLUMNS} FROM songs s WHERE s.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get song: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Get a song only if it is linked to `user_id`
    pub async fn get_song_for_user(&self, id: SongId, user_id: UserId) -> Result<Option<SongRow>> {
        let row = sqlx::query_as::<_, SongRow>(&format!(
            r#"
            SELECT {SONG_COLUMNS}
            FROM songs s
            JOIN user_songs us ON us.song_id = s.id
            WHERE s.id = ? AND us.user_id = ? AND us.status = 'ACTIVE'
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get song: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// A page of a user's songs, most recently linked first
    pub async fn list_songs_for_user(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<SongRow>> {
        let offset = i64::try_from(offset).map_err(|_| {
            Error::Database(DatabaseError::QueryFailed(
                "Song page offset out of range".to_string(),
            ))
        })?;

        let rows = sqlx::query_as::<_, SongRow>(&format!(
            r#"
            SELECT {SONG_COLUMNS}
            FROM songs s
            JOIN user_songs us ON us.song_id = s.id
            WHERE us.user_id = ? AND us.status = 'ACTIVE'
            ORDER BY us.created_at DESC, us.id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list songs: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Record the processing outcome of a song
    ///
    /// `analysis` replaces the stored payload when given; `None` keeps the existing one.
    /// Returns false when no song has the given ID.
    pub async fn update_song_processing(
        &self,
        id: SongId,
        is_processed: bool,
        analysis: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE songs
            SET is_processed = ?, analysis = COALESCE(?, analysis)
            WHERE id = ?
            "#,
        )
        .bind(is_processed)
        .bind(analysis)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to update song", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of songs linked to a user
    pub async fn count_songs_for_user(&self, user_id: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_songs WHERE user_id = ? AND status = 'ACTIVE'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to count songs: {}",
                e
            )))
        })?;

        Ok(count)
    }
}
