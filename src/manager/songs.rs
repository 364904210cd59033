//! Caller-created songs: upload targets, audio uploads and processing results.
//!
//! Unlike acquired songs, these start as a bare record with a reserved object key. The
//! audio arrives later through [`TaskManager::upload_song_audio`] and the analysis outcome
//! through [`TaskManager::update_song`].

use crate::db::NewSong;
use crate::error::{Error, Result};
use crate::storage::{self, AUDIO_CONTENT_TYPE, ObjectMetadata};
use crate::types::{
    AudioAnalysis, Caller, SongId, SongInfo, SongUpload, SourcePlatform, TaskStatus,
};

use super::TaskManager;

/// Details of a song the caller is about to upload
#[derive(Debug, Clone)]
pub struct NewUpload {
    /// Track title
    pub title: String,
    /// Artist
    pub artist: String,
    /// Duration in seconds (0 when unknown)
    pub duration: u32,
    /// Where the caller got the audio from
    pub source_url: Option<String>,
    /// Platform of `source_url`
    pub source_type: SourcePlatform,
}

/// Processing outcome reported for a song
#[derive(Debug, Clone)]
pub struct SongUpdate {
    /// Outcome; only `COMPLETED` marks the song processed
    pub status: TaskStatus,
    /// Analysis to attach, kept only with a `COMPLETED` status
    pub analysis: Option<AudioAnalysis>,
}

impl TaskManager {
    /// Create a song record for the caller and reserve the object key for its audio
    ///
    /// The key is `<user id>/<unix millis>-<sanitized title>.mp3` and the record's
    /// `file_url` already points at where the store will serve it.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] when title or artist is blank
    /// - [`Error::NotFound`] when the caller has no user record
    pub async fn create_song(&self, caller: &Caller, upload: NewUpload) -> Result<SongUpload> {
        let title = upload.title.trim();
        let artist = upload.artist.trim();
        if title.is_empty() || artist.is_empty() {
            return Err(Error::Validation("title and artist are required".to_string()));
        }

        let user_id = self.resolve_user(caller).await?;
        let now_millis = chrono::Utc::now().timestamp_millis();
        let key = format!("{}.mp3", storage::object_key(user_id, now_millis, title));
        let file_url = self.store.object_url(&key)?;

        let song_id = self
            .db
            .create_song_for_user(
                user_id,
                &NewSong {
                    title: title.to_string(),
                    artist: artist.to_string(),
                    duration: upload.duration,
                    source_url: upload.source_url,
                    source_type: upload.source_type,
                    source_id: format!("{}-{}", now_millis, user_id),
                    file_url,
                    storage_key: Some(key.clone()),
                    thumbnail_url: None,
                    is_processed: false,
                },
            )
            .await?;

        tracing::info!(
            song_id = song_id.0,
            user_id = user_id.0,
            key = %key,
            "Song created, awaiting upload"
        );

        let song = self.get_song(caller, song_id).await?;
        Ok(SongUpload {
            song,
            upload_url: format!("/songs/{}/audio", song_id),
            upload_key: key,
        })
    }

    /// Store the audio of one of the caller's songs under its reserved key
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty body or a song without a reserved key
    /// - [`Error::NotFound`] when the song is missing or not linked to the caller
    /// - [`Error::Storage`] when the store rejects the upload
    pub async fn upload_song_audio(
        &self,
        caller: &Caller,
        song_id: SongId,
        bytes: Vec<u8>,
    ) -> Result<SongInfo> {
        if bytes.is_empty() {
            return Err(Error::Validation("audio body is empty".to_string()));
        }

        let user_id = self.resolve_user(caller).await?;
        let row = self
            .db
            .get_song_for_user(song_id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {}", song_id)))?;

        let key = row.storage_key.clone().ok_or_else(|| {
            Error::Validation(format!("song {} does not accept uploads", song_id))
        })?;

        let mut metadata = ObjectMetadata::new();
        metadata.insert("user-id".to_string(), user_id.to_string());
        metadata.insert("song-id".to_string(), song_id.to_string());
        metadata.insert("title".to_string(), row.title.clone());
        metadata.insert("artist".to_string(), row.artist.clone());

        let size = bytes.len();
        self.store.put(&key, bytes, AUDIO_CONTENT_TYPE, &metadata).await?;

        tracing::info!(
            song_id = song_id.0,
            bytes = size,
            store = self.store.name(),
            "Song audio uploaded"
        );

        SongInfo::try_from(row)
    }

    /// Record the processing outcome of one of the caller's songs
    ///
    /// A `COMPLETED` status marks the song processed and attaches the analysis, when one
    /// is given. Any other status clears the processed flag and keeps earlier analysis.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the song is missing or not linked to the caller.
    pub async fn update_song(
        &self,
        caller: &Caller,
        song_id: SongId,
        update: SongUpdate,
    ) -> Result<SongInfo> {
        let user_id = self.resolve_user(caller).await?;
        if self.db.get_song_for_user(song_id, user_id).await?.is_none() {
            return Err(Error::NotFound(format!("song {}", song_id)));
        }

        let is_processed = update.status == TaskStatus::Completed;
        let analysis = match update.analysis {
            Some(analysis) if is_processed => Some(serde_json::to_string(&analysis)?),
            _ => None,
        };

        if !self
            .db
            .update_song_processing(song_id, is_processed, analysis.as_deref())
            .await?
        {
            return Err(Error::NotFound(format!("song {}", song_id)));
        }

        tracing::info!(
            song_id = song_id.0,
            status = %update.status,
            with_analysis = analysis.is_some(),
            "Song processing recorded"
        );

        self.get_song(caller, song_id).await
    }
}
