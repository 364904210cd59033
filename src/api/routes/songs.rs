//! Song library handlers.

use super::{CreateSongRequest, SongsQuery, UpdateSongRequest};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::manager::{NewUpload, SongUpdate};
use crate::types::{Caller, SongId, SongInfo, SongPage, SongUpload, SourcePlatform};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};

fn song_id(path: std::result::Result<Path<i64>, PathRejection>) -> Result<SongId> {
    let Path(id) = path.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    Ok(SongId(id))
}

/// GET /songs - List the caller's songs
#[utoipa::path(
    get,
    path = "/songs",
    tag = "songs",
    params(
        ("page" = Option<u32>, Query, description = "1-based page (default: 1)"),
        ("limit" = Option<u32>, Query, description = "Page size, 1-100 (default: 10)")
    ),
    responses(
        (status = 200, description = "Page of songs, newest first", body = SongPage),
        (status = 400, description = "Invalid pagination", body = crate::error::ApiError),
        (status = 401, description = "No caller identity", body = crate::error::ApiError)
    )
)]
pub async fn list_songs(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: std::result::Result<Query<SongsQuery>, QueryRejection>,
) -> Result<Json<SongPage>> {
    let Query(query) = query.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    let page = state
        .manager
        .list_songs(&caller, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

/// GET /songs/:id - Get a single song
#[utoipa::path(
    get,
    path = "/songs/{id}",
    tag = "songs",
    params(
        ("id" = i64, Path, description = "Song ID")
    ),
    responses(
        (status = 200, description = "Song", body = SongInfo),
        (status = 400, description = "Malformed song ID", body = crate::error::ApiError),
        (status = 401, description = "No caller identity", body = crate::error::ApiError),
        (status = 404, description = "Song not found or not in the caller's library", body = crate::error::ApiError)
    )
)]
pub async fn get_song(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<SongInfo>> {
    let song = state.manager.get_song(&caller, song_id(path)?).await?;
    Ok(Json(song))
}

/// POST /songs - Create a song record and reserve its upload target
#[utoipa::path(
    post,
    path = "/songs",
    tag = "songs",
    request_body = CreateSongRequest,
    responses(
        (status = 200, description = "Song created; PUT the audio to upload_url", body = SongUpload),
        (status = 400, description = "Missing title or artist", body = crate::error::ApiError),
        (status = 401, description = "No caller identity", body = crate::error::ApiError),
        (status = 404, description = "Unknown user", body = crate::error::ApiError)
    )
)]
pub async fn create_song(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: std::result::Result<Json<CreateSongRequest>, JsonRejection>,
) -> Result<Json<SongUpload>> {
    let Json(request) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    let upload = NewUpload {
        title: request.title.unwrap_or_default(),
        artist: request.artist.unwrap_or_default(),
        duration: request.duration.unwrap_or(0),
        source_url: request.source_url,
        source_type: request.source_type.unwrap_or(SourcePlatform::Youtube),
    };

    let created = state.manager.create_song(&caller, upload).await?;
    Ok(Json(created))
}

/// PUT /songs/:id - Record the processing outcome of a song
#[utoipa::path(
    put,
    path = "/songs/{id}",
    tag = "songs",
    params(
        ("id" = i64, Path, description = "Song ID")
    ),
    request_body = UpdateSongRequest,
    responses(
        (status = 200, description = "Updated song", body = SongInfo),
        (status = 400, description = "Missing status", body = crate::error::ApiError),
        (status = 401, description = "No caller identity", body = crate::error::ApiError),
        (status = 404, description = "Song not found or not in the caller's library", body = crate::error::ApiError)
    )
)]
pub async fn update_song(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UpdateSongRequest>, JsonRejection>,
) -> Result<Json<SongInfo>> {
    let song_id = song_id(path)?;
    let Json(request) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    let status = request
        .status
        .ok_or_else(|| Error::Validation("status is required".to_string()))?;

    let song = state
        .manager
        .update_song(
            &caller,
            song_id,
            SongUpdate {
                status,
                analysis: request.analysis,
            },
        )
        .await?;
    Ok(Json(song))
}

/// PUT /songs/:id/audio - Upload the audio of a song created with POST /songs
#[utoipa::path(
    put,
    path = "/songs/{id}/audio",
    tag = "songs",
    params(
        ("id" = i64, Path, description = "Song ID")
    ),
    request_body(content = Vec<u8>, content_type = "audio/mpeg"),
    responses(
        (status = 200, description = "Audio stored", body = SongInfo),
        (status = 400, description = "Empty body or song without an upload target", body = crate::error::ApiError),
        (status = 401, description = "No caller identity", body = crate::error::ApiError),
        (status = 404, description = "Song not found or not in the caller's library", body = crate::error::ApiError),
        (status = 413, description = "Body exceeds server.api.max_upload_bytes", body = crate::error::ApiError),
        (status = 502, description = "Object storage rejected the upload", body = crate::error::ApiError)
    )
)]
pub async fn upload_song_audio(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: std::result::Result<Path<i64>, PathRejection>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<SongInfo>> {
    let song_id = song_id(path)?;
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge(rejection.body_text())
        } else {
            Error::Validation(rejection.body_text())
        }
    })?;

    let song = state
        .manager
        .upload_song_audio(&caller, song_id, bytes.to_vec())
        .await?;
    Ok(Json(song))
}
