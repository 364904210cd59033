//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`download`] - Submission and task status
//! - [`songs`] - The caller's song library
//! - [`users`] - User lifecycle webhook
//! - [`system`] - Health, events, OpenAPI

use crate::types::{AudioAnalysis, SourcePlatform, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

mod download;
mod songs;
mod system;
mod users;

// Re-export all handlers so `routes::function_name` works from the router
pub use download::*;
pub use songs::*;
pub use system::*;
pub use users::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitRequest {
    /// Source URL on a recognised platform
    #[serde(default)]
    pub url: Option<String>,
}

/// Query parameters for GET /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskQuery {
    /// Return only this task; without it the caller's recent tasks are listed
    #[schema(value_type = Option<i64>)]
    pub task_id: Option<TaskId>,
}

/// Query parameters for GET /songs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SongsQuery {
    /// 1-based page number (default: 1)
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size, at most 100 (default: 10)
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// Request body for POST /songs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateSongRequest {
    /// Track title
    #[serde(default)]
    pub title: Option<String>,
    /// Artist
    #[serde(default)]
    pub artist: Option<String>,
    /// Duration in seconds (default: 0)
    #[serde(default)]
    pub duration: Option<u32>,
    /// Where the audio came from
    #[serde(default)]
    pub source_url: Option<String>,
    /// Platform of `source_url` (default: YOUTUBE)
    #[serde(default)]
    pub source_type: Option<SourcePlatform>,
}

/// Request body for PUT /songs/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UpdateSongRequest {
    /// Processing outcome; COMPLETED marks the song processed
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Analysis result, stored with a COMPLETED status
    #[serde(default)]
    pub analysis: Option<AudioAnalysis>,
}

/// Response body for GET /download without a task id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RecentTasks {
    /// Most recent tasks, newest first
    pub tasks: Vec<crate::types::TaskInfo>,
}

/// Response body for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthStatus {
    /// "ok" when every dependency answers, "degraded" otherwise
    pub status: String,
    /// Crate version
    pub version: String,
    /// "ok" or "unavailable"
    pub database: String,
}
