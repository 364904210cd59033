//! Core types for tunefetch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Defines an `i64`-backed row identifier with the conversions and sqlx bindings the
/// database layer needs.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the inner i64 value
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl PartialEq<i64> for $name {
            fn eq(&self, other: &i64) -> bool {
                self.0 == *other
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

row_id!(
    /// Unique identifier for an acquisition task
    TaskId
);
row_id!(
    /// Unique identifier for a song
    SongId
);
row_id!(
    /// Internal identifier for a user (distinct from the external identity string)
    UserId
);

/// Task type recorded on every acquisition task
pub const TASK_TYPE_DOWNLOAD: &str = "download";

/// Lifecycle status of an acquisition task
///
/// Transitions only move forward: `Pending → Processing → {Completed | Failed}`,
/// plus `Pending → Failed` for jobs that never started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Created, waiting for the worker
    Pending,
    /// The acquisition job is running
    Processing,
    /// Song created and attached
    Completed,
    /// Terminated with an error message
    Failed,
}

impl TaskStatus {
    /// Every status, in lifecycle order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    /// Convert integer status code to TaskStatus
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => TaskStatus::Pending,
            1 => TaskStatus::Processing,
            2 => TaskStatus::Completed,
            3 => TaskStatus::Failed,
            _ => TaskStatus::Failed, // Default to Failed for unknown status
        }
    }

    /// Convert TaskStatus to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Processing => 1,
            TaskStatus::Completed => 2,
            TaskStatus::Failed => 3,
        }
    }

    /// Completed and failed tasks accept no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether moving from `self` to `next` respects the forward-only state machine
    ///
    /// The database layer enforces these edges with conditional updates and derives the
    /// expected source states of a rejected transition from this table.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Pending, TaskStatus::Failed)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }

    /// States from which `next` may be entered
    pub fn sources_of(next: TaskStatus) -> Vec<TaskStatus> {
        Self::ALL
            .into_iter()
            .filter(|status| status.can_transition_to(next))
            .collect()
    }

    /// Wire name (`PENDING`, `PROCESSING`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized origin of a source URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourcePlatform {
    /// youtube.com, youtu.be, m.youtube.com
    Youtube,
    /// bilibili.com, b23.tv
    Bilibili,
    /// music.163.com
    Netease,
    /// y.qq.com, music.qq.com
    Qq,
    /// jamendo.com track pages
    Jamendo,
    /// `test://` scheme, resolved locally without the acquisition tool
    Local,
}

impl SourcePlatform {
    /// Stored/wire name of the platform tag
    pub fn as_str(&self) -> &'static str {
        match self {
            SourcePlatform::Youtube => "YOUTUBE",
            SourcePlatform::Bilibili => "BILIBILI",
            SourcePlatform::Netease => "NETEASE",
            SourcePlatform::Qq => "QQ",
            SourcePlatform::Jamendo => "JAMENDO",
            SourcePlatform::Local => "LOCAL",
        }
    }

    /// Parse a stored platform tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "YOUTUBE" => Some(SourcePlatform::Youtube),
            "BILIBILI" => Some(SourcePlatform::Bilibili),
            "NETEASE" => Some(SourcePlatform::Netease),
            "QQ" => Some(SourcePlatform::Qq),
            "JAMENDO" => Some(SourcePlatform::Jamendo),
            "LOCAL" => Some(SourcePlatform::Local),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved identity of an API caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    /// Opaque identity assigned by the authentication provider
    pub external_id: String,
    /// Fixture mode: the user is auto-provisioned and Jamendo URLs resolve to fixtures
    pub test_mode: bool,
}

impl Caller {
    /// A regular caller
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            test_mode: false,
        }
    }

    /// A caller authenticated through the test-mode headers
    pub fn test(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            test_mode: true,
        }
    }
}

/// Acquisition task as returned to callers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Task ID
    pub id: TaskId,
    /// Task type (always "download")
    pub task_type: String,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Coarse progress percentage (0-100)
    pub progress: u8,
    /// Submitted source URL
    pub source_url: String,
    /// Platform the URL was classified as
    pub source_type: SourcePlatform,
    /// Song produced by a completed task
    pub result_song_id: Option<SongId>,
    /// Error message of a failed task
    pub error_message: Option<String>,
    /// When the task was submitted
    pub created_at: DateTime<Utc>,
    /// When the job started processing
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

/// Song as returned to callers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SongInfo {
    /// Song ID
    pub id: SongId,
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
    /// Cover art
    pub thumbnail_url: Option<String>,
    /// Whether analysis has run on the song
    pub is_processed: bool,
    /// Analysis payload, when present
    #[schema(value_type = Option<Object>)]
    pub analysis: Option<serde_json::Value>,
    /// When the song was created
    pub created_at: DateTime<Utc>,
}

/// Pagination block returned with list responses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Total number of items
    pub total: u64,
    /// Total number of pages
    pub total_pages: u64,
}

impl Pagination {
    /// Build the pagination block for a total item count
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// A page of the caller's songs
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SongPage {
    /// Songs on this page, newest first
    pub data: Vec<SongInfo>,
    /// Pagination details
    pub pagination: Pagination,
}

/// Synchronous result of a submission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitReceipt {
    /// Created task
    pub task_id: TaskId,
    /// Status at the time of return (PENDING, or COMPLETED for fixture URLs)
    pub status: TaskStatus,
    /// Human-readable acknowledgement
    pub message: String,
    /// Song created synchronously for fixture URLs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_id: Option<SongId>,
}

/// Vocal analysis attached to a song once processing completes
///
/// Missing fields take neutral defaults: key `C`, tempo 120, difficulty `MEDIUM`,
/// every score zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct AudioAnalysis {
    /// Musical key
    pub key: String,
    /// Tempo in beats per minute
    pub tempo: f64,
    /// Lowest sung pitch (Hz)
    pub pitch_min: f64,
    /// Highest sung pitch (Hz)
    pub pitch_max: f64,
    /// Mean pitch (Hz)
    pub pitch_average: f64,
    /// Pitch variance
    pub pitch_variance: f64,
    /// Median pitch (Hz)
    pub pitch_median: f64,
    /// Difficulty label (EASY, MEDIUM, HARD, ...)
    pub difficulty: String,
    /// Overall complexity score
    pub complexity_score: f64,
    /// Vocal demand score
    pub vocal_demand: f64,
    /// Breathing demand score
    pub breathing_demand: f64,
}

impl Default for AudioAnalysis {
    fn default() -> Self {
        Self {
            key: "C".to_string(),
            tempo: 120.0,
            pitch_min: 0.0,
            pitch_max: 0.0,
            pitch_average: 0.0,
            pitch_variance: 0.0,
            pitch_median: 0.0,
            difficulty: "MEDIUM".to_string(),
            complexity_score: 0.0,
            vocal_demand: 0.0,
            breathing_demand: 0.0,
        }
    }
}

/// A caller-created song and where to send its audio
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SongUpload {
    /// The new song record (not yet processed)
    pub song: SongInfo,
    /// Path accepting the audio bytes with `PUT`
    pub upload_url: String,
    /// Object key the audio will be stored under
    pub upload_key: String,
}

/// Task lifecycle events broadcast to subscribers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task created and handed to the worker
    Queued {
        /// Task ID
        task_id: TaskId,
        /// Owning user
        user_id: UserId,
        /// Classified platform
        platform: SourcePlatform,
    },
    /// Job started processing
    Started {
        /// Task ID
        task_id: TaskId,
        /// Owning user
        user_id: UserId,
    },
    /// Progress milestone reached
    Progress {
        /// Task ID
        task_id: TaskId,
        /// Owning user
        user_id: UserId,
        /// New progress percentage
        progress: u8,
    },
    /// Task completed with a song
    Completed {
        /// Task ID
        task_id: TaskId,
        /// Owning user
        user_id: UserId,
        /// Produced song
        song_id: SongId,
    },
    /// Task failed
    Failed {
        /// Task ID
        task_id: TaskId,
        /// Owning user
        user_id: UserId,
        /// Error message recorded on the task
        error: String,
    },
    /// The manager is shutting down
    Shutdown,
}

impl Event {
    /// Owning user of the task this event is about (None for global events)
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Event::Queued { user_id, .. }
            | Event::Started { user_id, .. }
            | Event::Progress { user_id, .. }
            | Event::Completed { user_id, .. }
            | Event::Failed { user_id, .. } => Some(*user_id),
            Event::Shutdown => None,
        }
    }

    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Started { .. } => "started",
            Event::Progress { .. } => "progress",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Shutdown => "shutdown",
        }
    }
}
