//! Task lifecycle manager split into focused submodules.
//!
//! The `TaskManager` struct and its methods are organized by domain:
//! - [`submit`] - Validation, task creation and enqueueing
//! - [`fixtures`] - Synchronous fixture songs for test-scheme and test-mode submissions
//! - [`worker`] - Job channel consumer that spawns one detached job per task
//! - [`acquisition`] - Execution of a single acquisition job
//! - [`query`] - Task and song lookups scoped to the caller
//! - [`songs`] - Caller-created songs, audio uploads and processing results
//! - [`users`] - User resolution and the user lifecycle webhook
//! - [`lifecycle`] - Startup reconciliation, staleness sweeper, shutdown

mod acquisition;
mod fixtures;
mod lifecycle;
mod query;
mod songs;
mod submit;
mod users;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use lifecycle::{RESTART_MESSAGE, STALE_MESSAGE};
pub use query::MAX_PAGE_LIMIT;
pub use songs::{NewUpload, SongUpdate};
pub use users::{EmailAddress, UserEvent, UserEventData};

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetcher::{self, MediaFetcher};
use crate::storage::{self, ObjectStore};
use crate::types::{Event, SourcePlatform, TaskId, UserId};

/// A task handed from `submit()` to the worker loop
#[derive(Debug, Clone)]
pub(crate) struct Job {
    pub(crate) task_id: TaskId,
    pub(crate) user_id: UserId,
    pub(crate) source_url: String,
    pub(crate) platform: SourcePlatform,
}

/// Job queue and worker state
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Sending half of the in-process job channel (the worker loop owns the receiver)
    pub(crate) job_tx: mpsc::UnboundedSender<Job>,
    /// Optional bound on concurrently running jobs (tasks.max_concurrent_jobs)
    pub(crate) concurrent_limit: Option<Arc<Semaphore>>,
    /// Tracks the worker loop, the sweeper and every running job
    pub(crate) tracker: TaskTracker,
    /// Flag to indicate whether new submissions are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled when shutdown starts; stops the worker loop and the sweeper
    pub(crate) shutdown: CancellationToken,
}

/// Acquisition task manager (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct TaskManager {
    /// Database instance for persistence (wrapped in Arc for sharing across jobs)
    /// Public for integration tests to inspect task rows
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across jobs)
    pub(crate) config: Arc<Config>,
    /// Acquisition tool
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    /// Object storage for the acquired audio
    pub(crate) store: Arc<dyn ObjectStore>,
    /// Job queue and worker state
    pub(crate) queue_state: QueueState,
}

impl TaskManager {
    /// Create a new TaskManager from configuration
    ///
    /// This initializes all collaborators:
    /// - Validates the configuration
    /// - Creates the scratch directory for acquisition jobs
    /// - Opens/creates the SQLite database and runs migrations
    /// - Locates yt-dlp (or falls back to a fetcher that always fails)
    /// - Builds the configured object store
    ///
    /// and then behaves like [`TaskManager::with_collaborators`].
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.acquisition.temp_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create temp directory '{}': {}",
                        config.acquisition.temp_dir.display(),
                        e
                    ),
                ))
            })?;

        let db = Database::new(&config.persistence.database_path).await?;

        if db.was_unclean_shutdown().await? {
            tracing::warn!("Previous session did not shut down cleanly");
        }

        let fetcher = fetcher::from_config(&config.acquisition);
        let store = storage::from_config(&config.storage)?;

        Self::with_collaborators(config, db, fetcher, store).await
    }

    /// Create a TaskManager around explicitly provided collaborators
    ///
    /// Fails every task left unfinished by a previous session, marks a clean start and
    /// spawns the worker loop and the staleness sweeper.
    pub async fn with_collaborators(
        config: Config,
        db: Database,
        fetcher: Arc<dyn MediaFetcher>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        // Mark that we're starting up (for unclean shutdown detection)
        db.set_clean_start().await?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);

        let (job_tx, job_rx) = mpsc::unbounded_channel();

        let concurrent_limit = config
            .tasks
            .max_concurrent_jobs
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let queue_state = QueueState {
            job_tx,
            concurrent_limit,
            tracker: TaskTracker::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown: CancellationToken::new(),
        };

        tracing::info!(
            fetcher = fetcher.name(),
            store = store.name(),
            max_concurrent_jobs = ?config.tasks.max_concurrent_jobs,
            "Task manager initialized"
        );

        let manager = Self {
            db: Arc::new(db),
            event_tx,
            config: Arc::new(config),
            fetcher,
            store,
            queue_state,
        };

        // Nothing from a previous session can still be working on these
        manager.reconcile_unfinished().await?;

        manager.start_worker(job_rx);
        manager.start_sweeper();

        Ok(manager)
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives
    /// `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tunefetch::{Config, TaskManager};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let manager = TaskManager::new(Config::default()).await?;
    ///
    ///     let mut events = manager.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "task event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Whether new submissions are currently accepted
    pub fn is_accepting(&self) -> bool {
        self.queue_state
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Emit an event to all subscribers
    ///
    /// With no active subscribers the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let manager = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}
