//! # tunefetch
//!
//! Backend library for a music-library service: callers submit a source URL on a
//! recognised platform, a background worker acquires the audio with yt-dlp, uploads it
//! to object storage and records a song in the caller's library.
//!
//! ## Design Philosophy
//!
//! tunefetch is designed to be:
//! - **Non-blocking** - Submission returns immediately; acquisition runs on a worker
//! - **Observable** - Task status is persisted and every transition is broadcast as an event
//! - **Library-first** - The REST API and the demo server are thin layers over [`TaskManager`]
//! - **Pluggable** - Acquisition tool, object store and identity provider sit behind traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use tunefetch::{Caller, Config, TaskManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TaskManager::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let caller = Caller::new("user_2abc");
//!     manager.ensure_user(&caller.external_id).await?;
//!     let receipt = manager
//!         .submit(&caller, "https://www.youtube.com/watch?v=dQw4w9WgXcQ")
//!         .await?;
//!     println!("task {} is {}", receipt.task_id, receipt.status);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Acquisition tool integration (yt-dlp)
pub mod fetcher;
/// Task lifecycle manager (decomposed into focused submodules)
pub mod manager;
/// Source URL classification
pub mod platform;
/// Object storage backends
pub mod storage;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, TaskError, ToHttpStatus};
pub use fetcher::{MediaFetcher, MediaMetadata};
pub use manager::{NewUpload, SongUpdate, TaskManager};
pub use storage::ObjectStore;
pub use types::{
    AudioAnalysis, Caller, Event, Pagination, SongId, SongInfo, SongPage, SongUpload,
    SourcePlatform, SubmitReceipt, TaskId, TaskInfo, TaskStatus, UserId,
};

/// Helper function to run the manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use tunefetch::{Config, TaskManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = TaskManager::new(Config::default()).await?;
///     let _api = manager.spawn_api_server();
///
///     // Run with automatic signal handling
///     run_with_shutdown(manager).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: TaskManager) -> Result<()> {
    wait_for_signal().await;
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
