//! Common test utilities for tunefetch integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tunefetch::manager::{UserEvent, UserEventData};
use tunefetch::storage::LocalObjectStore;
use tunefetch::{
    Caller, Config, Database, MediaFetcher, MediaMetadata, Result, TaskId, TaskInfo,
    TaskManager,
};

/// Public base URL given to the local object store
pub const CDN: &str = "https://cdn.example";

/// Acquisition tool stand-in that writes a small file named after the title
pub struct ScriptedFetcher {
    /// Metadata returned by every probe
    pub metadata: MediaMetadata,
    /// Error returned by every download, if set
    pub download_error: Option<String>,
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self {
            metadata: MediaMetadata {
                id: Some("BV1xx411c7mD".to_string()),
                title: Some("Bad Apple!!".to_string()),
                uploader: Some("Alstroemeria Records".to_string()),
                duration: Some(219.0),
                ..Default::default()
            },
            download_error: None,
        }
    }
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn probe(&self, _url: &str) -> Result<MediaMetadata> {
        Ok(self.metadata.clone())
    }

    async fn download(&self, _url: &str, dir: &Path) -> Result<PathBuf> {
        if let Some(message) = &self.download_error {
            return Err(tunefetch::Error::Acquisition(message.clone()));
        }
        let title = self.metadata.title.as_deref().unwrap_or("audio");
        let path = dir.join(format!("{title}.mp3"));
        tokio::fs::write(&path, b"ID3 scripted").await?;
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Configuration rooted in a temp directory
pub fn config_in(root: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = root.join("tunefetch.db");
    config.acquisition.temp_dir = root.join("temp");
    config.storage = tunefetch::config::StorageConfig::Local {
        root: root.join("storage"),
        public_base_url: Some(CDN.to_string()),
    };
    config
}

/// Open a manager over `config` with the given fetcher and a local store
pub async fn open_manager(config: Config, fetcher: Arc<dyn MediaFetcher>) -> TaskManager {
    std::fs::create_dir_all(&config.acquisition.temp_dir).expect("temp dir");
    let tunefetch::config::StorageConfig::Local {
        root,
        public_base_url,
    } = config.storage.clone()
    else {
        panic!("integration tests use local storage");
    };

    let db = Database::new(&config.persistence.database_path)
        .await
        .expect("open database");
    TaskManager::with_collaborators(
        config,
        db,
        fetcher,
        Arc::new(LocalObjectStore::new(root, public_base_url)),
    )
    .await
    .expect("create manager")
}

/// Fresh manager with the default scripted fetcher
pub async fn create_manager() -> (TaskManager, TempDir) {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let manager = open_manager(
        config_in(temp_dir.path()),
        Arc::new(ScriptedFetcher::default()),
    )
    .await;
    (manager, temp_dir)
}

/// Register a user through the lifecycle webhook path and return its caller
pub async fn register(manager: &TaskManager, external_id: &str) -> Caller {
    manager
        .apply_user_event(&UserEvent {
            event_type: "user.created".to_string(),
            data: UserEventData {
                id: external_id.to_string(),
                ..Default::default()
            },
        })
        .await
        .expect("register user");
    Caller::new(external_id)
}

/// Poll until the task is COMPLETED or FAILED
pub async fn wait_for_terminal(
    manager: &TaskManager,
    caller: &Caller,
    task_id: TaskId,
    timeout: Duration,
) -> TaskInfo {
    tokio::time::timeout(timeout, async {
        loop {
            let task = manager
                .get_status(caller, task_id)
                .await
                .expect("task status");
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("task did not finish in time")
}

/// Skip test if yt-dlp is not installed
#[macro_export]
macro_rules! skip_if_no_yt_dlp {
    () => {
        if which::which("yt-dlp").is_err() {
            eprintln!("Skipping test: yt-dlp not found on PATH");
            return;
        }
    };
}
