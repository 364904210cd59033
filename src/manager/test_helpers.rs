//! Shared test helpers for creating TaskManager instances in tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetcher::{MediaFetcher, MediaMetadata};
use crate::manager::TaskManager;
use crate::storage::{LocalObjectStore, ObjectMetadata, ObjectStore, StoredObject};
use crate::types::{Caller, TaskId, TaskInfo};

/// Public base URL of the test object store
pub(crate) const TEST_CDN: &str = "https://cdn.test";

/// Scriptable acquisition tool
pub(crate) struct FakeFetcher {
    pub(crate) metadata: MediaMetadata,
    pub(crate) file_name: String,
    pub(crate) probe_error: Option<String>,
    pub(crate) download_error: Option<String>,
    /// Sleep inside `download` (after recording the directory)
    pub(crate) delay: Option<Duration>,
    /// Every directory `download` was asked to write into
    pub(crate) dirs: Mutex<Vec<PathBuf>>,
}

impl Default for FakeFetcher {
    fn default() -> Self {
        Self {
            metadata: MediaMetadata {
                id: Some("dQw4w9WgXcQ".to_string()),
                title: Some("Never Gonna Give You Up".to_string()),
                uploader: Some("Rick Astley".to_string()),
                channel: Some("RickAstleyVEVO".to_string()),
                duration: Some(212.6),
                thumbnail: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg".to_string()),
                webpage_url: None,
            },
            file_name: "Never Gonna Give You Up.mp3".to_string(),
            probe_error: None,
            download_error: None,
            delay: None,
            dirs: Mutex::new(Vec::new()),
        }
    }
}

impl FakeFetcher {
    pub(crate) fn seen_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn probe(&self, _url: &str) -> Result<MediaMetadata> {
        match &self.probe_error {
            Some(message) => Err(Error::Acquisition(message.clone())),
            None => Ok(self.metadata.clone()),
        }
    }

    async fn download(&self, _url: &str, dir: &Path) -> Result<PathBuf> {
        self.dirs.lock().unwrap().push(dir.to_path_buf());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.download_error {
            return Err(Error::Acquisition(message.clone()));
        }

        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, b"ID3 fake audio").await?;
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Object store that rejects every upload
pub(crate) struct RejectingStore;

#[async_trait]
impl ObjectStore for RejectingStore {
    async fn put(
        &self,
        _key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
        _metadata: &ObjectMetadata,
    ) -> Result<StoredObject> {
        Err(Error::Storage("403 Forbidden".to_string()))
    }

    fn object_url(&self, key: &str) -> Result<String> {
        Ok(format!("{}/{}", TEST_CDN, key))
    }

    fn name(&self) -> &'static str {
        "rejecting"
    }
}

/// Configuration rooted in a temp directory
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = root.join("test.db");
    config.acquisition.temp_dir = root.join("temp");
    config.storage = crate::config::StorageConfig::Local {
        root: root.join("storage"),
        public_base_url: Some(TEST_CDN.to_string()),
    };
    config
}

/// Helper to create a test TaskManager with the default fake fetcher.
/// Returns the manager, the fetcher and the tempdir (which must be kept alive).
pub(crate) async fn create_test_manager() -> (TaskManager, Arc<FakeFetcher>, TempDir) {
    create_test_manager_with(FakeFetcher::default(), |_| {}).await
}

/// Like [`create_test_manager`] with a custom fetcher and config adjustments
pub(crate) async fn create_test_manager_with(
    fetcher: FakeFetcher,
    configure: impl FnOnce(&mut Config),
) -> (TaskManager, Arc<FakeFetcher>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    configure(&mut config);

    let fetcher = Arc::new(fetcher);
    let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
        temp_dir.path().join("storage"),
        Some(TEST_CDN.to_string()),
    ));

    let manager = build_manager(config, fetcher.clone(), store).await;
    (manager, fetcher, temp_dir)
}

/// Open the configured database and wire the given collaborators
pub(crate) async fn build_manager(
    config: Config,
    fetcher: Arc<dyn MediaFetcher>,
    store: Arc<dyn ObjectStore>,
) -> TaskManager {
    std::fs::create_dir_all(&config.acquisition.temp_dir).unwrap();
    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();

    TaskManager::with_collaborators(config, db, fetcher, store)
        .await
        .unwrap()
}

/// Provision a regular (non test-mode) user and return its caller
pub(crate) async fn regular_caller(manager: &TaskManager, external_id: &str) -> Caller {
    manager
        .db
        .upsert_user(&crate::db::NewUser {
            external_id: external_id.to_string(),
            email: Some(format!("{external_id}@example.com")),
            ..Default::default()
        })
        .await
        .unwrap();
    Caller::new(external_id)
}

/// Poll a task until it reaches a terminal state (fails the test after 5 seconds)
pub(crate) async fn wait_for_terminal(
    manager: &TaskManager,
    caller: &Caller,
    task_id: TaskId,
) -> TaskInfo {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let task = manager.get_status(caller, task_id).await.unwrap();
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not reach a terminal state in time")
}
