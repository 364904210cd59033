//! Directory-backed object store

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::{ObjectMetadata, ObjectStore, StoredObject, encode_key, join_url};
use crate::{Error, Result};

/// Stores objects as files under a root directory
///
/// Metadata is written next to each object as `<key>.meta.json`. URLs are built from the
/// configured public base URL, or are `file://` URLs when none is set.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`
    pub fn new(root: PathBuf, public_base_url: Option<String>) -> Self {
        Self {
            root,
            public_base_url,
        }
    }

    /// Filesystem path of an object
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(Error::Storage(format!("invalid object key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn url_at(&self, key: &str, path: &Path) -> String {
        match &self.public_base_url {
            Some(base) => join_url(base, &encode_key(key)),
            None => {
                let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
                url::Url::from_file_path(&absolute)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| format!("file://{}", absolute.display()))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<StoredObject> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| Error::Storage(format!("failed to write {}: {}", path.display(), e)))?;

        let sidecar = serde_json::json!({
            "content_type": content_type,
            "size": bytes.len(),
            "metadata": metadata,
        });
        let mut sidecar_path = path.clone().into_os_string();
        sidecar_path.push(".meta.json");
        tokio::fs::write(&sidecar_path, serde_json::to_vec_pretty(&sidecar)?)
            .await
            .map_err(|e| Error::Storage(format!("failed to write object metadata: {}", e)))?;

        tracing::debug!(key, bytes = bytes.len(), "stored object on local disk");

        Ok(StoredObject {
            key: key.to_string(),
            url: self.url_at(key, &path),
        })
    }

    fn object_url(&self, key: &str) -> Result<String> {
        let path = self.path_for(key)?;
        Ok(self.url_at(key, &path))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ObjectMetadata {
        ObjectMetadata::from([
            ("user-id".to_string(), "7".to_string()),
            ("title".to_string(), "Song".to_string()),
        ])
    }

    #[tokio::test]
    async fn put_writes_object_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(
            dir.path().to_path_buf(),
            Some("https://cdn.example.com/songs/".to_string()),
        );

        let stored = store
            .put("7/123-a_b_mp3", b"ID3data".to_vec(), "audio/mpeg", &metadata())
            .await
            .unwrap();

        assert_eq!(stored.key, "7/123-a_b_mp3");
        assert_eq!(stored.url, "https://cdn.example.com/songs/7/123-a_b_mp3");
        assert_eq!(
            std::fs::read(dir.path().join("7/123-a_b_mp3")).unwrap(),
            b"ID3data"
        );

        let sidecar: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("7/123-a_b_mp3.meta.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar["content_type"], "audio/mpeg");
        assert_eq!(sidecar["metadata"]["title"], "Song");
        assert_eq!(sidecar["size"], 7);
        assert_eq!(store.object_url("7/123-a_b_mp3").unwrap(), stored.url);
    }

    #[tokio::test]
    async fn default_urls_are_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf(), None);

        let stored = store
            .put("1/x", vec![1, 2, 3], "audio/mpeg", &ObjectMetadata::new())
            .await
            .unwrap();
        assert!(stored.url.starts_with("file://"), "{}", stored.url);
    }

    #[tokio::test]
    async fn rejects_keys_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf(), None);

        for key in ["../evil", "/etc/passwd", "", "a/../../b"] {
            let result = store
                .put(key, vec![0], "audio/mpeg", &ObjectMetadata::new())
                .await;
            assert!(matches!(result, Err(Error::Storage(_))), "{key:?}");
            assert!(store.object_url(key).is_err(), "{key:?}");
        }
    }
}
