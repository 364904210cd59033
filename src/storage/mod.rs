//! Object storage for acquired audio
//!
//! [`ObjectStore`] is the seam between acquisition jobs and wherever the bytes end up:
//!
//! - [`LocalObjectStore`]: a directory on disk
//! - [`HttpObjectStore`]: an S3-compatible endpoint accepting `PUT <endpoint>/<bucket>/<key>`

mod http;
mod local;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::types::UserId;

/// User-defined metadata attached to a stored object
pub type ObjectMetadata = BTreeMap<String, String>;

/// Content type of uploaded audio
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Location of an uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key the object was stored under
    pub key: String,
    /// URL the object can be retrieved from
    pub url: String,
}

/// Object storage collaborator
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) when the backend rejects or fails
    /// the write.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> crate::Result<StoredObject>;

    /// URL an object stored under `key` will be retrievable from
    ///
    /// Lets a song record carry its final URL before the bytes arrive.
    fn object_url(&self, key: &str) -> crate::Result<String>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Build the store described by the storage config
pub fn from_config(config: &StorageConfig) -> crate::Result<Arc<dyn ObjectStore>> {
    match config {
        StorageConfig::Local {
            root,
            public_base_url,
        } => Ok(Arc::new(LocalObjectStore::new(
            root.clone(),
            public_base_url.clone(),
        ))),
        StorageConfig::Http {
            endpoint,
            bucket,
            auth_token,
            public_base_url,
        } => Ok(Arc::new(HttpObjectStore::new(
            endpoint,
            bucket.clone(),
            auth_token.clone(),
            public_base_url.clone(),
        )?)),
    }
}

/// Parse an HTTP storage endpoint, requiring an `http`/`https` scheme and a host
///
/// Rejects inputs like `minio:9000/x`, which parse with `minio` as the scheme.
pub(crate) fn parse_endpoint(endpoint: &str) -> crate::Result<url::Url> {
    let invalid = |reason: String| crate::Error::Config {
        message: format!("storage.endpoint {}: {}", endpoint, reason),
        key: Some("storage.endpoint".to_string()),
    };

    let url = url::Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(invalid("must be an absolute http(s) URL".to_string()));
    }
    Ok(url)
}

/// Key for an uploaded audio file: `<user id>/<unix millis>-<file name>`
///
/// Every non-alphanumeric character of the file name (the extension dot included) is
/// replaced with `_`.
pub fn object_key(user_id: UserId, timestamp_millis: i64, file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}/{}-{}", user_id, timestamp_millis, sanitized)
}

/// Percent-encode each segment of a key for use in a URL path
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a base URL and an encoded key with exactly one slash
pub(crate) fn join_url(base: &str, encoded_key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), encoded_key)
}
