//! S3-compatible HTTP object store

use async_trait::async_trait;
use std::time::Duration;

use super::{ObjectMetadata, ObjectStore, StoredObject, encode_key, join_url, parse_endpoint};
use crate::{Error, Result};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Uploads objects with `PUT <endpoint>/<bucket>/<key>`
///
/// Metadata entries are sent as `x-amz-meta-<name>` headers and the optional token as a
/// bearer `Authorization` header. Object URLs default to
/// `https://<bucket>.s3.amazonaws.com/<key>`.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: url::Url,
    bucket: String,
    auth_token: Option<String>,
    public_base_url: Option<String>,
}

impl HttpObjectStore {
    /// Create a store for `bucket` behind `endpoint`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the endpoint is not an absolute http(s) URL.
    pub fn new(
        endpoint: &str,
        bucket: String,
        auth_token: Option<String>,
        public_base_url: Option<String>,
    ) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            bucket,
            auth_token,
            public_base_url,
        })
    }

    fn upload_url(&self, encoded_key: &str) -> String {
        join_url(
            &join_url(self.endpoint.as_str(), &urlencoding::encode(&self.bucket)),
            encoded_key,
        )
    }

    fn public_url(&self, encoded_key: &str) -> String {
        match &self.public_base_url {
            Some(base) => join_url(base, encoded_key),
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, encoded_key),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<StoredObject> {
        let encoded_key = encode_key(key);
        let url = self.upload_url(&encoded_key);
        let size = bytes.len();

        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);

        for (name, value) in metadata {
            // Header values must be visible ASCII; encode anything else
            request = request.header(
                format!("x-amz-meta-{}", name.to_ascii_lowercase()),
                urlencoding::encode(value).into_owned(),
            );
        }

        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Storage(format!("upload of {} failed: {}", key, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            return Err(Error::Storage(format!(
                "upload of {} rejected with {}: {}",
                key, status, body
            )));
        }

        tracing::debug!(key, bytes = size, bucket = %self.bucket, "uploaded object");

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(&encoded_key),
        })
    }

    fn object_url(&self, key: &str) -> Result<String> {
        Ok(self.public_url(&encode_key(key)))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn metadata() -> ObjectMetadata {
        ObjectMetadata::from([
            ("user-id".to_string(), "7".to_string()),
            ("platform".to_string(), "YOUTUBE".to_string()),
        ])
    }

    #[tokio::test]
    async fn put_uploads_with_headers_and_returns_s3_url() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/songs/7/123-a_mp3"))
            .and(header("content-type", "audio/mpeg"))
            .and(header("authorization", "Bearer secret"))
            .and(header("x-amz-meta-user-id", "7"))
            .and(header("x-amz-meta-platform", "YOUTUBE"))
            .and(body_bytes(b"ID3".to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(
            &server.uri(),
            "songs".to_string(),
            Some("secret".to_string()),
            None,
        )
        .unwrap();

        let stored = store
            .put("7/123-a_mp3", b"ID3".to_vec(), "audio/mpeg", &metadata())
            .await
            .unwrap();

        assert_eq!(stored.key, "7/123-a_mp3");
        assert_eq!(stored.url, "https://songs.s3.amazonaws.com/7/123-a_mp3");
        assert_eq!(store.object_url("7/123-a_mp3").unwrap(), stored.url);
    }

    #[tokio::test]
    async fn public_base_url_overrides_s3_url() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(
            &server.uri(),
            "songs".to_string(),
            None,
            Some("https://cdn.example.com".to_string()),
        )
        .unwrap();

        let stored = store
            .put("1/x", vec![0], "audio/mpeg", &ObjectMetadata::new())
            .await
            .unwrap();
        assert_eq!(stored.url, "https://cdn.example.com/1/x");
    }

    #[tokio::test]
    async fn rejected_upload_is_a_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AccessDenied"))
            .mount(&server)
            .await;

        let store =
            HttpObjectStore::new(&server.uri(), "songs".to_string(), None, None).unwrap();

        let err = store
            .put("1/x", vec![0], "audio/mpeg", &ObjectMetadata::new())
            .await
            .unwrap_err();
        match err {
            Error::Storage(message) => {
                assert!(message.contains("403"), "{message}");
                assert!(message.contains("AccessDenied"), "{message}");
            }
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn relative_endpoint_is_a_config_error() {
        for endpoint in ["not a url", "minio:9000/x"] {
            let result = HttpObjectStore::new(endpoint, "songs".to_string(), None, None);
            assert!(matches!(result, Err(Error::Config { .. })), "{endpoint}");
        }
    }
}
