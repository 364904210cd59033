//! Fetcher used when no acquisition tool is available

use super::traits::{MediaFetcher, MediaMetadata};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

const UNAVAILABLE: &str = "media acquisition requires the yt-dlp binary. \
     Configure acquisition.yt_dlp_path or ensure yt-dlp is in PATH.";

/// Fetcher used when the yt-dlp binary cannot be located
///
/// Every call returns `Error::NotSupported`, so jobs fail with an actionable message
/// instead of the service refusing to start.
pub struct UnavailableFetcher;

#[async_trait]
impl MediaFetcher for UnavailableFetcher {
    async fn probe(&self, _url: &str) -> crate::Result<MediaMetadata> {
        Err(crate::Error::NotSupported(UNAVAILABLE.into()))
    }

    async fn download(&self, _url: &str, _dir: &Path) -> crate::Result<PathBuf> {
        Err(crate::Error::NotSupported(UNAVAILABLE.into()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
