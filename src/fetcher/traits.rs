//! Traits and types for media acquisition

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Metadata reported by the acquisition tool for a source URL
///
/// Every field is optional; callers apply their own fallbacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    /// Platform-side identifier
    pub id: Option<String>,
    /// Track title
    pub title: Option<String>,
    /// Uploader name
    pub uploader: Option<String>,
    /// Channel name
    pub channel: Option<String>,
    /// Duration in seconds (fractional)
    pub duration: Option<f64>,
    /// Cover art URL
    pub thumbnail: Option<String>,
    /// Canonical page URL
    pub webpage_url: Option<String>,
}

impl MediaMetadata {
    /// Artist name: uploader, then channel
    pub fn artist(&self) -> Option<&str> {
        self.uploader
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.channel.as_deref().filter(|s| !s.trim().is_empty()))
    }

    /// Duration rounded to whole seconds (0 when absent or invalid)
    pub fn duration_secs(&self) -> u32 {
        match self.duration {
            Some(d) if d.is_finite() && d > 0.0 => d.round().min(u32::MAX as f64) as u32,
            _ => 0,
        }
    }
}

/// Acquisition tool collaborator
///
/// `probe` is called before `download` for each job. Implementations must not leave
/// files outside the directory they are given.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch metadata for a source URL without downloading the media
    ///
    /// # Errors
    ///
    /// Returns [`Error::Acquisition`](crate::Error::Acquisition) when the tool fails, or
    /// [`Error::NotSupported`](crate::Error::NotSupported) when no tool is available.
    async fn probe(&self, url: &str) -> crate::Result<MediaMetadata>;

    /// Download the audio for a source URL into `dir`, returning the produced file
    async fn download(&self, url: &str, dir: &Path) -> crate::Result<PathBuf>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
