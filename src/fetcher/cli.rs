//! yt-dlp backed fetcher

use super::parser::{parse_metadata, summarize_stderr};
use super::traits::{MediaFetcher, MediaMetadata};
use crate::config::AcquisitionConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Fetcher running the external `yt-dlp` binary
///
/// Metadata comes from `yt-dlp --dump-json --no-warnings <url>`; the audio from
/// `yt-dlp -x --audio-format <fmt> --audio-quality <q> -o <dir>/%(title)s.%(ext)s <url>`.
/// Child processes are killed if the job future is dropped (e.g. on timeout).
///
/// # Examples
///
/// ```no_run
/// use tunefetch::fetcher::{MediaFetcher, YtDlpFetcher};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = YtDlpFetcher::new(PathBuf::from("/usr/local/bin/yt-dlp"));
/// let meta = fetcher.probe("https://youtu.be/dQw4w9WgXcQ").await?;
/// # Ok(())
/// # }
/// ```
pub struct YtDlpFetcher {
    binary_path: PathBuf,
    audio_format: String,
    audio_quality: String,
}

impl YtDlpFetcher {
    /// Create a fetcher with an explicit binary path and mp3/128K output
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            audio_format: "mp3".to_string(),
            audio_quality: "128K".to_string(),
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Locate the binary as configured: explicit path first, then PATH if allowed
    pub fn from_config(config: &AcquisitionConfig) -> Option<Self> {
        let binary = match &config.yt_dlp_path {
            Some(path) => Some(path.clone()),
            None if config.search_path => which::which("yt-dlp").ok(),
            None => None,
        }?;

        Some(Self {
            binary_path: binary,
            audio_format: config.audio_format.clone(),
            audio_quality: config.audio_quality.clone(),
        })
    }

    /// Path of the binary this fetcher runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary_path);
        command.kill_on_drop(true);
        command
    }

    /// Find the extracted audio file in `dir`
    async fn find_output(&self, dir: &Path) -> crate::Result<PathBuf> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut candidates = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.audio_format));
            if matches && entry.file_type().await?.is_file() {
                candidates.push(path);
            }
        }

        candidates.sort();
        candidates.into_iter().next().ok_or_else(|| {
            crate::Error::Acquisition(format!(
                "yt-dlp finished but produced no .{} file",
                self.audio_format
            ))
        })
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn probe(&self, url: &str) -> crate::Result<MediaMetadata> {
        let output = self
            .command()
            .arg("--dump-json")
            .arg("--no-warnings")
            .arg(url)
            .output()
            .await
            .map_err(spawn_error)?;

        if !output.status.success() {
            return Err(crate::Error::Acquisition(format!(
                "yt-dlp metadata lookup failed: {}",
                summarize_stderr(&output.stderr)
            )));
        }

        parse_metadata(&output.stdout)
    }

    async fn download(&self, url: &str, dir: &Path) -> crate::Result<PathBuf> {
        let template = dir.join("%(title)s.%(ext)s");

        let output = self
            .command()
            .arg("-x")
            .arg("--audio-format")
            .arg(&self.audio_format)
            .arg("--audio-quality")
            .arg(&self.audio_quality)
            .arg("-o")
            .arg(&template)
            .arg(url)
            .output()
            .await
            .map_err(spawn_error)?;

        if !output.status.success() {
            return Err(crate::Error::Acquisition(format!(
                "yt-dlp download failed: {}",
                summarize_stderr(&output.stderr)
            )));
        }

        self.find_output(dir).await
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

fn spawn_error(e: std::io::Error) -> crate::Error {
    crate::Error::Acquisition(format!("failed to execute yt-dlp: {}", e))
}
