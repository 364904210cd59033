//! Parsers for yt-dlp output

use serde::Deserialize;

use super::traits::MediaMetadata;
use crate::{Error, Result};

/// Subset of the `--dump-json` document we read
#[derive(Debug, Deserialize)]
struct DumpJson {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
}

/// Parse the stdout of `yt-dlp --dump-json`
///
/// yt-dlp prints one JSON document per line, one per entry for playlist URLs; the first
/// entry is used.
pub fn parse_metadata(stdout: &[u8]) -> Result<MediaMetadata> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| Error::Acquisition("yt-dlp produced no metadata".to_string()))?;

    let dump: DumpJson = serde_json::from_str(line)
        .map_err(|e| Error::Acquisition(format!("unreadable yt-dlp metadata: {}", e)))?;

    Ok(MediaMetadata {
        id: dump.id,
        title: dump.title,
        uploader: dump.uploader,
        channel: dump.channel,
        duration: dump.duration,
        thumbnail: dump.thumbnail,
        webpage_url: dump.webpage_url,
    })
}

/// Condense stderr into a single-line error summary
///
/// Prefers yt-dlp's `ERROR:` lines; otherwise the last non-empty line.
pub(crate) fn summarize_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("ERROR:"))
        .collect();

    let summary = if !errors.is_empty() {
        errors.join("; ")
    } else {
        lines.last().copied().unwrap_or("no error output").to_string()
    };

    const MAX_LEN: usize = 500;
    if summary.chars().count() > MAX_LEN {
        let truncated: String = summary.chars().take(MAX_LEN).collect();
        format!("{}...", truncated)
    } else {
        summary
    }
}
