//! Media acquisition tool handling
//!
//! The acquisition tool is an opaque external process that emits metadata for a source URL
//! and writes an audio file for it. The [`MediaFetcher`] trait is the seam; implementations:
//!
//! - [`YtDlpFetcher`]: runs the external `yt-dlp` binary
//! - [`UnavailableFetcher`]: used when no binary is available; every call fails with
//!   [`Error::NotSupported`](crate::Error::NotSupported)
//!
//! ## Usage
//!
//! ```no_run
//! use tunefetch::fetcher::{MediaFetcher, YtDlpFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found");
//!     let scratch = tempfile::tempdir()?;
//!
//!     let meta = fetcher.probe("https://youtu.be/dQw4w9WgXcQ").await?;
//!     let file = fetcher.download("https://youtu.be/dQw4w9WgXcQ", scratch.path()).await?;
//!     println!("{:?} -> {}", meta.title, file.display());
//!     Ok(())
//! }
//! ```

mod cli;
mod noop;
mod parser;
mod traits;

pub use cli::YtDlpFetcher;
pub use noop::UnavailableFetcher;
pub use parser::parse_metadata;
pub use traits::{MediaFetcher, MediaMetadata};

use std::sync::Arc;

use crate::config::AcquisitionConfig;

/// Build the fetcher described by the acquisition config
///
/// Falls back to [`UnavailableFetcher`] when no yt-dlp binary can be located, so the
/// service still starts and each job fails with a clear message.
pub fn from_config(config: &AcquisitionConfig) -> Arc<dyn MediaFetcher> {
    match YtDlpFetcher::from_config(config) {
        Some(fetcher) => {
            tracing::info!(binary = %fetcher.binary_path().display(), "using yt-dlp fetcher");
            Arc::new(fetcher)
        }
        None => {
            tracing::warn!(
                "yt-dlp not found; acquisition jobs will fail until it is installed or \
                 acquisition.yt_dlp_path is configured"
            );
            Arc::new(UnavailableFetcher)
        }
    }
}
