//! Source URL classification
//!
//! Maps a submitted URL onto one of the recognized [`SourcePlatform`]s. Patterns are
//! evaluated in a fixed order and the first match wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::types::SourcePlatform;

struct PlatformPattern {
    platform: SourcePlatform,
    regex: Regex,
}

// Literal patterns, checked by the tests below.
#[allow(clippy::expect_used)]
static PATTERNS: LazyLock<Vec<PlatformPattern>> = LazyLock::new(|| {
    [
        (
            SourcePlatform::Youtube,
            r"^(https?://)?(www\.)?(youtube\.com|youtu\.be|m\.youtube\.com)/.+",
        ),
        (
            SourcePlatform::Bilibili,
            r"^(https?://)?(www\.)?(bilibili\.com|b23\.tv)/.+",
        ),
        (
            SourcePlatform::Netease,
            r"^(https?://)?(www\.)?(music\.163\.com|y\.music\.163\.com)/.+",
        ),
        (SourcePlatform::Qq, r"^(https?://)?(y\.qq\.com|music\.qq\.com)/.+"),
        (
            SourcePlatform::Jamendo,
            r"^(https?://)?(www\.)?jamendo\.com/track/(\d+)/.*",
        ),
        (SourcePlatform::Local, r"^test://.+"),
    ]
    .into_iter()
    .map(|(platform, pattern)| PlatformPattern {
        platform,
        regex: Regex::new(pattern).expect("platform pattern must compile"),
    })
    .collect()
});

#[allow(clippy::expect_used)]
static JAMENDO_TRACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"jamendo\.com/track/(\d+)").expect("jamendo track pattern must compile")
});

/// Classify a URL, returning `None` when no platform pattern matches
pub fn classify(url: &str) -> Option<SourcePlatform> {
    let url = url.trim();
    PATTERNS
        .iter()
        .find(|p| p.regex.is_match(url))
        .map(|p| p.platform)
}

/// Classify a URL for submission
///
/// Empty and unrecognized URLs are rejected with [`Error::Validation`].
pub fn require_platform(url: &str) -> Result<SourcePlatform> {
    if url.trim().is_empty() {
        return Err(Error::Validation("url is required".to_string()));
    }
    classify(url).ok_or_else(|| Error::Validation(format!("unsupported platform: {}", url.trim())))
}

/// Extract the numeric track id from a Jamendo track URL
pub fn jamendo_track_id(url: &str) -> Option<&str> {
    JAMENDO_TRACK
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_platform() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", SourcePlatform::Youtube),
            ("https://youtu.be/dQw4w9WgXcQ", SourcePlatform::Youtube),
            ("m.youtube.com/watch?v=abc", SourcePlatform::Youtube),
            ("https://www.bilibili.com/video/BV1xx411c7mD", SourcePlatform::Bilibili),
            ("https://b23.tv/abcdef", SourcePlatform::Bilibili),
            ("https://music.163.com/#/song?id=1", SourcePlatform::Netease),
            ("http://y.music.163.com/m/song?id=2", SourcePlatform::Netease),
            ("https://y.qq.com/n/ryqq/songDetail/0039MnYb0qxYhV", SourcePlatform::Qq),
            ("https://music.qq.com/song/1", SourcePlatform::Qq),
            (
                "https://www.jamendo.com/track/1972914/cinematic-documentary",
                SourcePlatform::Jamendo,
            ),
            ("jamendo.com/track/42/", SourcePlatform::Jamendo),
            ("test://fixture-song", SourcePlatform::Local),
        ];

        for (url, expected) in cases {
            assert_eq!(classify(url), Some(expected), "{url}");
        }
    }

    #[test]
    fn rejects_unrecognized_urls() {
        for url in [
            "https://soundcloud.com/artist/track",
            "https://youtube.com",
            "https://www.jamendo.com/album/123/x",
            "ftp://music.163.com/song",
            "test://",
            "not a url",
        ] {
            assert_eq!(classify(url), None, "{url}");
        }
    }

    #[test]
    fn www_prefix_is_not_accepted_for_qq() {
        assert_eq!(classify("https://www.y.qq.com/n/song"), None);
    }

    #[test]
    fn require_platform_rejects_empty_and_unknown() {
        assert!(matches!(require_platform(""), Err(Error::Validation(_))));
        assert!(matches!(require_platform("   "), Err(Error::Validation(_))));
        let err = require_platform("https://example.com/song").unwrap_err();
        assert!(err.to_string().contains("unsupported platform"));
        assert_eq!(
            require_platform("  https://youtu.be/x  ").unwrap(),
            SourcePlatform::Youtube
        );
    }

    #[test]
    fn extracts_jamendo_track_id() {
        assert_eq!(
            jamendo_track_id("https://www.jamendo.com/track/1884133/inspiring"),
            Some("1884133")
        );
        assert_eq!(jamendo_track_id("https://youtu.be/x"), None);
    }
}
