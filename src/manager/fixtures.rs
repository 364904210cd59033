//! Fixture songs for submissions that never reach the acquisition tool.
//!
//! `test://` URLs always resolve here; Jamendo track URLs do when the caller is in test
//! mode. A handful of Jamendo track ids carry real catalogue metadata.

use crate::db::NewSong;
use crate::platform;
use crate::types::SourcePlatform;

/// Placeholder audio location of generic fixture songs
const FIXTURE_FILE_URL: &str = "https://example.com/test.mp3";

struct CatalogueTrack {
    id: &'static str,
    title: &'static str,
    artist: &'static str,
    duration: u32,
    file_url: &'static str,
    thumbnail_url: &'static str,
}

const JAMENDO_CATALOGUE: [CatalogueTrack; 3] = [
    CatalogueTrack {
        id: "1972914",
        title: "Cinematic Documentary",
        artist: "MaxKoMusic",
        duration: 154,
        file_url: "https://mp3d.jamendo.com/download/track/1972914/mp32/",
        thumbnail_url: "https://usercontent.jamendo.com?type=album&id=399517&width=300",
    },
    CatalogueTrack {
        id: "1884133",
        title: "Inspiring Cinematic Background",
        artist: "AGsoundtrax",
        duration: 137,
        file_url: "https://mp3d.jamendo.com/download/track/1884133/mp32/",
        thumbnail_url: "https://usercontent.jamendo.com?type=album&id=353475&width=300",
    },
    CatalogueTrack {
        id: "1781603",
        title: "Summer Vibes",
        artist: "Roa Music",
        duration: 185,
        file_url: "https://mp3d.jamendo.com/download/track/1781603/mp32/",
        thumbnail_url: "https://usercontent.jamendo.com?type=album&id=285114&width=300",
    },
];

/// Whether a submission is resolved synchronously with a fixture song
pub(crate) fn is_fixture(platform: SourcePlatform, test_mode: bool) -> bool {
    match platform {
        SourcePlatform::Local => true,
        SourcePlatform::Jamendo => test_mode,
        _ => false,
    }
}

/// Song record for a fixture submission
///
/// `now_millis` makes the source id unique per submission.
pub(crate) fn fixture_song(url: &str, platform: SourcePlatform, now_millis: i64) -> NewSong {
    let generic = NewSong {
        title: "Test Song".to_string(),
        artist: "Test Artist".to_string(),
        duration: 180,
        source_url: Some(url.to_string()),
        source_type: platform,
        source_id: format!("test-{}", now_millis),
        file_url: FIXTURE_FILE_URL.to_string(),
        storage_key: None,
        thumbnail_url: None,
        is_processed: true,
    };

    if platform != SourcePlatform::Jamendo {
        return generic;
    }

    let track = platform::jamendo_track_id(url)
        .and_then(|id| JAMENDO_CATALOGUE.iter().find(|track| track.id == id));

    match track {
        Some(track) => NewSong {
            title: track.title.to_string(),
            artist: track.artist.to_string(),
            duration: track.duration,
            source_id: format!("jamendo-{}-{}", track.id, now_millis),
            file_url: track.file_url.to_string(),
            thumbnail_url: Some(track.thumbnail_url.to_string()),
            ..generic
        },
        None => generic,
    }
}
