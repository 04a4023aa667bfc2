use serde::{Deserialize, Serialize};

/// Label used when a track carries no artist at all.
pub const UNKNOWN_ARTIST: &str = "unknown artist";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Artist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Album {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ExternalIds {
    #[serde(default)]
    pub isrc: Option<String>,
}

/// A track as delivered by the rooms backend.
///
/// The payload follows the provider catalog format: the ISRC lives under
/// `external_ids`, artwork under `album.images`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub duration_ms: u32,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_ids: ExternalIds,
}

impl Track {
    pub fn isrc(&self) -> Option<&str> {
        self.external_ids.isrc.as_deref()
    }

    /// Artist names joined with ", ", or [`UNKNOWN_ARTIST`] when there are none.
    pub fn artists_label(&self) -> String {
        if self.artists.is_empty() {
            return UNKNOWN_ARTIST.to_string();
        }
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn album_cover_url(&self) -> Option<&str> {
        self.album.images.first().map(|image| image.url.as_str())
    }

    /// Formats the duration as MM:SS.
    pub fn formatted_duration(&self) -> String {
        let total_seconds = self.duration_ms / 1000;
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_json() -> &'static str {
        r#"{
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "artists": [{"id": "0gxyHStUsqpMadRV0Di1Qt", "name": "Rick Astley"}],
            "album": {"name": "Whenever You Need Somebody", "images": [{"url": "https://i.scdn.co/image/abc", "width": 640, "height": 640}]},
            "duration_ms": 213573,
            "preview_url": null,
            "external_ids": {"isrc": "GBARL9300135"},
            "popularity": 78
        }"#
    }

    #[test]
    fn parses_provider_track() {
        let track: Track = serde_json::from_str(track_json()).unwrap();
        assert_eq!(track.isrc(), Some("GBARL9300135"));
        assert_eq!(track.artists_label(), "Rick Astley");
        assert_eq!(track.album_cover_url(), Some("https://i.scdn.co/image/abc"));
        assert_eq!(track.formatted_duration(), "03:33");
        assert!(track.preview_url.is_none());
    }

    #[test]
    fn missing_artists_use_sentinel() {
        let track: Track = serde_json::from_str(r#"{"id": "x", "name": "Untitled"}"#).unwrap();
        assert_eq!(track.artists_label(), UNKNOWN_ARTIST);
        assert_eq!(track.isrc(), None);
        assert_eq!(track.album_cover_url(), None);
    }

    #[test]
    fn joins_multiple_artists() {
        let mut track: Track = serde_json::from_str(track_json()).unwrap();
        track.artists.push(Artist {
            id: None,
            name: "Pete Waterman".to_string(),
        });
        assert_eq!(track.artists_label(), "Rick Astley, Pete Waterman");
    }
}
