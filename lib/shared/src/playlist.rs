use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::music::Track;
use crate::room::Member;

/// ISRC -> ids of the members holding that recording.
pub type MembershipRecord = HashMap<String, Vec<String>>;

/// Shared count -> tracks held by exactly that many members.
pub type SharedCountBuckets = BTreeMap<u32, Vec<Track>>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlaylistMetadata {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub rank: u32,
    /// Order among the playlists of the same type.
    #[serde(default)]
    pub rank_for_type: u32,
    #[serde(default)]
    pub shared_track_count: u32,
}

/// Full playlist payload from `GET /rooms/{roomId}/playlists/{playlistId}`.
///
/// The header fields are spelled out rather than flattened: serde cannot read
/// integer map keys back through a flattened struct.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub rank: u32,
    /// Order among the playlists of the same type.
    #[serde(default)]
    pub rank_for_type: u32,
    #[serde(default)]
    pub shared_track_count: u32,
    #[serde(default)]
    pub tracks_per_shared_count: SharedCountBuckets,
    #[serde(default)]
    pub user_ids_per_shared_tracks: MembershipRecord,
    #[serde(default)]
    pub users: HashMap<String, Member>,
}

impl Playlist {
    pub fn metadata(&self) -> PlaylistMetadata {
        PlaylistMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            rank: self.rank,
            rank_for_type: self.rank_for_type,
            shared_track_count: self.shared_track_count,
        }
    }
}

/// Playlists of a room in display order: by rank, then rank within the type,
/// then id.
pub fn ordered_playlists(
    playlists: impl IntoIterator<Item = PlaylistMetadata>,
) -> Vec<PlaylistMetadata> {
    let mut ordered: Vec<PlaylistMetadata> = playlists.into_iter().collect();
    ordered.sort_by(|a, b| {
        (a.rank, a.rank_for_type, &a.id).cmp(&(b.rank, b.rank_for_type, &b.id))
    });
    ordered
}

/// Body of `POST /rooms/{roomId}/playlists/{playlistId}/add`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AddPlaylistRequest {
    pub shared_user_count: Vec<u32>,
}

/// Playlist created on the member's streaming account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreatedPlaylist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(alias = "spotify_url", default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_playlist_with_integer_keys() {
        let playlist: Playlist = serde_json::from_str(
            r#"{
                "id": "p1",
                "name": "Songs in common",
                "type": "shared",
                "rank": 1,
                "shared_track_count": 1,
                "tracks_per_shared_count": {
                    "2": [{"id": "t1", "name": "Song", "external_ids": {"isrc": "X"}}],
                    "3": []
                },
                "user_ids_per_shared_tracks": {"X": ["u1", "u2"]},
                "users": {
                    "u1": {"id": "u1", "name": "alice"},
                    "u2": {"id": "u2", "name": "bob"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(playlist.tracks_per_shared_count[&2].len(), 1);
        assert!(playlist.tracks_per_shared_count[&3].is_empty());
        assert_eq!(playlist.user_ids_per_shared_tracks["X"], vec!["u1", "u2"]);
        assert_eq!(playlist.metadata().kind, "shared");
    }

    #[test]
    fn created_playlist_accepts_legacy_url_key() {
        let created: CreatedPlaylist = serde_json::from_str(
            r#"{"name": "Road trip - Songs in common", "spotify_url": "https://open.spotify.com/playlist/1"}"#,
        )
        .unwrap();
        assert_eq!(created.url, "https://open.spotify.com/playlist/1");
        assert!(created.id.is_none());
    }

    #[test]
    fn add_request_body_shape() {
        let body = AddPlaylistRequest {
            shared_user_count: vec![3, 4],
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"shared_user_count":[3,4]}"#
        );
    }

    fn metadata(id: &str, rank: u32, rank_for_type: u32) -> PlaylistMetadata {
        PlaylistMetadata {
            id: id.to_string(),
            name: id.to_string(),
            kind: "popularity".to_string(),
            rank,
            rank_for_type,
            shared_track_count: 0,
        }
    }

    #[test]
    fn playlists_ordered_within_rank() {
        let listing: HashMap<String, PlaylistMetadata> = [
            metadata("unpopular", 2, 1),
            metadata("shared", 1, 0),
            metadata("popular", 2, 0),
            metadata("b", 3, 0),
            metadata("a", 3, 0),
        ]
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

        let ids: Vec<String> = ordered_playlists(listing.into_values())
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["shared", "popular", "unpopular", "a", "b"]);
    }

    #[test]
    fn parses_rank_for_type() {
        let parsed: PlaylistMetadata = serde_json::from_str(
            r#"{"id": "p2", "name": "Dance", "type": "audio_features", "rank": 3, "rank_for_type": 2, "shared_track_count": 12}"#,
        )
        .unwrap();
        assert_eq!(parsed.rank_for_type, 2);
        assert_eq!(parsed.kind, "audio_features");
    }
}
