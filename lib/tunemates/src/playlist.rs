use std::sync::Arc;

use shared::playlist::{CreatedPlaylist, Playlist};
use tracing::{debug, info};

use crate::aggregation::{self, Grouping, ThresholdSelection};
use crate::error::{Result, TunematesError};
use crate::traits::RoomBackend;

/// A loaded playlist of a room with its grouping and the user's threshold.
pub struct PlaylistSession {
    backend: Arc<dyn RoomBackend>,
    room_id: String,
    playlist: Playlist,
    grouping: Grouping,
}

impl PlaylistSession {
    /// Fetches the playlist and groups its tracks with the default threshold.
    pub async fn load(
        backend: Arc<dyn RoomBackend>,
        room_id: &str,
        playlist_id: &str,
    ) -> Result<Self> {
        let playlist = backend.get_playlist(room_id, playlist_id).await?;
        let grouping = aggregation::compute_playlist_grouping(&playlist)?;
        debug!(
            "Loaded playlist {} of room {} with {} shared tracks",
            playlist.id,
            room_id,
            grouping.total_track_count()
        );
        Ok(Self {
            backend,
            room_id: room_id.to_string(),
            playlist,
            grouping,
        })
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    /// Threshold of the session, `None` when no track is shared.
    pub fn selection_mut(&mut self) -> Option<&mut ThresholdSelection> {
        self.grouping.selection_mut()
    }

    /// View restricted to tracks every one of `member_ids` holds.
    pub fn filter_by_members<S: AsRef<str>>(&self, member_ids: &[S]) -> Result<Grouping> {
        aggregation::filter_by_members(
            &self.grouping,
            &self.playlist.user_ids_per_shared_tracks,
            member_ids,
        )
    }

    /// Creates the playlist on the provider from the selected shared counts.
    pub async fn create_provider_playlist(&self) -> Result<CreatedPlaylist> {
        let counts = self
            .grouping
            .selection()
            .map(ThresholdSelection::counts_to_include)
            .unwrap_or_default();
        if counts.is_empty() {
            return Err(TunematesError::MalformedInput(
                "no shared count selected for the playlist".to_string(),
            ));
        }

        let created = self
            .backend
            .create_playlist(&self.room_id, &self.playlist.id, &counts)
            .await?;
        info!("Created provider playlist \"{}\" at {}", created.name, created.url);
        Ok(created)
    }
}
