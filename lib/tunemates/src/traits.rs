use std::collections::HashMap;

use async_trait::async_trait;
use shared::{
    playlist::{CreatedPlaylist, Playlist, PlaylistMetadata},
    room::{Member, Room},
};

use crate::error::Result;

/// The remote rooms service: rooms and their members, the matching job and
/// its playlists.
#[async_trait]
pub trait RoomBackend: Send + Sync {
    /// Profile of the logged in member.
    async fn current_user(&self) -> Result<Member>;

    /// Rooms the logged in member belongs to, pending and processed ones.
    async fn list_rooms(&self) -> Result<Vec<Room>>;

    /// Creates a room owned by the caller and returns its id. `None` lets the
    /// backend name it.
    async fn create_room(&self, name: Option<&str>) -> Result<String>;

    /// Adds the caller to the room. Joining a room twice is accepted, joining a
    /// locked one is refused by the backend.
    async fn join_room(&self, room_id: &str) -> Result<()>;

    async fn get_room(&self, room_id: &str) -> Result<Room>;

    /// Starts the "find common music" job. The backend locks the room to new
    /// members as a side effect.
    async fn start_job(&self, room_id: &str) -> Result<()>;

    async fn list_playlists(&self, room_id: &str) -> Result<HashMap<String, PlaylistMetadata>>;

    async fn get_playlist(&self, room_id: &str, playlist_id: &str) -> Result<Playlist>;

    /// Creates a playlist on the caller's streaming account from the given
    /// shared-count groups.
    async fn create_playlist(
        &self,
        room_id: &str,
        playlist_id: &str,
        shared_counts: &[u32],
    ) -> Result<CreatedPlaylist>;

    async fn health_check(&self) -> bool;
}
