//! Client side of a collaborative music room: polling of the room state while
//! the common music job runs, and grouping of the resulting playlists by how
//! many members share each track.

pub mod aggregation;
pub mod client;
pub mod config;
pub mod error;
pub mod playlist;
pub mod sync;
pub mod traits;

pub use aggregation::{
    compute_grouping, compute_playlist_grouping, filter_by_members, Grouping, Threshold,
    ThresholdSelection,
};
pub use client::{RoomsClient, RoomsClientBuilder};
pub use config::{ClientConfig, SyncConfig};
pub use error::{Result, TunematesError};
pub use playlist::PlaylistSession;
pub use sync::{JobConfirmation, RoomSyncController, RoomSyncState, SyncError, SyncPhase};
pub use traits::RoomBackend;
