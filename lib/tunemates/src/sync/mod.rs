mod cadence;
mod controller;
mod state;

pub use cadence::next_poll_delay;
pub use controller::RoomSyncController;
pub use state::{JobConfirmation, RoomSyncState, SyncError, SyncPhase};
