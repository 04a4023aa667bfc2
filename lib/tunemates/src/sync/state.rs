use chrono::{DateTime, Utc};
use shared::room::{JobStatus, Member, Room};
use thiserror::Error;

use crate::error::TunematesError;

/// Where a [`RoomSyncController`](super::RoomSyncController) is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    /// One room request is in flight.
    Fetching,
    /// The next poll timer is armed.
    Scheduled,
    /// Nothing left to observe, polling stopped.
    Settled,
    /// The last poll failed; a retry is armed.
    Errored,
    /// The backend rejected the session; polling stopped until re-authentication.
    Unauthenticated,
    Destroyed,
}

/// Error flag exposed to the UI. Mirrors [`TunematesError`] in a cloneable form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Not authenticated, log in again")]
    Unauthenticated,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Finding common music failed, start it again")]
    JobFailed,

    #[error("{0}")]
    Other(String),
}

impl From<&TunematesError> for SyncError {
    fn from(error: &TunematesError) -> Self {
        match error {
            TunematesError::Unauthenticated => SyncError::Unauthenticated,
            TunematesError::Network(e) => SyncError::Network(e.to_string()),
            TunematesError::Api { status, message } => SyncError::Api {
                status: *status,
                message: message.clone(),
            },
            TunematesError::JobFailed => SyncError::JobFailed,
            other => SyncError::Other(other.to_string()),
        }
    }
}

/// Snapshot of a room as last seen by the controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomSyncState {
    pub room_id: Option<String>,
    pub room_name: String,
    pub locked: bool,
    pub is_owner: bool,
    pub members: Vec<Member>,
    pub job_status: JobStatus,
    pub progress_percent: u8,
    pub phase: SyncPhase,
    pub error: Option<SyncError>,
    /// Time the last successful room fetch was applied.
    pub last_updated: Option<DateTime<Utc>>,
}

impl RoomSyncState {
    pub(crate) fn for_room(room_id: &str) -> Self {
        Self {
            room_id: Some(room_id.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn apply_room(&mut self, room: &Room) {
        self.room_name = room.name.clone();
        self.locked = room.locked;
        self.is_owner = room.is_owner;
        self.members = room.users.clone();
        self.job_status = room.job_status();
        self.progress_percent = self.job_status.progress_percent();
        self.error = match self.job_status {
            JobStatus::Done { success: false } => Some(SyncError::JobFailed),
            _ => None,
        };
        self.last_updated = Some(Utc::now());
    }

    /// Whether the UI should offer to start (or restart) the matching job.
    pub fn can_trigger_job(&self) -> bool {
        matches!(
            self.job_status,
            JobStatus::NotStarted | JobStatus::Done { success: false }
        )
    }

    pub fn is_polling(&self) -> bool {
        matches!(
            self.phase,
            SyncPhase::Fetching | SyncPhase::Scheduled | SyncPhase::Errored
        )
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.phase == SyncPhase::Unauthenticated
    }
}

/// Caller's acknowledgement that starting the job locks the room to new members.
///
/// Required by [`RoomSyncController::trigger_job`](super::RoomSyncController::trigger_job);
/// only construct it after the user explicitly agreed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobConfirmation {
    _private: (),
}

impl JobConfirmation {
    pub fn confirmed() -> Self {
        Self { _private: () }
    }
}
