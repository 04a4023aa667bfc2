use std::time::Duration;

use shared::room::{JobStatus, Room};

use crate::config::SyncConfig;

/// Delay before the next room poll, `None` once there is nothing left to observe.
pub fn next_poll_delay(room: &Room, config: &SyncConfig) -> Option<Duration> {
    match room.job_status() {
        JobStatus::InProgress { .. } => Some(config.in_progress_interval),
        // Still open: members may join or the job may get started by someone else.
        JobStatus::NotStarted if !room.locked => Some(config.waiting_interval),
        JobStatus::NotStarted | JobStatus::Done { .. } => None,
    }
}
