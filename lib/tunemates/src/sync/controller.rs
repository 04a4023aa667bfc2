//! Polling lifecycle of a single room.
//!
//! Every transition happens under one short critical section on [`Inner`], which
//! is never held across an `.await`. Fetches and timers run as spawned tasks and
//! carry the generation they were started in; a completion whose generation no
//! longer matches is dropped, which is how teardown and room switches discard
//! late responses.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use shared::room::Room;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cadence::next_poll_delay;
use super::state::{JobConfirmation, RoomSyncState, SyncError, SyncPhase};
use crate::config::SyncConfig;
use crate::error::{Result, TunematesError};
use crate::traits::RoomBackend;

struct Inner {
    room_id: Option<String>,
    generation: u64,
    phase: SyncPhase,
    /// The only timer slot. Cleared before every re-arm.
    timer: Option<JoinHandle<()>>,
    /// Identifies the armed timer, a stale one that already woke must not fetch.
    timer_seq: u64,
    in_flight: Option<JoinHandle<()>>,
    /// Fetch again as soon as the in-flight one completes.
    refresh_queued: bool,
}

impl Inner {
    fn clear_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(request) = self.in_flight.take() {
            request.abort();
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.phase != SyncPhase::Destroyed
    }
}

struct Shared {
    backend: Arc<dyn RoomBackend>,
    config: SyncConfig,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<RoomSyncState>,
}

impl Shared {
    fn set_phase(&self, inner: &mut Inner, phase: SyncPhase) {
        inner.phase = phase;
        self.state_tx.send_modify(|state| state.phase = phase);
    }

    fn begin_fetch(self: &Arc<Self>, inner: &mut Inner) {
        let Some(room_id) = inner.room_id.clone() else {
            return;
        };
        inner.clear_timer();
        inner.refresh_queued = false;
        self.set_phase(inner, SyncPhase::Fetching);

        let generation = inner.generation;
        let shared = Arc::clone(self);
        debug!("Fetching room {} (generation {})", room_id, generation);
        inner.in_flight = Some(tokio::spawn(async move {
            let result = shared.backend.get_room(&room_id).await;
            shared.complete_fetch(generation, result);
        }));
    }

    fn complete_fetch(self: &Arc<Self>, generation: u64, result: Result<Room>) {
        let mut inner = self.inner.lock();
        if !inner.is_current(generation) {
            debug!("Discarding room response from generation {}", generation);
            return;
        }
        // Dropping our own handle detaches it, the task is finishing anyway.
        inner.in_flight = None;

        match result {
            Ok(room) => {
                self.state_tx.send_modify(|state| state.apply_room(&room));
                if inner.refresh_queued {
                    self.begin_fetch(&mut inner);
                    return;
                }
                match next_poll_delay(&room, &self.config) {
                    Some(delay) => self.arm_timer(&mut inner, delay, SyncPhase::Scheduled),
                    None => {
                        info!(
                            "Room {} settled with job status {:?}, polling stopped",
                            room.id,
                            room.job_status()
                        );
                        self.set_phase(&mut inner, SyncPhase::Settled);
                    }
                }
            }
            Err(TunematesError::Unauthenticated) => {
                warn!("Session rejected while polling room, stopping");
                inner.refresh_queued = false;
                self.state_tx
                    .send_modify(|state| state.error = Some(SyncError::Unauthenticated));
                self.set_phase(&mut inner, SyncPhase::Unauthenticated);
            }
            Err(e) => {
                warn!("Failed to fetch room state: {}", e);
                let error = SyncError::from(&e);
                self.state_tx.send_modify(|state| state.error = Some(error));
                if inner.refresh_queued {
                    self.begin_fetch(&mut inner);
                    return;
                }
                let delay = self.config.in_progress_interval;
                self.arm_timer(&mut inner, delay, SyncPhase::Errored);
            }
        }
    }

    fn arm_timer(self: &Arc<Self>, inner: &mut Inner, delay: Duration, phase: SyncPhase) {
        inner.clear_timer();
        inner.timer_seq += 1;
        let (generation, seq) = (inner.generation, inner.timer_seq);
        let shared = Arc::clone(self);
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.on_timer(generation, seq);
        }));
        self.set_phase(inner, phase);
    }

    fn on_timer(self: &Arc<Self>, generation: u64, seq: u64) {
        let mut inner = self.inner.lock();
        if !inner.is_current(generation) || inner.timer_seq != seq || inner.timer.is_none() {
            return;
        }
        // Our own slot: take it so begin_fetch does not abort the running task.
        inner.timer = None;
        self.begin_fetch(&mut inner);
    }
}

/// Keeps one room's state mirrored from the backend.
///
/// Methods that start work spawn tokio tasks and must be called from within a
/// tokio runtime. Dropping the controller tears it down like [`stop`](Self::stop).
pub struct RoomSyncController {
    shared: Arc<Shared>,
}

impl RoomSyncController {
    pub fn new(backend: Arc<dyn RoomBackend>, config: SyncConfig) -> Self {
        let (state_tx, _) = watch::channel(RoomSyncState::default());
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                inner: Mutex::new(Inner {
                    room_id: None,
                    generation: 0,
                    phase: SyncPhase::Idle,
                    timer: None,
                    timer_seq: 0,
                    in_flight: None,
                    refresh_queued: false,
                }),
                state_tx,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock()
    }

    /// Starts syncing `room_id`.
    ///
    /// Calling it again for the same room while a fetch or a poll is pending
    /// does nothing. A different room id resets everything.
    pub fn start(&self, room_id: &str) {
        let mut inner = self.lock();
        if inner.phase == SyncPhase::Destroyed {
            warn!("Ignoring start for room {} on a stopped controller", room_id);
            return;
        }

        if inner.room_id.as_deref() == Some(room_id) {
            if matches!(inner.phase, SyncPhase::Fetching | SyncPhase::Scheduled) {
                debug!("Room {} is already being synced", room_id);
                return;
            }
        } else {
            if let Some(previous) = inner.room_id.as_deref() {
                info!("Switching room sync from {} to {}", previous, room_id);
            } else {
                info!("Starting room sync for {}", room_id);
            }
            inner.clear_timer();
            inner.abort_in_flight();
            inner.generation += 1;
            inner.room_id = Some(room_id.to_string());
            self.shared
                .state_tx
                .send_replace(RoomSyncState::for_room(room_id));
        }

        self.shared.begin_fetch(&mut inner);
    }

    /// Fetches the room now. A fetch already in flight absorbs the call.
    pub fn refresh(&self) -> Result<()> {
        let mut inner = self.lock();
        match inner.phase {
            SyncPhase::Destroyed => Err(TunematesError::Destroyed),
            _ if inner.room_id.is_none() => Err(TunematesError::NotStarted),
            SyncPhase::Fetching => Ok(()),
            _ => {
                self.shared.begin_fetch(&mut inner);
                Ok(())
            }
        }
    }

    /// Asks the backend to start finding common music, then refreshes.
    ///
    /// Starting the job locks the room to new members, hence the
    /// [`JobConfirmation`]. On failure the last snapshot is kept and only its
    /// error flag changes.
    pub async fn trigger_job(&self, _confirmation: JobConfirmation) -> Result<()> {
        let (room_id, generation) = {
            let inner = self.lock();
            if inner.phase == SyncPhase::Destroyed {
                return Err(TunematesError::Destroyed);
            }
            let room_id = inner.room_id.clone().ok_or(TunematesError::NotStarted)?;
            (room_id, inner.generation)
        };

        let result = self.shared.backend.start_job(&room_id).await;

        let mut inner = self.lock();
        if !inner.is_current(generation) {
            debug!("Room changed while starting the job, not refreshing");
            return result;
        }

        match result {
            Ok(()) => {
                info!("Common music search started for room {}", room_id);
                self.shared.state_tx.send_modify(|state| state.error = None);
                if inner.phase == SyncPhase::Fetching {
                    inner.refresh_queued = true;
                } else {
                    self.shared.begin_fetch(&mut inner);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start common music search for room {}: {}", room_id, e);
                let error = SyncError::from(&e);
                self.shared
                    .state_tx
                    .send_modify(|state| state.error = Some(error));
                if matches!(e, TunematesError::Unauthenticated) {
                    inner.clear_timer();
                    inner.abort_in_flight();
                    inner.refresh_queued = false;
                    self.shared.set_phase(&mut inner, SyncPhase::Unauthenticated);
                }
                Err(e)
            }
        }
    }

    /// Tears the controller down: cancels the timer and drops any late response.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if inner.phase == SyncPhase::Destroyed {
            return;
        }
        inner.clear_timer();
        inner.abort_in_flight();
        inner.generation += 1;
        inner.refresh_queued = false;
        self.shared.set_phase(&mut inner, SyncPhase::Destroyed);
        if let Some(room_id) = inner.room_id.as_deref() {
            info!("Stopped room sync for {}", room_id);
        }
    }

    pub fn snapshot(&self) -> RoomSyncState {
        self.shared.state_tx.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RoomSyncState> {
        self.shared.state_tx.subscribe()
    }

    pub fn room_id(&self) -> Option<String> {
        self.lock().room_id.clone()
    }
}

impl Drop for RoomSyncController {
    fn drop(&mut self) {
        self.stop();
    }
}
