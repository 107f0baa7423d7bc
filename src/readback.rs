//! Concurrent writeback bookkeeping.
//!
//! Three parties meet here: the display thread that configures a capture and
//! later asks for its fence, the engine thread that reports completion, and
//! blocking consumers such as frame dumps. The two maps are only touched under
//! the coordinator's lock.

use {
    crate::{display::DisplayId, fence::SyncFile},
    ahash::AHashMap,
    parking_lot::{Condvar, Mutex},
    std::{
        sync::Arc,
        time::{Duration, Instant},
    },
    uapi::c,
};

pub mod frame_dump;
#[cfg(test)]
mod tests;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CwbStatus {
    Signaled,
    /// The fence was taken from the engine but completion was not reported yet.
    NotChecked,
    TimedOut,
    Pending,
    NotAvailable,
    UnknownError,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CwbClient {
    None,
    Composer,
    FrameDump,
    Color,
    External,
}

#[derive(Clone, Debug)]
struct CwbResponse {
    handle_id: u64,
    status: CwbStatus,
    release_fence: Option<SyncFile>,
}

#[derive(Default)]
struct CwbState {
    buffer_map: AHashMap<u64, CwbClient>,
    status_map: AHashMap<CwbClient, CwbResponse>,
}

/// Receives completions for captures requested by external clients.
pub trait CwbEventHandler: Send + Sync {
    /// Returns `true` if the completion was fully delivered.
    fn notify_cwb_done(&self, display: DisplayId, status: i32, handle_id: u64) -> bool;
}

#[derive(Clone, Debug)]
pub enum CwbWait {
    /// No capture is recorded for the client.
    Absent,
    /// Completion was not reported within the timeout. The entry is kept.
    NotNotified,
    Done(CwbStatus, Option<SyncFile>),
}

pub struct ReadbackCoordinator {
    display: DisplayId,
    state: Mutex<CwbState>,
    cv: Condvar,
    handler: Option<Arc<dyn CwbEventHandler>>,
}

impl ReadbackCoordinator {
    pub fn new(display: DisplayId, handler: Option<Arc<dyn CwbEventHandler>>) -> Arc<Self> {
        Arc::new(Self {
            display,
            state: Default::default(),
            cv: Default::default(),
            handler,
        })
    }

    /// Records a configured capture. A stale response of the client for the
    /// same buffer is dropped.
    pub fn register(&self, handle_id: u64, client: CwbClient) {
        let mut state = self.state.lock();
        state.buffer_map.insert(handle_id, client);
        if state
            .status_map
            .get(&client)
            .is_some_and(|r| r.handle_id == handle_id)
        {
            state.status_map.remove(&client);
        }
    }

    /// Hands out the release fence of the client's capture at most once.
    ///
    /// `engine_fence` is the fence of the most recent writeback as reported by
    /// the engine. `current_output` is the buffer configured in the last stack.
    pub fn fence_for_client(
        &self,
        client: CwbClient,
        current_output: Option<u64>,
        engine_fence: Option<SyncFile>,
    ) -> (CwbStatus, Option<SyncFile>) {
        if client == CwbClient::None {
            log::error!("Invalid writeback client");
            return (CwbStatus::UnknownError, None);
        }
        let mut fence = engine_fence;
        let mut handle_id = 0;
        let mut status = CwbStatus::Signaled;
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some(resp) = state.status_map.get(&client).filter(|r| r.handle_id != 0) {
                handle_id = resp.handle_id;
                if resp.status != CwbStatus::NotChecked {
                    fence = resp.release_fence.clone();
                }
                status = resp.status;
            } else if let Some(output) = current_output {
                if state.buffer_map.get(&output) == Some(&client) {
                    handle_id = output;
                    status = CwbStatus::NotChecked;
                }
            } else {
                if let Some((id, _)) = state.buffer_map.iter().find(|(_, c)| **c == client) {
                    handle_id = *id;
                }
                fence = None;
            }
            if fence.is_some() {
                state.buffer_map.remove(&handle_id);
                state.status_map.remove(&client);
            }
        }
        if handle_id == 0 {
            log::trace!("No writeback fence available for {:?}", client);
            return (CwbStatus::NotAvailable, None);
        }
        if fence.is_none() {
            log::trace!("Writeback fence of buffer {} not available yet", handle_id);
            status = CwbStatus::Pending;
        }
        match status {
            CwbStatus::NotChecked | CwbStatus::TimedOut => {
                log::debug!(
                    "Writeback of buffer {} for {:?} not yet notified or timed out",
                    handle_id,
                    client,
                );
            }
            CwbStatus::UnknownError => {
                log::error!("Writeback of buffer {} for {:?} failed", handle_id, client);
            }
            _ => {}
        }
        (status, fence)
    }

    /// Records the completion of a capture.
    ///
    /// `status` is 0 on success and `-ETIME` if the writeback fence timed out.
    pub fn notify_cwb_done(&self, status: i32, handle_id: u64, release_fence: Option<SyncFile>) {
        let mut state = self.state.lock();
        let Some(client) = state.buffer_map.remove(&handle_id) else {
            log::trace!("Writeback buffer {} is not registered", handle_id);
            return;
        };
        let cwb_status = match status {
            0 => CwbStatus::Signaled,
            s if s == -c::ETIME => CwbStatus::TimedOut,
            _ => CwbStatus::UnknownError,
        };
        state.status_map.insert(
            client,
            CwbResponse {
                handle_id,
                status: cwb_status,
                release_fence,
            },
        );
        match client {
            CwbClient::FrameDump | CwbClient::Color => {
                self.cv.notify_one();
            }
            CwbClient::External => {
                if let Some(handler) = &self.handler
                    && handler.notify_cwb_done(self.display, status, handle_id)
                {
                    state.status_map.remove(&client);
                }
            }
            _ => {}
        }
        drop(state);
        log::debug!(
            "Writeback of buffer {} for {:?} completed: {:?}",
            handle_id,
            client,
            cwb_status,
        );
    }

    /// Correlates the output buffer of a finished commit with its client.
    pub fn frame_output_client(&self, current_output: Option<u64>) -> CwbClient {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match current_output {
            Some(handle_id) => {
                if let Some(&client) = state.buffer_map.get(&handle_id) {
                    state.status_map.insert(
                        client,
                        CwbResponse {
                            handle_id,
                            status: CwbStatus::NotChecked,
                            release_fence: None,
                        },
                    );
                    return client;
                }
                state
                    .status_map
                    .iter()
                    .find(|(_, r)| r.handle_id == handle_id)
                    .map(|(c, _)| *c)
                    .unwrap_or(CwbClient::None)
            }
            None => state
                .status_map
                .iter()
                .find(|(_, r)| r.handle_id != 0)
                .map(|(c, _)| *c)
                .unwrap_or(CwbClient::None),
        }
    }

    /// Waits until the completion of the client's capture has been reported
    /// and takes the response.
    pub fn wait_for_completion(&self, client: CwbClient, timeout: Duration) -> CwbWait {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            let Some(resp) = state.status_map.get(&client) else {
                return CwbWait::Absent;
            };
            if resp.status != CwbStatus::NotChecked {
                let status = resp.status;
                let fence = resp.release_fence.clone();
                state.status_map.remove(&client);
                return CwbWait::Done(status, fence);
            }
            if Instant::now() >= deadline {
                return CwbWait::NotNotified;
            }
            self.cv.wait_until(&mut state, deadline);
        }
    }

    pub fn has_pending_requests(&self) -> bool {
        !self.state.lock().buffer_map.is_empty()
    }

    pub fn is_registered(&self, handle_id: u64) -> bool {
        self.state.lock().buffer_map.contains_key(&handle_id)
    }

    pub fn status_of(&self, client: CwbClient) -> Option<CwbStatus> {
        self.state.lock().status_map.get(&client).map(|r| r.status)
    }
}
