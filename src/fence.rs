use {
    crate::utils::{errorfmt::ErrorFmt, oserror::OsError},
    std::{slice, sync::Arc},
    thiserror::Error,
    uapi::{OwnedFd, c},
};

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum FenceError {
    #[error("Could not poll the sync file")]
    Poll(#[source] OsError),
}

/// A sync file that becomes readable once the associated work completes.
#[derive(Clone, Debug)]
pub struct SyncFile(pub Arc<OwnedFd>);

impl SyncFile {
    pub fn new(fd: OwnedFd) -> Self {
        Self(Arc::new(fd))
    }

    pub fn raw(&self) -> c::c_int {
        self.0.raw()
    }

    /// Waits at most `timeout_ms` milliseconds. A negative timeout waits
    /// forever. Returns whether the fence signaled.
    pub fn wait(&self, timeout_ms: i32) -> Result<bool, FenceError> {
        let mut pollfd = c::pollfd {
            fd: self.raw(),
            events: c::POLLIN,
            revents: 0,
        };
        loop {
            match uapi::poll(slice::from_mut(&mut pollfd), timeout_ms) {
                Ok(n) => return Ok(n > 0),
                Err(e) if e.0 == c::EINTR => continue,
                Err(e) => return Err(FenceError::Poll(e.into())),
            }
        }
    }

    pub fn is_signaled(&self) -> bool {
        matches!(self.wait(0), Ok(true))
    }

    pub fn same(&self, other: &SyncFile) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Waits for an optional fence without a timeout. Failures are logged.
pub fn wait_forever(fence: Option<&SyncFile>) {
    if let Some(fence) = fence
        && let Err(e) = fence.wait(-1)
    {
        log::warn!("Could not wait for fence: {}", ErrorFmt(e));
    }
}
