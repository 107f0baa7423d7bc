use {
    crate::{
        engine::CwbConfig, fence::SyncFile, format::Format, stack::OutputBuffer,
        utils::oserror::OsError,
    },
    std::{
        cell::{Cell, RefCell},
        rc::Rc,
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum FrameDumpError {
    #[error("Could not allocate a {0}x{1} dump buffer")]
    Allocate(u32, u32, #[source] OsError),
    #[error("Could not map the dump buffer")]
    Map(#[source] OsError),
}

/// Owns the memory that captured frames are written into.
pub trait FrameDumpSink {
    fn provide_buffer(
        &self,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<OutputBuffer, FrameDumpError>;

    /// Persists the frame. `retire_fence` signals when the frame was scanned out.
    fn dump(&self, buffer: &OutputBuffer, index: u32, retire_fence: Option<&SyncFile>);

    fn release(&self, buffer: &OutputBuffer);
}

/// The state of a running output dump.
#[derive(Default)]
pub struct FrameDump {
    sink: RefCell<Option<Rc<dyn FrameDumpSink>>>,
    buffer: RefCell<Option<OutputBuffer>>,
    config: Cell<CwbConfig>,
    count: Cell<u32>,
    index: Cell<u32>,
}

impl FrameDump {
    pub fn start(
        &self,
        sink: Rc<dyn FrameDumpSink>,
        buffer: OutputBuffer,
        config: CwbConfig,
        count: u32,
    ) {
        *self.sink.borrow_mut() = Some(sink);
        *self.buffer.borrow_mut() = Some(buffer);
        self.config.set(config);
        self.count.set(count);
        self.index.set(0);
    }

    pub fn is_active(&self) -> bool {
        self.buffer.borrow().is_some()
    }

    pub fn count(&self) -> u32 {
        self.count.get()
    }

    pub fn index(&self) -> u32 {
        self.index.get()
    }

    pub fn buffer(&self) -> Option<OutputBuffer> {
        self.buffer.borrow().clone()
    }

    pub fn config(&self) -> CwbConfig {
        self.config.get()
    }

    pub fn dump(&self, retire_fence: Option<&SyncFile>) {
        let sink = self.sink.borrow().clone();
        if let (Some(sink), Some(buffer)) = (sink, &*self.buffer.borrow()) {
            sink.dump(buffer, self.index.get(), retire_fence);
        }
    }

    /// Moves to the next frame after a successful re-arm.
    pub fn advance(&self) {
        self.count.set(self.count.get().saturating_sub(1));
        self.index.set(self.index.get() + 1);
    }

    pub fn release(&self) {
        let buffer = self.buffer.borrow_mut().take();
        let sink = self.sink.borrow_mut().take();
        if let (Some(sink), Some(buffer)) = (sink, &buffer) {
            sink.release(buffer);
            log::info!("Released the frame dump buffer");
        }
        self.config.set(CwbConfig::default());
        self.count.set(0);
        self.index.set(0);
    }
}
