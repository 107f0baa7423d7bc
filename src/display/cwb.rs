use {
    crate::{
        display::HwcDisplay,
        engine::{CwbConfig, PowerMode},
        error::{EngineError, HwcError},
        fence::SyncFile,
        format::{BufferInfo, Format},
        readback::{
            CwbClient, CwbStatus, CwbWait, ReadbackCoordinator, frame_dump::FrameDumpSink,
        },
        stack::OutputBuffer,
        utils::errorfmt::ErrorFmt,
    },
    std::{rc::Rc, sync::Arc, time::Duration},
};

impl HwcDisplay {
    /// The coordinator shared with the thread that reports writeback
    /// completions.
    pub fn readback(&self) -> &Arc<ReadbackCoordinator> {
        &self.readback
    }

    /// Configures a capture of the next committed frame into `buffer`.
    pub fn set_readback_buffer(
        &self,
        buffer: &BufferInfo,
        acquire_fence: Option<SyncFile>,
        config: CwbConfig,
        client: CwbClient,
    ) -> Result<(), HwcError> {
        if matches!(
            self.power_mode.get(),
            PowerMode::Off | PowerMode::DozeSuspend
        ) {
            log::warn!("Display {}: Writeback requested while powered off", self.id);
            return Err(HwcError::BadDisplay);
        }
        if self.secure_event.get().is_some() {
            log::warn!(
                "Display {}: Writeback is not supported during a secure transition",
                self.id
            );
            return Err(HwcError::Unsupported);
        }
        if buffer.format == Format::Invalid {
            log::warn!("Display {}: Invalid writeback format", self.id);
            return Err(HwcError::BadParameter);
        }
        if !self.engine.is_writeback_supported_format(buffer.format) {
            log::warn!(
                "Display {}: Writeback does not support {:?}",
                self.id,
                buffer.format
            );
            return Err(HwcError::BadParameter);
        }
        let output = OutputBuffer {
            handle_id: buffer.handle_id,
            info: *buffer,
            acquire_fence,
        };
        if let Err(e) = self.engine.capture_cwb(&output, &config) {
            return Err(match e {
                EngineError::Parameters => {
                    log::error!("Display {}: Invalid writeback parameters", self.id);
                    HwcError::BadParameter
                }
                EngineError::ShutDown => {
                    log::warn!("Display {} is not registered for writeback", self.id);
                    HwcError::Unsupported
                }
                EngineError::Resources => {
                    log::warn!("Display {}: The writeback block is busy", self.id);
                    HwcError::Unsupported
                }
                e => {
                    log::warn!(
                        "Display {}: Writeback is not supported: {}",
                        self.id,
                        ErrorFmt(e)
                    );
                    HwcError::Unsupported
                }
            });
        }
        self.readback.register(output.handle_id, client);
        log::debug!(
            "Display {}: Configured writeback buffer {} for {:?}",
            self.id,
            output.handle_id,
            client
        );
        *self.pending_output.borrow_mut() = Some(output);
        Ok(())
    }

    fn current_output(&self) -> Option<u64> {
        self.stack
            .borrow()
            .output_buffer
            .as_ref()
            .map(|b| b.handle_id)
    }

    pub fn readback_fence_for_client(&self, client: CwbClient) -> (CwbStatus, Option<SyncFile>) {
        let engine_fence = self.engine.output_buffer_acquire_fence();
        self.readback
            .fence_for_client(client, self.current_output(), engine_fence)
    }

    /// The fence of the last capture requested by the composer client.
    pub fn readback_buffer_fence(&self) -> Result<SyncFile, HwcError> {
        let (status, fence) = self.readback_fence_for_client(CwbClient::Composer);
        match fence {
            Some(f) => Ok(f),
            None => {
                log::warn!(
                    "Display {}: Readback fence not available: {:?}",
                    self.id,
                    status
                );
                Err(HwcError::Unsupported)
            }
        }
    }

    pub fn notify_cwb_done(&self, status: i32, handle_id: u64, release_fence: Option<SyncFile>) {
        self.readback
            .notify_cwb_done(status, handle_id, release_fence);
    }

    pub(super) fn handle_frame_output(&self) {
        match self.readback.frame_output_client(self.current_output()) {
            CwbClient::Color => self.handle_color_capture(),
            CwbClient::FrameDump => self.handle_frame_dump(),
            _ => {}
        }
    }

    fn cwb_wait(&self) -> Duration {
        Duration::from_millis(self.config.cwb_wait_ms)
    }

    pub fn set_frame_dump_config(
        &self,
        count: u32,
        output_dump: bool,
        format: Format,
        config: CwbConfig,
        sink: Rc<dyn FrameDumpSink>,
    ) -> Result<(), HwcError> {
        if self.secure_event.get().is_some() {
            log::warn!(
                "Display {}: Frame dumps are not supported during a secure transition",
                self.id
            );
            return Ok(());
        }
        if count == 0 {
            log::warn!("Display {}: Requested a dump of 0 frames", self.id);
            return Ok(());
        }
        if output_dump && self.frame_dump.is_active() {
            log::warn!("Display {}: A frame dump is already running", self.id);
            return Ok(());
        }
        if let Some(tm) = &self.tone_mapper {
            tm.set_frame_dump_config(count);
        }
        log::info!(
            "Display {}: Dumping {} frames, output dump {}",
            self.id,
            count,
            output_dump
        );
        if !output_dump {
            return Ok(());
        }
        let (width, height) = match self.engine.cwb_buffer_resolution(&config) {
            Ok(r) => r,
            Err(e) => {
                log::warn!(
                    "Display {}: Could not get the writeback resolution: {}",
                    self.id,
                    ErrorFmt(e)
                );
                return Err(HwcError::BadConfig);
            }
        };
        let buffer = match sink.provide_buffer(width, height, format) {
            Ok(b) => b,
            Err(e) => {
                log::error!(
                    "Display {}: Could not allocate the dump buffer: {}",
                    self.id,
                    ErrorFmt(e)
                );
                return Err(HwcError::NoResources);
            }
        };
        let info = buffer.info;
        self.frame_dump.start(sink, buffer, config, count);
        if let Err(e) = self.set_readback_buffer(&info, None, config, CwbClient::FrameDump) {
            self.frame_dump.release();
            return Err(e);
        }
        Ok(())
    }

    fn handle_frame_dump(&self) {
        if self.frame_dump.count() == 0 {
            return;
        }
        let status = match self
            .readback
            .wait_for_completion(CwbClient::FrameDump, self.cwb_wait())
        {
            CwbWait::Done(status, _) => status,
            CwbWait::NotNotified => {
                log::warn!(
                    "Display {}: Writeback notification timed out, retrying in the next cycle",
                    self.id
                );
                return;
            }
            CwbWait::Absent => return,
        };
        let index = self.frame_dump.index();
        match status {
            CwbStatus::Signaled | CwbStatus::TimedOut => {
                // A fence timeout means that the capture waited for a second.
                // The buffer is assumed to be written by then.
                let stack = self.stack.borrow();
                self.frame_dump.dump(stack.retire_fence.as_ref());
                if status == CwbStatus::TimedOut {
                    log::warn!(
                        "Display {}: Frame {} might be empty after a fence timeout",
                        self.id,
                        index
                    );
                }
            }
            _ => log::warn!(
                "Display {}: Dropped frame {} after a power or teardown event",
                self.id,
                index
            ),
        }
        let mut stop = self.frame_dump.count() <= 1;
        if !stop {
            let Some(buffer) = self.frame_dump.buffer() else {
                return;
            };
            let config = self.frame_dump.config();
            match self.set_readback_buffer(&buffer.info, None, config, CwbClient::FrameDump) {
                Ok(()) => self.frame_dump.advance(),
                Err(e) => {
                    log::warn!(
                        "Display {}: Stopped dumping {} frames from index {}: {}",
                        self.id,
                        self.frame_dump.count(),
                        index,
                        ErrorFmt(e)
                    );
                    stop = true;
                }
            }
        }
        if stop {
            self.frame_dump.release();
        }
    }

    pub fn frame_dump_count(&self) -> u32 {
        self.frame_dump.count()
    }

    pub fn is_frame_dump_active(&self) -> bool {
        self.frame_dump.is_active()
    }

    /// Requests a capture for color calibration.
    pub fn request_color_capture(
        &self,
        buffer: &BufferInfo,
        config: CwbConfig,
    ) -> Result<(), HwcError> {
        self.color_capture_status.set(None);
        self.set_readback_buffer(buffer, None, config, CwbClient::Color)
    }

    fn handle_color_capture(&self) {
        match self
            .readback
            .wait_for_completion(CwbClient::Color, self.cwb_wait())
        {
            CwbWait::Done(status, _) => {
                log::debug!("Display {}: Color capture finished: {:?}", self.id, status);
                self.color_capture_status.set(Some(status));
            }
            CwbWait::NotNotified => log::warn!(
                "Display {}: Color capture not notified yet",
                self.id
            ),
            CwbWait::Absent => {}
        }
    }

    pub fn color_capture_status(&self) -> Option<CwbStatus> {
        self.color_capture_status.get()
    }

    /// Drops pending captures. The dump buffer is kept while the engine still
    /// writes into it.
    pub fn teardown_concurrent_writeback(&self) -> Result<(), EngineError> {
        if !self.engine.handle_cwb_teardown() {
            return Err(EngineError::NotSupported);
        }
        if !self.readback.has_pending_requests() {
            self.color_capture_status.set(None);
            self.frame_dump.release();
        }
        Ok(())
    }
}
