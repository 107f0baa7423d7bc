//! Deterministic collaborators for tests and the `hwc-sim` binary.
//!
//! Every call is counted. Results can be scripted per call through the
//! public fields.

use {
    crate::{
        callbacks::{CallbackSink, VsyncPeriodChangeTimeline},
        display::DisplayId,
        engine::{
            CwbConfig, DisplayEngine, DisplayInfo, PowerMode, PrepareStatus, SecureEvent,
            VariableConfig,
        },
        error::EngineError,
        fence::SyncFile,
        flags::{BF_HDR, LF_CURSOR, LF_SKIP, LR_FLIP_BUFFER, LR_TONE_MAP, StackFlags},
        format::{BufferInfo, Format},
        layer::EngineComposition,
        readback::frame_dump::{FrameDumpError, FrameDumpSink},
        stack::{LayerStackSnapshot, OutputBuffer},
        tone_map::ToneMapper,
        utils::numcell::NumCell,
    },
    std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
    },
    uapi::c,
};

/// Creates an already signaled fence.
pub fn signaled_fence() -> Option<SyncFile> {
    match uapi::eventfd(1, c::EFD_CLOEXEC) {
        Ok(fd) => Some(SyncFile::new(fd)),
        Err(e) => {
            log::warn!("Could not create an eventfd: {}", e);
            None
        }
    }
}

#[derive(Default)]
pub struct SimCalls {
    pub prepare: NumCell<u32>,
    pub commit_or_prepare: NumCell<u32>,
    pub commit: NumCell<u32>,
    pub flush: NumCell<u32>,
    pub destroy_layer: NumCell<u32>,
    pub set_color_mode: NumCell<u32>,
    pub set_color_mode_by_id: NumCell<u32>,
    pub set_color_transform: NumCell<u32>,
    pub set_display_state: NumCell<u32>,
    pub set_vsync_state: NumCell<u32>,
    pub set_cursor_position: NumCell<u32>,
    pub set_active_config: NumCell<u32>,
    pub capture_cwb: NumCell<u32>,
    pub handle_secure_event: NumCell<u32>,
}

pub struct SimEngine {
    pub calls: SimCalls,
    pub info: Cell<DisplayInfo>,
    /// Consumed front to back. An empty queue means success.
    pub prepare_results: RefCell<VecDeque<Result<PrepareStatus, EngineError>>>,
    pub commit_results: RefCell<VecDeque<Result<(), EngineError>>>,
    /// Composes every layer on the GPU.
    pub gpu_composition: Cell<bool>,
    pub flip_client_target: Cell<bool>,
    pub tone_map_hdr: Cell<bool>,
    pub validated: Cell<bool>,
    pub demura: Cell<bool>,
    pub color_modes: RefCell<Vec<(String, Vec<(String, String)>)>>,
    pub applied_color_modes: RefCell<Vec<String>>,
    pub color_mode_error: Cell<Option<EngineError>>,
    pub color_transform: Cell<[f64; 16]>,
    pub color_transform_error: Cell<Option<EngineError>>,
    pub power_mode: Cell<PowerMode>,
    pub power_error: Cell<Option<EngineError>>,
    pub vsync_error: Cell<Option<EngineError>>,
    pub cursor_error: Cell<Option<EngineError>>,
    pub cursor: Cell<(i32, i32)>,
    pub configs: RefCell<Vec<VariableConfig>>,
    pub active_config: Cell<u32>,
    pub config_error: Cell<Option<EngineError>>,
    pub allowed_mode_switch: Cell<u32>,
    pub frame_buffer_size: Cell<(u32, u32)>,
    pub cwb_resolution: Cell<Option<(u32, u32)>>,
    pub capture_error: Cell<Option<EngineError>>,
    pub captures: RefCell<Vec<u64>>,
    pub output_fence: RefCell<Option<SyncFile>>,
    pub refuse_cwb_teardown: Cell<bool>,
    pub secure_event_refresh: Cell<bool>,
    pub secure_events: RefCell<Vec<SecureEvent>>,
    pub last_stack_flags: Cell<StackFlags>,
    pub last_layer_count: Cell<usize>,
    pub last_output_buffer: Cell<Option<u64>>,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self {
            calls: Default::default(),
            info: Default::default(),
            prepare_results: Default::default(),
            commit_results: Default::default(),
            gpu_composition: Cell::new(false),
            flip_client_target: Cell::new(false),
            tone_map_hdr: Cell::new(false),
            validated: Cell::new(false),
            demura: Cell::new(false),
            color_modes: Default::default(),
            applied_color_modes: Default::default(),
            color_mode_error: Cell::new(None),
            color_transform: Cell::new([0.0; 16]),
            color_transform_error: Cell::new(None),
            power_mode: Cell::new(PowerMode::Off),
            power_error: Cell::new(None),
            vsync_error: Cell::new(None),
            cursor_error: Cell::new(None),
            cursor: Cell::new((0, 0)),
            configs: RefCell::new(vec![VariableConfig {
                x_pixels: 1080,
                y_pixels: 2400,
                x_dpi: 400,
                y_dpi: 400,
                fps: 60,
                vsync_period_ns: 16_666_666,
                smart_panel: false,
            }]),
            active_config: Cell::new(0),
            config_error: Cell::new(None),
            allowed_mode_switch: Cell::new(0),
            frame_buffer_size: Cell::new((0, 0)),
            cwb_resolution: Cell::new(Some((1080, 2400))),
            capture_error: Cell::new(None),
            captures: Default::default(),
            output_fence: Default::default(),
            refuse_cwb_teardown: Cell::new(false),
            secure_event_refresh: Cell::new(false),
            secure_events: Default::default(),
            last_stack_flags: Default::default(),
            last_layer_count: Cell::new(0),
            last_output_buffer: Cell::new(None),
        }
    }
}

impl SimEngine {
    /// Adds a named mode with its attributes.
    pub fn add_color_mode(&self, name: &str, attrs: &[(&str, &str)]) {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.color_modes.borrow_mut().push((name.to_string(), attrs));
    }

    fn compose(&self, stack: &mut LayerStackSnapshot) {
        let gpu = self.gpu_composition.get();
        for layer in &mut stack.layers {
            if layer.client_target {
                if self.flip_client_target.get() {
                    layer.requests |= LR_FLIP_BUFFER;
                }
                continue;
            }
            if self.tone_map_hdr.get() && layer.buffer_flags.contains(BF_HDR) {
                layer.requests |= LR_TONE_MAP;
            }
            layer.composition = if gpu || layer.flags.contains(LF_SKIP) {
                EngineComposition::Gpu
            } else if layer.flags.contains(LF_CURSOR) {
                EngineComposition::Cursor
            } else {
                EngineComposition::Sde
            };
        }
        self.last_stack_flags.set(stack.flags);
        self.last_layer_count.set(stack.layers.len());
        self.last_output_buffer
            .set(stack.output_buffer.as_ref().map(|b| b.handle_id));
    }

    fn scripted_prepare(
        &self,
        stack: &mut LayerStackSnapshot,
    ) -> Result<PrepareStatus, EngineError> {
        let res = self
            .prepare_results
            .borrow_mut()
            .pop_front()
            .unwrap_or(Ok(PrepareStatus::Done));
        if res.is_ok() {
            self.compose(stack);
        }
        res
    }
}

fn error_or(error: &Cell<Option<EngineError>>) -> Result<(), EngineError> {
    match error.get() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl DisplayEngine for SimEngine {
    fn prepare(&self, stack: &mut LayerStackSnapshot) -> Result<PrepareStatus, EngineError> {
        self.calls.prepare.fetch_add(1);
        self.scripted_prepare(stack)
    }

    fn commit_or_prepare(
        &self,
        stack: &mut LayerStackSnapshot,
    ) -> Result<PrepareStatus, EngineError> {
        self.calls.commit_or_prepare.fetch_add(1);
        let res = self.scripted_prepare(stack)?;
        if res == PrepareStatus::Done && !stack.validate_only {
            self.commit(stack)?;
        }
        Ok(res)
    }

    fn commit(&self, stack: &mut LayerStackSnapshot) -> Result<(), EngineError> {
        self.calls.commit.fetch_add(1);
        if let Some(Err(e)) = self.commit_results.borrow_mut().pop_front() {
            return Err(e);
        }
        for layer in &mut stack.layers {
            if !layer.client_target {
                layer.release_fence = signaled_fence();
            }
        }
        stack.retire_fence = signaled_fence();
        if stack.output_buffer.is_some() {
            *self.output_fence.borrow_mut() = signaled_fence();
        }
        Ok(())
    }

    fn flush(&self, stack: &mut LayerStackSnapshot) -> Result<(), EngineError> {
        let _ = stack;
        self.calls.flush.fetch_add(1);
        Ok(())
    }

    fn destroy_layer(&self) {
        self.calls.destroy_layer.fetch_add(1);
    }

    fn is_validated(&self) -> bool {
        self.validated.get()
    }

    fn has_demura(&self) -> bool {
        self.demura.get()
    }

    fn info(&self) -> DisplayInfo {
        self.info.get()
    }

    fn color_modes(&self) -> Result<Vec<String>, EngineError> {
        Ok(self
            .color_modes
            .borrow()
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }

    fn color_mode_attrs(&self, name: &str) -> Result<Vec<(String, String)>, EngineError> {
        self.color_modes
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a.clone())
            .ok_or(EngineError::Parameters)
    }

    fn set_color_mode(&self, name: &str) -> Result<(), EngineError> {
        self.calls.set_color_mode.fetch_add(1);
        error_or(&self.color_mode_error)?;
        self.applied_color_modes.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn set_color_mode_by_id(&self, id: i32) -> Result<(), EngineError> {
        self.calls.set_color_mode_by_id.fetch_add(1);
        error_or(&self.color_mode_error)?;
        if id < 0 {
            return Err(EngineError::Parameters);
        }
        Ok(())
    }

    fn set_color_transform(&self, matrix: &[f64; 16]) -> Result<(), EngineError> {
        self.calls.set_color_transform.fetch_add(1);
        error_or(&self.color_transform_error)?;
        self.color_transform.set(*matrix);
        Ok(())
    }

    fn set_display_state(
        &self,
        state: PowerMode,
        teardown: bool,
    ) -> Result<Option<SyncFile>, EngineError> {
        let _ = teardown;
        self.calls.set_display_state.fetch_add(1);
        error_or(&self.power_error)?;
        self.power_mode.set(state);
        Ok(signaled_fence())
    }

    fn display_state(&self) -> Result<PowerMode, EngineError> {
        Ok(self.power_mode.get())
    }

    fn set_vsync_state(&self, enabled: bool) -> Result<(), EngineError> {
        let _ = enabled;
        self.calls.set_vsync_state.fetch_add(1);
        error_or(&self.vsync_error)
    }

    fn set_cursor_position(&self, x: i32, y: i32) -> Result<(), EngineError> {
        self.calls.set_cursor_position.fetch_add(1);
        error_or(&self.cursor_error)?;
        self.cursor.set((x, y));
        Ok(())
    }

    fn num_variable_configs(&self) -> Result<u32, EngineError> {
        Ok(self.configs.borrow().len() as u32)
    }

    fn variable_config(&self, index: u32) -> Result<VariableConfig, EngineError> {
        self.configs
            .borrow()
            .get(index as usize)
            .copied()
            .ok_or(EngineError::Parameters)
    }

    fn active_config(&self) -> Result<u32, EngineError> {
        Ok(self.active_config.get())
    }

    fn set_active_config(&self, index: u32) -> Result<(), EngineError> {
        self.calls.set_active_config.fetch_add(1);
        error_or(&self.config_error)?;
        if index as usize >= self.configs.borrow().len() {
            return Err(EngineError::Parameters);
        }
        self.active_config.set(index);
        Ok(())
    }

    fn allowed_mode_switch(&self) -> Result<u32, EngineError> {
        Ok(self.allowed_mode_switch.get())
    }

    fn set_frame_buffer_config(&self, width: u32, height: u32) -> Result<(), EngineError> {
        self.frame_buffer_size.set((width, height));
        Ok(())
    }

    fn capture_cwb(&self, buffer: &OutputBuffer, config: &CwbConfig) -> Result<(), EngineError> {
        let _ = config;
        self.calls.capture_cwb.fetch_add(1);
        error_or(&self.capture_error)?;
        self.captures.borrow_mut().push(buffer.handle_id);
        Ok(())
    }

    fn output_buffer_acquire_fence(&self) -> Option<SyncFile> {
        self.output_fence.borrow().clone()
    }

    fn handle_cwb_teardown(&self) -> bool {
        !self.refuse_cwb_teardown.get()
    }

    fn cwb_buffer_resolution(&self, config: &CwbConfig) -> Result<(u32, u32), EngineError> {
        let _ = config;
        self.cwb_resolution.get().ok_or(EngineError::NotSupported)
    }

    fn handle_secure_event(&self, event: SecureEvent) -> Result<bool, EngineError> {
        self.calls.handle_secure_event.fetch_add(1);
        self.secure_events.borrow_mut().push(event);
        Ok(self.secure_event_refresh.get())
    }
}

/// Records every callback.
#[derive(Default)]
pub struct RecordingCallbacks {
    pub refreshes: NumCell<u32>,
    pub vsyncs: RefCell<Vec<(i64, i64)>>,
    pub timing_changes: RefCell<Vec<VsyncPeriodChangeTimeline>>,
    pub idle: RefCell<Vec<bool>>,
    pub vsync_unregistered: Cell<bool>,
}

impl CallbackSink for RecordingCallbacks {
    fn refresh(&self, display: DisplayId) {
        log::trace!("Refresh of display {}", display);
        self.refreshes.fetch_add(1);
    }

    fn vsync(&self, display: DisplayId, timestamp: i64, period_ns: i64) {
        let _ = display;
        self.vsyncs.borrow_mut().push((timestamp, period_ns));
    }

    fn vsync_period_timing_changed(&self, display: DisplayId, timeline: VsyncPeriodChangeTimeline) {
        let _ = display;
        self.timing_changes.borrow_mut().push(timeline);
    }

    fn notify_idle_status(&self, display: DisplayId, idle: bool) {
        let _ = display;
        self.idle.borrow_mut().push(idle);
    }

    fn vsync_callback_registered(&self) -> bool {
        !self.vsync_unregistered.get()
    }
}

#[derive(Default)]
pub struct SimToneMapper {
    pub handled: NumCell<u32>,
    pub terminated: NumCell<u32>,
    pub post_commits: NumCell<u32>,
    pub dump_frames: Cell<u32>,
    active: Cell<bool>,
}

impl ToneMapper for SimToneMapper {
    fn handle(&self, stack: &mut LayerStackSnapshot) -> Result<(), EngineError> {
        let _ = stack;
        self.handled.fetch_add(1);
        self.active.set(true);
        Ok(())
    }

    fn terminate(&self) {
        self.terminated.fetch_add(1);
        self.active.set(false);
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn post_commit(&self, stack: &LayerStackSnapshot) {
        let _ = stack;
        self.post_commits.fetch_add(1);
    }

    fn set_frame_dump_config(&self, count: u32) {
        self.dump_frames.set(count);
    }
}

/// Hands out buffer descriptions and records the dumps instead of writing
/// them anywhere.
pub struct SimFrameDumpSink {
    next_handle: NumCell<u64>,
    pub fail_allocation: Cell<bool>,
    pub dumps: RefCell<Vec<(u64, u32)>>,
    pub released: NumCell<u32>,
}

impl Default for SimFrameDumpSink {
    fn default() -> Self {
        Self {
            next_handle: NumCell::new(0x1000),
            fail_allocation: Cell::new(false),
            dumps: Default::default(),
            released: Default::default(),
        }
    }
}

impl FrameDumpSink for SimFrameDumpSink {
    fn provide_buffer(
        &self,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<OutputBuffer, FrameDumpError> {
        if self.fail_allocation.get() {
            return Err(FrameDumpError::Allocate(
                width,
                height,
                uapi::Errno(c::ENOMEM).into(),
            ));
        }
        let handle_id = self.next_handle.fetch_add(1);
        Ok(OutputBuffer {
            handle_id,
            info: BufferInfo {
                handle_id,
                format,
                width,
                height,
                unaligned_width: width,
                unaligned_height: height,
                ..Default::default()
            },
            acquire_fence: None,
        })
    }

    fn dump(&self, buffer: &OutputBuffer, index: u32, retire_fence: Option<&SyncFile>) {
        let _ = retire_fence;
        log::debug!("Dumping frame {} of buffer {}", index, buffer.handle_id);
        self.dumps.borrow_mut().push((buffer.handle_id, index));
    }

    fn release(&self, buffer: &OutputBuffer) {
        let _ = buffer;
        self.released.fetch_add(1);
    }
}
