//! One display and its validate/commit cycle.
//!
//! A cycle is `validate`, optionally `accept_changes`, then `present`. The
//! combined `commit_or_prepare` lets the engine fold both phases into one call.

use {
    crate::{
        callbacks::{CallbackSink, VsyncPeriodChangeTimeline},
        color_mode::ColorModeArbiter,
        config::DisplayConfig,
        engine::{DisplayEngine, DisplayInfo, PowerMode, PrepareStatus, SecureEvent},
        error::{EngineError, HwcError},
        fence::{SyncFile, wait_forever},
        flags::{
            GC_ADDED, GC_REMOVED, GeometryChanges, LF_SINGLE_BUFFER, SF_GEOMETRY_CHANGED,
            SF_HDR_PRESENT, SecureSessions,
        },
        format::{BufferInfo, Dataspace},
        layer::{Composition, EngineComposition, HwcLayer, LayerId, Rect},
        layer_set::LayerSet,
        manager::ManagerContext,
        readback::{CwbEventHandler, CwbStatus, ReadbackCoordinator, frame_dump::FrameDump},
        refresh::{ConfigChange, RefreshRateNegotiator},
        stack::{LayerStackSnapshot, OutputBuffer, StackParams, build_layer_stack},
        time::now_nsec,
        tone_map::{ToneMapper, handle_tone_map},
        utils::errorfmt::ErrorFmt,
        validate::{DisplayRequestList, ValidateResult, Validation},
    },
    std::{
        cell::{Cell, RefCell},
        rc::Rc,
        sync::Arc,
    },
    thiserror::Error,
};

mod cwb;
mod power;

linear_ids!(DisplayIds, DisplayId);

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Could not query the display configs")]
    QueryConfigs(#[source] EngineError),
}

/// The collaborators a display talks to.
pub struct DisplayDeps {
    pub engine: Rc<dyn DisplayEngine>,
    pub callbacks: Rc<dyn CallbackSink>,
    pub tone_mapper: Option<Rc<dyn ToneMapper>>,
    pub cwb_handler: Option<Arc<dyn CwbEventHandler>>,
}

enum PrepareOutcome {
    Prepared(PrepareStatus),
    /// The engine refused the stack for now. Every layer goes to the device.
    Bypassed,
    ShutDown,
}

pub struct HwcDisplay {
    pub id: DisplayId,
    config: DisplayConfig,
    engine: Rc<dyn DisplayEngine>,
    callbacks: Rc<dyn CallbackSink>,
    manager: Arc<ManagerContext>,
    tone_mapper: Option<Rc<dyn ToneMapper>>,
    info: DisplayInfo,
    layers: LayerSet,
    client_target: HwcLayer,
    validation: Validation,
    color: ColorModeArbiter,
    refresh: RefreshRateNegotiator,
    readback: Arc<ReadbackCoordinator>,
    frame_dump: FrameDump,
    stack: RefCell<LayerStackSnapshot>,
    pending_output: RefCell<Option<OutputBuffer>>,
    geometry_changes: Cell<GeometryChanges>,
    geometry_changes_on_doze_suspend: Cell<GeometryChanges>,
    shutdown_pending: Cell<bool>,
    flush: Cell<bool>,
    flush_on_error: Cell<bool>,
    first_cycle: Cell<bool>,
    skip_commit: Cell<bool>,
    animating: Cell<bool>,
    power_mode: Cell<PowerMode>,
    pending_power_mode: Cell<PowerMode>,
    release_fence: RefCell<Option<SyncFile>>,
    current_refresh_rate: Cell<u32>,
    idle: Cell<bool>,
    client_up: Cell<bool>,
    secure_event: Cell<Option<SecureEvent>>,
    paused: Cell<bool>,
    pause_pending: Cell<bool>,
    secure_sessions: Cell<SecureSessions>,
    color_capture_status: Cell<Option<CwbStatus>>,
    elapse_timestamp: Cell<i64>,
    expected_present_time: Cell<i64>,
}

impl HwcDisplay {
    pub fn new(
        id: DisplayId,
        config: DisplayConfig,
        deps: DisplayDeps,
        manager: Arc<ManagerContext>,
    ) -> Result<Rc<Self>, DisplayError> {
        let engine = deps.engine;
        let info = engine.info();
        let refresh = RefreshRateNegotiator::new(engine.clone(), config.vsyncs_to_apply_rate_change)
            .map_err(DisplayError::QueryConfigs)?;
        let tone_mapper = match config.enable_gpu_tonemapper {
            true => deps.tone_mapper,
            false => None,
        };
        let layers = LayerSet::new(config.disable_sdr_dimming);
        let client_target = layers.create_detached();
        let (_, max_refresh_rate) = engine.refresh_rate_range();
        log::info!(
            "Creating display {} ({:?}, {} configs)",
            id,
            info.class,
            refresh.num_configs(),
        );
        Ok(Rc::new(Self {
            id,
            color: ColorModeArbiter::new(engine.clone()),
            readback: ReadbackCoordinator::new(id, deps.cwb_handler),
            callbacks: deps.callbacks,
            manager,
            tone_mapper,
            info,
            layers,
            client_target,
            validation: Default::default(),
            refresh,
            frame_dump: Default::default(),
            stack: Default::default(),
            pending_output: Default::default(),
            geometry_changes: Default::default(),
            geometry_changes_on_doze_suspend: Default::default(),
            shutdown_pending: Cell::new(false),
            flush: Cell::new(false),
            flush_on_error: Cell::new(false),
            first_cycle: Cell::new(true),
            skip_commit: Cell::new(false),
            animating: Cell::new(false),
            power_mode: Cell::new(PowerMode::Off),
            pending_power_mode: Cell::new(PowerMode::Off),
            release_fence: Default::default(),
            current_refresh_rate: Cell::new(max_refresh_rate),
            idle: Cell::new(false),
            client_up: Cell::new(false),
            secure_event: Cell::new(None),
            paused: Cell::new(false),
            pause_pending: Cell::new(false),
            secure_sessions: Default::default(),
            color_capture_status: Cell::new(None),
            elapse_timestamp: Cell::new(0),
            expected_present_time: Cell::new(0),
            config,
            engine,
        }))
    }

    pub fn info(&self) -> DisplayInfo {
        self.info
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_pending.get()
    }

    /// Asks the client for a new validate/present cycle.
    pub fn refresh(&self) {
        self.callbacks.refresh(self.id);
    }

    pub fn create_layer(&self) -> LayerId {
        let layer = self.layers.create();
        self.geometry_changes.set(self.geometry_changes.get() | GC_ADDED);
        self.validation.stack_invalid.set(true);
        log::debug!("Display {}: Created layer {}", self.id, layer.id);
        layer.id
    }

    pub fn destroy_layer(&self, id: LayerId) -> Result<(), HwcError> {
        self.layers.get(id)?;
        // Blocks until the engine no longer references the layer.
        self.engine.destroy_layer();
        self.layers.destroy(id)?;
        self.geometry_changes.set(self.geometry_changes.get() | GC_REMOVED);
        self.validation.stack_invalid.set(true);
        log::debug!("Display {}: Destroyed layer {}", self.id, id);
        Ok(())
    }

    pub fn layer(&self, id: LayerId) -> Result<Rc<HwcLayer>, HwcError> {
        self.layers.get(id)
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn set_layer_z_order(&self, id: LayerId, z: u32) -> Result<(), HwcError> {
        self.layers.set_z_order(id, z)
    }

    pub fn client_target(&self) -> &HwcLayer {
        &self.client_target
    }

    /// A missing buffer keeps the cached target.
    pub fn set_client_target(
        &self,
        buffer: Option<&BufferInfo>,
        acquire_fence: Option<SyncFile>,
        dataspace: Dataspace,
        damage: &[Rect],
    ) -> Result<(), HwcError> {
        let Some(buffer) = buffer else {
            return Ok(());
        };
        let ct = &self.client_target;
        ct.set_frame_rate(self.frame_rate_limit());
        ct.set_dataspace(dataspace);
        ct.set_surface_damage(damage);
        ct.set_buffer(Some(buffer), acquire_fence)
    }

    pub fn set_display_animating(&self, animating: bool) {
        if !animating {
            self.refresh();
        }
        self.animating.set(animating);
    }

    pub fn set_frame_timing(&self, elapse_timestamp: i64, expected_present_time: i64) {
        self.elapse_timestamp.set(elapse_timestamp);
        self.expected_present_time.set(expected_present_time);
    }

    pub fn set_client_up(&self, up: bool) {
        self.client_up.set(up);
    }

    pub fn color_modes(&self) -> &ColorModeArbiter {
        &self.color
    }

    pub fn set_color_transform(&self, matrix: &[f32; 16]) -> Result<(), HwcError> {
        if self.shutdown_pending.get() {
            return Ok(());
        }
        self.color.set_color_transform(matrix)
    }

    /// The snapshot of the last built stack.
    pub fn stack(&self) -> LayerStackSnapshot {
        self.stack.borrow().clone()
    }

    fn frame_rate_limit(&self) -> u32 {
        self.current_refresh_rate
            .get()
            .min(self.manager.throttling_refresh_rate())
    }

    fn update_refresh_rate(&self) {
        let rate = self.frame_rate_limit();
        for layer in self.layers.sorted() {
            if !layer.has_metadata_refresh_rate() {
                layer.set_frame_rate(rate);
            }
        }
    }

    fn build_stack(&self, layers: &[Rc<HwcLayer>]) {
        let params = StackParams {
            disable_hdr_handling: self.config.disable_hdr_handling,
            swap_interval_zero: self.config.swap_interval_zero,
            game_supported: self.info.game_supported,
            max_layer_count: self.config.max_layer_count,
            animating: self.animating.get(),
            geometry_changes_on_doze_suspend: self.geometry_changes_on_doze_suspend.get(),
            client_target_dataspace: self.color.current_color_mode().dataspace(),
            elapse_timestamp: self.elapse_timestamp.get(),
            expected_present_time: self.expected_present_time.get(),
        };
        let mut changes = self.geometry_changes.get();
        let mut stack = build_layer_stack(&params, layers, &self.client_target, &mut changes);
        self.geometry_changes.set(changes);
        stack.output_buffer = self.pending_output.borrow_mut().take();
        *self.stack.borrow_mut() = stack;
    }

    fn apply_color_mode(&self) {
        let hdr_present = self.stack.borrow().flags.contains(SF_HDR_PRESENT);
        if let Err(e) = self.color.apply_current(hdr_present) {
            log::warn!(
                "Display {}: Could not apply the color mode: {}",
                self.id,
                ErrorFmt(e)
            );
        }
    }

    fn apply_pending_config(&self) {
        self.refresh.update_active_config();
        self.current_refresh_rate
            .set(self.refresh.active_refresh_rate());
    }

    fn process_active_config_change(&self) {
        match self.refresh.process_active_config_change(now_nsec()) {
            Ok(Some(timeline)) => {
                self.current_refresh_rate
                    .set(self.refresh.active_refresh_rate());
                self.callbacks
                    .vsync_period_timing_changed(self.id, timeline);
            }
            Ok(None) => {}
            Err(e) => log::warn!(
                "Display {}: Could not apply the pending config: {}",
                self.id,
                ErrorFmt(e)
            ),
        }
    }

    fn handle_prepare_result(
        &self,
        res: Result<PrepareStatus, EngineError>,
    ) -> Result<PrepareOutcome, HwcError> {
        let e = match res {
            Ok(status) => return Ok(PrepareOutcome::Prepared(status)),
            Err(e) => e,
        };
        match e {
            EngineError::ShutDown => {
                log::info!("Display {} is shutting down", self.id);
                self.shutdown_pending.set(true);
                Ok(PrepareOutcome::ShutDown)
            }
            EngineError::Permission => {
                self.wait_on_previous_fence();
                let mut stack = self.stack.borrow_mut();
                for sl in &mut stack.layers {
                    if !sl.client_target {
                        sl.composition = EngineComposition::Sde;
                    }
                }
                self.geometry_changes_on_doze_suspend
                    .set(self.geometry_changes_on_doze_suspend.get() | self.geometry_changes.get());
                Ok(PrepareOutcome::Bypassed)
            }
            e => {
                log::warn!("Display {}: Prepare failed: {}", self.id, ErrorFmt(e));
                // Other displays might release resources before the next cycle.
                self.refresh();
                Err(HwcError::BadDisplay)
            }
        }
    }

    fn wait_on_previous_fence(&self) {
        if !self.info.command_mode {
            return;
        }
        wait_forever(self.release_fence.borrow().as_ref());
    }

    fn finalize(&self) -> ValidateResult {
        let mut stack = self.stack.borrow_mut();
        self.validation
            .finalize(&self.layers, &self.client_target, &mut stack)
    }

    /// Lets the engine decide how every layer is composed.
    pub fn validate(&self) -> Result<ValidateResult, HwcError> {
        self.validation.begin();
        self.idle.set(false);
        if self.shutdown_pending.get() {
            return Err(HwcError::BadDisplay);
        }
        self.process_active_config_change();
        let layers = self.layers.sorted();
        self.build_stack(&layers);
        self.apply_color_mode();
        if let Some(res) = self.validation.try_skip_prepare(
            self.engine.is_validated(),
            self.engine.has_demura(),
            &layers,
        ) {
            return Ok(res);
        }
        self.update_refresh_rate();
        self.apply_pending_config();
        self.validation.validate_done.set(false);
        if self.paused.get() {
            return Ok(self.validate_paused());
        }
        let res = self.engine.prepare(&mut self.stack.borrow_mut());
        match self.handle_prepare_result(res)? {
            PrepareOutcome::ShutDown => return Ok(ValidateResult::default()),
            PrepareOutcome::Prepared(_) => self
                .geometry_changes_on_doze_suspend
                .set(GeometryChanges::none()),
            PrepareOutcome::Bypassed => {}
        }
        Ok(self.finalize())
    }

    fn validate_paused(&self) -> ValidateResult {
        log::debug!("Display {} is paused", self.id);
        let mut stack = self.stack.borrow_mut();
        for sl in &mut stack.layers {
            if !sl.client_target {
                sl.composition = EngineComposition::Sde;
            }
        }
        drop(stack);
        self.skip_commit.set(true);
        self.finalize()
    }

    /// Validates and, unless the engine asks for a separate commit, presents
    /// in one engine call.
    ///
    /// Returns the validation result, whether a present is still required, and
    /// the retire fence of the folded commit.
    pub fn commit_or_prepare(
        &self,
        validate_only: bool,
    ) -> Result<(ValidateResult, bool, Option<SyncFile>), HwcError> {
        if self.shutdown_pending.get() {
            return Err(HwcError::BadDisplay);
        }
        self.validation.begin();
        self.idle.set(false);
        self.process_active_config_change();
        self.update_refresh_rate();
        self.apply_pending_config();
        self.validation.validate_done.set(false);
        let layers = self.layers.sorted();
        self.build_stack(&layers);
        self.apply_color_mode();
        let res = {
            let mut stack = self.stack.borrow_mut();
            stack.validate_only = validate_only;
            self.engine.commit_or_prepare(&mut stack)
        };
        let needs_commit = match self.handle_prepare_result(res)? {
            PrepareOutcome::ShutDown => return Ok((ValidateResult::default(), false, None)),
            PrepareOutcome::Prepared(status) => {
                self.geometry_changes_on_doze_suspend
                    .set(GeometryChanges::none());
                status == PrepareStatus::NeedsCommit
            }
            PrepareOutcome::Bypassed => false,
        };
        let mut retire_fence = None;
        if !needs_commit {
            if !validate_only {
                self.flush_on_error.set(true);
                self.first_cycle.set(false);
            }
            retire_fence = self.post_commit();
        }
        let res = self.finalize();
        if !needs_commit && !validate_only {
            self.validation.validate_done.set(false);
        }
        Ok((res, needs_commit, retire_fence))
    }

    pub fn accept_changes(&self) -> Result<(), HwcError> {
        self.validation.accept_changes(&self.layers)
    }

    pub fn changed_composition_types(&self) -> Result<Vec<(LayerId, Composition)>, HwcError> {
        self.validation.changed_composition_types(&self.layers)
    }

    pub fn display_requests(&self) -> Result<DisplayRequestList, HwcError> {
        self.validation
            .display_requests(&self.layers, &self.stack.borrow())
    }

    /// The release fence of every layer in z order.
    pub fn release_fences(&self) -> Vec<(LayerId, Option<SyncFile>)> {
        self.layers
            .sorted()
            .iter()
            .map(|l| (l.id, l.release_fence()))
            .collect()
    }

    fn commit(&self) -> Result<(), HwcError> {
        if self.flush.get() {
            return Ok(());
        }
        if self.shutdown_pending.get() || self.layers.is_empty() {
            return Ok(());
        }
        if !self.validation.validate_done.get() {
            log::debug!("Display {} is not validated", self.id);
            return Err(HwcError::NotValidated);
        }
        if self.skip_commit.get() {
            log::debug!("Skipping the commit on display {}", self.id);
            return Ok(());
        }
        let mut stack = self.stack.borrow_mut();
        handle_tone_map(self.tone_mapper.as_ref(), &mut stack);
        match self.engine.commit(&mut stack) {
            Ok(()) => {
                self.flush_on_error.set(true);
                self.first_cycle.set(false);
                Ok(())
            }
            Err(EngineError::ShutDown) => {
                log::info!("Display {} is shutting down", self.id);
                self.shutdown_pending.set(true);
                Ok(())
            }
            Err(EngineError::NotValidated) => Err(HwcError::NotValidated),
            Err(EngineError::Permission) => Err(HwcError::Unsupported),
            Err(e) => {
                log::error!("Display {}: Commit failed: {}", self.id, ErrorFmt(e));
                // The previous frame is flushed in the next cycle so that its
                // buffers and fences are released.
                self.flush.set(true);
                Err(HwcError::Unsupported)
            }
        }
    }

    /// Commits the validated stack and returns the retire fence.
    pub fn present(&self) -> Result<Option<SyncFile>, HwcError> {
        self.commit()?;
        self.handle_frame_output();
        Ok(self.post_commit())
    }

    fn post_commit(&self) -> Option<SyncFile> {
        self.validation.validate_done.set(false);
        let mut stack = self.stack.borrow_mut();
        if self.flush.get() && self.flush_on_error.get() {
            if let Err(e) = self.engine.flush(&mut stack) {
                log::error!("Display {}: Flush failed: {}", self.id, ErrorFmt(e));
            }
        }
        if let Some(tm) = &self.tone_mapper
            && tm.is_active()
        {
            tm.post_commit(&stack);
        }
        let retire_fence = self.retrieve_fences(&mut stack);
        stack.flags.set(SF_GEOMETRY_CHANGED, false);
        drop(stack);
        self.client_target.reset_geometry_changes();
        for layer in self.layers.sorted() {
            layer.reset_geometry_changes();
        }
        self.geometry_changes.set(GeometryChanges::none());
        self.flush.set(false);
        self.skip_commit.set(false);
        if self.pause_pending.replace(false) {
            log::info!("Pausing display {}", self.id);
            self.paused.set(true);
        }
        if matches!(
            self.secure_event.get(),
            Some(SecureEvent::TuiEnd | SecureEvent::TuiUnprepare)
        ) {
            self.secure_event.set(None);
        }
        if let Some(config) = self.refresh.take_first_commit_config() {
            log::info!("Display {}: Changing the active config to {}", self.id, config);
            if let Err(e) = self.set_active_config(config) {
                log::warn!(
                    "Display {}: Could not set config {}: {}",
                    self.id,
                    config,
                    ErrorFmt(e)
                );
            }
        }
        retire_fence
    }

    fn retrieve_fences(&self, stack: &mut LayerStackSnapshot) -> Option<SyncFile> {
        let swap_interval_zero = self.config.swap_interval_zero;
        let flush = self.flush.get();
        for sl in &mut stack.layers {
            sl.acquire_fence = None;
            if sl.client_target {
                continue;
            }
            let Ok(layer) = self.layers.get(sl.id) else {
                continue;
            };
            layer.take_acquire_fence();
            if flush {
                layer.set_release_fence(None);
            } else if !swap_interval_zero && !sl.flags.contains(LF_SINGLE_BUFFER) {
                layer.set_release_fence(sl.release_fence.clone());
            }
        }
        match swap_interval_zero {
            true => None,
            false => stack.retire_fence.clone(),
        }
    }

    pub fn configs(&self) -> Vec<u32> {
        self.refresh.configs()
    }

    pub fn refresh_rates(&self) -> &RefreshRateNegotiator {
        &self.refresh
    }

    pub fn active_config(&self) -> u32 {
        self.refresh.active_config()
    }

    pub fn set_active_config(&self, config: u32) -> Result<(), HwcError> {
        let change = self
            .refresh
            .set_active_config(config, !self.first_cycle.get())?;
        if change == ConfigChange::Pending {
            log::info!("Display {}: Active config {} is pending", self.id, config);
            self.current_refresh_rate
                .set(self.refresh.active_refresh_rate());
            self.refresh();
        }
        Ok(())
    }

    /// Returns `None` if the change was deferred until the first commit.
    pub fn set_active_config_with_constraints(
        &self,
        config: u32,
        seamless_required: bool,
        desired_time: i64,
    ) -> Result<Option<VsyncPeriodChangeTimeline>, HwcError> {
        let timeline = self.refresh.set_active_config_with_constraints(
            config,
            seamless_required,
            desired_time,
            now_nsec(),
            !self.first_cycle.get(),
            self.client_up.get(),
        )?;
        if let Some(tl) = &timeline
            && tl.refresh_required
        {
            self.refresh();
        }
        Ok(timeline)
    }

    pub fn vsync_period(&self) -> Result<i64, HwcError> {
        self.refresh.vsync_period(now_nsec())
    }

    pub fn current_refresh_rate(&self) -> u32 {
        self.current_refresh_rate.get()
    }
}
