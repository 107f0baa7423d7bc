//! Active config tracking and vsync period transitions.

use {
    crate::{
        callbacks::VsyncPeriodChangeTimeline,
        engine::{DisplayEngine, VariableConfig},
        error::{EngineError, HwcError},
        utils::errorfmt::ErrorFmt,
    },
    hwc_algorithms::timeline::{
        NO_VSYNC_TIME, estimate_vsync_timeline, is_time_after_or_equal_vsync,
    },
    std::{
        cell::{Cell, RefCell},
        collections::{BTreeMap, VecDeque},
        rc::Rc,
    },
};


/// A config change requested with constraints that waits for its refresh time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct PendingRateChange {
    config: u32,
    refresh_time: i64,
    applied_time: i64,
}

/// The vsync period that stays visible until `applied_time`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct TransientPeriod {
    period: i64,
    applied_time: i64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigChange {
    /// The config is stored and applied after the first commit.
    Deferred,
    /// The config becomes active with the next prepare. The client has to refresh.
    Pending,
    Unchanged,
}

pub struct RefreshRateNegotiator {
    engine: Rc<dyn DisplayEngine>,
    vsyncs_to_apply: u32,
    /// Unique configs by client index.
    configs: BTreeMap<u32, VariableConfig>,
    /// Maps engine indices to client indices. Duplicate engine configs share
    /// the client index of their first occurrence.
    index_map: Vec<u32>,
    active_index: Cell<Option<u32>>,
    pending_config: Cell<Option<u32>>,
    pending_first_commit_config: Cell<Option<u32>>,
    pending_change: Cell<Option<PendingRateChange>>,
    transient: RefCell<VecDeque<TransientPeriod>>,
    active_refresh_rate: Cell<u32>,
    fb_size: Cell<(u32, u32)>,
}

impl RefreshRateNegotiator {
    pub fn new(engine: Rc<dyn DisplayEngine>, vsyncs_to_apply: u32) -> Result<Self, EngineError> {
        let num_configs = engine.num_variable_configs()?;
        let mut configs = BTreeMap::new();
        let mut index_map = Vec::with_capacity(num_configs as usize);
        for i in 0..num_configs {
            let info = engine.variable_config(i)?;
            let existing = configs
                .iter()
                .find(|(_, c)| **c == info)
                .map(|(idx, _)| *idx);
            match existing {
                Some(idx) => index_map.push(idx),
                None => {
                    configs.insert(i, info);
                    index_map.push(i);
                }
            }
        }
        let slf = Self {
            engine,
            vsyncs_to_apply: vsyncs_to_apply.max(1),
            configs,
            index_map,
            active_index: Cell::new(None),
            pending_config: Cell::new(None),
            pending_first_commit_config: Cell::new(None),
            pending_change: Cell::new(None),
            transient: Default::default(),
            active_refresh_rate: Cell::new(0),
            fb_size: Cell::new((0, 0)),
        };
        if num_configs > 0 {
            let active = match slf.engine.active_config() {
                Ok(a) => a,
                Err(e) => {
                    log::warn!("Could not query the active config: {}", ErrorFmt(e));
                    0
                }
            };
            slf.active_index.set(Some(active));
            if let Some(info) = slf.config(slf.client_index(active)) {
                slf.active_refresh_rate.set(info.fps);
                slf.fb_size.set((info.x_pixels, info.y_pixels));
            }
        }
        log::info!("Found {} display configs", slf.configs.len());
        Ok(slf)
    }

    fn client_index(&self, engine_index: u32) -> u32 {
        self.index_map
            .get(engine_index as usize)
            .copied()
            .unwrap_or(engine_index)
    }

    pub fn num_configs(&self) -> usize {
        self.configs.len()
    }

    pub fn configs(&self) -> Vec<u32> {
        self.configs.keys().copied().collect()
    }

    pub fn config(&self, config: u32) -> Option<&VariableConfig> {
        self.configs.get(&config)
    }

    pub fn active_refresh_rate(&self) -> u32 {
        self.active_refresh_rate.get()
    }

    pub fn frame_buffer_size(&self) -> (u32, u32) {
        self.fb_size.get()
    }

    /// The pending config if one exists, otherwise the active one.
    pub fn active_config(&self) -> u32 {
        let index = match self.pending_config.get() {
            Some(p) => p,
            None => match self.engine.active_config() {
                Ok(a) => a,
                Err(_) => self.active_index.get().unwrap_or(0),
            },
        };
        self.client_index(index)
    }

    fn cached_active_config(&self) -> u32 {
        match self.active_index.get() {
            Some(idx) if (idx as usize) < self.index_map.len() => self.index_map[idx as usize],
            _ => self.active_config(),
        }
    }

    pub fn is_mode_switch_allowed(&self, config: u32) -> bool {
        let allowed = match self.engine.allowed_mode_switch() {
            Ok(a) => a,
            Err(EngineError::Resources) => {
                log::warn!("Not allowed to switch to mode {}", config);
                return false;
            }
            Err(e) => {
                log::warn!("Could not query the allowed mode switches: {}", ErrorFmt(e));
                0
            }
        };
        if allowed == 0 || (config < 32 && allowed & (1 << config) != 0) {
            return true;
        }
        log::warn!("Not allowed to switch to mode {}", config);
        false
    }

    /// Stores a client config change. Returns `Pending` if the client has to
    /// refresh for it to be applied.
    pub fn set_active_config(
        &self,
        config: u32,
        first_commit_done: bool,
    ) -> Result<ConfigChange, HwcError> {
        if self.active_config() == config {
            return Ok(ConfigChange::Unchanged);
        }
        if !self.is_mode_switch_allowed(config) {
            return Err(HwcError::BadConfig);
        }
        if self.defer_until_first_commit(config, first_commit_done) {
            return Ok(ConfigChange::Deferred);
        }
        log::info!("Active configuration changed to {}", config);
        if let Some(info) = self.config(config) {
            self.active_refresh_rate.set(info.fps);
        }
        self.pending_config.set(Some(config));
        Ok(ConfigChange::Pending)
    }

    fn defer_until_first_commit(&self, config: u32, first_commit_done: bool) -> bool {
        if !first_commit_done {
            self.pending_first_commit_config.set(Some(config));
            log::info!("Deferring config change to {} until the first commit", config);
            return true;
        }
        self.pending_first_commit_config.set(None);
        false
    }

    /// Applies a config stored by `set_active_config`. Called before prepare.
    pub fn update_active_config(&self) {
        let Some(config) = self.pending_config.take() else {
            return;
        };
        match self.engine.set_active_config(config) {
            Ok(()) => self.active_index.set(Some(config)),
            Err(e) => log::info!("Could not set config {}: {}", config, ErrorFmt(e)),
        }
    }

    /// The config that was requested before the first commit, if any.
    pub fn take_first_commit_config(&self) -> Option<u32> {
        self.pending_first_commit_config.take()
    }

    pub fn set_active_config_with_constraints(
        &self,
        config: u32,
        seamless_required: bool,
        desired_time: i64,
        now: i64,
        first_commit_done: bool,
        client_up: bool,
    ) -> Result<Option<VsyncPeriodChangeTimeline>, HwcError> {
        let Some(info) = self.config(config).copied() else {
            log::error!("Invalid config {}", config);
            return Err(HwcError::BadConfig);
        };
        if !self.is_mode_switch_allowed(config) {
            return Err(HwcError::BadConfig);
        }
        if self.defer_until_first_commit(config, first_commit_done) {
            return Ok(None);
        }
        self.active_refresh_rate.set(info.fps);
        if seamless_required && !self.allow_seamless(config) {
            log::error!("A seamless switch to config {} is not allowed", config);
            return Err(HwcError::SeamlessNotAllowed);
        }
        let period = self.vsync_period(now)?;
        let timeline = estimate_vsync_timeline(now, period, self.vsyncs_to_apply, desired_time);
        self.pending_change.set(Some(PendingRateChange {
            config,
            refresh_time: timeline.refresh_time,
            applied_time: timeline.applied_time,
        }));
        let mut refresh_required = true;
        if client_up && (info.x_pixels, info.y_pixels) != self.fb_size.get() {
            refresh_required = false;
            self.fb_size.set((info.x_pixels, info.y_pixels));
        }
        Ok(Some(VsyncPeriodChangeTimeline {
            timeline,
            refresh_required,
        }))
    }

    pub fn has_pending_change(&self) -> bool {
        self.pending_change.get().is_some()
    }

    fn is_change_ready(&self, now: i64) -> Option<PendingRateChange> {
        let pending = self.pending_change.get()?;
        is_time_after_or_equal_vsync(now, pending.refresh_time).then_some(pending)
    }

    /// Submits a pending constrained config change once its refresh time has
    /// been reached. Returns the corrected timeline if the estimate moved.
    pub fn process_active_config_change(
        &self,
        now: i64,
    ) -> Result<Option<VsyncPeriodChangeTimeline>, HwcError> {
        let Some(pending) = self.is_change_ready(now) else {
            return Ok(None);
        };
        let period = self.vsync_period_by_active_config()?;
        self.submit_config(pending.config)?;
        let timeline =
            estimate_vsync_timeline(now, period, self.vsyncs_to_apply, pending.refresh_time);
        self.transient.borrow_mut().push_back(TransientPeriod {
            period,
            applied_time: timeline.applied_time,
        });
        self.pending_change.set(None);
        if timeline.applied_time != pending.applied_time {
            return Ok(Some(VsyncPeriodChangeTimeline {
                timeline,
                refresh_required: false,
            }));
        }
        Ok(None)
    }

    fn submit_config(&self, config: u32) -> Result<(), HwcError> {
        let current = self.active_config();
        if let Err(e) = self.engine.set_active_config(config) {
            log::error!(
                "Could not change the config from {} to {}: {}",
                current,
                config,
                ErrorFmt(e),
            );
            return Err(HwcError::BadConfig);
        }
        self.active_index.set(Some(config));
        log::info!("Active configuration changed from {} to {}", current, config);
        let Some(info) = self.config(config).copied() else {
            return Ok(());
        };
        self.active_refresh_rate.set(info.fps);
        let current_size = self
            .config(current)
            .map(|c| (c.x_pixels, c.y_pixels))
            .unwrap_or_default();
        if (info.x_pixels, info.y_pixels) != current_size {
            if let Err(e) = self
                .engine
                .set_frame_buffer_config(info.x_pixels, info.y_pixels)
            {
                log::error!("Could not resize the frame buffer: {}", ErrorFmt(e));
                return Err(HwcError::BadParameter);
            }
            self.fb_size.set((info.x_pixels, info.y_pixels));
            log::info!(
                "New framebuffer resolution ({}x{})",
                info.x_pixels,
                info.y_pixels
            );
        }
        Ok(())
    }

    fn transient_vsync_period(&self, now: i64) -> Option<i64> {
        let mut transient = self.transient.borrow_mut();
        while let Some(front) = transient.front() {
            if is_time_after_or_equal_vsync(now, front.applied_time) {
                transient.pop_front();
            } else {
                return Some(front.period);
            }
        }
        None
    }

    fn vsync_period_by_active_config(&self) -> Result<i64, HwcError> {
        let active = self.cached_active_config();
        match self.config(active) {
            Some(c) => Ok(c.vsync_period_ns),
            None => {
                log::error!("Could not get the vsync period of config {}", active);
                Err(HwcError::BadConfig)
            }
        }
    }

    /// The vsync period that is visible at `now`.
    pub fn vsync_period(&self, now: i64) -> Result<i64, HwcError> {
        if let Some(period) = self.transient_vsync_period(now) {
            return Ok(period);
        }
        self.vsync_period_by_active_config()
    }

    pub fn is_same_group(&self, a: u32, b: u32) -> bool {
        match (self.config(a), self.config(b)) {
            (Some(a), Some(b)) => a.group() == b.group(),
            _ => {
                log::error!("Invalid configs {}, {}", a, b);
                false
            }
        }
    }

    fn allow_seamless(&self, config: u32) -> bool {
        self.is_same_group(self.cached_active_config(), config)
    }

    /// The refresh time of the pending constrained change.
    pub fn pending_refresh_time(&self) -> i64 {
        self.pending_change
            .get()
            .map(|p| p.refresh_time)
            .unwrap_or(NO_VSYNC_TIME)
    }
}
