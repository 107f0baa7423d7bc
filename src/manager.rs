use {
    crate::{
        config::DisplayConfig,
        display::{DisplayDeps, DisplayError, DisplayId, DisplayIds, HwcDisplay},
        error::HwcError,
        utils::copyhashmap::CopyHashMap,
    },
    std::{
        rc::Rc,
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicU32, Ordering::Relaxed},
        },
    },
};

#[cfg(test)]
mod tests;

pub const DEFAULT_THROTTLING_REFRESH_RATE: u32 = 60;

/// State shared by all displays.
///
/// The manager is the only writer. Displays read it during their cycles.
pub struct ManagerContext {
    throttling_refresh_rate: AtomicU32,
    mmrm_restricted: AtomicBool,
}

impl Default for ManagerContext {
    fn default() -> Self {
        Self {
            throttling_refresh_rate: AtomicU32::new(DEFAULT_THROTTLING_REFRESH_RATE),
            mmrm_restricted: AtomicBool::new(false),
        }
    }
}

impl ManagerContext {
    pub fn throttling_refresh_rate(&self) -> u32 {
        self.throttling_refresh_rate.load(Relaxed)
    }

    pub fn mmrm_restricted(&self) -> bool {
        self.mmrm_restricted.load(Relaxed)
    }
}

#[derive(Default)]
pub struct HwcManager {
    ctx: Arc<ManagerContext>,
    ids: DisplayIds,
    displays: CopyHashMap<DisplayId, Rc<HwcDisplay>>,
}

impl HwcManager {
    pub fn context(&self) -> &Arc<ManagerContext> {
        &self.ctx
    }

    pub fn create_display(
        &self,
        config: DisplayConfig,
        deps: DisplayDeps,
    ) -> Result<Rc<HwcDisplay>, DisplayError> {
        let display = HwcDisplay::new(self.ids.next(), config, deps, self.ctx.clone())?;
        self.displays.set(display.id, display.clone());
        Ok(display)
    }

    pub fn display(&self, id: DisplayId) -> Result<Rc<HwcDisplay>, HwcError> {
        self.displays.get(&id).ok_or(HwcError::BadDisplay)
    }

    pub fn destroy_display(&self, id: DisplayId) -> Result<(), HwcError> {
        match self.displays.remove(&id) {
            Some(_) => {
                log::info!("Destroyed display {}", id);
                Ok(())
            }
            None => Err(HwcError::BadDisplay),
        }
    }

    pub fn num_displays(&self) -> usize {
        self.displays.len()
    }

    pub fn set_throttling_refresh_rate(&self, fps: u32) {
        log::info!("Throttling refresh rate set to {}", fps);
        self.ctx.throttling_refresh_rate.store(fps, Relaxed);
    }

    /// Multimedia resources became restricted or available again. Every
    /// display is asked to refresh.
    pub fn mmrm_event(&self, restricted: bool) {
        log::info!("MMRM restricted: {}", restricted);
        self.ctx.mmrm_restricted.store(restricted, Relaxed);
        let displays: Vec<_> = self.displays.lock().values().cloned().collect();
        for display in displays {
            display.refresh();
        }
    }
}
