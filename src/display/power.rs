use {
    crate::{
        display::HwcDisplay,
        engine::{DisplayClass, PowerMode, SecureEvent},
        error::{EngineError, HwcError},
        flags::{SF_CURSOR_PRESENT, SS_SECURE_CAMERA, SS_SECURE_DISPLAY, SecureSessions},
        layer::{Composition, LayerId},
        utils::errorfmt::ErrorFmt,
    },
};

impl HwcDisplay {
    pub fn power_mode(&self) -> PowerMode {
        self.power_mode.get()
    }

    pub fn set_power_mode(&self, mode: PowerMode, teardown: bool) -> Result<(), HwcError> {
        log::info!("Display {}: Setting power mode {:?}", self.id, mode);
        if self.shutdown_pending.get() {
            return Ok(());
        }
        let mut flush_on_error = self.flush_on_error.get();
        match mode {
            PowerMode::Off => {
                // All buffers are released. Nothing is flushed until a buffer
                // was submitted again.
                flush_on_error = false;
                if let Some(tm) = &self.tone_mapper {
                    tm.terminate();
                }
            }
            PowerMode::On | PowerMode::Doze => {
                if self.manager.mmrm_restricted()
                    && self.info.class != DisplayClass::Builtin
                    && matches!(
                        self.power_mode.get(),
                        PowerMode::Off | PowerMode::DozeSuspend
                    )
                {
                    return Ok(());
                }
                self.color.restore_color_transform();
            }
            PowerMode::DozeSuspend => {}
        }
        let release_fence = match self.engine.set_display_state(mode, teardown) {
            Ok(f) => f,
            Err(EngineError::ShutDown) => {
                self.shutdown_pending.set(true);
                return Ok(());
            }
            Err(e) => {
                log::error!(
                    "Display {}: Could not set power mode {:?}: {}",
                    self.id,
                    mode,
                    ErrorFmt(e)
                );
                return Err(HwcError::BadParameter);
            }
        };
        self.flush_on_error.set(flush_on_error);
        self.power_mode.set(mode);
        if let Some(fence) = &release_fence {
            for layer in self.layers.sorted() {
                layer.set_release_fence(Some(fence.clone()));
            }
        }
        *self.release_fence.borrow_mut() = release_fence;
        Ok(())
    }

    pub fn set_vsync_enabled(&self, enabled: bool) -> Result<(), HwcError> {
        if self.shutdown_pending.get() || !self.callbacks.vsync_callback_registered() {
            return Ok(());
        }
        match self.engine.set_vsync_state(enabled) {
            Ok(()) => Ok(()),
            Err(EngineError::ShutDown) => {
                self.shutdown_pending.set(true);
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "Display {}: Could not set vsync state {}: {}",
                    self.id,
                    enabled,
                    ErrorFmt(e)
                );
                Err(HwcError::BadDisplay)
            }
        }
    }

    pub fn set_cursor_position(&self, id: LayerId, x: i32, y: i32) -> Result<(), HwcError> {
        if self.shutdown_pending.get() {
            return Ok(());
        }
        if !self.stack.borrow().flags.contains(SF_CURSOR_PRESENT) {
            log::warn!("Display {}: Cursor layer not present", self.id);
            return Err(HwcError::BadLayer);
        }
        let layer = self.layers.get(id)?;
        if layer.device_selected() != Composition::Cursor {
            return Ok(());
        }
        if self.engine.is_validated() {
            // Positions cannot change between validate and present.
            return Err(HwcError::NotValidated);
        }
        if let Ok(state) = self.engine.display_state()
            && state != PowerMode::On
        {
            return Ok(());
        }
        match self.engine.set_cursor_position(x, y) {
            Ok(()) => Ok(()),
            Err(EngineError::ShutDown) => {
                self.shutdown_pending.set(true);
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "Display {}: Could not move the cursor to {}x{}: {}",
                    self.id,
                    x,
                    y,
                    ErrorFmt(e)
                );
                Err(HwcError::BadDisplay)
            }
        }
    }

    /// Forwards a hardware vsync to the client together with the period that
    /// is in effect right now.
    pub fn on_vsync(&self, timestamp: i64) {
        let period = self.vsync_period().unwrap_or(0);
        self.callbacks.vsync(self.id, timestamp, period);
    }

    pub fn on_idle_timeout(&self) {
        self.idle.set(true);
        if self.notify_idle_now() {
            self.callbacks.notify_idle_status(self.id, true);
        }
    }

    fn notify_idle_now(&self) -> bool {
        self.idle.get() && (self.info.command_mode || self.config.idle_active_ms <= 0)
    }

    pub fn is_idle(&self) -> bool {
        self.idle.get()
    }

    pub fn secure_event(&self) -> Option<SecureEvent> {
        self.secure_event.get()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    fn validate_secure_transition(&self, event: SecureEvent) -> Result<(), EngineError> {
        let current = self.secure_event.get();
        let valid = match event {
            SecureEvent::TuiPrepare => current.is_none(),
            SecureEvent::TuiStart | SecureEvent::TuiUnprepare => {
                current == Some(SecureEvent::TuiPrepare)
            }
            SecureEvent::TuiEnd => current == Some(SecureEvent::TuiStart),
        };
        if !valid {
            log::error!(
                "Display {}: Invalid secure transition from {:?} to {:?}",
                self.id,
                current,
                event
            );
            return Err(EngineError::Parameters);
        }
        Ok(())
    }

    /// Moves the trusted UI state machine. Returns whether a refresh is needed.
    pub fn handle_secure_event(
        &self,
        event: SecureEvent,
        update_event_only: bool,
    ) -> Result<bool, EngineError> {
        if self.secure_event.get() == Some(event) {
            log::warn!("Display {}: Secure event {:?} is already set", self.id, event);
            return Ok(false);
        }
        if update_event_only {
            self.secure_event
                .set((event == SecureEvent::TuiPrepare).then_some(event));
            return Ok(false);
        }
        self.validate_secure_transition(event)?;
        let needs_refresh = match self.engine.handle_secure_event(event) {
            Ok(r) => r,
            Err(e) => {
                if e == EngineError::Permission {
                    log::warn!("Display {}: Secure event {:?} refused", self.id, event);
                } else {
                    log::error!(
                        "Display {}: Could not handle secure event {:?}: {}",
                        self.id,
                        event,
                        ErrorFmt(e)
                    );
                }
                return Err(e);
            }
        };
        match event {
            SecureEvent::TuiEnd | SecureEvent::TuiUnprepare => {
                if event == SecureEvent::TuiEnd {
                    self.color.reapply_mode();
                }
                log::info!("Resuming display {}", self.id);
                self.paused.set(false);
                self.pause_pending.set(false);
                if !needs_refresh {
                    self.secure_event.set(None);
                    return Ok(false);
                }
            }
            SecureEvent::TuiPrepare | SecureEvent::TuiStart => {
                if needs_refresh {
                    self.pause_pending.set(true);
                } else {
                    log::info!("Pausing display {}", self.id);
                    self.paused.set(true);
                }
            }
        }
        self.secure_event.set(Some(event));
        Ok(needs_refresh)
    }

    pub fn post_handle_secure_event(&self, event: SecureEvent) -> Result<(), EngineError> {
        self.engine.post_handle_secure_event(event)?;
        match event {
            SecureEvent::TuiEnd | SecureEvent::TuiUnprepare => self.secure_event.set(None),
            _ => self.secure_event.set(Some(event)),
        }
        Ok(())
    }

    /// Pauses or resumes the composition of this display.
    pub fn toggle_screen_updates(&self, enable: bool) -> Result<(), HwcError> {
        if self.secure_event.get().is_some() {
            log::warn!(
                "Display {}: Cannot toggle screen updates during a secure transition",
                self.id
            );
            return Err(HwcError::Unsupported);
        }
        self.paused.set(!enable);
        self.refresh();
        Ok(())
    }

    /// Powers the display off when a secure display or camera session starts.
    ///
    /// Returns whether the display has to be powered on again because a
    /// session ended.
    pub fn handle_secure_session(&self, sessions: SecureSessions) -> bool {
        let active = self.secure_sessions.get();
        let mut power_on_pending = false;
        for (session, name) in [
            (SS_SECURE_DISPLAY, "secure display"),
            (SS_SECURE_CAMERA, "secure camera"),
        ] {
            let now = sessions.contains(session);
            if active.contains(session) == now {
                continue;
            }
            if now {
                self.pending_power_mode.set(self.power_mode.get());
                if let Err(e) = self.set_power_mode(PowerMode::Off, true) {
                    log::error!("Display {}: Could not power off: {}", self.id, ErrorFmt(e));
                }
            } else {
                power_on_pending = self.pending_power_mode.get() != PowerMode::Off;
            }
            log::info!(
                "Display {}: {} session {}",
                self.id,
                name,
                if now { "started" } else { "ended" }
            );
        }
        self.secure_sessions.set(sessions);
        power_on_pending
    }

    pub fn pending_power_mode(&self) -> PowerMode {
        self.pending_power_mode.get()
    }
}
