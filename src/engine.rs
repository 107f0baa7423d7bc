//! The display engine collaborator.
//!
//! The engine programs pipes, mixers and writeback blocks. This crate only
//! orchestrates it: every call is synchronous and expected to return promptly.

use {
    crate::{
        error::EngineError,
        fence::SyncFile,
        format::Format,
        stack::{LayerStackSnapshot, OutputBuffer},
    },
    hwc_algorithms::rect::FRect,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PrepareStatus {
    Done,
    /// The engine folded validation and commit and wants the commit to run.
    NeedsCommit,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PowerMode {
    Off,
    On,
    Doze,
    DozeSuspend,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DisplayClass {
    Builtin,
    Pluggable,
    Virtual,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DisplayInfo {
    pub class: DisplayClass,
    pub command_mode: bool,
    pub game_supported: bool,
    /// Source pipes can tone map HDR content on their own.
    pub pipe_tone_mapping: bool,
}

impl Default for DisplayInfo {
    fn default() -> Self {
        Self {
            class: DisplayClass::Builtin,
            command_mode: false,
            game_supported: false,
            pipe_tone_mapping: false,
        }
    }
}

/// The attributes that decide whether two configs may be switched seamlessly.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct ConfigGroup {
    pub x_pixels: u32,
    pub y_pixels: u32,
    pub x_dpi: u32,
    pub y_dpi: u32,
    pub smart_panel: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct VariableConfig {
    pub x_pixels: u32,
    pub y_pixels: u32,
    pub x_dpi: u32,
    pub y_dpi: u32,
    pub fps: u32,
    pub vsync_period_ns: i64,
    pub smart_panel: bool,
}

impl VariableConfig {
    pub fn group(&self) -> ConfigGroup {
        ConfigGroup {
            x_pixels: self.x_pixels,
            y_pixels: self.y_pixels,
            x_dpi: self.x_dpi,
            y_dpi: self.y_dpi,
            smart_panel: self.smart_panel,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum CwbTapPoint {
    #[default]
    LayerMixer,
    Dspp,
    Demura,
}

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct CwbConfig {
    pub tap_point: CwbTapPoint,
    pub roi: FRect,
    pub full_rect: FRect,
    pub pu_as_cwb_roi: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SecureEvent {
    TuiPrepare,
    TuiStart,
    TuiEnd,
    TuiUnprepare,
}

pub trait DisplayEngine {
    fn prepare(&self, stack: &mut LayerStackSnapshot) -> Result<PrepareStatus, EngineError>;

    fn commit_or_prepare(
        &self,
        stack: &mut LayerStackSnapshot,
    ) -> Result<PrepareStatus, EngineError> {
        self.prepare(stack)
    }

    fn commit(&self, stack: &mut LayerStackSnapshot) -> Result<(), EngineError>;

    fn flush(&self, stack: &mut LayerStackSnapshot) -> Result<(), EngineError> {
        let _ = stack;
        Ok(())
    }

    /// Blocks until no asynchronous commit references any layer.
    fn destroy_layer(&self) {}

    /// Whether the engine still holds a validated stack.
    fn is_validated(&self) -> bool;

    fn has_demura(&self) -> bool {
        false
    }

    fn info(&self) -> DisplayInfo {
        DisplayInfo::default()
    }

    fn color_modes(&self) -> Result<Vec<String>, EngineError> {
        Ok(vec![])
    }

    fn color_mode_attrs(&self, name: &str) -> Result<Vec<(String, String)>, EngineError> {
        let _ = name;
        Ok(vec![])
    }

    fn set_color_mode(&self, name: &str) -> Result<(), EngineError>;

    fn set_color_mode_by_id(&self, id: i32) -> Result<(), EngineError> {
        let _ = id;
        Err(EngineError::NotSupported)
    }

    fn set_color_transform(&self, matrix: &[f64; 16]) -> Result<(), EngineError>;

    fn set_display_state(
        &self,
        state: PowerMode,
        teardown: bool,
    ) -> Result<Option<SyncFile>, EngineError>;

    fn display_state(&self) -> Result<PowerMode, EngineError>;

    fn set_vsync_state(&self, enabled: bool) -> Result<(), EngineError> {
        let _ = enabled;
        Ok(())
    }

    fn set_cursor_position(&self, x: i32, y: i32) -> Result<(), EngineError> {
        let _ = x;
        let _ = y;
        Err(EngineError::NotSupported)
    }

    fn num_variable_configs(&self) -> Result<u32, EngineError>;

    fn variable_config(&self, index: u32) -> Result<VariableConfig, EngineError>;

    fn active_config(&self) -> Result<u32, EngineError>;

    fn set_active_config(&self, index: u32) -> Result<(), EngineError>;

    /// A bitmask of configs that may be switched to. Zero allows all.
    fn allowed_mode_switch(&self) -> Result<u32, EngineError> {
        Ok(0)
    }

    fn set_frame_buffer_config(&self, width: u32, height: u32) -> Result<(), EngineError> {
        let _ = width;
        let _ = height;
        Ok(())
    }

    /// The minimum and maximum refresh rate of the panel.
    fn refresh_rate_range(&self) -> (u32, u32) {
        (60, 60)
    }

    fn is_writeback_supported_format(&self, format: Format) -> bool {
        format.is_writeback_capable()
    }

    fn capture_cwb(&self, buffer: &OutputBuffer, config: &CwbConfig) -> Result<(), EngineError> {
        let _ = buffer;
        let _ = config;
        Err(EngineError::NotSupported)
    }

    /// The fence of the most recently committed writeback output.
    fn output_buffer_acquire_fence(&self) -> Option<SyncFile> {
        None
    }

    /// Returns `false` if the engine refuses to tear down writeback.
    fn handle_cwb_teardown(&self) -> bool {
        true
    }

    fn cwb_buffer_resolution(&self, config: &CwbConfig) -> Result<(u32, u32), EngineError> {
        let _ = config;
        Err(EngineError::NotSupported)
    }

    /// Returns whether a refresh is needed to complete the transition.
    fn handle_secure_event(&self, event: SecureEvent) -> Result<bool, EngineError> {
        let _ = event;
        Ok(false)
    }

    fn post_handle_secure_event(&self, event: SecureEvent) -> Result<(), EngineError> {
        let _ = event;
        Ok(())
    }
}
