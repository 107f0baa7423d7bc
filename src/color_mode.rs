//! Color mode selection.
//!
//! Clients pick a color mode and render intent. The engine only knows named
//! modes, so every (mode, intent, dynamic range) triple is mapped to one of
//! the names the engine reported at startup.

use {
    crate::{
        engine::DisplayEngine, error::HwcError, format::Dataspace, layer::IDENTITY_MATRIX,
        utils::errorfmt::ErrorFmt,
    },
    ahash::AHashMap,
    std::{
        cell::{Cell, RefCell},
        collections::BTreeMap,
        rc::Rc,
    },
};

#[cfg(test)]
mod tests;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct ColorMode(pub i32);

impl ColorMode {
    pub const NATIVE: Self = Self(0);
    pub const STANDARD_BT601_625: Self = Self(1);
    pub const STANDARD_BT601_625_UNADJUSTED: Self = Self(2);
    pub const STANDARD_BT601_525: Self = Self(3);
    pub const STANDARD_BT601_525_UNADJUSTED: Self = Self(4);
    pub const STANDARD_BT709: Self = Self(5);
    pub const DCI_P3: Self = Self(6);
    pub const SRGB: Self = Self(7);
    pub const ADOBE_RGB: Self = Self(8);
    pub const DISPLAY_P3: Self = Self(9);
    pub const BT2020: Self = Self(10);
    pub const BT2100_PQ: Self = Self(11);
    pub const BT2100_HLG: Self = Self(12);
    pub const DISPLAY_BT2020: Self = Self(13);

    pub fn is_valid(self) -> bool {
        (Self::NATIVE.0..=Self::DISPLAY_BT2020.0).contains(&self.0)
    }

    /// The dataspace the client target has to be rendered in.
    pub fn dataspace(self) -> Dataspace {
        match self {
            Self::SRGB => Dataspace::V0_SRGB,
            Self::DISPLAY_P3 => Dataspace::DISPLAY_P3,
            Self::BT2100_PQ => Dataspace::BT2020_PQ,
            Self::BT2100_HLG => Dataspace::BT2020_HLG,
            Self::DISPLAY_BT2020 => Dataspace::DISPLAY_BT2020,
            _ => Dataspace::UNKNOWN,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct RenderIntent(pub i32);

impl RenderIntent {
    pub const COLORIMETRIC: Self = Self(0);
    pub const ENHANCE: Self = Self(1);
    pub const TONE_MAP_COLORIMETRIC: Self = Self(2);
    pub const TONE_MAP_ENHANCE: Self = Self(3);
}

pub const MAX_EXTENDED_RENDER_INTENT: i32 = 0x1ff;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub enum DynamicRange {
    #[default]
    Sdr,
    Hdr,
}

pub const NATIVE_IDENTITY: &str = "hal_native_identity";

const ATTR_COLOR_GAMUT: &str = "ColorGamut";
const ATTR_DYNAMIC_RANGE: &str = "DynamicRange";
const ATTR_PICTURE_QUALITY: &str = "PictureQuality";
const ATTR_GAMMA_TRANSFER: &str = "GammaTransfer";
const ATTR_RENDER_INTENT: &str = "RenderIntent";

const GAMUT_NATIVE: &str = "native";
const GAMUT_SRGB: &str = "srgb";
const GAMUT_DCIP3: &str = "dcip3";
const GAMUT_BT2020: &str = "bt2020";
const RANGE_HDR: &str = "hdr";
const RANGE_SDR: &str = "sdr";
const QUALITY_STANDARD: &str = "standard";
const TRANSFER_ST2084: &str = "st2084";
const TRANSFER_HLG: &str = "hlg";
const TRANSFER_SRGB: &str = "srgb";

type IntentMap = BTreeMap<RenderIntent, BTreeMap<DynamicRange, String>>;
pub type ColorModeMap = BTreeMap<ColorMode, IntentMap>;

/// The attributes the engine attached to a named mode.
#[derive(Debug, Default)]
struct ModeAttrs {
    gamut: Option<String>,
    range: Option<String>,
    quality: Option<String>,
    transfer: Option<String>,
    intent: Option<String>,
}

impl ModeAttrs {
    fn parse(attrs: &[(String, String)]) -> Self {
        let mut res = Self::default();
        for (key, value) in attrs {
            let slot = if key.contains(ATTR_COLOR_GAMUT) {
                &mut res.gamut
            } else if key.contains(ATTR_DYNAMIC_RANGE) {
                &mut res.range
            } else if key.contains(ATTR_PICTURE_QUALITY) {
                &mut res.quality
            } else if key.contains(ATTR_GAMMA_TRANSFER) {
                &mut res.transfer
            } else if key.contains(ATTR_RENDER_INTENT) {
                &mut res.intent
            } else {
                continue;
            };
            *slot = Some(value.clone());
        }
        res
    }
}

/// Builds the mode map from the names reported by the engine.
pub fn populate_color_modes(engine: &dyn DisplayEngine, pipe_tone_mapping: bool) -> ColorModeMap {
    let mut map = ColorModeMap::new();
    let mut insert = |mode: ColorMode, intent: RenderIntent, range: DynamicRange, name: &str| {
        map.entry(mode)
            .or_default()
            .entry(intent)
            .or_default()
            .insert(range, name.to_string());
    };
    let names = match engine.color_modes() {
        Ok(names) if !names.is_empty() => names,
        res => {
            if let Err(e) = res {
                log::warn!("Could not query color modes: {}", ErrorFmt(e));
            }
            log::warn!("No color modes reported, using the native mode");
            insert(
                ColorMode::NATIVE,
                RenderIntent::COLORIMETRIC,
                DynamicRange::Sdr,
                NATIVE_IDENTITY,
            );
            return map;
        }
    };
    for name in &names {
        let attrs = engine.color_mode_attrs(name).unwrap_or_default();
        if attrs.is_empty() {
            if name.contains("hal_native") {
                insert(
                    ColorMode::NATIVE,
                    RenderIntent::COLORIMETRIC,
                    DynamicRange::Sdr,
                    name,
                );
            }
            continue;
        }
        let attrs = ModeAttrs::parse(&attrs);
        let intent = attrs
            .intent
            .as_deref()
            .and_then(|i| i.trim().parse::<i32>().ok())
            .filter(|i| (0..=MAX_EXTENDED_RENDER_INTENT).contains(i));
        let Some(intent) = intent else {
            log::warn!("Invalid render intent {:?} for mode {}", attrs.intent, name);
            continue;
        };
        let intent = RenderIntent(intent);
        let gamut = attrs.gamut.as_deref().unwrap_or(GAMUT_NATIVE);
        let range = attrs.range.as_deref().unwrap_or(RANGE_SDR);
        let quality = attrs.quality.as_deref().unwrap_or(QUALITY_STANDARD);
        let transfer = attrs.transfer.as_deref().unwrap_or_default();
        log::debug!(
            "Mode {}: gamut = {}, range = {}, quality = {}, intent = {}",
            name,
            gamut,
            range,
            quality,
            intent.0,
        );
        match (gamut, range) {
            (GAMUT_NATIVE, _) => insert(ColorMode::NATIVE, intent, DynamicRange::Sdr, name),
            (GAMUT_SRGB, RANGE_SDR) => insert(ColorMode::SRGB, intent, DynamicRange::Sdr, name),
            (GAMUT_DCIP3, RANGE_SDR) => {
                insert(ColorMode::DISPLAY_P3, intent, DynamicRange::Sdr, name)
            }
            (GAMUT_DCIP3, RANGE_HDR) => {
                if pipe_tone_mapping {
                    insert(ColorMode::DISPLAY_P3, intent, DynamicRange::Hdr, name);
                } else if quality == QUALITY_STANDARD {
                    insert(ColorMode::BT2100_PQ, intent, DynamicRange::Hdr, name);
                    insert(ColorMode::BT2100_HLG, intent, DynamicRange::Hdr, name);
                }
            }
            (GAMUT_BT2020, _) => {
                let colorimetric = RenderIntent::COLORIMETRIC;
                match transfer {
                    TRANSFER_ST2084 => {
                        insert(ColorMode::BT2100_PQ, colorimetric, DynamicRange::Hdr, name)
                    }
                    TRANSFER_HLG => {
                        insert(ColorMode::BT2100_HLG, colorimetric, DynamicRange::Hdr, name)
                    }
                    TRANSFER_SRGB => insert(
                        ColorMode::DISPLAY_BT2020,
                        colorimetric,
                        DynamicRange::Sdr,
                        name,
                    ),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    map
}

pub struct ColorModeArbiter {
    engine: Rc<dyn DisplayEngine>,
    map: ColorModeMap,
    preferred: RefCell<AHashMap<(ColorMode, DynamicRange), String>>,
    current_mode: Cell<ColorMode>,
    current_intent: Cell<RenderIntent>,
    current_range: Cell<DynamicRange>,
    apply_mode: Cell<bool>,
    color_matrix: Cell<[f64; 16]>,
}

impl ColorModeArbiter {
    pub fn new(engine: Rc<dyn DisplayEngine>) -> Self {
        let pipe_tone_mapping = engine.info().pipe_tone_mapping;
        let map = populate_color_modes(&*engine, pipe_tone_mapping);
        Self {
            engine,
            map,
            preferred: Default::default(),
            current_mode: Cell::new(ColorMode::NATIVE),
            current_intent: Cell::new(RenderIntent::COLORIMETRIC),
            current_range: Cell::new(DynamicRange::Sdr),
            apply_mode: Cell::new(false),
            color_matrix: Cell::new(IDENTITY_MATRIX.map(|v| v as f64)),
        }
    }

    pub fn map(&self) -> &ColorModeMap {
        &self.map
    }

    fn lookup(&self, mode: ColorMode, intent: RenderIntent, range: DynamicRange) -> Option<&str> {
        self.map.get(&mode)?.get(&intent)?.get(&range).map(|s| &**s)
    }

    pub fn color_mode_count(&self) -> u32 {
        (self.map.len() as u32).max(1)
    }

    pub fn render_intent_count(&self, mode: ColorMode) -> u32 {
        let n = self.map.get(&mode).map(|m| m.len()).unwrap_or(0);
        (n as u32).max(1)
    }

    pub fn color_modes(&self) -> Vec<ColorMode> {
        self.map.keys().copied().collect()
    }

    pub fn render_intents(&self, mode: ColorMode) -> Result<Vec<RenderIntent>, HwcError> {
        match self.map.get(&mode) {
            Some(intents) => Ok(intents.keys().copied().collect()),
            None => Err(HwcError::BadParameter),
        }
    }

    pub fn validate(&self, mode: ColorMode, intent: RenderIntent) -> Result<(), HwcError> {
        if !mode.is_valid() {
            log::error!("Invalid color mode {}", mode.0);
            return Err(HwcError::BadParameter);
        }
        let Some(intents) = self.map.get(&mode) else {
            log::error!("Could not find color mode {}", mode.0);
            return Err(HwcError::Unsupported);
        };
        if !intents.contains_key(&intent) {
            log::error!("Could not find render intent {} in mode {}", intent.0, mode.0);
            return Err(HwcError::Unsupported);
        }
        Ok(())
    }

    pub fn set_color_mode_with_render_intent(
        &self,
        mode: ColorMode,
        intent: RenderIntent,
    ) -> Result<(), HwcError> {
        self.validate(mode, intent)?;
        if self.current_mode.get() == mode && self.current_intent.get() == intent {
            return Ok(());
        }
        let name = self
            .lookup(mode, intent, DynamicRange::Sdr)
            .or_else(|| self.lookup(mode, intent, DynamicRange::Hdr))
            .unwrap_or_default();
        if let Err(e) = self.engine.set_color_mode(name) {
            log::error!(
                "Could not apply mode {} intent {} ({}): {}",
                mode.0,
                intent.0,
                name,
                ErrorFmt(e),
            );
            return Err(HwcError::Unsupported);
        }
        self.restore_color_transform();
        self.current_mode.set(mode);
        self.current_intent.set(intent);
        log::info!("Applied color mode {} intent {} ({})", mode.0, intent.0, name);
        Ok(())
    }

    /// Records the mode without touching the engine. It is applied with the
    /// next frame.
    pub fn cache_color_mode_with_render_intent(
        &self,
        mode: ColorMode,
        intent: RenderIntent,
    ) -> Result<(), HwcError> {
        self.validate(mode, intent)?;
        if self.current_mode.get() == mode && self.current_intent.get() == intent {
            return Ok(());
        }
        self.current_mode.set(mode);
        self.current_intent.set(intent);
        self.apply_mode.set(true);
        Ok(())
    }

    fn resolve(&self, range: DynamicRange) -> Option<String> {
        let mode = self.current_mode.get();
        let intent = self.current_intent.get();
        if let Some(name) = self.preferred.borrow().get(&(mode, range)) {
            return Some(name.clone());
        }
        let hdr = range == DynamicRange::Hdr;
        let mut name = self.lookup(mode, intent, range);
        if name.is_none() && hdr {
            name = self.lookup(mode, RenderIntent::COLORIMETRIC, DynamicRange::Hdr);
        }
        let wide = matches!(
            mode,
            ColorMode::DISPLAY_P3 | ColorMode::DISPLAY_BT2020 | ColorMode::NATIVE
        );
        if name.is_none() && wide && hdr {
            name = self.lookup(mode, intent, DynamicRange::Sdr);
        }
        if name.is_none() && mode == ColorMode::BT2100_PQ && !hdr {
            log::info!("Falling back to the HDR mode for BT2100 PQ");
            name = self.lookup(mode, intent, DynamicRange::Hdr);
        }
        name.map(|n| n.to_string())
    }

    /// Applies the cached mode if it was changed or if the HDR state of the
    /// stack flipped.
    pub fn apply_current(&self, hdr_present: bool) -> Result<(), HwcError> {
        if self.map.len() <= 1 {
            return Ok(());
        }
        let range = match hdr_present {
            true => DynamicRange::Hdr,
            false => DynamicRange::Sdr,
        };
        if !self.apply_mode.get() && self.current_range.get() == range {
            return Ok(());
        }
        self.apply_mode.set(false);
        self.current_range.set(range);
        let (mode, intent) = (self.current_mode.get(), self.current_intent.get());
        let Some(name) = self.resolve(range) else {
            log::error!(
                "No mode for mode {} intent {} range {:?}",
                mode.0,
                intent.0,
                range,
            );
            return Err(HwcError::BadParameter);
        };
        if let Err(e) = self.engine.set_color_mode(&name) {
            log::error!("Could not apply mode {}: {}", name, ErrorFmt(e));
            return Err(HwcError::BadParameter);
        }
        self.restore_color_transform();
        log::debug!(
            "Applied mode {} intent {} range {:?} ({})",
            mode.0,
            intent.0,
            range,
            name,
        );
        Ok(())
    }

    pub fn set_color_mode_by_id(&self, id: i32) -> Result<(), HwcError> {
        log::info!("Applying color mode id {}", id);
        if let Err(e) = self.engine.set_color_mode_by_id(id) {
            log::warn!("Could not apply color mode id {}: {}", id, ErrorFmt(e));
            return Err(HwcError::BadParameter);
        }
        Ok(())
    }

    /// Pins a named mode as the preferred mode of its (mode, range) pair.
    pub fn set_color_mode_from_client_api(&self, name: &str) -> Result<(), HwcError> {
        let attrs = match self.engine.color_mode_attrs(name) {
            Ok(attrs) => ModeAttrs::parse(&attrs),
            Err(e) => {
                log::error!("Could not get the attributes of mode {}: {}", name, ErrorFmt(e));
                return Err(HwcError::BadParameter);
            }
        };
        let (Some(gamut), Some(range)) = (&attrs.gamut, &attrs.range) else {
            log::error!("Mode {} lacks gamut or dynamic range: {:?}", name, attrs);
            return Err(HwcError::BadParameter);
        };
        let mode = match &**gamut {
            GAMUT_DCIP3 => ColorMode::DISPLAY_P3,
            GAMUT_SRGB => ColorMode::SRGB,
            _ => ColorMode::NATIVE,
        };
        let range = match &**range {
            RANGE_HDR => DynamicRange::Hdr,
            _ => DynamicRange::Sdr,
        };
        if self.current_mode.get() == mode && self.current_range.get() == range {
            log::info!("Applying mode {}", name);
            if let Err(e) = self.engine.set_color_mode(name) {
                log::error!("Could not apply mode {}: {}", name, ErrorFmt(e));
                return Err(HwcError::BadParameter);
            }
        }
        self.preferred
            .borrow_mut()
            .insert((mode, range), name.to_string());
        Ok(())
    }

    /// Re-sends the cached matrix. Failures are only logged.
    pub fn restore_color_transform(&self) {
        if let Err(e) = self.engine.set_color_transform(&self.color_matrix.get()) {
            log::error!("Could not restore the color transform: {}", ErrorFmt(e));
        }
    }

    /// The matrix is cached even if the engine rejects it.
    pub fn set_color_transform(&self, matrix: &[f32; 16]) -> Result<(), HwcError> {
        let matrix = matrix.map(|v| v as f64);
        let res = match self.engine.set_color_transform(&matrix) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Could not set the color transform: {}", ErrorFmt(e));
                Err(HwcError::Unsupported)
            }
        };
        self.color_matrix.set(matrix);
        res
    }

    pub fn color_matrix(&self) -> [f64; 16] {
        self.color_matrix.get()
    }

    pub fn reapply_mode(&self) {
        self.apply_mode.set(true);
    }

    pub fn current_color_mode(&self) -> ColorMode {
        self.current_mode.get()
    }

    pub fn current_render_intent(&self) -> RenderIntent {
        self.current_intent.get()
    }

    pub fn current_dynamic_range(&self) -> DynamicRange {
        self.current_range.get()
    }
}
