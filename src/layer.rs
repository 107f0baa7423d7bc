use {
    crate::{
        error::HwcError,
        fence::SyncFile,
        flags::{
            BF_HDR, BF_MASK_LAYER, BF_SECURE, BF_SECURE_CAMERA, BF_SECURE_DISPLAY, BF_VIDEO,
            BufferFlags, GC_ADDED, GC_BLEND_MODE, GC_BUFFER_GEOMETRY, GC_DATASPACE,
            GC_DISPLAY_FRAME, GC_LAYER_BRIGHTNESS, GC_PLANE_ALPHA, GC_SOURCE_CROP, GC_TRANSFORM,
            GC_Z_ORDER,
            GeometryChanges, LF_SOLID_FILL, LF_UPDATING, LU_CLIENT_COMP_REQUEST,
            LU_COLOR_TRANSFORM, LU_CONTENT_METADATA, LU_METADATA, LU_SECURITY,
            LU_SURFACE_DAMAGE, LU_SURFACE_INVALIDATE, LayerFlags, LayerUpdates,
        },
        format::{BufferInfo, ColorMetadata, Dataspace, Format, HdrMetadata},
    },
    hwc_algorithms::rect::FRect,
    std::cell::{Cell, RefCell},
};


linear_ids!(LayerIds, LayerId, u64);

/// The composition type as seen by the client.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum Composition {
    #[default]
    Invalid,
    Client,
    Device,
    SolidColor,
    Cursor,
    DisplayDecoration,
}

/// The composition type as decided by the display engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum EngineComposition {
    Gpu,
    Stitch,
    Demura,
    Sde,
    Cursor,
    #[default]
    None,
    GpuTarget,
    StitchTarget,
    CwbTarget,
    Iwe,
}

impl EngineComposition {
    /// Maps an engine decision to the type reported to the client.
    pub fn to_client(
        self,
        solid_fill: bool,
        mask_layer: bool,
        requested_orig: Composition,
    ) -> Composition {
        let mut res = match self {
            EngineComposition::Gpu => Composition::Client,
            EngineComposition::Cursor => Composition::Cursor,
            _ => Composition::Device,
        };
        if self == EngineComposition::Sde {
            if solid_fill {
                res = Composition::SolidColor;
            }
            if mask_layer && requested_orig == Composition::DisplayDecoration {
                res = Composition::DisplayDecoration;
            }
        }
        res
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlendMode {
    None,
    Premultiplied,
    Coverage,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Blending {
    Opaque,
    #[default]
    Premultiplied,
    Coverage,
}

pub const TRANSFORM_NONE: i32 = 0;
pub const TRANSFORM_FLIP_H: i32 = 1;
pub const TRANSFORM_FLIP_V: i32 = 2;
pub const TRANSFORM_ROT_90: i32 = 4;
pub const TRANSFORM_ROT_180: i32 = 3;
pub const TRANSFORM_ROT_270: i32 = 7;

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct LayerTransform {
    pub rotation: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl LayerTransform {
    pub fn from_raw(transform: i32) -> Option<Self> {
        let (rotation, flip_horizontal, flip_vertical) = match transform {
            TRANSFORM_NONE => (0.0, false, false),
            TRANSFORM_FLIP_H => (0.0, true, false),
            TRANSFORM_FLIP_V => (0.0, false, true),
            TRANSFORM_ROT_90 => (90.0, false, false),
            TRANSFORM_ROT_180 => (0.0, true, true),
            TRANSFORM_ROT_270 => (90.0, true, true),
            t if t == TRANSFORM_FLIP_H | TRANSFORM_ROT_90 => (90.0, true, false),
            t if t == TRANSFORM_FLIP_V | TRANSFORM_ROT_90 => (90.0, false, true),
            _ => return None,
        };
        Some(Self {
            rotation,
            flip_horizontal,
            flip_vertical,
        })
    }

    pub fn is_rotation_present(&self) -> bool {
        self.rotation != 0.0 || self.flip_horizontal || self.flip_vertical
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum LayerType {
    #[default]
    Unknown,
    App,
    Game,
    Browser,
}

/// An integer rectangle as sent by clients. `right` and `bottom` are exclusive.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn to_frect(self) -> FRect {
        FRect::new(
            self.left as f32,
            self.top as f32,
            self.right as f32,
            self.bottom as f32,
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PerFrameMetadataKey {
    DisplayRedPrimaryX,
    DisplayRedPrimaryY,
    DisplayGreenPrimaryX,
    DisplayGreenPrimaryY,
    DisplayBluePrimaryX,
    DisplayBluePrimaryY,
    WhitePointX,
    WhitePointY,
    MaxLuminance,
    MinLuminance,
    MaxContentLightLevel,
    MaxFrameAverageLightLevel,
}

pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

const MAX_PLANE_ALPHA: u8 = 255;
const STANDARD_FPS: [u32; 4] = [24, 30, 48, 60];

/// Snaps a metadata frame rate to a nearby standard video rate.
pub fn round_to_standard_fps(fps: f32) -> u32 {
    let rate = fps as u32;
    for std in STANDARD_FPS {
        if std.abs_diff(rate) < 2 {
            return std;
        }
    }
    rate
}

/// The per-layer record that clients mutate between frames.
pub struct HwcLayer {
    pub id: LayerId,
    disable_sdr_dimming: bool,
    client_requested: Cell<Composition>,
    client_requested_orig: Cell<Composition>,
    device_selected: Cell<Composition>,
    z: Cell<u32>,
    layer_type: Cell<LayerType>,
    compatible: Cell<bool>,
    geometry_changes: Cell<GeometryChanges>,
    update_mask: Cell<LayerUpdates>,
    surface_updated: Cell<bool>,
    display_frame: Cell<FRect>,
    source_crop: Cell<FRect>,
    non_integral_source_crop: Cell<bool>,
    transform: Cell<LayerTransform>,
    blending: Cell<Blending>,
    plane_alpha: Cell<u8>,
    solid_fill_color: Cell<u32>,
    dataspace: Cell<Dataspace>,
    dataspace_supported: Cell<bool>,
    color_metadata: Cell<ColorMetadata>,
    hdr_metadata: Cell<HdrMetadata>,
    buffer: Cell<Option<BufferInfo>>,
    buffer_flags: Cell<BufferFlags>,
    acquire_fence: RefCell<Option<SyncFile>>,
    release_fence: RefCell<Option<SyncFile>>,
    dirty_regions: RefCell<Vec<FRect>>,
    visible_regions: RefCell<Vec<FRect>>,
    color_transform: Cell<[f32; 16]>,
    color_transform_set: Cell<bool>,
    brightness: Cell<f32>,
    frame_rate: Cell<u32>,
    has_metadata_refresh_rate: Cell<bool>,
    frame_flags: Cell<LayerFlags>,
}

impl HwcLayer {
    pub fn new(id: LayerId, disable_sdr_dimming: bool) -> Self {
        Self {
            id,
            disable_sdr_dimming,
            client_requested: Cell::new(Composition::Device),
            client_requested_orig: Cell::new(Composition::Device),
            device_selected: Cell::new(Composition::Device),
            z: Cell::new(0),
            layer_type: Default::default(),
            compatible: Cell::new(false),
            geometry_changes: Cell::new(GC_ADDED),
            update_mask: Default::default(),
            surface_updated: Cell::new(true),
            display_frame: Default::default(),
            source_crop: Default::default(),
            non_integral_source_crop: Cell::new(false),
            transform: Default::default(),
            blending: Default::default(),
            plane_alpha: Cell::new(MAX_PLANE_ALPHA),
            solid_fill_color: Cell::new(0),
            dataspace: Cell::new(Dataspace::UNKNOWN),
            dataspace_supported: Cell::new(true),
            color_metadata: Default::default(),
            hdr_metadata: Default::default(),
            buffer: Cell::new(None),
            buffer_flags: Default::default(),
            acquire_fence: Default::default(),
            release_fence: Default::default(),
            dirty_regions: Default::default(),
            visible_regions: Default::default(),
            color_transform: Cell::new(IDENTITY_MATRIX),
            color_transform_set: Cell::new(false),
            brightness: Cell::new(1.0),
            frame_rate: Cell::new(0),
            has_metadata_refresh_rate: Cell::new(false),
            frame_flags: Default::default(),
        }
    }

    pub fn set_buffer(
        &self,
        buffer: Option<&BufferInfo>,
        acquire_fence: Option<SyncFile>,
    ) -> Result<(), HwcError> {
        let Some(buffer) = buffer else {
            let requested = self.client_requested.get();
            if matches!(requested, Composition::Device | Composition::Cursor) {
                log::warn!(
                    "Layer {}: Missing buffer for requested composition {:?}",
                    self.id,
                    requested,
                );
                return Err(HwcError::BadParameter);
            }
            return Ok(());
        };
        let old = self.buffer.get().unwrap_or_default();
        if old.format != buffer.format || old.width != buffer.width || old.height != buffer.height
        {
            self.add_geometry_changes(GC_BUFFER_GEOMETRY);
        }
        if old.secure != buffer.secure
            || old.secure_camera != buffer.secure_camera
            || old.secure_display != buffer.secure_display
        {
            self.add_updates(LU_SECURITY);
        }
        let mut flags = self.buffer_flags.get();
        flags.set(BF_VIDEO, buffer.video);
        flags.set(BF_SECURE, buffer.secure);
        flags.set(BF_SECURE_CAMERA, buffer.secure_camera);
        flags.set(BF_SECURE_DISPLAY, buffer.secure_display);
        self.buffer_flags.set(flags);
        if let Some(fps) = buffer.frame_rate {
            let rate = match fps {
                0 => self.frame_rate.get(),
                _ => round_to_standard_fps(fps as f32),
            };
            self.has_metadata_refresh_rate.set(true);
            if rate != self.frame_rate.get() {
                self.frame_rate.set(rate);
                self.add_updates(LU_METADATA);
            }
        } else {
            self.has_metadata_refresh_rate.set(false);
        }
        self.buffer.set(Some(*buffer));
        *self.acquire_fence.borrow_mut() = acquire_fence;
        self.update_color_metadata();
        Ok(())
    }

    pub fn set_surface_damage(&self, damage: &[Rect]) {
        let mut updated = true;
        if let [rect] = damage
            && rect.right == 0
            && rect.bottom == 0
        {
            updated = false;
        }
        self.surface_updated.set(updated);
        if !self.frame_flags.get().contains(LF_UPDATING) && updated {
            self.add_updates(LU_SURFACE_INVALIDATE);
        }
        let rects: Vec<_> = damage.iter().map(|r| r.to_frect()).collect();
        let mut dirty = self.dirty_regions.borrow_mut();
        if dirty.len() != rects.len() {
            self.add_updates(LU_SURFACE_INVALIDATE);
        } else if dirty.iter().zip(rects.iter()).any(|(a, b)| a != b) {
            self.add_updates(LU_SURFACE_DAMAGE);
        }
        *dirty = rects;
    }

    pub fn set_blend_mode(&self, mode: BlendMode) {
        let blending = match mode {
            BlendMode::Coverage => Blending::Coverage,
            BlendMode::Premultiplied => Blending::Premultiplied,
            BlendMode::None => Blending::Opaque,
        };
        if self.blending.replace(blending) != blending {
            self.add_geometry_changes(GC_BLEND_MODE);
        }
    }

    pub fn set_color(&self, color: Color) {
        if self.client_requested.get() != Composition::SolidColor {
            return;
        }
        let argb = color.argb();
        if self.solid_fill_color.replace(argb) != argb {
            self.add_updates(LU_SURFACE_INVALIDATE);
            self.surface_updated.set(true);
        } else {
            self.surface_updated.set(false);
        }
    }

    pub fn set_composition_type(&self, ty: Composition) -> Result<(), HwcError> {
        if ty != self.client_requested.get()
            || ty != self.device_selected.get()
            || ty == Composition::Client
        {
            self.add_updates(LU_CLIENT_COMP_REQUEST);
        }
        self.client_requested.set(ty);
        self.client_requested_orig.set(ty);
        if ty == Composition::Invalid {
            return Err(HwcError::BadParameter);
        }
        Ok(())
    }

    pub fn set_dataspace(&self, dataspace: Dataspace) {
        let dataspace = dataspace.translate_legacy();
        if self.dataspace.replace(dataspace) != dataspace {
            self.add_geometry_changes(GC_DATASPACE);
            if self.buffer.get().is_some() {
                self.update_color_metadata();
            }
        }
    }

    fn update_color_metadata(&self) {
        let dataspace = self.dataspace.get();
        if dataspace == Dataspace::UNKNOWN {
            self.dataspace_supported.set(true);
            return;
        }
        match dataspace.color_metadata() {
            Some(md) => {
                if self.color_metadata.replace(md) != md {
                    self.add_updates(LU_METADATA);
                }
                self.dataspace_supported.set(true);
            }
            None => {
                log::debug!("Layer {}: Unsupported dataspace {:x}", self.id, dataspace.0);
                self.dataspace_supported.set(false);
            }
        }
    }

    pub fn set_display_frame(&self, frame: Rect) {
        let frame = frame.to_frect();
        if self.display_frame.replace(frame) != frame {
            self.add_geometry_changes(GC_DISPLAY_FRAME);
        }
    }

    pub fn set_cursor_position(&self, x: i32, y: i32) {
        let frame = self.display_frame.get();
        self.set_display_frame(Rect::new(
            x,
            y,
            x + frame.width() as i32,
            y + frame.height() as i32,
        ));
    }

    pub fn set_plane_alpha(&self, alpha: f32) -> Result<(), HwcError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(HwcError::BadParameter);
        }
        let mut plane_alpha = (MAX_PLANE_ALPHA as f32 * alpha).round() as u8;
        if plane_alpha == MAX_PLANE_ALPHA && alpha < 1.0 {
            plane_alpha = MAX_PLANE_ALPHA - 1;
        }
        if self.plane_alpha.replace(plane_alpha) != plane_alpha {
            self.add_geometry_changes(GC_PLANE_ALPHA);
        }
        Ok(())
    }

    pub fn set_source_crop(&self, crop: FRect) {
        let rounded = crop.round_inward();
        self.non_integral_source_crop.set(!crop.is_integral());
        if self.source_crop.replace(rounded) != rounded {
            self.add_geometry_changes(GC_SOURCE_CROP);
        }
    }

    pub fn set_transform(&self, transform: i32) -> Result<(), HwcError> {
        let Some(transform) = LayerTransform::from_raw(transform) else {
            return Err(HwcError::BadParameter);
        };
        if self.transform.replace(transform) != transform {
            self.add_geometry_changes(GC_TRANSFORM);
        }
        Ok(())
    }

    pub fn set_visible_region(&self, visible: &[Rect]) {
        *self.visible_regions.borrow_mut() = visible.iter().map(|r| r.to_frect()).collect();
    }

    /// Returns whether the z order changed. The caller owns the z index.
    pub(crate) fn set_z_order(&self, z: u32) -> bool {
        if self.z.replace(z) != z {
            self.add_geometry_changes(GC_Z_ORDER);
            return true;
        }
        false
    }

    pub fn set_type(&self, ty: LayerType) {
        self.layer_type.set(ty);
    }

    pub fn set_compatible(&self, compatible: bool) {
        self.compatible.set(compatible);
    }

    pub fn set_color_transform(&self, matrix: &[f32; 16]) {
        if self.color_transform.get() != *matrix {
            self.color_transform.set(*matrix);
            self.add_updates(LU_COLOR_TRANSFORM);
            self.color_transform_set.set(*matrix != IDENTITY_MATRIX);
        }
    }

    pub fn set_per_frame_metadata(&self, metadata: &[(PerFrameMetadataKey, f32)]) {
        use PerFrameMetadataKey::*;
        let old = self.hdr_metadata.get();
        let mut md = old;
        let chroma = |v: f32| (v * 50000.0) as u32;
        for &(key, value) in metadata {
            match key {
                DisplayRedPrimaryX => md.primaries[0][0] = chroma(value),
                DisplayRedPrimaryY => md.primaries[0][1] = chroma(value),
                DisplayGreenPrimaryX => md.primaries[1][0] = chroma(value),
                DisplayGreenPrimaryY => md.primaries[1][1] = chroma(value),
                DisplayBluePrimaryX => md.primaries[2][0] = chroma(value),
                DisplayBluePrimaryY => md.primaries[2][1] = chroma(value),
                WhitePointX => md.white_point[0] = chroma(value),
                WhitePointY => md.white_point[1] = chroma(value),
                MaxLuminance => md.max_luminance = value as u32,
                MinLuminance => md.min_luminance = (value * 10000.0) as u32,
                MaxContentLightLevel => md.max_content_light_level = value as u32,
                MaxFrameAverageLightLevel => md.max_frame_average_light_level = value as u32,
            }
        }
        if md != old {
            self.hdr_metadata.set(md);
            self.add_updates(LU_CONTENT_METADATA);
            self.add_geometry_changes(GC_DATASPACE);
        }
    }

    pub fn set_brightness(&self, brightness: f32) -> Result<(), HwcError> {
        if brightness.is_nan() || !(0.0..=1.0).contains(&brightness) {
            log::error!("Layer {}: Invalid brightness {}", self.id, brightness);
            return Err(HwcError::BadParameter);
        }
        let mut brightness = brightness;
        if brightness != 1.0
            && self.disable_sdr_dimming
            && self.client_requested.get() == Composition::Device
        {
            brightness = 1.0;
        }
        if self.brightness.replace(brightness) != brightness {
            self.add_geometry_changes(GC_LAYER_BRIGHTNESS);
        }
        Ok(())
    }

    /// Records the engine's decision and returns the resulting client type.
    pub fn set_engine_composition(&self, composition: EngineComposition) -> Composition {
        let flags = self.buffer_flags.get();
        let ty = composition.to_client(
            self.frame_flags.get().contains(LF_SOLID_FILL),
            flags.contains(BF_MASK_LAYER),
            self.client_requested_orig.get(),
        );
        self.device_selected.set(ty);
        ty
    }

    pub fn force_device_selected(&self, ty: Composition) {
        self.device_selected.set(ty);
    }

    /// Accepts a composition change proposed by validation.
    pub fn update_client_composition(&self, ty: Composition) {
        self.client_requested.set(ty);
    }

    pub fn reset_validation(&self) {
        self.update_mask.set(LayerUpdates::none());
    }

    pub fn reset_geometry_changes(&self) {
        self.geometry_changes.set(GeometryChanges::none());
    }

    pub fn add_geometry_changes(&self, changes: GeometryChanges) {
        self.geometry_changes.set(self.geometry_changes.get() | changes);
    }

    fn add_updates(&self, updates: LayerUpdates) {
        self.update_mask.set(self.update_mask.get() | updates);
    }

    pub fn client_requested(&self) -> Composition {
        self.client_requested.get()
    }

    pub fn client_requested_orig(&self) -> Composition {
        self.client_requested_orig.get()
    }

    pub fn device_selected(&self) -> Composition {
        self.device_selected.get()
    }

    pub fn z(&self) -> u32 {
        self.z.get()
    }

    pub fn layer_type(&self) -> LayerType {
        self.layer_type.get()
    }

    pub fn is_compatible(&self) -> bool {
        self.compatible.get()
    }

    pub fn geometry_changes(&self) -> GeometryChanges {
        self.geometry_changes.get()
    }

    pub fn update_mask(&self) -> LayerUpdates {
        self.update_mask.get()
    }

    pub fn is_surface_updated(&self) -> bool {
        self.surface_updated.get()
    }

    pub fn display_frame(&self) -> FRect {
        self.display_frame.get()
    }

    pub fn source_crop(&self) -> FRect {
        self.source_crop.get()
    }

    pub fn set_source_rect(&self, rect: FRect) {
        self.source_crop.set(rect);
    }

    pub fn is_non_integral_source_crop(&self) -> bool {
        self.non_integral_source_crop.get()
    }

    pub fn transform(&self) -> LayerTransform {
        self.transform.get()
    }

    pub fn blending(&self) -> Blending {
        self.blending.get()
    }

    pub fn plane_alpha(&self) -> u8 {
        self.plane_alpha.get()
    }

    pub fn solid_fill_color(&self) -> u32 {
        self.solid_fill_color.get()
    }

    pub fn dataspace(&self) -> Dataspace {
        self.dataspace.get()
    }

    /// Layers composed by the client accept any dataspace.
    pub fn is_data_space_supported(&self) -> bool {
        match self.client_requested.get() {
            Composition::Device | Composition::Cursor => self.dataspace_supported.get(),
            _ => true,
        }
    }

    pub fn color_metadata(&self) -> ColorMetadata {
        self.color_metadata.get()
    }

    pub fn set_color_metadata(&self, md: ColorMetadata) {
        self.color_metadata.set(md);
    }

    pub fn hdr_metadata(&self) -> HdrMetadata {
        self.hdr_metadata.get()
    }

    pub fn buffer(&self) -> Option<BufferInfo> {
        self.buffer.get()
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.get().is_some()
    }

    pub fn format(&self) -> Format {
        self.buffer.get().map(|b| b.format).unwrap_or_default()
    }

    pub fn buffer_flags(&self) -> BufferFlags {
        self.buffer_flags.get()
    }

    pub fn set_buffer_flag(&self, flag: BufferFlags, value: bool) {
        let mut flags = self.buffer_flags.get();
        flags.set(flag, value);
        self.buffer_flags.set(flags);
    }

    pub fn is_hdr(&self) -> bool {
        self.buffer_flags.get().contains(BF_HDR)
    }

    pub fn is_single_buffered(&self) -> bool {
        self.buffer.get().is_some_and(|b| b.single_buffered)
    }

    pub fn is_front_buffer(&self) -> bool {
        self.buffer.get().is_some_and(|b| b.is_front_buffer())
    }

    pub fn acquire_fence(&self) -> Option<SyncFile> {
        self.acquire_fence.borrow().clone()
    }

    pub fn take_acquire_fence(&self) -> Option<SyncFile> {
        self.acquire_fence.borrow_mut().take()
    }

    pub fn release_fence(&self) -> Option<SyncFile> {
        self.release_fence.borrow().clone()
    }

    pub fn set_release_fence(&self, fence: Option<SyncFile>) {
        *self.release_fence.borrow_mut() = fence;
    }

    pub fn dirty_regions(&self) -> Vec<FRect> {
        self.dirty_regions.borrow().clone()
    }

    pub fn visible_regions(&self) -> Vec<FRect> {
        self.visible_regions.borrow().clone()
    }

    pub fn color_transform(&self) -> [f32; 16] {
        self.color_transform.get()
    }

    pub fn is_color_transform_set(&self) -> bool {
        self.color_transform_set.get()
    }

    pub fn brightness(&self) -> f32 {
        self.brightness.get()
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate.get()
    }

    pub fn set_frame_rate(&self, rate: u32) {
        self.frame_rate.set(rate);
    }

    pub fn has_metadata_refresh_rate(&self) -> bool {
        self.has_metadata_refresh_rate.get()
    }

    pub fn frame_flags(&self) -> LayerFlags {
        self.frame_flags.get()
    }

    pub fn set_frame_flags(&self, flags: LayerFlags) {
        self.frame_flags.set(flags);
    }

    pub fn is_scaling_present(&self) -> bool {
        let src = self.source_crop.get();
        let dst = self.display_frame.get();
        let (mut src_w, mut src_h) = (src.width() as u32, src.height() as u32);
        let (dst_w, dst_h) = (dst.width() as u32, dst.height() as u32);
        let rotation = self.transform.get().rotation;
        if rotation == 90.0 || rotation == 270.0 {
            std::mem::swap(&mut src_w, &mut src_h);
        }
        src_w != dst_w || src_h != dst_h
    }

    pub fn is_rotation_present(&self) -> bool {
        self.transform.get().is_rotation_present()
    }
}
