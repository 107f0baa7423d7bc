//! Per-frame layer stack assembly.
//!
//! The snapshot is rebuilt from scratch every frame. It contains the
//! application layers in z order followed by exactly one client target.

use {
    crate::{
        fence::SyncFile,
        flags::{
            BF_HDR, BF_MASK_LAYER, BF_SECURE, BF_SECURE_DISPLAY, BF_VIDEO, BufferFlags,
            GeometryChanges, LF_COLOR_TRANSFORM, LF_COMPATIBLE, LF_CURSOR, LF_FRONT_BUFFER,
            LF_GAME, LF_HAS_METADATA_REFRESH_RATE, LF_SINGLE_BUFFER, LF_SKIP, LF_SOLID_FILL,
            LF_UPDATING, LayerFlags, LayerRequests, LayerUpdates, SF_ANIMATING,
            SF_CURSOR_PRESENT, SF_FRONT_BUFFER_PRESENT, SF_GAME_PRESENT, SF_GEOMETRY_CHANGED,
            SF_HDR_PRESENT, SF_MASK_PRESENT, SF_SCALING_RGB_PRESENT, SF_SECURE_PRESENT,
            SF_SINGLE_BUFFER_PRESENT, SF_SKIP_PRESENT, SF_VIDEO_PRESENT, StackFlags,
        },
        format::{BufferInfo, ColorMetadata, ColorRange, Dataspace, HdrMetadata},
        layer::{
            Blending, Composition, EngineComposition, HwcLayer, LayerId, LayerTransform,
            LayerType,
        },
    },
    hwc_algorithms::rect::FRect,
    std::rc::Rc,
};

#[cfg(test)]
mod tests;

/// A buffer the engine writes the composed frame into.
#[derive(Clone, Debug)]
pub struct OutputBuffer {
    pub handle_id: u64,
    pub info: BufferInfo,
    pub acquire_fence: Option<SyncFile>,
}

/// One layer as handed to the engine.
///
/// The engine writes `composition`, `requests` and `release_fence`. All
/// other fields are inputs.
#[derive(Clone, Debug)]
pub struct StackLayer {
    pub id: LayerId,
    pub client_target: bool,
    pub flags: LayerFlags,
    pub buffer_flags: BufferFlags,
    pub buffer: Option<BufferInfo>,
    pub acquire_fence: Option<SyncFile>,
    pub src_rect: FRect,
    pub dst_rect: FRect,
    pub transform: LayerTransform,
    pub blending: Blending,
    pub plane_alpha: u8,
    pub solid_fill_color: u32,
    pub dataspace: Dataspace,
    pub color_metadata: ColorMetadata,
    pub hdr_metadata: HdrMetadata,
    pub layer_type: LayerType,
    pub frame_rate: u32,
    pub brightness: f32,
    pub geometry_changes: GeometryChanges,
    pub update_mask: LayerUpdates,
    pub dirty_regions: Vec<FRect>,
    pub visible_regions: Vec<FRect>,
    pub color_transform: Option<[f32; 16]>,
    pub composition: EngineComposition,
    pub requests: LayerRequests,
    pub release_fence: Option<SyncFile>,
}

impl StackLayer {
    fn from_layer(layer: &HwcLayer) -> Self {
        Self {
            id: layer.id,
            client_target: false,
            flags: LayerFlags::none(),
            buffer_flags: layer.buffer_flags(),
            buffer: layer.buffer(),
            acquire_fence: layer.acquire_fence(),
            src_rect: layer.source_crop(),
            dst_rect: layer.display_frame(),
            transform: layer.transform(),
            blending: layer.blending(),
            plane_alpha: layer.plane_alpha(),
            solid_fill_color: layer.solid_fill_color(),
            dataspace: layer.dataspace(),
            color_metadata: layer.color_metadata(),
            hdr_metadata: layer.hdr_metadata(),
            layer_type: layer.layer_type(),
            frame_rate: layer.frame_rate(),
            brightness: layer.brightness(),
            geometry_changes: layer.geometry_changes(),
            update_mask: layer.update_mask(),
            dirty_regions: layer.dirty_regions(),
            visible_regions: layer.visible_regions(),
            color_transform: None,
            composition: EngineComposition::None,
            requests: LayerRequests::none(),
            release_fence: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LayerStackSnapshot {
    pub layers: Vec<StackLayer>,
    pub flags: StackFlags,
    pub display_rect: FRect,
    pub elapse_timestamp: i64,
    pub expected_present_time: i64,
    pub validate_only: bool,
    pub client_incompatible: bool,
    pub output_buffer: Option<OutputBuffer>,
    pub retire_fence: Option<SyncFile>,
}

impl LayerStackSnapshot {
    pub fn client_target(&self) -> Option<&StackLayer> {
        self.layers.last().filter(|l| l.client_target)
    }

    /// The application layers without the client target.
    pub fn app_layers(&self) -> &[StackLayer] {
        match self.layers.split_last() {
            Some((last, rest)) if last.client_target => rest,
            _ => &self.layers,
        }
    }

    pub fn find(&self, id: LayerId) -> Option<&StackLayer> {
        self.layers.iter().find(|l| l.id == id)
    }
}

/// The inputs of the `updating` decision.
#[derive(Copy, Clone, Debug, Default)]
pub struct UpdateHints {
    pub single_buffer: bool,
    pub front_buffer: bool,
    pub surface_damaged: bool,
    pub geometry_changed: bool,
    pub video: bool,
}

impl UpdateHints {
    pub fn of(layer: &HwcLayer) -> Self {
        Self {
            single_buffer: layer.is_single_buffered(),
            front_buffer: layer.is_front_buffer(),
            surface_damaged: layer.is_surface_updated(),
            geometry_changed: layer.geometry_changes().is_not_empty(),
            video: layer.buffer_flags().contains(BF_VIDEO),
        }
    }

    pub fn is_updating(&self) -> bool {
        self.single_buffer
            || self.front_buffer
            || self.surface_damaged
            || self.geometry_changed
            || self.video
    }
}

pub fn is_layer_updating(layer: &HwcLayer) -> bool {
    UpdateHints::of(layer).is_updating()
}

/// Display-level inputs of a single build.
#[derive(Copy, Clone, Debug, Default)]
pub struct StackParams {
    pub disable_hdr_handling: bool,
    pub swap_interval_zero: bool,
    pub game_supported: bool,
    pub max_layer_count: usize,
    pub animating: bool,
    pub geometry_changes_on_doze_suspend: GeometryChanges,
    pub client_target_dataspace: Dataspace,
    pub elapse_timestamp: i64,
    pub expected_present_time: i64,
}

/// Builds the snapshot from `layers`, which must be sorted by z.
///
/// The per-frame flags are written back into the layers. The layer geometry
/// changes are ORed into `display_changes`.
pub fn build_layer_stack(
    params: &StackParams,
    layers: &[Rc<HwcLayer>],
    client_target: &HwcLayer,
    display_changes: &mut GeometryChanges,
) -> LayerStackSnapshot {
    let mut stack = LayerStackSnapshot {
        elapse_timestamp: params.elapse_timestamp,
        expected_present_time: params.expected_present_time,
        ..Default::default()
    };
    let num_layers = layers.len();
    let mut flags = StackFlags::none();
    let mut display_rect = FRect::default();
    for (idx, layer) in layers.iter().enumerate() {
        let mut sl = StackLayer::from_layer(layer);
        let mut lf = LayerFlags::none();
        let mut bf = layer.buffer_flags();
        bf.set(BF_HDR | BF_MASK_LAYER, false);
        let requested = layer.client_requested();
        if requested == Composition::Client || !client_target.has_buffer() {
            lf |= LF_SKIP;
        } else if requested == Composition::SolidColor {
            lf |= LF_SOLID_FILL;
        }
        if !layer.is_data_space_supported() {
            lf |= LF_SKIP;
        }
        if params.swap_interval_zero {
            sl.acquire_fence = None;
            layer.take_acquire_fence();
        }
        if bf.contains(BF_VIDEO) {
            flags |= SF_VIDEO_PRESENT;
        }
        if bf.intersects(BF_SECURE | BF_SECURE_DISPLAY) {
            flags |= SF_SECURE_PRESENT;
        }
        let scaling = layer.is_scaling_present();
        if layer.format().is_rgb() && scaling {
            flags |= SF_SCALING_RGB_PRESENT;
        }
        if layer.is_front_buffer() {
            lf |= LF_FRONT_BUFFER;
            flags |= SF_FRONT_BUFFER_PRESENT;
        }
        if layer.is_single_buffered() && !layer.is_rotation_present() && !scaling {
            lf |= LF_SINGLE_BUFFER;
            flags |= SF_SINGLE_BUFFER_PRESENT;
        }
        let md = layer.color_metadata();
        let hdr = md.is_hdr()
            || (layer.format().is_half_float() && md.range == ColorRange::Extended);
        if hdr && !params.disable_hdr_handling {
            bf |= BF_HDR;
            flags |= SF_HDR_PRESENT;
        }
        if params.game_supported && layer.layer_type() == LayerType::Game && !hdr {
            lf |= LF_GAME;
            flags |= SF_GAME_PRESENT;
        }
        if layer.is_non_integral_source_crop() {
            let fractional_ok = hdr
                || bf.intersects(BF_SECURE | BF_SECURE_DISPLAY | BF_VIDEO)
                || lf.intersects(LF_SINGLE_BUFFER | LF_SOLID_FILL | LF_GAME);
            if !fractional_ok {
                lf |= LF_SKIP;
            }
        }
        if idx + 1 == num_layers && !lf.contains(LF_SKIP) && requested == Composition::Cursor {
            lf |= LF_CURSOR;
            flags |= SF_CURSOR_PRESENT;
        }
        if lf.contains(LF_SOLID_FILL) && layer.brightness() != 1.0 {
            lf.set(LF_SOLID_FILL, false);
            lf |= LF_SKIP;
        }
        if lf.contains(LF_SKIP) {
            flags |= SF_SKIP_PRESENT;
        }
        if lf.contains(LF_SOLID_FILL) {
            let dst = sl.dst_rect;
            let mut info = sl.buffer.unwrap_or_default();
            info.width = dst.width() as u32;
            info.height = dst.height() as u32;
            info.unaligned_width = info.width;
            info.unaligned_height = info.height;
            sl.buffer = Some(info);
            sl.src_rect = FRect::new(0.0, 0.0, dst.width(), dst.height());
        }
        if layer.has_metadata_refresh_rate() {
            lf |= LF_HAS_METADATA_REFRESH_RATE;
        }
        display_rect = display_rect.union(&sl.dst_rect);
        *display_changes |= layer.geometry_changes();
        let updating = num_layers > params.max_layer_count || is_layer_updating(layer);
        if updating {
            lf |= LF_UPDATING;
        }
        if layer.is_color_transform_set() {
            lf |= LF_COLOR_TRANSFORM;
            sl.color_transform = Some(layer.color_transform());
        }
        if layer.client_requested_orig() == Composition::DisplayDecoration {
            bf |= BF_MASK_LAYER;
            flags |= SF_MASK_PRESENT;
        }
        if layer.is_compatible() {
            lf |= LF_COMPATIBLE;
        }
        layer.set_buffer_flag(BF_HDR, bf.contains(BF_HDR));
        layer.set_buffer_flag(BF_MASK_LAYER, bf.contains(BF_MASK_LAYER));
        layer.set_frame_flags(lf);
        sl.flags = lf;
        sl.buffer_flags = bf;
        stack.layers.push(sl);
    }
    let changes = *display_changes | params.geometry_changes_on_doze_suspend;
    flags.set(SF_GEOMETRY_CHANGED, changes.is_not_empty());
    flags.set(SF_ANIMATING, params.animating);
    stack.flags = flags;
    stack.display_rect = display_rect;
    stack.layers.push(client_target_layer(params, client_target));
    stack
}

fn client_target_layer(params: &StackParams, client_target: &HwcLayer) -> StackLayer {
    let dataspace = params.client_target_dataspace;
    if client_target.dataspace() != dataspace {
        client_target.set_dataspace(dataspace);
        if let Some(md) = dataspace.color_metadata() {
            client_target.set_color_metadata(md);
        }
    }
    let mut lf = LayerFlags::none();
    if is_layer_updating(client_target) {
        lf |= LF_UPDATING;
    }
    client_target.set_frame_flags(lf);
    let mut sl = StackLayer::from_layer(client_target);
    sl.client_target = true;
    sl.flags = lf;
    sl.composition = EngineComposition::GpuTarget;
    if params.swap_interval_zero {
        sl.acquire_fence = None;
    }
    sl
}
