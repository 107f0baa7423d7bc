use {
    crate::{
        flags::{
            BF_HDR, GC_DISPLAY_FRAME, GC_Z_ORDER, GeometryChanges, LF_CURSOR, LF_GAME, LF_SKIP,
            LF_SOLID_FILL, LF_UPDATING, SF_CURSOR_PRESENT, SF_GAME_PRESENT, SF_GEOMETRY_CHANGED,
            SF_HDR_PRESENT, SF_SECURE_PRESENT, SF_SKIP_PRESENT, SF_VIDEO_PRESENT,
        },
        format::{BufferInfo, Dataspace, Format},
        layer::{Composition, HwcLayer, LayerIds, LayerType, Rect},
        stack::{StackParams, UpdateHints, build_layer_stack},
    },
    hwc_algorithms::rect::FRect,
    std::rc::Rc,
};

struct Setup {
    ids: LayerIds,
    client_target: HwcLayer,
    layers: Vec<Rc<HwcLayer>>,
    params: StackParams,
}

fn buffer() -> BufferInfo {
    BufferInfo {
        handle_id: 7,
        format: Format::Rgba8888,
        width: 100,
        height: 100,
        unaligned_width: 100,
        unaligned_height: 100,
        ..Default::default()
    }
}

impl Setup {
    fn new() -> Self {
        let ids = LayerIds::default();
        let client_target = HwcLayer::new(ids.next(), false);
        client_target.set_buffer(Some(&buffer()), None).unwrap();
        Self {
            ids,
            client_target,
            layers: vec![],
            params: StackParams {
                max_layer_count: 32,
                ..Default::default()
            },
        }
    }

    fn add(&mut self) -> Rc<HwcLayer> {
        let layer = Rc::new(HwcLayer::new(self.ids.next(), false));
        layer.set_z_order(self.layers.len() as u32);
        layer.set_buffer(Some(&buffer()), None).unwrap();
        layer.set_source_crop(FRect::new(0.0, 0.0, 100.0, 100.0));
        layer.set_display_frame(Rect::new(0, 0, 100, 100));
        self.layers.push(layer.clone());
        layer
    }

    fn reset(&self) {
        for layer in &self.layers {
            layer.reset_geometry_changes();
        }
    }
}

#[test]
fn client_target_is_last() {
    let mut s = Setup::new();
    for n in 0..4 {
        let mut gc = GeometryChanges::none();
        let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
        assert_eq!(stack.layers.len(), n + 1);
        assert_eq!(stack.layers.iter().filter(|l| l.client_target).count(), 1);
        assert!(stack.layers.last().unwrap().client_target);
        assert_eq!(stack.app_layers().len(), n);
        assert_eq!(stack.client_target().unwrap().id, s.client_target.id);
        s.add();
    }
}

#[test]
fn updating_predicate() {
    for bits in 0u32..32 {
        let hints = UpdateHints {
            single_buffer: bits & 1 != 0,
            front_buffer: bits & 2 != 0,
            surface_damaged: bits & 4 != 0,
            geometry_changed: bits & 8 != 0,
            video: bits & 16 != 0,
        };
        assert_eq!(hints.is_updating(), bits != 0, "bits = {bits:05b}");
    }
}

#[test]
fn skip_layers() {
    let mut s = Setup::new();
    let a = s.add();
    let b = s.add();
    a.set_composition_type(Composition::Client).unwrap();
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(stack.layers[0].flags.contains(LF_SKIP));
    assert!(!stack.layers[1].flags.contains(LF_SKIP));
    assert!(stack.flags.contains(SF_SKIP_PRESENT));
    assert!(a.frame_flags().contains(LF_SKIP));

    let s2 = Setup {
        client_target: HwcLayer::new(s.ids.next(), false),
        ..s
    };
    let stack = build_layer_stack(&s2.params, &s2.layers, &s2.client_target, &mut gc);
    assert!(stack.app_layers().iter().all(|l| l.flags.contains(LF_SKIP)));
    assert!(b.frame_flags().contains(LF_SKIP));
}

#[test]
fn unsupported_dataspace_is_skipped() {
    let mut s = Setup::new();
    let a = s.add();
    a.set_dataspace(Dataspace(0x3f << crate::format::STANDARD_SHIFT));
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(stack.layers[0].flags.contains(LF_SKIP));
}

#[test]
fn cursor_only_on_top() {
    let mut s = Setup::new();
    let a = s.add();
    let b = s.add();
    a.set_composition_type(Composition::Cursor).unwrap();
    b.set_composition_type(Composition::Cursor).unwrap();
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(!stack.layers[0].flags.contains(LF_CURSOR));
    assert!(stack.layers[1].flags.contains(LF_CURSOR));
    assert!(stack.flags.contains(SF_CURSOR_PRESENT));
}

#[test]
fn non_integral_crop() {
    let mut s = Setup::new();
    let a = s.add();
    let b = s.add();
    a.set_source_crop(FRect::new(0.5, 0.0, 100.0, 100.0));
    b.set_source_crop(FRect::new(0.5, 0.0, 100.0, 100.0));
    let mut video = buffer();
    video.video = true;
    b.set_buffer(Some(&video), None).unwrap();
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(stack.layers[0].flags.contains(LF_SKIP));
    assert!(!stack.layers[1].flags.contains(LF_SKIP));
    assert!(stack.flags.contains(SF_VIDEO_PRESENT));
}

#[test]
fn secure_display_allows_non_integral_crop() {
    let mut s = Setup::new();
    let a = s.add();
    a.set_source_crop(FRect::new(0.5, 0.5, 99.5, 99.5));
    let mut secure = buffer();
    secure.secure_display = true;
    a.set_buffer(Some(&secure), None).unwrap();
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(!stack.layers[0].flags.contains(LF_SKIP));
    assert!(stack.flags.contains(SF_SECURE_PRESENT));
    assert!(!stack.flags.contains(SF_SKIP_PRESENT));
}

#[test]
fn hdr_content_with_hdr_handling_disabled() {
    let mut s = Setup::new();
    s.params.game_supported = true;
    s.params.disable_hdr_handling = true;
    let a = s.add();
    a.set_type(LayerType::Game);
    a.set_dataspace(Dataspace::BT2020_PQ);
    a.set_source_crop(FRect::new(0.5, 0.0, 100.0, 100.0));
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    let sl = &stack.layers[0];
    assert!(!sl.buffer_flags.contains(BF_HDR));
    assert!(!sl.flags.contains(LF_GAME));
    assert!(!sl.flags.contains(LF_SKIP));
    assert!(!stack.flags.contains(SF_GAME_PRESENT));

    a.set_dataspace(Dataspace::V0_SRGB);
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(stack.layers[0].flags.contains(LF_GAME));
}

#[test]
fn solid_fill() {
    let mut s = Setup::new();
    let a = s.add();
    let b = s.add();
    for l in [&a, &b] {
        l.set_composition_type(Composition::SolidColor).unwrap();
        l.set_display_frame(Rect::new(10, 10, 60, 40));
    }
    b.set_brightness(0.5).unwrap();
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    let fill = &stack.layers[0];
    assert!(fill.flags.contains(LF_SOLID_FILL));
    assert_eq!(fill.src_rect, FRect::new(0.0, 0.0, 50.0, 30.0));
    assert_eq!(fill.buffer.unwrap().width, 50);
    let dimmed = &stack.layers[1];
    assert!(!dimmed.flags.contains(LF_SOLID_FILL));
    assert!(dimmed.flags.contains(LF_SKIP));
}

#[test]
fn hdr() {
    let mut s = Setup::new();
    let a = s.add();
    a.set_dataspace(Dataspace::BT2020_PQ);
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(stack.flags.contains(SF_HDR_PRESENT));
    assert!(stack.layers[0].buffer_flags.contains(BF_HDR));
    assert!(a.is_hdr());

    s.params.disable_hdr_handling = true;
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(!stack.flags.contains(SF_HDR_PRESENT));
    assert!(!a.is_hdr());
}

#[test]
fn geometry_changes() {
    let mut s = Setup::new();
    s.add();
    s.add();
    s.reset();
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(!stack.flags.contains(SF_GEOMETRY_CHANGED));

    s.params.geometry_changes_on_doze_suspend = GC_Z_ORDER;
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(stack.flags.contains(SF_GEOMETRY_CHANGED));
    assert_eq!(gc, GeometryChanges::none());

    s.params.geometry_changes_on_doze_suspend = GeometryChanges::none();
    s.layers[1].set_display_frame(Rect::new(50, 50, 300, 200));
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert_eq!(gc, GC_DISPLAY_FRAME);
    assert!(stack.flags.contains(SF_GEOMETRY_CHANGED));
    assert_eq!(stack.display_rect, FRect::new(0.0, 0.0, 300.0, 200.0));
}

#[test]
fn too_many_layers_are_updating() {
    let mut s = Setup::new();
    s.add();
    s.add();
    s.reset();
    for l in &s.layers {
        l.set_surface_damage(&[Rect::new(0, 0, 0, 0)]);
    }
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(stack.app_layers().iter().all(|l| !l.flags.contains(LF_UPDATING)));
    s.params.max_layer_count = 1;
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert!(stack.app_layers().iter().all(|l| l.flags.contains(LF_UPDATING)));
}

#[test]
fn client_target_dataspace() {
    let mut s = Setup::new();
    s.params.client_target_dataspace = Dataspace::DISPLAY_P3;
    let mut gc = GeometryChanges::none();
    let stack = build_layer_stack(&s.params, &s.layers, &s.client_target, &mut gc);
    assert_eq!(stack.client_target().unwrap().dataspace, Dataspace::DISPLAY_P3);
    assert_eq!(s.client_target.dataspace(), Dataspace::DISPLAY_P3);
}
