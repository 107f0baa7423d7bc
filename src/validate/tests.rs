use {
    crate::{
        error::HwcError,
        flags::{
            DR_FLIP_CLIENT_TARGET, GeometryChanges, LF_SKIP, LR_FLIP_BUFFER,
            LRF_CLEAR_CLIENT_TARGET,
        },
        format::{BufferInfo, Format},
        layer::{Composition, EngineComposition, HwcLayer},
        layer_set::LayerSet,
        stack::{LayerStackSnapshot, StackParams, build_layer_stack},
        validate::{ValidateOutcome, Validation},
    },
    std::rc::Rc,
};

struct Setup {
    set: LayerSet,
    client_target: HwcLayer,
    validation: Validation,
}

impl Setup {
    fn new(n: usize) -> Self {
        let set = LayerSet::new(false);
        let client_target = set.create_detached();
        let buffer = BufferInfo {
            handle_id: 1,
            format: Format::Rgba8888,
            width: 10,
            height: 10,
            ..Default::default()
        };
        client_target.set_buffer(Some(&buffer), None).unwrap();
        for z in 0..n {
            let layer = set.create();
            set.set_z_order(layer.id, z as u32).unwrap();
            layer.set_buffer(Some(&buffer), None).unwrap();
        }
        Self {
            set,
            client_target,
            validation: Validation::default(),
        }
    }

    fn layers(&self) -> Vec<Rc<HwcLayer>> {
        self.set.sorted()
    }

    fn build(&self) -> LayerStackSnapshot {
        let params = StackParams {
            max_layer_count: 32,
            ..Default::default()
        };
        let mut gc = GeometryChanges::none();
        build_layer_stack(&params, &self.layers(), &self.client_target, &mut gc)
    }
}

#[test]
fn finalize_without_changes() {
    let s = Setup::new(2);
    let mut stack = s.build();
    for l in &mut stack.layers {
        l.composition = EngineComposition::Cursor;
    }
    stack.layers[0].composition = EngineComposition::Stitch;
    stack.layers[1].composition = EngineComposition::Stitch;
    let res = s.validation.finalize(&s.set, &s.client_target, &mut stack);
    assert_eq!(res.outcome, ValidateOutcome::NoChanges);
    assert_eq!(res.num_types, 0);
    assert_eq!(res.num_requests, 2);
    assert!(s.validation.validate_done.get());
    assert!(!s.validation.has_client_composition.get());
    let req = s.validation.display_requests(&s.set, &stack).unwrap();
    assert_eq!(req.layers.len(), 2);
    assert!(req.layers.iter().all(|(_, f)| *f == LRF_CLEAR_CLIENT_TARGET));
    assert!(req.display.is_empty());
}

#[test]
fn finalize_with_changes() {
    let s = Setup::new(3);
    let layers = s.layers();
    let mut stack = s.build();
    stack.layers[0].composition = EngineComposition::Gpu;
    stack.layers[1].composition = EngineComposition::Sde;
    stack.layers[2].composition = EngineComposition::Sde;
    let res = s.validation.finalize(&s.set, &s.client_target, &mut stack);
    assert_eq!(res.outcome, ValidateOutcome::HasChanges);
    assert_eq!(res.num_types, 1);
    assert_eq!(res.num_requests, 2);
    assert!(s.validation.has_client_composition.get());
    let changes = s.validation.changed_composition_types(&s.set).unwrap();
    assert_eq!(changes, [(layers[0].id, Composition::Client)]);
    assert_eq!(layers[0].device_selected(), Composition::Client);
    assert_eq!(layers[0].client_requested(), Composition::Device);
    s.validation.accept_changes(&s.set).unwrap();
    assert_eq!(layers[0].client_requested(), Composition::Client);
    assert_eq!(s.validation.num_changes(), 0);
}

#[test]
fn client_composition_with_requests_has_changes() {
    let s = Setup::new(2);
    let layers = s.layers();
    layers[0].set_composition_type(Composition::Client).unwrap();
    let mut stack = s.build();
    stack.layers[0].composition = EngineComposition::Gpu;
    stack.layers[1].composition = EngineComposition::Sde;
    let res = s.validation.finalize(&s.set, &s.client_target, &mut stack);
    assert_eq!(res.num_types, 0);
    assert_eq!(res.num_requests, 1);
    assert_eq!(res.outcome, ValidateOutcome::HasChanges);
}

#[test]
fn flip_client_target() {
    let s = Setup::new(1);
    let mut stack = s.build();
    stack.layers[0].composition = EngineComposition::Sde;
    stack.layers.last_mut().unwrap().requests = LR_FLIP_BUFFER;
    s.validation.finalize(&s.set, &s.client_target, &mut stack);
    let req = s.validation.display_requests(&s.set, &stack).unwrap();
    assert_eq!(req.display, DR_FLIP_CLIENT_TARGET);
}

#[test]
fn not_validated() {
    let s = Setup::new(1);
    let stack = s.build();
    assert_eq!(s.validation.accept_changes(&s.set), Err(HwcError::NotValidated));
    assert_eq!(
        s.validation.changed_composition_types(&s.set),
        Err(HwcError::NotValidated),
    );
    assert_eq!(
        s.validation.display_requests(&s.set, &stack),
        Err(HwcError::NotValidated),
    );
    let empty = Setup::new(0);
    assert_eq!(empty.validation.accept_changes(&empty.set), Ok(()));
    assert_eq!(empty.validation.changed_composition_types(&empty.set), Ok(vec![]));
}

#[test]
fn skip_prepare() {
    let s = Setup::new(3);
    let layers = s.layers();
    assert!(s.validation.try_skip_prepare(true, false, &[]).is_none());
    assert!(s.validation.try_skip_prepare(true, false, &layers).is_none());
    for l in &layers {
        l.set_frame_flags(LF_SKIP);
        l.force_device_selected(Composition::Client);
    }
    layers[2].set_composition_type(Composition::Client).unwrap();
    assert!(s.validation.try_skip_prepare(false, false, &layers).is_none());
    assert!(s.validation.try_skip_prepare(true, true, &layers).is_none());
    let res = s.validation.try_skip_prepare(true, false, &layers).unwrap();
    assert_eq!(res.num_types, 2);
    assert_eq!(res.num_requests, 0);
    assert_eq!(res.outcome, ValidateOutcome::HasChanges);
    assert!(s.validation.has_client_composition.get());
    assert!(s.validation.validate_done.get());

    layers[0].force_device_selected(Composition::Device);
    assert!(s.validation.try_skip_prepare(true, false, &layers).is_none());
    assert_eq!(s.validation.num_changes(), 0);
}
