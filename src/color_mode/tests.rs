use {
    crate::{
        color_mode::{
            ColorMode, ColorModeArbiter, DynamicRange, NATIVE_IDENTITY, RenderIntent,
            populate_color_modes,
        },
        engine::DisplayInfo,
        error::{EngineError, HwcError},
        format::Dataspace,
        layer::IDENTITY_MATRIX,
        sim::SimEngine,
    },
    std::rc::Rc,
};

fn mode(engine: &SimEngine, name: &str, gamut: &str, range: &str, intent: &str) {
    engine.add_color_mode(
        name,
        &[
            ("ColorGamut", gamut),
            ("DynamicRange", range),
            ("PictureQuality", "standard"),
            ("RenderIntent", intent),
        ],
    );
}

fn panel() -> Rc<SimEngine> {
    let engine = Rc::new(SimEngine::default());
    engine.add_color_mode("hal_native", &[]);
    mode(&engine, "srgb", "srgb", "sdr", "0");
    mode(&engine, "srgb_enhance", "srgb", "sdr", "1");
    mode(&engine, "p3", "dcip3", "sdr", "0");
    mode(&engine, "p3_hdr", "dcip3", "hdr", "0");
    engine.add_color_mode(
        "bt2020_pq",
        &[
            ("ColorGamut", "bt2020"),
            ("DynamicRange", "hdr"),
            ("GammaTransfer", "st2084"),
            ("RenderIntent", "0"),
        ],
    );
    engine
}

fn lookup(
    arbiter: &ColorModeArbiter,
    mode: ColorMode,
    intent: RenderIntent,
    range: DynamicRange,
) -> Option<String> {
    arbiter.map().get(&mode)?.get(&intent)?.get(&range).cloned()
}

#[test]
fn populate_without_modes() {
    let engine = SimEngine::default();
    let map = populate_color_modes(&engine, false);
    assert_eq!(map.len(), 1);
    assert_eq!(
        map[&ColorMode::NATIVE][&RenderIntent::COLORIMETRIC][&DynamicRange::Sdr],
        NATIVE_IDENTITY,
    );
}

#[test]
fn populate_rules() {
    let engine = panel();
    mode(&engine, "broken", "srgb", "sdr", "enhance");
    let arbiter = ColorModeArbiter::new(engine.clone());
    let c = RenderIntent::COLORIMETRIC;
    assert_eq!(
        lookup(&arbiter, ColorMode::NATIVE, c, DynamicRange::Sdr).as_deref(),
        Some("hal_native"),
    );
    assert_eq!(
        lookup(&arbiter, ColorMode::SRGB, RenderIntent::ENHANCE, DynamicRange::Sdr).as_deref(),
        Some("srgb_enhance"),
    );
    assert_eq!(
        lookup(&arbiter, ColorMode::BT2100_PQ, c, DynamicRange::Hdr).as_deref(),
        Some("bt2020_pq"),
    );
    assert_eq!(
        lookup(&arbiter, ColorMode::BT2100_HLG, c, DynamicRange::Hdr).as_deref(),
        Some("p3_hdr"),
    );
    assert_eq!(lookup(&arbiter, ColorMode::DISPLAY_P3, c, DynamicRange::Hdr), None);
    assert_eq!(arbiter.color_mode_count(), 5);
    assert_eq!(arbiter.render_intent_count(ColorMode::SRGB), 2);
    assert_eq!(arbiter.render_intent_count(ColorMode::ADOBE_RGB), 1);
    assert_eq!(
        arbiter.render_intents(ColorMode::SRGB),
        Ok(vec![RenderIntent::COLORIMETRIC, RenderIntent::ENHANCE]),
    );
    assert_eq!(
        arbiter.render_intents(ColorMode::ADOBE_RGB),
        Err(HwcError::BadParameter)
    );
}

#[test]
fn pipe_tone_mapping_keeps_hdr_in_p3() {
    let engine = panel();
    engine.info.set(DisplayInfo {
        pipe_tone_mapping: true,
        ..Default::default()
    });
    let arbiter = ColorModeArbiter::new(engine.clone());
    assert_eq!(
        lookup(
            &arbiter,
            ColorMode::DISPLAY_P3,
            RenderIntent::COLORIMETRIC,
            DynamicRange::Hdr
        )
        .as_deref(),
        Some("p3_hdr"),
    );
    assert_eq!(
        lookup(
            &arbiter,
            ColorMode::BT2100_HLG,
            RenderIntent::COLORIMETRIC,
            DynamicRange::Hdr
        ),
        None,
    );
}

#[test]
fn every_populated_pair_validates() {
    let arbiter = ColorModeArbiter::new(panel());
    for (mode, intents) in arbiter.map() {
        for intent in intents.keys() {
            assert_eq!(arbiter.validate(*mode, *intent), Ok(()));
        }
    }
}

#[test]
fn validation_errors() {
    let arbiter = ColorModeArbiter::new(panel());
    assert_eq!(
        arbiter.validate(ColorMode(-1), RenderIntent::COLORIMETRIC),
        Err(HwcError::BadParameter),
    );
    assert_eq!(
        arbiter.validate(ColorMode(14), RenderIntent::COLORIMETRIC),
        Err(HwcError::BadParameter),
    );
    assert_eq!(
        arbiter.validate(ColorMode::ADOBE_RGB, RenderIntent::COLORIMETRIC),
        Err(HwcError::Unsupported),
    );
    assert_eq!(
        arbiter.validate(ColorMode::DISPLAY_P3, RenderIntent::ENHANCE),
        Err(HwcError::Unsupported),
    );
}

#[test]
fn set_mode_is_idempotent() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    arbiter
        .set_color_mode_with_render_intent(ColorMode::SRGB, RenderIntent::ENHANCE)
        .unwrap();
    assert_eq!(engine.calls.set_color_mode.get(), 1);
    assert_eq!(engine.calls.set_color_transform.get(), 1);
    assert_eq!(*engine.applied_color_modes.borrow(), vec!["srgb_enhance"]);
    arbiter
        .set_color_mode_with_render_intent(ColorMode::SRGB, RenderIntent::ENHANCE)
        .unwrap();
    assert_eq!(engine.calls.set_color_mode.get(), 1);
    assert_eq!(engine.calls.set_color_transform.get(), 1);
    assert_eq!(arbiter.current_color_mode(), ColorMode::SRGB);
    assert_eq!(arbiter.current_render_intent(), RenderIntent::ENHANCE);
}

#[test]
fn set_mode_uses_hdr_name_without_sdr_entry() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    arbiter
        .set_color_mode_with_render_intent(ColorMode::BT2100_PQ, RenderIntent::COLORIMETRIC)
        .unwrap();
    assert_eq!(*engine.applied_color_modes.borrow(), vec!["bt2020_pq"]);
}

#[test]
fn set_mode_failure_keeps_the_current_mode() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    engine.color_mode_error.set(Some(EngineError::Undefined));
    assert_eq!(
        arbiter.set_color_mode_with_render_intent(ColorMode::SRGB, RenderIntent::COLORIMETRIC),
        Err(HwcError::Unsupported),
    );
    assert_eq!(arbiter.current_color_mode(), ColorMode::NATIVE);
}

#[test]
fn mode_change_survives_a_rejected_color_transform() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    engine.color_transform_error.set(Some(EngineError::NotSupported));
    assert_eq!(
        arbiter.set_color_mode_with_render_intent(ColorMode::SRGB, RenderIntent::ENHANCE),
        Ok(()),
    );
    assert_eq!(engine.calls.set_color_transform.get(), 1);
    assert_eq!(arbiter.current_color_mode(), ColorMode::SRGB);
    assert_eq!(arbiter.current_render_intent(), RenderIntent::ENHANCE);
}

#[test]
fn cached_mode_is_applied_with_the_next_frame() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    arbiter
        .cache_color_mode_with_render_intent(ColorMode::DISPLAY_P3, RenderIntent::COLORIMETRIC)
        .unwrap();
    assert_eq!(engine.calls.set_color_mode.get(), 0);
    arbiter.apply_current(false).unwrap();
    assert_eq!(*engine.applied_color_modes.borrow(), vec!["p3"]);
    arbiter.apply_current(false).unwrap();
    assert_eq!(engine.calls.set_color_mode.get(), 1);
    assert_eq!(arbiter.current_dynamic_range(), DynamicRange::Sdr);
}

#[test]
fn hdr_falls_back_to_sdr_in_wide_modes() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    arbiter
        .cache_color_mode_with_render_intent(ColorMode::DISPLAY_P3, RenderIntent::COLORIMETRIC)
        .unwrap();
    arbiter.apply_current(true).unwrap();
    assert_eq!(*engine.applied_color_modes.borrow(), vec!["p3"]);
    assert_eq!(arbiter.current_dynamic_range(), DynamicRange::Hdr);
    arbiter.apply_current(false).unwrap();
    assert_eq!(engine.calls.set_color_mode.get(), 2);
}

#[test]
fn pq_mode_falls_back_to_hdr_for_sdr_content() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    arbiter
        .cache_color_mode_with_render_intent(ColorMode::BT2100_PQ, RenderIntent::COLORIMETRIC)
        .unwrap();
    arbiter.apply_current(false).unwrap();
    assert_eq!(*engine.applied_color_modes.borrow(), vec!["bt2020_pq"]);
}

#[test]
fn unresolvable_mode_is_bad_parameter() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    arbiter
        .cache_color_mode_with_render_intent(ColorMode::SRGB, RenderIntent::ENHANCE)
        .unwrap();
    assert_eq!(arbiter.apply_current(true), Err(HwcError::BadParameter));
    assert_eq!(engine.calls.set_color_mode.get(), 0);
}

#[test]
fn single_mode_panels_never_apply() {
    let engine = Rc::new(SimEngine::default());
    let arbiter = ColorModeArbiter::new(engine.clone());
    arbiter.reapply_mode();
    arbiter.apply_current(true).unwrap();
    assert_eq!(engine.calls.set_color_mode.get(), 0);
}

#[test]
fn client_api_pins_preferred_mode() {
    let engine = panel();
    mode(&engine, "p3_vivid", "dcip3", "sdr", "0");
    let arbiter = ColorModeArbiter::new(engine.clone());
    arbiter.set_color_mode_from_client_api("p3_vivid").unwrap();
    assert_eq!(engine.calls.set_color_mode.get(), 0);
    arbiter
        .cache_color_mode_with_render_intent(ColorMode::DISPLAY_P3, RenderIntent::COLORIMETRIC)
        .unwrap();
    arbiter.apply_current(false).unwrap();
    assert_eq!(*engine.applied_color_modes.borrow(), vec!["p3_vivid"]);
    arbiter.set_color_mode_from_client_api("p3").unwrap();
    assert_eq!(
        *engine.applied_color_modes.borrow(),
        vec!["p3_vivid", "p3"]
    );
    assert_eq!(
        arbiter.set_color_mode_from_client_api("hal_native"),
        Err(HwcError::BadParameter),
    );
    assert_eq!(
        arbiter.set_color_mode_from_client_api("missing"),
        Err(HwcError::BadParameter),
    );
}

#[test]
fn color_transform_is_cached_on_failure() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    let mut matrix = IDENTITY_MATRIX;
    matrix[0] = 0.5;
    engine.color_transform_error.set(Some(EngineError::NotSupported));
    assert_eq!(arbiter.set_color_transform(&matrix), Err(HwcError::Unsupported));
    assert_eq!(arbiter.color_matrix()[0], 0.5);
    engine.color_transform_error.set(None);
    arbiter.restore_color_transform();
    assert_eq!(engine.color_transform.get()[0], 0.5);
    assert_eq!(engine.color_transform.get()[5], 1.0);
}

#[test]
fn by_id() {
    let engine = panel();
    let arbiter = ColorModeArbiter::new(engine.clone());
    assert_eq!(arbiter.set_color_mode_by_id(3), Ok(()));
    assert_eq!(arbiter.set_color_mode_by_id(-1), Err(HwcError::BadParameter));
    assert_eq!(engine.calls.set_color_mode_by_id.get(), 2);
}

#[test]
fn client_target_dataspace() {
    assert_eq!(ColorMode::SRGB.dataspace(), Dataspace::V0_SRGB);
    assert_eq!(ColorMode::DISPLAY_P3.dataspace(), Dataspace::DISPLAY_P3);
    assert_eq!(ColorMode::BT2100_PQ.dataspace(), Dataspace::BT2020_PQ);
    assert_eq!(ColorMode::BT2100_HLG.dataspace(), Dataspace::BT2020_HLG);
    assert_eq!(ColorMode::DISPLAY_BT2020.dataspace(), Dataspace::DISPLAY_BT2020);
    assert_eq!(ColorMode::NATIVE.dataspace(), Dataspace::UNKNOWN);
}
