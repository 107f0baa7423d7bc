use crate::format::{ColorPrimaries, ColorRange, Dataspace, Format, Transfer};

#[test]
fn legacy_translation() {
    assert_eq!(Dataspace::UNKNOWN.translate_legacy(), Dataspace::V0_SRGB);
    assert_eq!(Dataspace::LEGACY_SRGB.translate_legacy(), Dataspace::V0_SRGB);
    assert_eq!(Dataspace::LEGACY_BT709.translate_legacy(), Dataspace::V0_BT709);
    assert_eq!(Dataspace::BT2020_PQ.translate_legacy(), Dataspace::BT2020_PQ);
}

#[test]
fn metadata() {
    let md = Dataspace::BT2020_PQ.color_metadata().unwrap();
    assert_eq!(md.primaries, ColorPrimaries::Bt2020);
    assert_eq!(md.transfer, Transfer::St2084);
    assert_eq!(md.range, ColorRange::Full);
    assert!(md.is_hdr());
    assert!(!Dataspace::DISPLAY_BT2020.color_metadata().unwrap().is_hdr());
    assert!(Dataspace::UNKNOWN.color_metadata().is_none());
}

#[test]
fn format_classes() {
    assert!(Format::Rgba8888.is_rgb());
    assert!(!Format::Nv12.is_rgb());
    assert!(Format::Rgba16F.is_half_float());
    assert!(!Format::Rgba16F.is_writeback_capable());
    assert!(!Format::Invalid.is_writeback_capable());
}
