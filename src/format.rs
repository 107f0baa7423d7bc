#[cfg(test)]
mod tests;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum Format {
    #[default]
    Invalid,
    Argb8888,
    Rgba8888,
    Rgbx8888,
    Bgra8888,
    Rgb888,
    Rgb565,
    Rgba1010102,
    Rgba16F,
    Nv12,
    Nv21,
    P010,
    A8,
}

impl Format {
    pub fn is_rgb(self) -> bool {
        !matches!(self, Format::Invalid | Format::Nv12 | Format::Nv21 | Format::P010)
    }

    pub fn is_yuv(self) -> bool {
        matches!(self, Format::Nv12 | Format::Nv21 | Format::P010)
    }

    pub fn is_half_float(self) -> bool {
        self == Format::Rgba16F
    }

    /// Whether the concurrent writeback block can produce this format.
    pub fn is_writeback_capable(self) -> bool {
        matches!(
            self,
            Format::Argb8888
                | Format::Rgba8888
                | Format::Rgbx8888
                | Format::Bgra8888
                | Format::Rgb888
                | Format::Rgb565
                | Format::Rgba1010102
                | Format::Nv12
        )
    }
}

pub const STANDARD_SHIFT: u32 = 16;
pub const TRANSFER_SHIFT: u32 = 22;
pub const RANGE_SHIFT: u32 = 27;

pub const STANDARD_MASK: u32 = 63 << STANDARD_SHIFT;
pub const TRANSFER_MASK: u32 = 31 << TRANSFER_SHIFT;
pub const RANGE_MASK: u32 = 7 << RANGE_SHIFT;

pub const STANDARD_BT709: u32 = 1 << STANDARD_SHIFT;
pub const STANDARD_BT601_625: u32 = 2 << STANDARD_SHIFT;
pub const STANDARD_BT601_625_UNADJUSTED: u32 = 3 << STANDARD_SHIFT;
pub const STANDARD_BT601_525: u32 = 4 << STANDARD_SHIFT;
pub const STANDARD_BT601_525_UNADJUSTED: u32 = 5 << STANDARD_SHIFT;
pub const STANDARD_BT2020: u32 = 6 << STANDARD_SHIFT;
pub const STANDARD_DCI_P3: u32 = 10 << STANDARD_SHIFT;

pub const TRANSFER_LINEAR: u32 = 1 << TRANSFER_SHIFT;
pub const TRANSFER_SRGB: u32 = 2 << TRANSFER_SHIFT;
pub const TRANSFER_SMPTE_170M: u32 = 3 << TRANSFER_SHIFT;
pub const TRANSFER_GAMMA2_2: u32 = 4 << TRANSFER_SHIFT;
pub const TRANSFER_GAMMA2_8: u32 = 6 << TRANSFER_SHIFT;
pub const TRANSFER_ST2084: u32 = 7 << TRANSFER_SHIFT;
pub const TRANSFER_HLG: u32 = 8 << TRANSFER_SHIFT;

pub const RANGE_FULL: u32 = 1 << RANGE_SHIFT;
pub const RANGE_LIMITED: u32 = 2 << RANGE_SHIFT;
pub const RANGE_EXTENDED: u32 = 3 << RANGE_SHIFT;

/// A packed `standard | transfer | range` dataspace, or one of the legacy
/// values that only use the low 16 bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct Dataspace(pub u32);

impl Dataspace {
    pub const UNKNOWN: Self = Self(0);
    pub const LEGACY_SRGB_LINEAR: Self = Self(0x200);
    pub const LEGACY_SRGB: Self = Self(0x201);
    pub const LEGACY_JFIF: Self = Self(0x101);
    pub const LEGACY_BT601_625: Self = Self(0x102);
    pub const LEGACY_BT601_525: Self = Self(0x103);
    pub const LEGACY_BT709: Self = Self(0x104);

    pub const V0_SRGB_LINEAR: Self = Self(STANDARD_BT709 | TRANSFER_LINEAR | RANGE_FULL);
    pub const V0_SRGB: Self = Self(STANDARD_BT709 | TRANSFER_SRGB | RANGE_FULL);
    pub const V0_JFIF: Self = Self(STANDARD_BT601_625 | TRANSFER_SMPTE_170M | RANGE_FULL);
    pub const V0_BT601_625: Self =
        Self(STANDARD_BT601_625 | TRANSFER_SMPTE_170M | RANGE_LIMITED);
    pub const V0_BT601_525: Self =
        Self(STANDARD_BT601_525 | TRANSFER_SMPTE_170M | RANGE_LIMITED);
    pub const V0_BT709: Self = Self(STANDARD_BT709 | TRANSFER_SMPTE_170M | RANGE_LIMITED);
    pub const DISPLAY_P3: Self = Self(STANDARD_DCI_P3 | TRANSFER_SRGB | RANGE_FULL);
    pub const BT2020_PQ: Self = Self(STANDARD_BT2020 | TRANSFER_ST2084 | RANGE_FULL);
    pub const BT2020_HLG: Self = Self(STANDARD_BT2020 | TRANSFER_HLG | RANGE_FULL);
    pub const DISPLAY_BT2020: Self = Self(STANDARD_BT2020 | TRANSFER_SRGB | RANGE_FULL);

    /// Maps the legacy low-16-bit values onto their V0 equivalents. Unknown
    /// becomes V0 sRGB.
    pub fn translate_legacy(self) -> Self {
        let mut ds = self;
        let legacy = self.0 & 0xffff;
        if legacy != 0 {
            ds = match Self(legacy) {
                Self::LEGACY_SRGB => Self::V0_SRGB,
                Self::LEGACY_JFIF => Self::V0_JFIF,
                Self::LEGACY_SRGB_LINEAR => Self::V0_SRGB_LINEAR,
                Self::LEGACY_BT601_625 => Self::V0_BT601_625,
                Self::LEGACY_BT601_525 => Self::V0_BT601_525,
                Self::LEGACY_BT709 => Self::V0_BT709,
                _ => {
                    log::warn!("Unsupported legacy dataspace 0x{:x}", self.0);
                    self
                }
            };
        }
        if ds == Self::UNKNOWN {
            ds = Self::V0_SRGB;
        }
        ds
    }

    pub fn primaries(self) -> Option<ColorPrimaries> {
        let p = match self.0 & STANDARD_MASK {
            STANDARD_BT709 => ColorPrimaries::Bt709,
            STANDARD_BT601_525 | STANDARD_BT601_525_UNADJUSTED => ColorPrimaries::Bt601_525,
            STANDARD_BT601_625 | STANDARD_BT601_625_UNADJUSTED => ColorPrimaries::Bt601_625,
            STANDARD_DCI_P3 => ColorPrimaries::DciP3,
            STANDARD_BT2020 => ColorPrimaries::Bt2020,
            _ => return None,
        };
        Some(p)
    }

    pub fn transfer(self) -> Option<Transfer> {
        let t = match self.0 & TRANSFER_MASK {
            TRANSFER_SRGB => Transfer::Srgb,
            TRANSFER_SMPTE_170M => Transfer::Smpte170M,
            TRANSFER_ST2084 => Transfer::St2084,
            TRANSFER_HLG => Transfer::Hlg,
            TRANSFER_LINEAR => Transfer::Linear,
            TRANSFER_GAMMA2_2 => Transfer::Gamma2_2,
            TRANSFER_GAMMA2_8 => Transfer::Gamma2_8,
            _ => return None,
        };
        Some(t)
    }

    pub fn range(self) -> Option<ColorRange> {
        let r = match self.0 & RANGE_MASK {
            RANGE_FULL => ColorRange::Full,
            RANGE_LIMITED => ColorRange::Limited,
            RANGE_EXTENDED => ColorRange::Extended,
            _ => return None,
        };
        Some(r)
    }

    /// Returns `None` if any of the three components cannot be derived.
    pub fn color_metadata(self) -> Option<ColorMetadata> {
        Some(ColorMetadata {
            primaries: self.primaries()?,
            transfer: self.transfer()?,
            range: self.range()?,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum ColorPrimaries {
    #[default]
    Bt709,
    Bt601_525,
    Bt601_625,
    DciP3,
    Bt2020,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum Transfer {
    #[default]
    Srgb,
    Smpte170M,
    St2084,
    Hlg,
    Linear,
    Gamma2_2,
    Gamma2_8,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum ColorRange {
    #[default]
    Full,
    Limited,
    Extended,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct ColorMetadata {
    pub primaries: ColorPrimaries,
    pub transfer: Transfer,
    pub range: ColorRange,
}

impl ColorMetadata {
    pub fn is_hdr(&self) -> bool {
        self.primaries == ColorPrimaries::Bt2020
            && matches!(self.transfer, Transfer::St2084 | Transfer::Hlg)
    }
}

/// Static HDR metadata as delivered through per-frame metadata keys.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct HdrMetadata {
    pub primaries: [[u32; 2]; 3],
    pub white_point: [u32; 2],
    pub max_luminance: u32,
    pub min_luminance: u32,
    pub max_content_light_level: u32,
    pub max_frame_average_light_level: u32,
}

pub const USAGE_PROTECTED: u64 = 1 << 14;
pub const USAGE_FRONT_BUFFER: u64 = 1 << 32;

/// Caller-supplied description of a graphics buffer.
///
/// Allocation and mapping happen elsewhere. The composition layer only needs
/// these properties to make its decisions.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BufferInfo {
    pub handle_id: u64,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub unaligned_width: u32,
    pub unaligned_height: u32,
    pub usage: u64,
    pub video: bool,
    pub secure: bool,
    pub secure_camera: bool,
    pub secure_display: bool,
    pub single_buffered: bool,
    pub frame_rate: Option<u32>,
}

impl BufferInfo {
    pub fn is_front_buffer(&self) -> bool {
        self.usage & USAGE_FRONT_BUFFER != 0
    }
}
