//! Wire descriptors: a fourcc format code plus a 64-bit modifier describing
//! the physical encoding, for software that only ever sees the finished
//! buffer.
//!
//! The mapping is exact in the decision→modifier direction.
//! [`decode_modifier`] recovers the subset of parameters a modifier carries.
//!
//! ```rust
//! use tailor::encoding::EncodingDecision;
//! use tailor::wire::{self, Fourcc, GENERIC_16_16_TILE};
//! use tailor::FormatId;
//!
//! let desc = wire::to_wire_descriptor(FormatId::Nv12, &EncodingDecision::TileLinear);
//! assert_eq!(desc.fourcc, Fourcc::NV12);
//! assert_eq!(desc.modifier, GENERIC_16_16_TILE);
//! assert_eq!(desc.fourcc.to_string(), "NV12");
//! ```

use core::fmt;

use crate::encoding::{
    BlockCompressed, CodingUnitSize, EncodingDecision, FixedRateCompressed, SuperblockSize,
};
use crate::format::FormatId;

// ---------------------------------------------------------------------------
// Fourcc
// ---------------------------------------------------------------------------

/// Four-character format code, little-endian packed.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Fourcc(pub u32);

impl Fourcc {
    /// No valid format.
    pub const INVALID: Self = Self(0);

    pub const R16: Self = Self::new(b"R16 ");
    pub const ABGR8888: Self = Self::new(b"AB24");
    pub const ARGB8888: Self = Self::new(b"AR24");
    pub const RGB565: Self = Self::new(b"RG16");
    pub const BGR565: Self = Self::new(b"BG16");
    pub const XBGR8888: Self = Self::new(b"XB24");
    pub const BGR888: Self = Self::new(b"BG24");
    pub const ABGR2101010: Self = Self::new(b"AB30");
    pub const ABGR16161616F: Self = Self::new(b"AB4H");
    pub const AXBXGXRX106106106106: Self = Self::new(b"AB10");
    pub const YVU420: Self = Self::new(b"YV12");
    pub const YUV420: Self = Self::new(b"YU12");
    pub const NV12: Self = Self::new(b"NV12");
    pub const NV15: Self = Self::new(b"NV15");
    pub const NV16: Self = Self::new(b"NV16");
    pub const NV21: Self = Self::new(b"NV21");
    pub const Y0L2: Self = Self::new(b"Y0L2");
    pub const Y210: Self = Self::new(b"Y210");
    pub const P010: Self = Self::new(b"P010");
    pub const P210: Self = Self::new(b"P210");
    pub const Y410: Self = Self::new(b"Y410");
    pub const YUV444: Self = Self::new(b"YU24");
    pub const Q410: Self = Self::new(b"Q410");
    pub const Q401: Self = Self::new(b"Q401");
    pub const YUYV: Self = Self::new(b"YUYV");
    pub const YUV420_8BIT: Self = Self::new(b"YU08");
    pub const YUV420_10BIT: Self = Self::new(b"YU10");

    /// Pack four ASCII bytes, first byte in the low bits.
    #[inline]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(u32::from_le_bytes(*code))
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            return f.write_str("INVALID");
        }
        for b in self.to_bytes() {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            fmt::Write::write_char(f, c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fourcc({self} {:#010x})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ColorModel {
    Rgb,
    Yuv,
}

fn fourcc_for(id: FormatId) -> Option<(Fourcc, ColorModel)> {
    use ColorModel::{Rgb, Yuv};
    let entry = match id {
        FormatId::Raw16 => (Fourcc::R16, Rgb),
        FormatId::Rgba8888 => (Fourcc::ABGR8888, Rgb),
        FormatId::Bgra8888 => (Fourcc::ARGB8888, Rgb),
        FormatId::Rgb565 => (Fourcc::RGB565, Rgb),
        FormatId::Rgbx8888 => (Fourcc::XBGR8888, Rgb),
        FormatId::Rgb888 => (Fourcc::BGR888, Rgb),
        FormatId::Rgba1010102 => (Fourcc::ABGR2101010, Rgb),
        FormatId::Rgba16161616 => (Fourcc::ABGR16161616F, Rgb),
        FormatId::Rgba10101010 => (Fourcc::AXBXGXRX106106106106, Rgb),
        FormatId::Yv12 => (Fourcc::YVU420, Yuv),
        FormatId::Yu12 => (Fourcc::YUV420, Yuv),
        FormatId::Nv12 => (Fourcc::NV12, Yuv),
        FormatId::Nv15 => (Fourcc::NV15, Yuv),
        FormatId::Nv16 => (Fourcc::NV16, Yuv),
        FormatId::Nv21 => (Fourcc::NV21, Yuv),
        FormatId::Y0l2 => (Fourcc::Y0L2, Yuv),
        FormatId::Y210 => (Fourcc::Y210, Yuv),
        FormatId::P010 => (Fourcc::P010, Yuv),
        FormatId::P210 => (Fourcc::P210, Yuv),
        FormatId::Y410 => (Fourcc::Y410, Yuv),
        FormatId::Yuv444 => (Fourcc::YUV444, Yuv),
        FormatId::Q410 => (Fourcc::Q410, Yuv),
        FormatId::Q401 => (Fourcc::Q401, Yuv),
        FormatId::Yuv422_8Bit => (Fourcc::YUYV, Yuv),
        FormatId::Yuv420_8BitI => (Fourcc::YUV420_8BIT, Yuv),
        FormatId::Yuv420_10BitI => (Fourcc::YUV420_10BIT, Yuv),
        _ => return None,
    };
    Some(entry)
}

// ---------------------------------------------------------------------------
// Modifier bits
// ---------------------------------------------------------------------------

const VENDOR_ARM: u64 = 0x08;
const VENDOR_SHIFT: u32 = 56;
const ARM_TYPE_SHIFT: u32 = 52;
const ARM_VALUE_MASK: u64 = 0x000f_ffff_ffff_ffff;

const ARM_TYPE_AFBC: u64 = 0x00;
const ARM_TYPE_MISC: u64 = 0x01;
const ARM_TYPE_AFRC: u64 = 0x02;

const fn arm_code(ty: u64, value: u64) -> u64 {
    (VENDOR_ARM << VENDOR_SHIFT) | (ty << ARM_TYPE_SHIFT) | (value & ARM_VALUE_MASK)
}

/// No modifier: linear, or nothing known.
pub const MOD_LINEAR: u64 = 0;
/// Fixed 16×16 tiles.
pub const GENERIC_16_16_TILE: u64 = arm_code(ARM_TYPE_MISC, 1);

pub const AFBC_BLOCK_SIZE_MASK: u64 = 0xf;
pub const AFBC_YTR: u64 = 1 << 4;
pub const AFBC_SPLIT: u64 = 1 << 5;
pub const AFBC_SPARSE: u64 = 1 << 6;
pub const AFBC_TILED: u64 = 1 << 8;
pub const AFBC_DB: u64 = 1 << 10;
pub const AFBC_BCH: u64 = 1 << 11;
pub const AFBC_USM: u64 = 1 << 12;

pub const AFRC_CU_SIZE_MASK: u64 = 0xf;
pub const AFRC_LAYOUT_SCAN: u64 = 1 << 8;
const AFRC_P12_SHIFT: u32 = 4;

/// Block-size field of a block-compressed modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AfbcBlockSize {
    Size16x16,
    Size32x8,
    Size64x4,
    /// 32×8 luma, 64×4 chroma.
    Size32x8And64x4,
}

impl AfbcBlockSize {
    const fn code(self) -> u64 {
        match self {
            Self::Size16x16 => 1,
            Self::Size32x8 => 2,
            Self::Size64x4 => 3,
            Self::Size32x8And64x4 => 4,
        }
    }

    const fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::Size16x16),
            2 => Some(Self::Size32x8),
            3 => Some(Self::Size64x4),
            4 => Some(Self::Size32x8And64x4),
            _ => None,
        }
    }
}

const fn cu_code(cu: CodingUnitSize) -> u64 {
    match cu {
        CodingUnitSize::Bytes16 => 1,
        CodingUnitSize::Bytes24 => 2,
        CodingUnitSize::Bytes32 => 3,
    }
}

const fn cu_from_code(code: u64) -> Option<CodingUnitSize> {
    match code {
        1 => Some(CodingUnitSize::Bytes16),
        2 => Some(CodingUnitSize::Bytes24),
        3 => Some(CodingUnitSize::Bytes32),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Portable (format code, modifier) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WireDescriptor {
    pub fourcc: Fourcc,
    pub modifier: u64,
}

/// Wire descriptor for `id` stored with `decision`.
///
/// Formats with no fourcc map to [`Fourcc::INVALID`] with no modifier.
pub fn to_wire_descriptor(id: FormatId, decision: &EncodingDecision) -> WireDescriptor {
    let Some((mut fourcc, model)) = fourcc_for(id) else {
        return WireDescriptor::default();
    };

    // Block compression stores 565 with the opposite component order.
    if id == FormatId::Rgb565 && matches!(decision, EncodingDecision::BlockCompressed(_)) {
        fourcc = Fourcc::BGR565;
    }

    let modifier = match decision {
        EncodingDecision::Uncompressed => MOD_LINEAR,
        EncodingDecision::BlockCompressed(bc) => afbc_modifier(bc),
        EncodingDecision::FixedRateCompressed(fr) => afrc_modifier(fr, model),
        EncodingDecision::TileLinear => GENERIC_16_16_TILE,
    };

    WireDescriptor { fourcc, modifier }
}

fn afbc_modifier(bc: &BlockCompressed) -> u64 {
    let mut m = 0;
    for (set, bit) in [
        (bc.split_block, AFBC_SPLIT),
        (bc.tiled_headers, AFBC_TILED),
        (bc.double_body, AFBC_DB),
        (bc.bch, AFBC_BCH),
        (bc.yuv_transform, AFBC_YTR),
        (bc.sparse, AFBC_SPARSE),
        (bc.usm, AFBC_USM),
    ] {
        if set {
            m |= bit;
        }
    }

    let block_size = match bc.superblock {
        SuperblockSize::Wide if bc.multi_plane => AfbcBlockSize::Size32x8And64x4,
        SuperblockSize::Wide => AfbcBlockSize::Size32x8,
        SuperblockSize::ExtraWide => AfbcBlockSize::Size64x4,
        SuperblockSize::Basic => AfbcBlockSize::Size16x16,
    };
    arm_code(ARM_TYPE_AFBC, m | block_size.code())
}

fn afrc_modifier(fr: &FixedRateCompressed, model: ColorModel) -> u64 {
    let mut m = 0;
    if !fr.rotated {
        m |= AFRC_LAYOUT_SCAN;
    }

    m |= cu_code(fr.luma_coding_unit);
    if model == ColorModel::Yuv && fr.plane_count > 1 {
        m |= cu_code(fr.chroma_coding_unit) << AFRC_P12_SHIFT;
    }
    arm_code(ARM_TYPE_AFRC, m)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Encoding parameters recovered from a modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierFields {
    Linear,
    BlockCompressed {
        block_size: AfbcBlockSize,
        split_block: bool,
        tiled_headers: bool,
        double_body: bool,
        bch: bool,
        yuv_transform: bool,
        sparse: bool,
        usm: bool,
    },
    FixedRateCompressed {
        /// Set for 16×4 scan-order paging tiles, clear for rotated 8×8.
        scan_layout: bool,
        /// Plane 0 (RGBA or luma).
        coding_unit: CodingUnitSize,
        /// Planes 1 and 2, when signalled.
        chroma_coding_unit: Option<CodingUnitSize>,
    },
    GenericTile16x16,
}

/// Interpret a modifier produced by [`to_wire_descriptor`].
///
/// Returns `None` for foreign vendors and malformed fields.
pub fn decode_modifier(modifier: u64) -> Option<ModifierFields> {
    if modifier == MOD_LINEAR {
        return Some(ModifierFields::Linear);
    }
    if modifier == GENERIC_16_16_TILE {
        return Some(ModifierFields::GenericTile16x16);
    }
    if modifier >> VENDOR_SHIFT != VENDOR_ARM {
        return None;
    }

    let value = modifier & ARM_VALUE_MASK;
    match (modifier >> ARM_TYPE_SHIFT) & 0xf {
        ARM_TYPE_AFBC => Some(ModifierFields::BlockCompressed {
            block_size: AfbcBlockSize::from_code(value & AFBC_BLOCK_SIZE_MASK)?,
            split_block: value & AFBC_SPLIT != 0,
            tiled_headers: value & AFBC_TILED != 0,
            double_body: value & AFBC_DB != 0,
            bch: value & AFBC_BCH != 0,
            yuv_transform: value & AFBC_YTR != 0,
            sparse: value & AFBC_SPARSE != 0,
            usm: value & AFBC_USM != 0,
        }),
        ARM_TYPE_AFRC => {
            let chroma = (value >> AFRC_P12_SHIFT) & AFRC_CU_SIZE_MASK;
            Some(ModifierFields::FixedRateCompressed {
                scan_layout: value & AFRC_LAYOUT_SCAN != 0,
                coding_unit: cu_from_code(value & AFRC_CU_SIZE_MASK)?,
                chroma_coding_unit: match chroma {
                    0 => None,
                    code => Some(cu_from_code(code)?),
                },
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{self, Clump};
    use crate::format::{FormatCatalog, InternalFormat, ext};
    use crate::usage::Usage;
    use alloc::string::ToString;

    fn decide(id: FormatId, bits: u64) -> EncodingDecision {
        let attrs = FormatCatalog::builtin().lookup(id).unwrap();
        encoding::select(InternalFormat::from(id).with(bits), Usage::GPU_TEXTURE, attrs).unwrap()
    }

    #[test]
    fn fourcc_packs_little_endian() {
        assert_eq!(Fourcc::ABGR8888.0, 0x3432_4241);
        assert_eq!(Fourcc::NV12.to_bytes(), *b"NV12");
        assert_eq!(Fourcc::R16.to_string(), "R16 ");
        assert_eq!(Fourcc::INVALID.to_string(), "INVALID");
    }

    #[test]
    fn uncompressed_has_no_modifier() {
        let desc = to_wire_descriptor(FormatId::Rgba8888, &EncodingDecision::Uncompressed);
        assert_eq!(desc, WireDescriptor { fourcc: Fourcc::ABGR8888, modifier: 0 });
    }

    #[test]
    fn unmapped_format_is_invalid() {
        let decision = decide(FormatId::Y8, ext::AFBC_BASIC);
        assert_eq!(to_wire_descriptor(FormatId::Y8, &decision), WireDescriptor::default());
        assert_eq!(
            to_wire_descriptor(FormatId::Blob, &EncodingDecision::Uncompressed).fourcc,
            Fourcc::INVALID
        );
    }

    #[test]
    fn rgb565_order_flips_under_block_compression() {
        let linear = to_wire_descriptor(FormatId::Rgb565, &EncodingDecision::Uncompressed);
        assert_eq!(linear.fourcc, Fourcc::RGB565);

        let afbc = to_wire_descriptor(FormatId::Rgb565, &decide(FormatId::Rgb565, ext::AFBC_BASIC));
        assert_eq!(afbc.fourcc, Fourcc::BGR565);

        let cu = ext::afrc_luma_cu(ext::AFRC_CU_16) | ext::afrc_chroma_cu(ext::AFRC_CU_16);
        let afrc = decide(FormatId::Rgb565, ext::AFRC_BASIC | cu);
        assert_eq!(to_wire_descriptor(FormatId::Rgb565, &afrc).fourcc, Fourcc::RGB565);
    }

    #[test]
    fn afbc_basic_modifier() {
        let decision = decide(FormatId::Rgba8888, ext::AFBC_BASIC);
        let desc = to_wire_descriptor(FormatId::Rgba8888, &decision);
        assert_eq!(desc.modifier, 0x0800_0000_0000_0001);
    }

    #[test]
    fn afbc_flags_map_to_bits() {
        let bits = ext::AFBC_BASIC
            | ext::AFBC_SPLITBLK
            | ext::AFBC_TILED_HEADERS
            | ext::AFBC_DOUBLE_BODY
            | ext::AFBC_YUV_TRANSFORM
            | ext::AFBC_SPARSE
            | ext::AFBC_BCH
            | ext::AFBC_USM;
        let desc = to_wire_descriptor(FormatId::Rgba8888, &decide(FormatId::Rgba8888, bits));
        let expected = arm_code(
            ARM_TYPE_AFBC,
            1 | AFBC_SPLIT | AFBC_TILED | AFBC_DB | AFBC_YTR | AFBC_SPARSE | AFBC_BCH | AFBC_USM,
        );
        assert_eq!(desc.modifier, expected);
    }

    #[test]
    fn afbc_block_size_classes() {
        let wide = decide(FormatId::Rgba8888, ext::AFBC_BASIC | ext::AFBC_WIDEBLK);
        let m = to_wire_descriptor(FormatId::Rgba8888, &wide).modifier;
        assert_eq!(m & AFBC_BLOCK_SIZE_MASK, 2);

        let xwide = decide(
            FormatId::Rgba8888,
            ext::AFBC_BASIC | ext::AFBC_EXTRAWIDEBLK | ext::AFBC_TILED_HEADERS,
        );
        let m = to_wire_descriptor(FormatId::Rgba8888, &xwide).modifier;
        assert_eq!(m & AFBC_BLOCK_SIZE_MASK, 3);

        let multi = decide(
            FormatId::Nv12,
            ext::AFBC_BASIC | ext::AFBC_WIDEBLK | ext::AFBC_EXTRAWIDEBLK | ext::AFBC_TILED_HEADERS,
        );
        let m = to_wire_descriptor(FormatId::Nv12, &multi).modifier;
        assert_eq!(m & AFBC_BLOCK_SIZE_MASK, 4);
    }

    #[test]
    fn afrc_scan_bit_tracks_rotation() {
        let cu = ext::afrc_luma_cu(ext::AFRC_CU_24) | ext::afrc_chroma_cu(ext::AFRC_CU_16);
        let scan = decide(FormatId::Rgba8888, ext::AFRC_BASIC | cu);
        let m = to_wire_descriptor(FormatId::Rgba8888, &scan).modifier;
        assert_eq!(m, arm_code(ARM_TYPE_AFRC, AFRC_LAYOUT_SCAN | 2));

        let rot = decide(FormatId::Rgba8888, ext::AFRC_BASIC | ext::AFRC_ROT_LAYOUT | cu);
        let m = to_wire_descriptor(FormatId::Rgba8888, &rot).modifier;
        assert_eq!(m, arm_code(ARM_TYPE_AFRC, 2));
    }

    #[test]
    fn afrc_yuv_sets_both_coding_units() {
        let bits = ext::AFRC_BASIC
            | ext::afrc_luma_cu(ext::AFRC_CU_16)
            | ext::afrc_chroma_cu(ext::AFRC_CU_32);
        let m = to_wire_descriptor(FormatId::Nv12, &decide(FormatId::Nv12, bits)).modifier;
        assert_eq!(m, arm_code(ARM_TYPE_AFRC, AFRC_LAYOUT_SCAN | 1 | (3 << 4)));
    }

    #[test]
    fn afrc_rgb_ignores_chroma_field() {
        let fr = FixedRateCompressed {
            paging_tile_width: 16,
            paging_tile_height: 4,
            luma_coding_unit: CodingUnitSize::Bytes32,
            chroma_coding_unit: CodingUnitSize::Bytes16,
            clumps: [Clump { width: 4, height: 4 }; 3],
            plane_count: 1,
            rotated: false,
        };
        let m = afrc_modifier(&fr, ColorModel::Rgb);
        assert_eq!(m, arm_code(ARM_TYPE_AFRC, AFRC_LAYOUT_SCAN | 3));
    }

    #[test]
    fn tile_linear_is_generic_tile() {
        let desc = to_wire_descriptor(FormatId::P010, &EncodingDecision::TileLinear);
        assert_eq!(desc.fourcc, Fourcc::P010);
        assert_eq!(desc.modifier, 0x0810_0000_0000_0001);
    }

    #[test]
    fn decode_rejects_foreign_and_malformed() {
        assert_eq!(decode_modifier(0x0100_0000_0000_0001), None);
        // Block-size code 0.
        assert_eq!(decode_modifier(arm_code(ARM_TYPE_AFBC, AFBC_TILED)), None);
        // Coding-unit code 0.
        assert_eq!(decode_modifier(arm_code(ARM_TYPE_AFRC, AFRC_LAYOUT_SCAN)), None);
        assert_eq!(decode_modifier(0), Some(ModifierFields::Linear));
    }

    #[test]
    fn decode_recovers_afbc_fields() {
        let m = arm_code(ARM_TYPE_AFBC, 2 | AFBC_TILED | AFBC_SPLIT);
        assert_eq!(
            decode_modifier(m),
            Some(ModifierFields::BlockCompressed {
                block_size: AfbcBlockSize::Size32x8,
                split_block: true,
                tiled_headers: true,
                double_body: false,
                bch: false,
                yuv_transform: false,
                sparse: false,
                usm: false,
            })
        );
    }
}
