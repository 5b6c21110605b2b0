//! Encoding selection: decode the extension bits of an [`InternalFormat`]
//! once into a validated [`EncodingDecision`].
//!
//! Geometry and wire mapping only ever look at the decision, never at the
//! raw bits, so the overlap between block-compressed and fixed-rate
//! parameter fields cannot leak past this module.
//!
//! ```rust
//! use tailor::encoding::{self, EncodingDecision, SuperblockSize};
//! use tailor::format::{FormatCatalog, FormatId, InternalFormat, ext};
//! use tailor::Usage;
//!
//! let attrs = FormatCatalog::builtin().lookup(FormatId::Rgba8888).unwrap();
//! let word = InternalFormat::from(FormatId::Rgba8888).with(ext::AFBC_BASIC | ext::AFBC_WIDEBLK);
//! let decision = encoding::select(word, Usage::GPU_TEXTURE, attrs).unwrap();
//!
//! let EncodingDecision::BlockCompressed(afbc) = decision else { unreachable!() };
//! assert_eq!(afbc.superblock, SuperblockSize::Wide);
//! ```

use crate::format::{FormatAttributes, InternalFormat, ext};
use crate::usage::Usage;
use crate::{LayoutError, MAX_PLANES};

/// The four physical encoding families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncodingFamily {
    Uncompressed,
    BlockCompressed,
    FixedRateCompressed,
    TileLinear,
}

// ---------------------------------------------------------------------------
// Block compression
// ---------------------------------------------------------------------------

/// Superblock shape. Every shape covers 256 pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SuperblockSize {
    /// 16×16
    #[default]
    Basic,
    /// 32×8
    Wide,
    /// 64×4
    ExtraWide,
}

impl SuperblockSize {
    pub const fn width(self) -> u32 {
        match self {
            Self::Basic => 16,
            Self::Wide => 32,
            Self::ExtraWide => 64,
        }
    }

    pub const fn height(self) -> u32 {
        match self {
            Self::Basic => 16,
            Self::Wide => 8,
            Self::ExtraWide => 4,
        }
    }
}

/// Parameters of a block-compressed allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockCompressed {
    /// Superblock shape of plane 0.
    pub superblock: SuperblockSize,
    pub tiled_headers: bool,
    /// Planes after the first use their own header/body with 64×4 superblocks.
    pub multi_plane: bool,
    /// Rows padded to a multiple of 4 superblocks (non-YUV only).
    pub padded: bool,
    /// Body is doubled so the display can scan out one copy while the GPU
    /// writes the other. Only with tiled headers.
    pub frontbuffer_safe: bool,
    pub split_block: bool,
    /// Raw double-body request bit, as signalled on the wire.
    pub double_body: bool,
    /// Bit-channel-hybrid coding.
    pub bch: bool,
    pub yuv_transform: bool,
    pub sparse: bool,
    /// Unified storage mode.
    pub usm: bool,
}

impl BlockCompressed {
    /// Superblock shape used by `plane`.
    pub const fn superblock_for_plane(&self, plane: usize) -> SuperblockSize {
        if plane > 0 && self.multi_plane {
            SuperblockSize::ExtraWide
        } else {
            self.superblock
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed-rate compression
// ---------------------------------------------------------------------------

/// Bytes per fixed-rate coding unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodingUnitSize {
    Bytes16,
    Bytes24,
    Bytes32,
}

impl CodingUnitSize {
    /// Decode a 2-bit coding-unit field.
    pub const fn from_code(code: u64) -> Result<Self, LayoutError> {
        match code {
            ext::AFRC_CU_16 => Ok(Self::Bytes16),
            ext::AFRC_CU_24 => Ok(Self::Bytes24),
            ext::AFRC_CU_32 => Ok(Self::Bytes32),
            _ => Err(LayoutError::InvalidCodingUnitSize),
        }
    }

    pub const fn code(self) -> u64 {
        match self {
            Self::Bytes16 => ext::AFRC_CU_16,
            Self::Bytes24 => ext::AFRC_CU_24,
            Self::Bytes32 => ext::AFRC_CU_32,
        }
    }

    pub const fn bytes(self) -> u32 {
        match self {
            Self::Bytes16 => 16,
            Self::Bytes24 => 24,
            Self::Bytes32 => 32,
        }
    }

    /// Alignment of the start of a plane using this coding-unit size.
    pub const fn plane_alignment(self) -> u32 {
        match self {
            Self::Bytes16 => 1024,
            Self::Bytes24 => 512,
            Self::Bytes32 => 2048,
        }
    }
}

/// Pixels sharing one coding unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Clump {
    pub width: u32,
    pub height: u32,
}

/// Parameters of a fixed-rate-compressed allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FixedRateCompressed {
    pub paging_tile_width: u32,
    pub paging_tile_height: u32,
    /// Coding unit of plane 0 (RGBA or luma).
    pub luma_coding_unit: CodingUnitSize,
    /// Coding unit of planes after the first. Always decoded, even for
    /// single-plane formats.
    pub chroma_coding_unit: CodingUnitSize,
    pub clumps: [Clump; MAX_PLANES],
    pub plane_count: u8,
    /// 8×8 paging tiles laid out for rotation instead of 16×4 scan order.
    pub rotated: bool,
}

impl FixedRateCompressed {
    /// Coding-unit size used by `plane`.
    pub fn coding_unit_for_plane(&self, plane: usize) -> CodingUnitSize {
        if plane == 0 {
            self.luma_coding_unit
        } else {
            self.chroma_coding_unit
        }
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Concrete physical encoding of a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EncodingDecision {
    #[default]
    Uncompressed,
    BlockCompressed(BlockCompressed),
    FixedRateCompressed(FixedRateCompressed),
    /// 16×16 tiles, no parameters.
    TileLinear,
}

impl EncodingDecision {
    pub const fn family(&self) -> EncodingFamily {
        match self {
            Self::Uncompressed => EncodingFamily::Uncompressed,
            Self::BlockCompressed(_) => EncodingFamily::BlockCompressed,
            Self::FixedRateCompressed(_) => EncodingFamily::FixedRateCompressed,
            Self::TileLinear => EncodingFamily::TileLinear,
        }
    }

    pub const fn is_uncompressed(&self) -> bool {
        matches!(self, Self::Uncompressed)
    }
}

/// Decode the encoding bits of `format` for a format described by `attrs`.
///
/// A multi-plane block-compressed request without tiled headers (or without
/// extra-wide chroma superblocks) quietly falls back to single-plane
/// compression; only combinations the hardware cannot address are errors.
pub fn select(
    format: InternalFormat,
    usage: Usage,
    attrs: &FormatAttributes,
) -> Result<EncodingDecision, LayoutError> {
    if format.is_afrc() {
        select_afrc(format, attrs).map(EncodingDecision::FixedRateCompressed)
    } else if format.is_afbc() {
        select_afbc(format, usage, attrs).map(EncodingDecision::BlockCompressed)
    } else if format.is_block_linear() {
        Ok(EncodingDecision::TileLinear)
    } else {
        Ok(EncodingDecision::Uncompressed)
    }
}

fn select_afbc(
    format: InternalFormat,
    usage: Usage,
    attrs: &FormatAttributes,
) -> Result<BlockCompressed, LayoutError> {
    let wide = format.contains(ext::AFBC_WIDEBLK);
    let extra_wide = format.contains(ext::AFBC_EXTRAWIDEBLK);
    let tiled = format.contains(ext::AFBC_TILED_HEADERS);
    let double_body = format.contains(ext::AFBC_DOUBLE_BODY);
    let yuv_transform = format.contains(ext::AFBC_YUV_TRANSFORM);

    if attrs.is_yuv && yuv_transform {
        log::warn!("YUV transform requested for YUV format {:?}", attrs.id);
    }

    let superblock = if wide {
        SuperblockSize::Wide
    } else if extra_wide {
        SuperblockSize::ExtraWide
    } else {
        SuperblockSize::Basic
    };

    let mut multi_plane = attrs.plane_count > 1;
    if multi_plane && !tiled {
        log::debug!(
            "{:?}: multi-plane block compression needs tiled headers, using single plane",
            attrs.id
        );
        multi_plane = false;
    } else if multi_plane && !extra_wide {
        log::debug!(
            "{:?}: multi-plane block compression needs extra-wide chroma, using single plane",
            attrs.id
        );
        multi_plane = false;
    }

    // Plane>0 header addressing only exists with tiled headers.
    if extra_wide && !tiled {
        return Err(LayoutError::InvalidEncodingCombination);
    }

    // "Wide + extra-wide" is the multi-plane signal.
    if attrs.plane_count == 1 && wide && extra_wide {
        return Err(LayoutError::InvalidEncodingCombination);
    }

    let frontbuffer_safe = tiled && double_body;
    if frontbuffer_safe && (wide || extra_wide) {
        log::warn!("front-buffer-safe layout is not supported with wide superblocks");
    }

    Ok(BlockCompressed {
        superblock,
        tiled_headers: tiled,
        multi_plane,
        padded: usage.contains(Usage::AFBC_PADDING),
        frontbuffer_safe,
        split_block: format.contains(ext::AFBC_SPLITBLK),
        double_body,
        bch: format.contains(ext::AFBC_BCH),
        yuv_transform,
        sparse: format.contains(ext::AFBC_SPARSE),
        usm: format.contains(ext::AFBC_USM),
    })
}

fn select_afrc(
    format: InternalFormat,
    attrs: &FormatAttributes,
) -> Result<FixedRateCompressed, LayoutError> {
    let rotated = format.contains(ext::AFRC_ROT_LAYOUT);
    let (paging_tile_width, paging_tile_height) = if rotated { (8, 8) } else { (16, 4) };

    let field = |shift: u32| (format.0 >> shift) & ext::AFRC_CU_MASK;
    let luma_coding_unit = CodingUnitSize::from_code(field(ext::AFRC_RGBA_LUMA_CU_SHIFT))?;
    let chroma_coding_unit = CodingUnitSize::from_code(field(ext::AFRC_CHROMA_CU_SHIFT))?;

    let mut clumps = [Clump::default(); MAX_PLANES];
    for (plane, clump) in clumps.iter_mut().enumerate().take(attrs.plane_count as usize) {
        *clump = match attrs.components[plane] {
            1 => Clump {
                width: paging_tile_width,
                height: paging_tile_height,
            },
            2 => Clump { width: 8, height: 4 },
            3 | 4 => Clump { width: 4, height: 4 },
            _ => return Err(LayoutError::UnsupportedFormatForEncoding),
        };
    }

    Ok(FixedRateCompressed {
        paging_tile_width,
        paging_tile_height,
        luma_coding_unit,
        chroma_coding_unit,
        clumps,
        plane_count: attrs.plane_count,
        rotated,
    })
}

/// Check a decision against the catalog entry and the requested dimensions.
pub fn validate(
    decision: &EncodingDecision,
    attrs: &FormatAttributes,
    width: u32,
    height: u32,
) -> Result<(), LayoutError> {
    if !attrs.supports(decision.family()) {
        return Err(LayoutError::UnsupportedFormatForEncoding);
    }

    // `select` never produces this; decisions built by hand can.
    if let EncodingDecision::BlockCompressed(afbc) = decision
        && afbc.multi_plane
        && attrs.plane_count == 1
    {
        return Err(LayoutError::InvalidEncodingCombination);
    }

    if width == 0 || height == 0 {
        return Err(LayoutError::InvalidDimensions);
    }

    if attrs.requires_single_row() && height != 1 {
        return Err(LayoutError::InvalidDimensions);
    }

    Ok(())
}
