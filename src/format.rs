//! Base formats, the internal format word, and the immutable format catalog.
//!
//! An [`InternalFormat`] packs a base [`FormatId`] into its low 32 bits and
//! the encoding extension bits into the high 32 bits. The fixed-rate
//! parameter fields reuse the block-compressed parameter bits, so the word
//! must only be interpreted through [`crate::encoding::select`], which
//! resolves the family first.
//!
//! ```rust
//! use tailor::format::{FormatCatalog, FormatId, InternalFormat, ext};
//!
//! let word = InternalFormat::from(FormatId::Nv12)
//!     .with(ext::AFBC_BASIC | ext::AFBC_TILED_HEADERS);
//! assert_eq!(word.base(), FormatId::Nv12 as u32);
//!
//! let nv12 = FormatCatalog::builtin().lookup(FormatId::Nv12).unwrap();
//! assert_eq!(nv12.plane_count, 2);
//! assert!(nv12.is_yuv);
//! ```

use crate::encoding::EncodingFamily;
use crate::{LayoutError, MAX_PLANES};

// ---------------------------------------------------------------------------
// Base formats
// ---------------------------------------------------------------------------

/// Logical pixel formats known to the built-in catalog.
///
/// Values below `0x100` match the platform HAL pixel-format ids; the rest are
/// private to this allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
#[non_exhaustive]
pub enum FormatId {
    Rgba8888 = 0x1,
    Rgbx8888 = 0x2,
    Rgb888 = 0x3,
    Rgb565 = 0x4,
    Bgra8888 = 0x5,
    Nv16 = 0x10,
    Nv21 = 0x11,
    Yuv422_8Bit = 0x14,
    Rgba16161616 = 0x16,
    Raw16 = 0x20,
    Blob = 0x21,
    Raw10 = 0x25,
    Raw12 = 0x26,
    Rgba1010102 = 0x2B,
    Yuv420_8BitI = 0x100,
    Yuv420_10BitI = 0x101,
    Y0l2 = 0x102,
    Nv12 = 0x103,
    Yu12 = 0x104,
    Y210 = 0x105,
    P010 = 0x106,
    P210 = 0x107,
    Y410 = 0x108,
    Nv15 = 0x109,
    Yuv444 = 0x10A,
    Q410 = 0x10B,
    Q401 = 0x10C,
    Rgba10101010 = 0x10D,
    Y8 = 0x2020_3859,
    Y16 = 0x2036_3159,
    Yv12 = 0x3231_5659,
}

impl FormatId {
    const ALL: [FormatId; 31] = [
        Self::Rgba8888,
        Self::Rgbx8888,
        Self::Rgb888,
        Self::Rgb565,
        Self::Bgra8888,
        Self::Nv16,
        Self::Nv21,
        Self::Yuv422_8Bit,
        Self::Rgba16161616,
        Self::Raw16,
        Self::Blob,
        Self::Raw10,
        Self::Raw12,
        Self::Rgba1010102,
        Self::Yuv420_8BitI,
        Self::Yuv420_10BitI,
        Self::Y0l2,
        Self::Nv12,
        Self::Yu12,
        Self::Y210,
        Self::P010,
        Self::P210,
        Self::Y410,
        Self::Nv15,
        Self::Yuv444,
        Self::Q410,
        Self::Q401,
        Self::Rgba10101010,
        Self::Y8,
        Self::Y16,
        Self::Yv12,
    ];

    /// Look up a base format by its raw id.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| *id as u32 == raw)
    }

    /// Every base format, in catalog order.
    pub fn all() -> &'static [FormatId] {
        &Self::ALL
    }
}

// ---------------------------------------------------------------------------
// Internal format word
// ---------------------------------------------------------------------------

/// Extension bits of an [`InternalFormat`].
pub mod ext {
    /// Low 32 bits: base format id.
    pub const FMT_MASK: u64 = 0x0000_0000_FFFF_FFFF;
    /// High 32 bits: encoding parameters.
    pub const EXT_MASK: u64 = 0xFFFF_FFFF_0000_0000;

    pub const AFBC_BASIC: u64 = 1 << 32;
    pub const AFBC_SPLITBLK: u64 = 1 << 33;
    pub const AFBC_WIDEBLK: u64 = 1 << 34;
    pub const AFBC_TILED_HEADERS: u64 = 1 << 35;
    pub const AFBC_EXTRAWIDEBLK: u64 = 1 << 36;
    pub const AFBC_DOUBLE_BODY: u64 = 1 << 37;
    pub const AFBC_BCH: u64 = 1 << 38;
    pub const AFBC_YUV_TRANSFORM: u64 = 1 << 39;
    pub const AFBC_SPARSE: u64 = 1 << 40;
    pub const AFBC_USM: u64 = 1 << 41;

    pub const BLOCK_LINEAR_BASIC: u64 = 1 << 42;

    pub const AFRC_BASIC: u64 = 1 << 43;
    /// Shares its bit with [`AFBC_SPLITBLK`].
    pub const AFRC_ROT_LAYOUT: u64 = 1 << 33;
    pub const AFRC_RGBA_LUMA_CU_SHIFT: u32 = 34;
    pub const AFRC_CHROMA_CU_SHIFT: u32 = 36;
    pub const AFRC_CU_MASK: u64 = 0b11;

    /// Coding-unit field codes.
    pub const AFRC_CU_16: u64 = 1;
    pub const AFRC_CU_24: u64 = 2;
    pub const AFRC_CU_32: u64 = 3;

    /// Place a coding-unit code in the luma / RGBA field.
    pub const fn afrc_luma_cu(code: u64) -> u64 {
        (code & AFRC_CU_MASK) << AFRC_RGBA_LUMA_CU_SHIFT
    }

    /// Place a coding-unit code in the chroma field.
    pub const fn afrc_chroma_cu(code: u64) -> u64 {
        (code & AFRC_CU_MASK) << AFRC_CHROMA_CU_SHIFT
    }
}

/// Base format id plus encoding extension bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InternalFormat(pub u64);

impl InternalFormat {
    /// Raw base format id (low 32 bits).
    #[inline]
    pub const fn base(self) -> u32 {
        (self.0 & ext::FMT_MASK) as u32
    }

    /// Encoding extension bits (high 32 bits, still shifted).
    #[inline]
    pub const fn ext(self) -> u64 {
        self.0 & ext::EXT_MASK
    }

    /// Base format, if it names a known [`FormatId`].
    pub fn format_id(self) -> Option<FormatId> {
        FormatId::from_raw(self.base())
    }

    /// Set additional extension bits.
    #[must_use]
    pub const fn with(self, bits: u64) -> Self {
        Self(self.0 | (bits & ext::EXT_MASK))
    }

    /// `true` if every bit in `bits` is set.
    #[inline]
    pub const fn contains(self, bits: u64) -> bool {
        self.0 & bits == bits
    }

    /// `true` if the fixed-rate family bit is set.
    #[inline]
    pub const fn is_afrc(self) -> bool {
        self.contains(ext::AFRC_BASIC)
    }

    /// `true` if block compression is active. Fixed-rate takes precedence
    /// because the two families share parameter bits.
    #[inline]
    pub const fn is_afbc(self) -> bool {
        !self.is_afrc() && self.contains(ext::AFBC_BASIC)
    }

    /// `true` if the 16×16 tile-linear family is active.
    #[inline]
    pub const fn is_block_linear(self) -> bool {
        !self.is_afrc() && !self.is_afbc() && self.contains(ext::BLOCK_LINEAR_BASIC)
    }
}

impl From<FormatId> for InternalFormat {
    fn from(id: FormatId) -> Self {
        Self(id as u64)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Static description of a base format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatAttributes {
    pub id: FormatId,
    /// Number of planes (1..=3).
    pub plane_count: u8,
    /// Colour components stored in each plane.
    pub components: [u8; MAX_PLANES],
    /// Bits per pixel of each plane when stored uncompressed or tile-linear.
    pub bpp: [u8; MAX_PLANES],
    /// Bits per pixel of each plane as seen by the block compressor.
    pub bpp_afbc: [u8; MAX_PLANES],
    /// Horizontal subsampling of planes after the first.
    pub hsub: u8,
    /// Vertical subsampling of planes after the first.
    pub vsub: u8,
    /// Width granularity before subsampling.
    pub align_w: u8,
    /// Height granularity before subsampling.
    pub align_h: u8,
    /// CPU stride alignment, in pixels.
    pub align_w_cpu: u8,
    /// Minimum alignment for formats defined in blocks rather than pixels.
    pub tile_size: u8,
    pub is_yuv: bool,
    pub linear: bool,
    pub afbc: bool,
    pub afrc: bool,
    pub block_linear: bool,
}

impl FormatAttributes {
    fn check(&self) -> Result<(), LayoutError> {
        let planes = self.plane_count as usize;
        if !(1..=MAX_PLANES).contains(&planes)
            || self.hsub == 0
            || self.vsub == 0
            || self.tile_size == 0
        {
            log::warn!("rejecting catalog row {:?}", self.id);
            return Err(LayoutError::InvalidDimensions);
        }
        Ok(())
    }

    /// Whether the format may be stored with the given encoding family.
    pub const fn supports(&self, family: EncodingFamily) -> bool {
        match family {
            EncodingFamily::Uncompressed => self.linear,
            EncodingFamily::BlockCompressed => self.afbc,
            EncodingFamily::FixedRateCompressed => self.afrc,
            EncodingFamily::TileLinear => self.block_linear,
        }
    }

    /// YUV with chroma subsampled in either direction.
    pub const fn is_subsampled_yuv(&self) -> bool {
        self.is_yuv && (self.hsub > 1 || self.vsub > 1)
    }

    /// Formats whose single plane must be exactly one row tall.
    pub const fn requires_single_row(&self) -> bool {
        matches!(self.id, FormatId::Blob)
    }

    /// Formats whose chroma byte stride is pinned to half the luma stride.
    pub const fn has_half_chroma_stride(&self) -> bool {
        matches!(self.id, FormatId::Yv12)
    }
}

/// Catalog row builder; keeps the table below readable.
#[allow(clippy::too_many_arguments)]
const fn entry(
    id: FormatId,
    plane_count: u8,
    components: [u8; MAX_PLANES],
    bpp: [u8; MAX_PLANES],
    bpp_afbc: [u8; MAX_PLANES],
    (hsub, vsub): (u8, u8),
    (align_w, align_h, align_w_cpu, tile_size): (u8, u8, u8, u8),
    is_yuv: bool,
    (linear, afbc, afrc, block_linear): (bool, bool, bool, bool),
) -> FormatAttributes {
    FormatAttributes {
        id,
        plane_count,
        components,
        bpp,
        bpp_afbc,
        hsub,
        vsub,
        align_w,
        align_h,
        align_w_cpu,
        tile_size,
        is_yuv,
        linear,
        afbc,
        afrc,
        block_linear,
    }
}

const RGB: bool = false;
const YUV: bool = true;

#[rustfmt::skip]
static BUILTIN: [FormatAttributes; 31] = [
    //    id                       pl  cmp        bpp            bpp_afbc       sub     (aw,ah,cpu,tile) model (lin, afbc, afrc, bl)
    entry(FormatId::Rgba8888,      1, [4, 0, 0], [32, 0, 0],    [32, 0, 0],    (1, 1), (1, 1, 1, 1),  RGB, (true, true, true, false)),
    entry(FormatId::Rgbx8888,      1, [3, 0, 0], [32, 0, 0],    [32, 0, 0],    (1, 1), (1, 1, 1, 1),  RGB, (true, true, true, false)),
    entry(FormatId::Rgb888,        1, [3, 0, 0], [24, 0, 0],    [24, 0, 0],    (1, 1), (1, 1, 1, 1),  RGB, (true, true, true, false)),
    entry(FormatId::Rgb565,        1, [3, 0, 0], [16, 0, 0],    [16, 0, 0],    (1, 1), (1, 1, 1, 1),  RGB, (true, true, true, false)),
    entry(FormatId::Bgra8888,      1, [4, 0, 0], [32, 0, 0],    [32, 0, 0],    (1, 1), (1, 1, 1, 1),  RGB, (true, false, false, false)),
    entry(FormatId::Rgba1010102,   1, [4, 0, 0], [32, 0, 0],    [32, 0, 0],    (1, 1), (1, 1, 1, 1),  RGB, (true, true, true, false)),
    entry(FormatId::Rgba16161616,  1, [4, 0, 0], [64, 0, 0],    [64, 0, 0],    (1, 1), (1, 1, 1, 1),  RGB, (true, true, false, false)),
    entry(FormatId::Rgba10101010,  1, [4, 0, 0], [64, 0, 0],    [64, 0, 0],    (1, 1), (1, 1, 1, 1),  RGB, (true, false, false, false)),
    entry(FormatId::Y8,            1, [1, 0, 0], [8, 0, 0],     [8, 0, 0],     (1, 1), (2, 2, 16, 1), YUV, (true, true, true, false)),
    entry(FormatId::Y16,           1, [1, 0, 0], [16, 0, 0],    [16, 0, 0],    (1, 1), (2, 2, 16, 1), YUV, (true, true, false, false)),
    entry(FormatId::Blob,          1, [1, 0, 0], [8, 0, 0],     [8, 0, 0],     (1, 1), (1, 1, 1, 1),  RGB, (true, false, false, false)),
    entry(FormatId::Raw16,         1, [1, 0, 0], [16, 0, 0],    [16, 0, 0],    (1, 1), (2, 2, 16, 1), RGB, (true, false, false, false)),
    entry(FormatId::Raw12,         1, [1, 0, 0], [12, 0, 0],    [12, 0, 0],    (1, 1), (4, 2, 4, 1),  RGB, (true, false, false, false)),
    entry(FormatId::Raw10,         1, [1, 0, 0], [10, 0, 0],    [10, 0, 0],    (1, 1), (4, 2, 4, 1),  RGB, (true, false, false, false)),
    entry(FormatId::Nv12,          2, [1, 2, 0], [8, 16, 0],    [8, 16, 0],    (2, 2), (2, 2, 16, 1), YUV, (true, true, true, true)),
    entry(FormatId::Nv21,          2, [1, 2, 0], [8, 16, 0],    [8, 16, 0],    (2, 2), (2, 2, 16, 1), YUV, (true, false, false, false)),
    entry(FormatId::Nv16,          2, [1, 2, 0], [8, 16, 0],    [8, 16, 0],    (2, 1), (2, 1, 16, 1), YUV, (true, true, false, true)),
    entry(FormatId::Nv15,          2, [1, 2, 0], [10, 20, 0],   [10, 20, 0],   (2, 2), (4, 2, 4, 1),  YUV, (false, true, false, false)),
    entry(FormatId::Yv12,          3, [1, 1, 1], [8, 8, 8],     [8, 8, 8],     (2, 2), (2, 2, 16, 1), YUV, (true, false, false, false)),
    entry(FormatId::Yu12,          3, [1, 1, 1], [8, 8, 8],     [8, 8, 8],     (2, 2), (2, 2, 16, 1), YUV, (true, true, true, false)),
    entry(FormatId::P010,          2, [1, 2, 0], [16, 32, 0],   [10, 20, 0],   (2, 2), (2, 2, 16, 1), YUV, (true, false, true, true)),
    entry(FormatId::P210,          2, [1, 2, 0], [16, 32, 0],   [10, 20, 0],   (2, 1), (2, 1, 16, 1), YUV, (true, false, false, true)),
    entry(FormatId::Y210,          1, [3, 0, 0], [32, 0, 0],    [20, 0, 0],    (2, 1), (2, 1, 1, 1),  YUV, (true, true, false, false)),
    entry(FormatId::Y410,          1, [4, 0, 0], [32, 0, 0],    [32, 0, 0],    (1, 1), (1, 1, 1, 1),  YUV, (true, true, false, false)),
    entry(FormatId::Y0l2,          1, [4, 0, 0], [16, 0, 0],    [16, 0, 0],    (2, 2), (2, 2, 1, 2),  YUV, (true, false, false, false)),
    entry(FormatId::Yuv422_8Bit,   1, [3, 0, 0], [16, 0, 0],    [16, 0, 0],    (2, 1), (2, 1, 1, 1),  YUV, (true, true, false, false)),
    entry(FormatId::Yuv420_8BitI,  1, [3, 0, 0], [0, 0, 0],     [12, 0, 0],    (2, 2), (2, 2, 1, 1),  YUV, (false, true, false, false)),
    entry(FormatId::Yuv420_10BitI, 1, [3, 0, 0], [0, 0, 0],     [15, 0, 0],    (2, 2), (2, 2, 1, 1),  YUV, (false, true, false, false)),
    entry(FormatId::Yuv444,        3, [1, 1, 1], [8, 8, 8],     [8, 8, 8],     (1, 1), (1, 1, 16, 1), YUV, (true, true, true, false)),
    entry(FormatId::Q410,          3, [1, 1, 1], [16, 16, 16],  [10, 10, 10],  (1, 1), (1, 1, 16, 1), YUV, (true, false, false, false)),
    entry(FormatId::Q401,          3, [1, 1, 1], [16, 16, 16],  [10, 10, 10],  (1, 1), (1, 1, 16, 1), YUV, (true, false, false, false)),
];

/// Read-only table of [`FormatAttributes`], looked up by base format id.
///
/// The built-in table is a `static`; custom tables borrow their entries, so a
/// catalog can be shared across threads without synchronization.
#[derive(Clone, Copy, Debug)]
pub struct FormatCatalog<'a> {
    entries: &'a [FormatAttributes],
}

impl FormatCatalog<'static> {
    /// The built-in catalog.
    pub fn builtin() -> &'static FormatCatalog<'static> {
        static CATALOG: FormatCatalog<'static> = FormatCatalog { entries: &BUILTIN };
        &CATALOG
    }
}

impl<'a> FormatCatalog<'a> {
    /// A catalog over caller-provided entries.
    ///
    /// Rows that the geometry cannot use are rejected with
    /// [`LayoutError::InvalidDimensions`]: a plane count outside
    /// `1..=MAX_PLANES`, or a zero subsampling factor or tile size.
    pub fn from_entries(entries: &'a [FormatAttributes]) -> Result<Self, LayoutError> {
        for attrs in entries {
            attrs.check()?;
        }
        Ok(Self { entries })
    }

    /// Attributes for `id`.
    pub fn lookup(&self, id: FormatId) -> Result<&'a FormatAttributes, LayoutError> {
        self.entries
            .iter()
            .find(|attrs| attrs.id == id)
            .ok_or(LayoutError::UnrecognizedFormat)
    }

    /// Attributes for the base of an internal format word.
    pub fn lookup_raw(&self, base: u32) -> Result<&'a FormatAttributes, LayoutError> {
        let id = FormatId::from_raw(base).ok_or(LayoutError::UnrecognizedFormat)?;
        self.lookup(id)
    }

    pub fn entries(&self) -> &'a [FormatAttributes] {
        self.entries
    }
}
