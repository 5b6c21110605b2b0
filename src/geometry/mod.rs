//! Per-plane geometry: allocation dimensions, strides, body and header
//! sizes and offsets for each encoding family, then multi-layer
//! replication.
//!
//! Planes are laid out back to back in declaration order. Each plane's
//! offset is the running total before its own body and header are added.

use crate::encoding::{BlockCompressed, EncodingDecision, FixedRateCompressed, SuperblockSize};
use crate::format::FormatAttributes;
use crate::{LayoutError, MAX_PLANES, align_up, lcm};


/// Every superblock shape covers this many pixels.
pub const AFBC_PIXELS_PER_BLOCK: u64 = 256;
/// Bytes per superblock header entry.
pub const AFBC_HEADER_BYTES_PER_BLOCK: u64 = 16;
/// Header and body buffers start on this boundary (×4 with tiled headers).
pub const AFBC_BODY_BUFFER_ALIGNMENT: u64 = 1024;
/// Fixed-rate coding units per paging tile.
pub const AFRC_CODING_UNITS_PER_PAGING_TILE: u64 = 64;
/// Tile-linear tile edge, in pixels.
pub const BLOCK_LINEAR_TILE: u64 = 16;

/// Geometry of one plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PlaneLayout {
    /// Bytes from the start of the layer.
    pub offset: u64,
    pub byte_stride: u64,
    /// Allocated width in pixels, after every alignment rule.
    pub alloc_width: u32,
    /// Allocated height in pixels, after every alignment rule.
    pub alloc_height: u32,
    /// Row pitch in pixels for CPU-visible uncompressed planes, else 0.
    pub pixel_stride: u32,
    /// Block-compressed header bytes at `offset`; 0 for other encodings.
    pub header_size: u64,
    /// Pixel data bytes following the header.
    pub body_size: u64,
}

impl PlaneLayout {
    /// Total bytes this plane occupies.
    #[inline]
    pub const fn size(&self) -> u64 {
        self.header_size + self.body_size
    }

    /// One past the last byte of this plane.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.offset + self.size()
    }
}

/// Computed memory layout of a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferLayout {
    /// Bytes to reserve for all layers.
    pub size: u64,
    /// Distance between consecutive layers.
    pub layer_size: u64,
    pub layer_count: u32,
    /// CPU row pitch of plane 0 in pixels; 0 if not CPU-addressable.
    pub pixel_stride: u32,
    plane_count: u8,
    planes: [PlaneLayout; MAX_PLANES],
}

impl BufferLayout {
    /// Planes in address order.
    #[inline]
    pub fn planes(&self) -> &[PlaneLayout] {
        &self.planes[..self.plane_count as usize]
    }

    #[inline]
    pub fn plane_count(&self) -> usize {
        self.plane_count as usize
    }

    /// Replicate a single-layer layout `layer_count` times.
    ///
    /// Each layer must start where every consumer can address it: 4 KiB for
    /// block compression with tiled headers, 128 bytes without, unaligned
    /// for everything else.
    pub fn with_layers(
        mut self,
        layer_count: u32,
        decision: &EncodingDecision,
    ) -> Result<Self, LayoutError> {
        if layer_count == 0 {
            return Err(LayoutError::InvalidDimensions);
        }
        if layer_count == 1 {
            return Ok(self);
        }

        let single = self.layer_size;
        let aligned = match decision {
            EncodingDecision::BlockCompressed(bc) if bc.tiled_headers => align_up(single, 4096),
            EncodingDecision::BlockCompressed(_) => align_up(single, 128),
            _ => single,
        };

        self.layer_size = aligned;
        self.layer_count = layer_count;
        self.size = aligned
            .checked_mul(layer_count as u64)
            .ok_or(LayoutError::InvalidDimensions)?;
        Ok(self)
    }
}

/// Header/body buffer alignment for block compression.
#[inline]
pub const fn afbc_buffer_alignment(tiled_headers: bool) -> u64 {
    if tiled_headers {
        4 * AFBC_BODY_BUFFER_ALIGNMENT
    } else {
        AFBC_BODY_BUFFER_ALIGNMENT
    }
}

/// Single-layer layout for a validated encoding decision.
///
/// `has_cpu_usage` adds the CPU stride alignment; `has_hw_usage` adds the
/// hardware stride alignment. Only overflow of the byte arithmetic can fail.
pub fn compute_layout(
    width: u32,
    height: u32,
    decision: &EncodingDecision,
    attrs: &FormatAttributes,
    has_cpu_usage: bool,
    has_hw_usage: bool,
) -> Result<BufferLayout, LayoutError> {
    let plane_count = attrs.plane_count as usize;
    let mut planes = [PlaneLayout::default(); MAX_PLANES];
    let mut size: u64 = 0;

    for plane in 0..plane_count {
        let (w, h) = plane_dimensions(width, height, decision, attrs, plane, has_cpu_usage);
        log::trace!("plane[{plane}]: aligned {w}x{h}");

        let byte_stride = match decision {
            EncodingDecision::FixedRateCompressed(fr) => afrc_stride(fr, plane, w),
            EncodingDecision::BlockCompressed(_) => {
                let bits = w * attrs.bpp_afbc[plane] as u64;
                debug_assert_eq!(bits % 8, 0);
                bits / 8
            }
            EncodingDecision::TileLinear => {
                block_linear_stride(attrs, plane, planes[0].alloc_width as u64, w)
            }
            EncodingDecision::Uncompressed => uncompressed_stride(
                attrs,
                plane,
                w,
                planes[0].byte_stride,
                has_cpu_usage,
                has_hw_usage,
            ),
        };
        log::trace!("plane[{plane}]: byte stride {byte_stride}");

        let bpp = attrs.bpp[plane] as u64;
        let pixel_stride = if decision.is_uncompressed() && has_cpu_usage && bpp > 0 {
            debug_assert_eq!((byte_stride * 8) % bpp, 0);
            u32::try_from(byte_stride * 8 / bpp).map_err(|_| LayoutError::InvalidDimensions)?
        } else {
            0
        };

        let sb_count =
            w.checked_mul(h).ok_or(LayoutError::InvalidDimensions)? / AFBC_PIXELS_PER_BLOCK;
        let (body_size, header_size) = match decision {
            EncodingDecision::BlockCompressed(bc) => {
                afbc_sizes(bc, attrs, plane, sb_count).ok_or(LayoutError::InvalidDimensions)?
            }
            EncodingDecision::FixedRateCompressed(fr) => {
                let cu = fr.coding_unit_for_plane(plane);
                size = align_up(size, cu.plane_alignment() as u64);
                let clump = fr.clumps[plane];
                let units = (w / clump.width as u64) * (h / clump.height as u64);
                let body = units
                    .checked_mul(cu.bytes() as u64)
                    .ok_or(LayoutError::InvalidDimensions)?;
                (body, 0)
            }
            EncodingDecision::TileLinear => {
                let luma_height = if plane == 0 { h } else { planes[0].alloc_height as u64 };
                let rows = luma_height / BLOCK_LINEAR_TILE;
                let body = byte_stride
                    .checked_mul(rows)
                    .ok_or(LayoutError::InvalidDimensions)?;
                (body, 0)
            }
            EncodingDecision::Uncompressed => {
                let body = byte_stride
                    .checked_mul(h)
                    .ok_or(LayoutError::InvalidDimensions)?;
                (body, 0)
            }
        };
        log::trace!("plane[{plane}]: body {body_size}, header {header_size}");

        planes[plane] = PlaneLayout {
            offset: size,
            byte_stride,
            alloc_width: u32::try_from(w).map_err(|_| LayoutError::InvalidDimensions)?,
            alloc_height: u32::try_from(h).map_err(|_| LayoutError::InvalidDimensions)?,
            pixel_stride,
            header_size,
            body_size,
        };

        size = size
            .checked_add(body_size + header_size)
            .ok_or(LayoutError::InvalidDimensions)?;
    }
    log::trace!("layout size {size}");

    Ok(BufferLayout {
        size,
        layer_size: size,
        layer_count: 1,
        pixel_stride: planes[0].pixel_stride,
        plane_count: attrs.plane_count,
        planes,
    })
}

/// Allocation dimensions of `plane`, in pixels.
fn plane_dimensions(
    width: u32,
    height: u32,
    decision: &EncodingDecision,
    attrs: &FormatAttributes,
    plane: usize,
    has_cpu_usage: bool,
) -> (u64, u64) {
    // Whole samples for every channel first, then subsample chroma.
    let mut w = align_up(width as u64, attrs.align_w as u64);
    let mut h = align_up(height as u64, attrs.align_h as u64);
    if plane > 0 {
        w /= attrs.hsub as u64;
        h /= attrs.vsub as u64;
    }

    let (align_w, align_h) = match decision {
        EncodingDecision::BlockCompressed(bc) => afbc_pixel_alignment(bc, attrs, plane),
        EncodingDecision::FixedRateCompressed(fr) => {
            let clump = fr.clumps[plane];
            (
                (fr.paging_tile_width * clump.width) as u64,
                (fr.paging_tile_height * clump.height) as u64,
            )
        }
        EncodingDecision::TileLinear => (BLOCK_LINEAR_TILE, BLOCK_LINEAR_TILE),
        EncodingDecision::Uncompressed if has_cpu_usage => (attrs.align_w_cpu as u64, 1),
        EncodingDecision::Uncompressed => (1, 1),
    };

    let tile = attrs.tile_size as u64;
    (
        align_up(w, align_w.max(tile).max(1)),
        align_up(h, align_h.max(tile).max(1)),
    )
}

fn afbc_pixel_alignment(
    bc: &BlockCompressed,
    attrs: &FormatAttributes,
    plane: usize,
) -> (u64, u64) {
    let sb = bc.superblock_for_plane(plane);
    let (sb_w, sb_h) = (sb.width() as u64, sb.height() as u64);

    // Four superblocks across = one 64-byte header row.
    let padded_w = if bc.padded && !attrs.is_yuv { 4 * sb_w } else { 0 };

    // A header tile holds 8×8 superblocks, 4×4 above 32 bpp.
    let (tile_w, tile_h) = if bc.tiled_headers {
        let n = if attrs.bpp_afbc[plane] > 32 { 4 } else { 8 };
        (n * sb_w, n * sb_h)
    } else {
        (sb_w, sb_h)
    };

    let mut align_h = tile_h;
    if bc.superblock == SuperblockSize::Wide && !bc.tiled_headers {
        // Hardware reads and writes 32×16 for untiled wide blocks.
        align_h = align_h.max(16);
    }
    (padded_w.max(tile_w), align_h)
}

fn afbc_sizes(
    bc: &BlockCompressed,
    attrs: &FormatAttributes,
    plane: usize,
    sb_count: u64,
) -> Option<(u64, u64)> {
    let sb = bc.superblock_for_plane(plane);
    let buffer_align = afbc_buffer_alignment(bc.tiled_headers);

    let sb_bits = attrs.bpp_afbc[plane] as u64 * sb.width() as u64 * sb.height() as u64;
    let sb_bytes = align_up(sb_bits / 8, 128);
    let mut body = sb_count.checked_mul(sb_bytes)?;

    // Separate plane buffers: the next plane's header must stay aligned.
    if attrs.plane_count > 1 && plane + 1 < attrs.plane_count as usize {
        body = align_up(body, buffer_align);
    }

    if bc.frontbuffer_safe {
        let back = align_up(body, buffer_align);
        body = body.checked_add(back)?;
    }

    let header = align_up(sb_count.checked_mul(AFBC_HEADER_BYTES_PER_BLOCK)?, buffer_align);
    Some((body, header))
}

fn afrc_stride(fr: &FixedRateCompressed, plane: usize, w: u64) -> u64 {
    let clump = fr.clumps[plane];
    let paging_tiles = w / clump.width as u64 / fr.paging_tile_width as u64;
    let cu_bytes = fr.coding_unit_for_plane(plane).bytes() as u64;
    paging_tiles * AFRC_CODING_UNITS_PER_PAGING_TILE * cu_bytes
}

/// One row of 16×16 tiles. Chroma tiles shrink with subsampling but the
/// tile count always follows plane 0.
fn block_linear_stride(attrs: &FormatAttributes, plane: usize, luma_width: u64, w: u64) -> u64 {
    debug_assert_eq!((w * attrs.bpp[plane] as u64) % 8, 0);
    let (mut sample_w, mut sample_h) = (BLOCK_LINEAR_TILE, BLOCK_LINEAR_TILE);
    if plane > 0 {
        sample_w /= attrs.hsub as u64;
        sample_h /= attrs.vsub as u64;
    }
    let bytes_per_block = sample_w * sample_h * attrs.bpp[plane] as u64 / 8;
    let tiles_across = if plane == 0 { w } else { luma_width } / BLOCK_LINEAR_TILE;
    tiles_across * bytes_per_block
}

fn uncompressed_stride(
    attrs: &FormatAttributes,
    plane: usize,
    w: u64,
    luma_stride: u64,
    has_cpu_usage: bool,
    has_hw_usage: bool,
) -> u64 {
    let bpp = attrs.bpp[plane] as u64;
    debug_assert_eq!((w * bpp) % 8, 0);
    let mut stride = w * bpp / 8;

    let hw_align = match (has_hw_usage, attrs.is_yuv) {
        (false, _) => 0,
        (true, true) => 128,
        (true, false) => 64,
    };
    let cpu_align = if has_cpu_usage {
        debug_assert_eq!((bpp * attrs.align_w_cpu as u64) % 8, 0);
        bpp * attrs.align_w_cpu as u64 / 8
    } else {
        0
    };

    let stride_align = lcm(hw_align, cpu_align);
    if stride_align != 0 {
        let tile = attrs.tile_size as u64;
        stride = align_up(stride * tile, stride_align) / tile;
    }

    // Chroma stride is exactly half the luma stride, so luma must be
    // aligned to twice the combined alignment for the halves to stay aligned.
    if attrs.has_half_chroma_stride() && has_hw_usage && has_cpu_usage {
        if plane == 0 {
            stride = align_up(stride, 2 * stride_align);
        } else {
            stride = luma_stride / 2;
            debug_assert_eq!(stride % stride_align, 0);
            debug_assert_eq!(stride % 16, 0);
        }
    }
    stride
}
