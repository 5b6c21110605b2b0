//! Initial superblock headers for block-compressed buffers.
//!
//! A freshly reserved block-compressed buffer must start with one valid
//! 16-byte header per superblock of plane 0, or the first consumer to read it
//! sees garbage. Untiled headers point every superblock at the start of the
//! body; tiled headers for non-subsampled layouts are all zero.

use bytemuck::{Pod, Zeroable};

use crate::encoding::EncodingDecision;
use crate::format::FormatAttributes;
use crate::geometry::{
    AFBC_HEADER_BYTES_PER_BLOCK, AFBC_PIXELS_PER_BLOCK, BufferLayout, afbc_buffer_alignment,
};
use crate::{LayoutError, align_up};

/// One superblock header, stored as little-endian words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
struct BlockHeader {
    words: [u32; 4],
}

impl BlockHeader {
    fn from_words(words: [u32; 4]) -> Self {
        Self { words: words.map(u32::to_le) }
    }
}

/// What [`write_block_headers`] needs to know about plane 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockHeaderLayout {
    /// Allocated width of plane 0 in pixels.
    pub width: u32,
    /// Allocated height of plane 0 in pixels.
    pub height: u32,
    pub tiled_headers: bool,
    /// Chroma is subsampled inside each superblock (single-plane 4:2:0).
    pub subsampled: bool,
}

impl BlockHeaderLayout {
    /// Header description for a computed layout, or `None` if the buffer is
    /// not block-compressed.
    pub fn new(
        layout: &BufferLayout,
        decision: &EncodingDecision,
        attrs: &FormatAttributes,
    ) -> Option<Self> {
        let EncodingDecision::BlockCompressed(bc) = decision else {
            return None;
        };
        let plane = layout.planes().first()?;
        Some(Self {
            width: plane.alloc_width,
            height: plane.alloc_height,
            tiled_headers: bc.tiled_headers,
            // Separate planes each carry their own unsubsampled headers.
            subsampled: attrs.is_subsampled_yuv() && layout.plane_count() == 1,
        })
    }

    pub fn header_count(&self) -> u64 {
        self.width as u64 * self.height as u64 / AFBC_PIXELS_PER_BLOCK
    }

    /// Bytes written by [`write_block_headers`].
    pub fn header_bytes(&self) -> u64 {
        self.header_count() * AFBC_HEADER_BYTES_PER_BLOCK
    }

    /// Offset of the body from the first header.
    pub fn body_offset(&self) -> u64 {
        align_up(self.header_bytes(), afbc_buffer_alignment(self.tiled_headers))
    }

    fn pattern(&self) -> Result<BlockHeader, LayoutError> {
        if self.tiled_headers && !self.subsampled {
            return Ok(BlockHeader::zeroed());
        }
        // The body offset is stored in a 32-bit header word.
        let body =
            u32::try_from(self.body_offset()).map_err(|_| LayoutError::InvalidDimensions)?;
        Ok(if self.subsampled {
            BlockHeader::from_words([
                body.wrapping_add(1 << 28),
                0x8020_0040,
                0x0100_4000,
                0x0002_0080,
            ])
        } else {
            BlockHeader::from_words([body, 0x1, 0x1_0000, 0x0])
        })
    }
}

/// Fill the header area at the start of `dst`.
///
/// Returns the number of bytes written. Fails with
/// [`LayoutError::InvalidDimensions`] if the body offset does not fit a
/// header word, or [`LayoutError::BufferTooSmall`] if `dst` cannot hold
/// every header. Bytes past the header area are not touched.
pub fn write_block_headers(dst: &mut [u8], desc: &BlockHeaderLayout) -> Result<usize, LayoutError> {
    let header = desc.pattern()?;
    let len = usize::try_from(desc.header_bytes()).map_err(|_| LayoutError::BufferTooSmall)?;
    let area = dst.get_mut(..len).ok_or(LayoutError::BufferTooSmall)?;

    let bytes = bytemuck::bytes_of(&header);
    for chunk in area.chunks_exact_mut(bytes.len()) {
        chunk.copy_from_slice(bytes);
    }
    log::trace!(
        "wrote {} block headers ({}x{}, tiled={}, subsampled={})",
        desc.header_count(),
        desc.width,
        desc.height,
        desc.tiled_headers,
        desc.subsampled
    );
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn word(bytes: &[u8], index: usize) -> u32 {
        let at = index * 4;
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn untiled_headers_point_at_body() {
        let desc = BlockHeaderLayout {
            width: 64,
            height: 64,
            tiled_headers: false,
            subsampled: false,
        };
        assert_eq!(desc.header_count(), 16);
        assert_eq!(desc.body_offset(), 1024);

        let mut buf = vec![0xAAu8; 512];
        assert_eq!(write_block_headers(&mut buf, &desc), Ok(256));
        for h in 0..16 {
            let at = &buf[h * 16..h * 16 + 16];
            assert_eq!([word(at, 0), word(at, 1), word(at, 2), word(at, 3)], [1024, 1, 0x10000, 0]);
        }
        assert!(buf[256..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn tiled_rgb_headers_are_zero() {
        let desc = BlockHeaderLayout {
            width: 128,
            height: 128,
            tiled_headers: true,
            subsampled: false,
        };
        assert_eq!(desc.body_offset(), 4096);
        let mut buf = vec![0xFFu8; 1024];
        assert_eq!(write_block_headers(&mut buf, &desc), Ok(1024));
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn subsampled_pattern_even_when_tiled() {
        let desc = BlockHeaderLayout {
            width: 128,
            height: 128,
            tiled_headers: true,
            subsampled: true,
        };
        let mut buf = vec![0u8; 1024];
        write_block_headers(&mut buf, &desc).unwrap();
        let last = &buf[1008..];
        assert_eq!(word(last, 0), 4096 + (1 << 28));
        assert_eq!(word(last, 1), 0x8020_0040);
        assert_eq!(word(last, 2), 0x0100_4000);
        assert_eq!(word(last, 3), 0x0002_0080);
    }

    #[test]
    fn short_destination_is_rejected() {
        let desc = BlockHeaderLayout {
            width: 64,
            height: 64,
            tiled_headers: false,
            subsampled: false,
        };
        let mut buf = vec![0u8; 255];
        assert_eq!(write_block_headers(&mut buf, &desc), Err(LayoutError::BufferTooSmall));
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn body_offset_past_header_word_is_rejected() {
        let huge = BlockHeaderLayout {
            width: 1 << 18,
            height: 1 << 18,
            tiled_headers: false,
            subsampled: false,
        };
        assert_eq!(huge.body_offset(), 1 << 32);
        assert_eq!(write_block_headers(&mut [], &huge), Err(LayoutError::InvalidDimensions));

        let subsampled = BlockHeaderLayout { subsampled: true, tiled_headers: true, ..huge };
        assert_eq!(
            write_block_headers(&mut [], &subsampled),
            Err(LayoutError::InvalidDimensions)
        );

        // Tiled RGB headers carry no offset.
        let tiled = BlockHeaderLayout { tiled_headers: true, ..huge };
        assert_eq!(write_block_headers(&mut [], &tiled), Err(LayoutError::BufferTooSmall));
    }

    #[test]
    fn only_block_compressed_layouts_have_headers() {
        use crate::format::{FormatCatalog, FormatId};
        use crate::geometry::compute_layout;

        let attrs = FormatCatalog::builtin().lookup(FormatId::Rgba8888).unwrap();
        let decision = EncodingDecision::Uncompressed;
        let layout = compute_layout(64, 64, &decision, attrs, false, false).unwrap();
        assert_eq!(BlockHeaderLayout::new(&layout, &decision, attrs), None);
    }
}
