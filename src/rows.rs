//! Typed pixel rows over the CPU-visible planes of a buffer.
//!
//! Rows are borrowed from the caller's bytes and trimmed to the allocated
//! width, so the stride padding between them is never exposed.

use rgb::Rgba;

use crate::LayoutError;
use crate::format::FormatId;
use crate::request::DerivedBuffer;

/// Byte range and shape of one plane of one layer.
pub(crate) struct PlaneSpan {
    pub start: usize,
    pub len: usize,
    pub row_bytes: usize,
    pub height: usize,
    pub stride: usize,
}

impl PlaneSpan {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

pub(crate) fn plane_span(
    derived: &DerivedBuffer,
    layer: u32,
    plane: usize,
) -> Result<PlaneSpan, LayoutError> {
    if !derived.decision.is_uncompressed() {
        return Err(LayoutError::UnsupportedFormatForEncoding);
    }
    let layout = &derived.layout;
    if layer >= layout.layer_count {
        return Err(LayoutError::InvalidDimensions);
    }
    let p = layout.planes().get(plane).ok_or(LayoutError::InvalidDimensions)?;
    let bits_per_pixel = derived.attrs.bpp[plane];

    let to_usize = |v: u64| usize::try_from(v).map_err(|_| LayoutError::BufferTooSmall);
    let start = to_usize(layer as u64 * layout.layer_size + p.offset)?;
    let row_bytes = to_usize(p.alloc_width as u64 * bits_per_pixel as u64 / 8)?;
    let stride = to_usize(p.byte_stride)?;
    let height = p.alloc_height as usize;
    if row_bytes > stride {
        return Err(LayoutError::InvalidDimensions);
    }

    // The last row only needs to reach its own width.
    let len = stride * height.saturating_sub(1) + row_bytes;
    Ok(PlaneSpan {
        start,
        len,
        row_bytes,
        height,
        stride,
    })
}

/// Span of plane 0 for the 8-bit RGBA layouts.
pub(crate) fn rgba_span(derived: &DerivedBuffer, layer: u32) -> Result<PlaneSpan, LayoutError> {
    if !matches!(derived.attrs.id, FormatId::Rgba8888 | FormatId::Rgbx8888) {
        return Err(LayoutError::UnrecognizedFormat);
    }
    let span = plane_span(derived, layer, 0)?;
    debug_assert_eq!(span.stride % 4, 0);
    Ok(span)
}

/// Rows of an RGBA_8888 or RGBX_8888 layer, top to bottom.
pub fn rgba_rows<'a>(
    buffer: &'a [u8],
    derived: &DerivedBuffer,
    layer: u32,
) -> Result<impl Iterator<Item = &'a [Rgba<u8>]> + use<'a>, LayoutError> {
    let span = rgba_span(derived, layer)?;
    let bytes = buffer
        .get(span.start..span.end())
        .ok_or(LayoutError::BufferTooSmall)?;
    let pixels: &[Rgba<u8>] =
        bytemuck::try_cast_slice(bytes).map_err(|_| LayoutError::BufferTooSmall)?;
    let width = span.row_bytes / 4;
    Ok(pixels
        .chunks(span.stride / 4)
        .take(span.height)
        .map(move |row| &row[..width]))
}

/// Mutable form of [`rgba_rows`].
pub fn rgba_rows_mut<'a>(
    buffer: &'a mut [u8],
    derived: &DerivedBuffer,
    layer: u32,
) -> Result<impl Iterator<Item = &'a mut [Rgba<u8>]> + use<'a>, LayoutError> {
    let span = rgba_span(derived, layer)?;
    let bytes = buffer
        .get_mut(span.start..span.end())
        .ok_or(LayoutError::BufferTooSmall)?;
    let pixels: &mut [Rgba<u8>] =
        bytemuck::try_cast_slice_mut(bytes).map_err(|_| LayoutError::BufferTooSmall)?;
    let width = span.row_bytes / 4;
    Ok(pixels
        .chunks_mut(span.stride / 4)
        .take(span.height)
        .map(move |row| &mut row[..width]))
}
