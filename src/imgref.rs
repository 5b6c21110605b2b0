//! Strided [`imgref`] views over the CPU-visible planes of a buffer.
//!
//! Views borrow the caller's bytes; nothing is copied. Only uncompressed
//! layouts have a CPU-addressable pixel grid.
//!
//! ```rust
//! use tailor::{BufferRequest, Capabilities, FormatCatalog, FormatId, SystemMemory, Usage};
//! use rgb::Rgba;
//!
//! let request = BufferRequest::internal(FormatId::Rgba8888.into(), 10, 4)
//!     .with_usage(Usage::CPU_WRITE_OFTEN | Usage::GPU_TEXTURE);
//! let mut alloc = tailor::allocate(
//!     &request,
//!     &Capabilities::default(),
//!     FormatCatalog::builtin(),
//!     &mut SystemMemory::new(),
//! )
//! .unwrap();
//!
//! let mut img = tailor::imgref::rgba_view_mut(&mut alloc.buffer, &alloc.derived, 0).unwrap();
//! assert_eq!(img.stride(), 16);
//! img[(9usize, 3usize)] = Rgba::new(1, 2, 3, 4);
//! ```

use imgref::{ImgRef, ImgRefMut};
use rgb::Rgba;

use crate::LayoutError;
use crate::request::DerivedBuffer;
use crate::rows::{plane_span, rgba_span};

// ---------------------------------------------------------------------------
// Byte views
// ---------------------------------------------------------------------------

/// Bytes of `plane` in `layer`, one row per pixel row.
///
/// Row width comes from the bits per pixel in `derived.attrs`.
pub fn plane_view<'a>(
    buffer: &'a [u8],
    derived: &DerivedBuffer,
    layer: u32,
    plane: usize,
) -> Result<ImgRef<'a, u8>, LayoutError> {
    let span = plane_span(derived, layer, plane)?;
    let bytes = buffer
        .get(span.start..span.start + span.len)
        .ok_or(LayoutError::BufferTooSmall)?;
    Ok(ImgRef::new_stride(bytes, span.row_bytes, span.height, span.stride))
}

/// Mutable form of [`plane_view`].
pub fn plane_view_mut<'a>(
    buffer: &'a mut [u8],
    derived: &DerivedBuffer,
    layer: u32,
    plane: usize,
) -> Result<ImgRefMut<'a, u8>, LayoutError> {
    let span = plane_span(derived, layer, plane)?;
    let bytes = buffer
        .get_mut(span.start..span.start + span.len)
        .ok_or(LayoutError::BufferTooSmall)?;
    Ok(ImgRefMut::new_stride(bytes, span.row_bytes, span.height, span.stride))
}

// ---------------------------------------------------------------------------
// Typed RGBA views
// ---------------------------------------------------------------------------

/// Pixels of an RGBA_8888 or RGBX_8888 layer.
pub fn rgba_view<'a>(
    buffer: &'a [u8],
    derived: &DerivedBuffer,
    layer: u32,
) -> Result<ImgRef<'a, Rgba<u8>>, LayoutError> {
    let span = rgba_span(derived, layer)?;
    let bytes = buffer
        .get(span.start..span.start + span.len)
        .ok_or(LayoutError::BufferTooSmall)?;
    let pixels: &[Rgba<u8>] =
        bytemuck::try_cast_slice(bytes).map_err(|_| LayoutError::BufferTooSmall)?;
    Ok(ImgRef::new_stride(pixels, span.row_bytes / 4, span.height, span.stride / 4))
}

/// Mutable form of [`rgba_view`].
pub fn rgba_view_mut<'a>(
    buffer: &'a mut [u8],
    derived: &DerivedBuffer,
    layer: u32,
) -> Result<ImgRefMut<'a, Rgba<u8>>, LayoutError> {
    let span = rgba_span(derived, layer)?;
    let bytes = buffer
        .get_mut(span.start..span.start + span.len)
        .ok_or(LayoutError::BufferTooSmall)?;
    let pixels: &mut [Rgba<u8>] =
        bytemuck::try_cast_slice_mut(bytes).map_err(|_| LayoutError::BufferTooSmall)?;
    Ok(ImgRefMut::new_stride(pixels, span.row_bytes / 4, span.height, span.stride / 4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatCatalog, FormatId, InternalFormat, ext};
    use crate::request::{BufferRequest, derive_buffer};
    use crate::usage::Usage;
    use crate::{Capabilities, SystemMemory, allocate};

    const CPU_HW: Usage = Usage::CPU_WRITE_OFTEN.union(Usage::GPU_TEXTURE);

    fn derive(request: &BufferRequest) -> DerivedBuffer {
        derive_buffer(request, &Capabilities::default(), FormatCatalog::builtin()).unwrap()
    }

    #[test]
    fn rgba_rows_honour_stride() {
        let request = BufferRequest::internal(FormatId::Rgba8888.into(), 10, 3).with_usage(CPU_HW);
        let mut a = allocate(
            &request,
            &Capabilities::default(),
            FormatCatalog::builtin(),
            &mut SystemMemory::new(),
        )
        .unwrap();
        assert_eq!(a.derived.layout.planes()[0].byte_stride, 64);

        let mut img = rgba_view_mut(&mut a.buffer, &a.derived, 0).unwrap();
        assert_eq!((img.width(), img.height(), img.stride()), (10, 3, 16));
        img[(0usize, 1usize)] = Rgba::new(1, 2, 3, 4);

        assert_eq!(&a.buffer[64..68], &[1, 2, 3, 4]);
        let view = rgba_view(&a.buffer, &a.derived, 0).unwrap();
        assert_eq!(view[(0usize, 1usize)], Rgba::new(1, 2, 3, 4));
    }

    #[test]
    fn chroma_plane_starts_at_offset() {
        let request = BufferRequest::internal(FormatId::Nv12.into(), 16, 8).with_usage(CPU_HW);
        let catalog = FormatCatalog::builtin();
        let mut a = allocate(&request, &Capabilities::default(), catalog, &mut SystemMemory::new())
            .unwrap();
        let uv = a.derived.layout.planes()[1];

        let mut img = plane_view_mut(&mut a.buffer, &a.derived, 0, 1).unwrap();
        assert_eq!((img.width(), img.height()), (32, 4));
        img[(0usize, 0usize)] = 0x80;
        assert_eq!(a.buffer[uv.offset as usize], 0x80);
    }

    #[test]
    fn plane_views_never_exceed_the_stride() {
        let request = BufferRequest::internal(FormatId::Rgba8888.into(), 4, 4);
        let mut derived = derive(&request);
        let buf = [0u8; 64];
        let view = plane_view(&buf, &derived, 0, 0).unwrap();
        assert_eq!((view.width(), view.stride()), (16, 16));

        derived.attrs.bpp[0] = 64;
        assert_eq!(plane_view(&buf, &derived, 0, 0).unwrap_err(), LayoutError::InvalidDimensions);
        assert_eq!(plane_view(&buf, &derived, 0, 1).unwrap_err(), LayoutError::InvalidDimensions);
    }

    #[test]
    fn layers_are_addressable() {
        let request = BufferRequest::internal(FormatId::Rgba8888.into(), 2, 2).with_layers(3);
        let derived = derive(&request);
        let mut buf = [0u8; 48];
        buf[32] = 9;
        let view = rgba_view(&buf, &derived, 2).unwrap();
        assert_eq!(view[(0usize, 0usize)].r, 9);
        assert_eq!(rgba_view(&buf, &derived, 3).unwrap_err(), LayoutError::InvalidDimensions);
    }

    #[test]
    fn compressed_and_short_buffers_are_rejected() {
        let word = InternalFormat::from(FormatId::Rgba8888).with(ext::AFBC_BASIC);
        let request = BufferRequest::internal(word, 16, 16).with_usage(Usage::GPU_TEXTURE);
        let derived = derive(&request);
        let buf = [0u8; 2048];
        assert_eq!(
            rgba_view(&buf, &derived, 0).unwrap_err(),
            LayoutError::UnsupportedFormatForEncoding
        );

        let request = BufferRequest::internal(FormatId::Rgba8888.into(), 4, 4);
        let derived = derive(&request);
        assert_eq!(rgba_view(&buf[..63], &derived, 0).unwrap_err(), LayoutError::BufferTooSmall);
    }

    #[test]
    fn typed_view_needs_rgba() {
        let request = BufferRequest::internal(FormatId::Bgra8888.into(), 4, 4);
        let derived = derive(&request);
        let buf = [0u8; 64];
        assert_eq!(rgba_view(&buf, &derived, 0).unwrap_err(), LayoutError::UnrecognizedFormat);
    }
}
