//! Requests: choosing the internal format word, then deriving the full
//! layout in one call.

use crate::caps::{Capabilities, FormatCaps};
use crate::encoding::{self, EncodingDecision};
use crate::format::{FormatAttributes, FormatCatalog, FormatId, InternalFormat, ext};
use crate::geometry::{self, BufferLayout};
use crate::usage::Usage;
use crate::wire::{self, WireDescriptor};
use crate::LayoutError;

/// Platform HAL pixel-format ids that have no catalog entry of their own.
pub mod hal {
    /// Pick whatever suits the usage.
    pub const IMPLEMENTATION_DEFINED: u32 = 0x22;
    /// Any 4:2:0 YCbCr layout.
    pub const YCBCR_420_888: u32 = 0x23;
    /// Alias of the catalog P010 format.
    pub const YCBCR_P010: u32 = 0x36;
}

/// How the requested format value is to be read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FormatType {
    /// A complete [`InternalFormat`] word, used verbatim.
    Internal,
    /// A HAL pixel-format id; encoding is negotiated from usage and caps.
    #[default]
    Hal,
}

/// One buffer request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferRequest {
    pub format: u64,
    pub format_type: FormatType,
    pub width: u32,
    pub height: u32,
    /// Producer and consumer usage combined.
    pub usage: Usage,
    pub layer_count: u32,
}

impl BufferRequest {
    /// A request for an explicit internal format word.
    pub const fn internal(format: InternalFormat, width: u32, height: u32) -> Self {
        Self {
            format: format.0,
            format_type: FormatType::Internal,
            width,
            height,
            usage: Usage::empty(),
            layer_count: 1,
        }
    }

    /// A request for a HAL pixel-format id.
    pub const fn hal(format: u32, width: u32, height: u32) -> Self {
        Self {
            format: format as u64,
            format_type: FormatType::Hal,
            width,
            height,
            usage: Usage::empty(),
            layer_count: 1,
        }
    }

    /// Add producer or consumer usage.
    #[must_use]
    pub const fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = self.usage.union(usage);
        self
    }

    #[must_use]
    pub const fn with_layers(mut self, layer_count: u32) -> Self {
        self.layer_count = layer_count;
        self
    }
}

/// Choose the internal format word for a requested format.
///
/// [`FormatType::Internal`] words are taken as-is once their base is known
/// to `catalog`. [`FormatType::Hal`] ids are mapped to a catalog base and
/// block compression is negotiated against `caps`.
pub fn select_format(
    requested: u64,
    format_type: FormatType,
    usage: Usage,
    caps: &Capabilities,
    catalog: &FormatCatalog<'_>,
) -> Result<InternalFormat, LayoutError> {
    match format_type {
        FormatType::Internal => {
            let word = InternalFormat(requested);
            catalog.lookup_raw(word.base())?;
            Ok(word)
        }
        FormatType::Hal => {
            let raw = u32::try_from(requested).map_err(|_| LayoutError::UnrecognizedFormat)?;
            let id = hal_base_format(raw, usage)?;
            let attrs = catalog.lookup(id)?;

            let supported = caps.supported_for(usage);
            if supported.contains(FormatCaps::OPTIONS_PRESENT)
                && !pixel_format_supported(id, supported)
            {
                return Err(LayoutError::UnrecognizedFormat);
            }

            let bits = negotiate_afbc(attrs, usage, supported);
            let word = InternalFormat::from(id).with(bits);
            log::debug!("{raw:#x} with usage {usage:?} -> {id:?} ({:#x})", word.ext());
            Ok(word)
        }
    }
}

fn hal_base_format(raw: u32, usage: Usage) -> Result<FormatId, LayoutError> {
    match raw {
        hal::IMPLEMENTATION_DEFINED => {
            let video = Usage::VIDEO_ENCODER | Usage::CAMERA_OUTPUT | Usage::CAMERA_INPUT;
            Ok(if usage.intersects(video) { FormatId::Nv12 } else { FormatId::Rgba8888 })
        }
        hal::YCBCR_420_888 => Ok(FormatId::Nv12),
        hal::YCBCR_P010 => Ok(FormatId::P010),
        _ => FormatId::from_raw(raw).ok_or(LayoutError::UnrecognizedFormat),
    }
}

fn pixel_format_supported(id: FormatId, caps: FormatCaps) -> bool {
    match id {
        FormatId::Rgba1010102 => caps.contains(FormatCaps::PIXFMT_RGBA1010102),
        FormatId::Rgba16161616 => caps.contains(FormatCaps::PIXFMT_RGBA16161616),
        _ => true,
    }
}

/// Block-compression bits every block involved in `usage` can handle.
fn negotiate_afbc(attrs: &FormatAttributes, usage: Usage, caps: FormatCaps) -> u64 {
    if usage.has_cpu_access()
        || usage.intersects(Usage::NO_AFBC | Usage::FRONT_BUFFER)
        || !attrs.afbc
        || attrs.plane_count > 1
        || !caps.contains(FormatCaps::OPTIONS_PRESENT | FormatCaps::AFBC_BASIC)
    {
        return 0;
    }

    if attrs.is_yuv {
        let writes = usage.intersects(
            Usage::GPU_RENDER_TARGET | Usage::VIDEO_DECODER | Usage::CAMERA_OUTPUT,
        );
        let reads = usage.intersects(
            Usage::GPU_TEXTURE
                | Usage::COMPOSER_OVERLAY
                | Usage::COMPOSER_CLIENT_TARGET
                | Usage::VIDEO_ENCODER
                | Usage::CAMERA_INPUT,
        );
        if (writes && !caps.contains(FormatCaps::AFBC_YUV_WRITE))
            || (reads && !caps.contains(FormatCaps::AFBC_YUV_READ))
        {
            return 0;
        }
    }

    let mut bits = ext::AFBC_BASIC;
    if caps.contains(FormatCaps::AFBC_SPLITBLK) && !attrs.is_yuv {
        bits |= ext::AFBC_SPLITBLK;
    }
    if caps.contains(FormatCaps::AFBC_TILED_HEADERS) {
        bits |= ext::AFBC_TILED_HEADERS;
    }
    if !attrs.is_yuv && attrs.components[0] >= 3 {
        bits |= ext::AFBC_YUV_TRANSFORM;
    }
    bits
}

/// Everything derived for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DerivedBuffer {
    /// Base format plus the encoding bits actually used.
    pub alloc_format: InternalFormat,
    /// Catalog row of the base format.
    pub attrs: FormatAttributes,
    pub decision: EncodingDecision,
    pub layout: BufferLayout,
}

impl DerivedBuffer {
    pub fn wire_descriptor(&self) -> WireDescriptor {
        wire::to_wire_descriptor(self.attrs.id, &self.decision)
    }
}

/// Select, validate and lay out one request.
///
/// Fails before computing any geometry if the format, encoding or
/// dimensions are unusable; the only late failure is size overflow.
pub fn derive_buffer(
    request: &BufferRequest,
    caps: &Capabilities,
    catalog: &FormatCatalog<'_>,
) -> Result<DerivedBuffer, LayoutError> {
    if request.layer_count == 0 {
        return Err(LayoutError::InvalidDimensions);
    }

    let alloc_format = select_format(
        request.format,
        request.format_type,
        request.usage,
        caps,
        catalog,
    )?;
    let attrs = catalog.lookup_raw(alloc_format.base())?;

    let decision = encoding::select(alloc_format, request.usage, attrs)?;
    encoding::validate(&decision, attrs, request.width, request.height)?;

    let layout = geometry::compute_layout(
        request.width,
        request.height,
        &decision,
        attrs,
        request.usage.has_cpu_access(),
        request.usage.has_hardware_access(),
    )?
    .with_layers(request.layer_count, &decision)?;

    Ok(DerivedBuffer {
        alloc_format,
        attrs: *attrs,
        decision,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Fourcc;

    const AFBC_GPU: FormatCaps = FormatCaps::OPTIONS_PRESENT
        .union(FormatCaps::AFBC_BASIC)
        .union(FormatCaps::AFBC_SPLITBLK)
        .union(FormatCaps::AFBC_TILED_HEADERS)
        .union(FormatCaps::AFBC_YUV_READ)
        .union(FormatCaps::AFBC_YUV_WRITE);

    fn gpu_caps() -> Capabilities {
        Capabilities::default().with_gpu(AFBC_GPU)
    }

    fn select_hal(
        raw: u32,
        usage: Usage,
        caps: &Capabilities,
    ) -> Result<InternalFormat, LayoutError> {
        select_format(raw as u64, FormatType::Hal, usage, caps, FormatCatalog::builtin())
    }

    #[test]
    fn internal_word_is_verbatim() {
        let word = InternalFormat::from(FormatId::Nv12).with(ext::BLOCK_LINEAR_BASIC);
        let got = select_format(
            word.0,
            FormatType::Internal,
            Usage::GPU_TEXTURE,
            &gpu_caps(),
            FormatCatalog::builtin(),
        );
        assert_eq!(got, Ok(word));
    }

    #[test]
    fn unknown_ids_are_unrecognized() {
        let caps = Capabilities::default();
        assert_eq!(
            select_hal(0x7777, Usage::GPU_TEXTURE, &caps),
            Err(LayoutError::UnrecognizedFormat)
        );
        let got = select_format(
            0xDEAD,
            FormatType::Internal,
            Usage::empty(),
            &caps,
            FormatCatalog::builtin(),
        );
        assert_eq!(got, Err(LayoutError::UnrecognizedFormat));
        let catalog = FormatCatalog::builtin();
        let too_wide = select_format(1 << 40, FormatType::Hal, Usage::empty(), &caps, catalog);
        assert_eq!(too_wide, Err(LayoutError::UnrecognizedFormat));
    }

    #[test]
    fn implementation_defined_follows_usage() {
        let caps = Capabilities::default();
        let video = select_hal(hal::IMPLEMENTATION_DEFINED, Usage::VIDEO_ENCODER, &caps).unwrap();
        assert_eq!(video.format_id(), Some(FormatId::Nv12));
        let gpu = select_hal(hal::IMPLEMENTATION_DEFINED, Usage::GPU_TEXTURE, &caps).unwrap();
        assert_eq!(gpu.format_id(), Some(FormatId::Rgba8888));
        let p010 = select_hal(hal::YCBCR_P010, Usage::empty(), &caps).unwrap();
        assert_eq!(p010.format_id(), Some(FormatId::P010));
    }

    #[test]
    fn gpu_only_rgba_negotiates_afbc() {
        let word = select_hal(FormatId::Rgba8888 as u32, Usage::GPU_TEXTURE, &gpu_caps()).unwrap();
        assert!(word.is_afbc());
        assert!(
            word.contains(ext::AFBC_SPLITBLK | ext::AFBC_TILED_HEADERS | ext::AFBC_YUV_TRANSFORM)
        );
    }

    #[test]
    fn afbc_needs_every_block() {
        let usage = Usage::GPU_TEXTURE | Usage::COMPOSER_OVERLAY;
        let word = select_hal(FormatId::Rgba8888 as u32, usage, &gpu_caps()).unwrap();
        assert_eq!(word.ext(), 0);

        let caps = gpu_caps().with_dpu(FormatCaps::OPTIONS_PRESENT | FormatCaps::AFBC_BASIC);
        let word = select_hal(FormatId::Rgba8888 as u32, usage, &caps).unwrap();
        assert!(word.is_afbc());
        assert!(!word.contains(ext::AFBC_TILED_HEADERS));
    }

    #[test]
    fn afbc_vetoes() {
        let caps = gpu_caps();
        for usage in [
            Usage::GPU_TEXTURE | Usage::CPU_WRITE_OFTEN,
            Usage::GPU_TEXTURE | Usage::NO_AFBC,
            Usage::GPU_TEXTURE | Usage::FRONT_BUFFER,
        ] {
            let word = select_hal(FormatId::Rgba8888 as u32, usage, &caps).unwrap();
            assert_eq!(word.ext(), 0, "{usage:?}");
        }
        // Multi-plane and unsupported formats stay uncompressed.
        let nv12 = select_hal(FormatId::Nv12 as u32, Usage::GPU_TEXTURE, &caps).unwrap();
        assert_eq!(nv12.ext(), 0);
        let bgra = select_hal(FormatId::Bgra8888 as u32, Usage::GPU_TEXTURE, &caps).unwrap();
        assert_eq!(bgra.ext(), 0);
    }

    #[test]
    fn yuv_afbc_needs_yuv_caps() {
        let id = FormatId::Yuv420_8BitI as u32;
        let word = select_hal(id, Usage::GPU_TEXTURE, &gpu_caps()).unwrap();
        assert!(word.is_afbc());
        assert!(!word.contains(ext::AFBC_SPLITBLK));
        assert!(!word.contains(ext::AFBC_YUV_TRANSFORM));

        let read_only =
            Capabilities::default().with_gpu(AFBC_GPU.difference(FormatCaps::AFBC_YUV_WRITE));
        let word = select_hal(id, Usage::GPU_RENDER_TARGET, &read_only).unwrap();
        assert_eq!(word.ext(), 0);
    }

    #[test]
    fn reported_caps_gate_wide_formats() {
        let caps = gpu_caps();
        assert_eq!(
            select_hal(FormatId::Rgba1010102 as u32, Usage::GPU_TEXTURE, &caps),
            Err(LayoutError::UnrecognizedFormat)
        );
        // The CPU reports both wide formats by default.
        let cpu = select_hal(FormatId::Rgba1010102 as u32, Usage::CPU_READ_OFTEN, &caps).unwrap();
        assert_eq!(cpu.format_id(), Some(FormatId::Rgba1010102));
        // Blocks that report nothing impose nothing.
        let silent = Capabilities::default();
        assert!(select_hal(FormatId::Rgba1010102 as u32, Usage::GPU_TEXTURE, &silent).is_ok());
    }

    #[test]
    fn derive_hal_request_end_to_end() {
        let request =
            BufferRequest::hal(FormatId::Rgba8888 as u32, 64, 64).with_usage(Usage::GPU_TEXTURE);
        let derived = derive_buffer(&request, &gpu_caps(), FormatCatalog::builtin()).unwrap();
        assert!(matches!(
            derived.decision,
            EncodingDecision::BlockCompressed(bc) if bc.tiled_headers
        ));
        // 128×128 after header-tile alignment: 4 KiB of headers, 64 KiB of body.
        assert_eq!(derived.layout.size, 4096 + 65_536);
        assert_eq!(derived.wire_descriptor().fourcc, Fourcc::ABGR8888);
    }

    #[test]
    fn derive_rejects_zero_layers_and_dimensions() {
        let caps = Capabilities::default();
        let base = BufferRequest::internal(FormatId::Rgba8888.into(), 16, 16);
        let catalog = FormatCatalog::builtin();
        assert_eq!(
            derive_buffer(&base.with_layers(0), &caps, catalog),
            Err(LayoutError::InvalidDimensions)
        );
        let zero_width = BufferRequest { width: 0, ..base };
        assert_eq!(derive_buffer(&zero_width, &caps, catalog), Err(LayoutError::InvalidDimensions));
    }

    #[test]
    fn derive_applies_layers() {
        let request = BufferRequest::internal(FormatId::Rgba8888.into(), 3, 3).with_layers(6);
        let caps = Capabilities::default();
        let derived = derive_buffer(&request, &caps, FormatCatalog::builtin()).unwrap();
        assert_eq!(derived.layout.layer_size, 36);
        assert_eq!(derived.layout.size, 216);
        assert_eq!(derived.layout.layer_count, 6);
    }

    #[test]
    fn derive_rejects_blob_rows() {
        let request = BufferRequest::internal(FormatId::Blob.into(), 4096, 2)
            .with_usage(Usage::CPU_READ_OFTEN);
        let got = derive_buffer(&request, &Capabilities::default(), FormatCatalog::builtin());
        assert_eq!(got, Err(LayoutError::InvalidDimensions));
    }
}
