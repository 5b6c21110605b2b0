//! Per-hardware-block format capabilities.
//!
//! The caller queries its hardware once and hands the resulting
//! [`Capabilities`] snapshot to every request. Nothing here is global or
//! lazily initialized; refreshing the snapshot is the caller's business.

use crate::usage::Usage;

bitflags::bitflags! {
    /// Encodings and pixel formats one hardware block can produce or consume.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FormatCaps: u64 {
        /// The block reported capabilities at all.
        const OPTIONS_PRESENT = 1 << 0;
        const AFBC_BASIC = 1 << 1;
        const AFBC_SPLITBLK = 1 << 2;
        const AFBC_WIDEBLK = 1 << 3;
        const AFBC_TILED_HEADERS = 1 << 4;
        const AFBC_EXTRAWIDEBLK = 1 << 5;
        const AFBC_MULTIPLANE_READ = 1 << 6;
        const AFBC_DOUBLE_BODY = 1 << 7;
        const AFBC_BCH = 1 << 8;
        const AFBC_YUV_READ = 1 << 9;
        const AFBC_YUV_WRITE = 1 << 10;
        const AFRC = 1 << 11;
        const BLOCK_LINEAR = 1 << 12;

        const PIXFMT_RGBA1010102 = 1 << 32;
        const PIXFMT_RGBA16161616 = 1 << 33;
    }
}

/// Capability snapshot for every hardware block that may touch a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub cpu: FormatCaps,
    pub gpu: FormatCaps,
    /// Display processor.
    pub dpu: FormatCaps,
    /// Display processor block encoder, used for the composition target.
    pub dpu_aeu: FormatCaps,
    /// Video encoder and decoder.
    pub vpu: FormatCaps,
    pub camera: FormatCaps,
}

impl Default for Capabilities {
    /// The CPU handles the wide RGBA formats; no hardware block reports anything.
    fn default() -> Self {
        Self {
            cpu: FormatCaps::OPTIONS_PRESENT
                | FormatCaps::PIXFMT_RGBA1010102
                | FormatCaps::PIXFMT_RGBA16161616,
            gpu: FormatCaps::empty(),
            dpu: FormatCaps::empty(),
            dpu_aeu: FormatCaps::empty(),
            vpu: FormatCaps::empty(),
            camera: FormatCaps::empty(),
        }
    }
}

impl Capabilities {
    pub const fn with_gpu(mut self, caps: FormatCaps) -> Self {
        self.gpu = caps;
        self
    }

    pub const fn with_dpu(mut self, caps: FormatCaps) -> Self {
        self.dpu = caps;
        self
    }

    pub const fn with_dpu_aeu(mut self, caps: FormatCaps) -> Self {
        self.dpu_aeu = caps;
        self
    }

    pub const fn with_vpu(mut self, caps: FormatCaps) -> Self {
        self.vpu = caps;
        self
    }

    pub const fn with_camera(mut self, caps: FormatCaps) -> Self {
        self.camera = caps;
        self
    }

    /// Capabilities shared by every block `usage` involves.
    ///
    /// Empty when the usage involves no block at all, so an unused buffer
    /// never negotiates compression.
    pub fn supported_for(&self, usage: Usage) -> FormatCaps {
        let blocks = [
            (usage.has_cpu_access(), self.cpu),
            (
                usage.intersects(
                    Usage::GPU_TEXTURE
                        | Usage::GPU_RENDER_TARGET
                        | Usage::GPU_DATA_BUFFER
                        | Usage::RENDERSCRIPT,
                ),
                self.gpu,
            ),
            (
                usage.intersects(
                    Usage::COMPOSER_OVERLAY | Usage::COMPOSER_CLIENT_TARGET | Usage::CURSOR,
                ),
                self.dpu,
            ),
            (usage.contains(Usage::COMPOSER_CLIENT_TARGET), self.dpu_aeu),
            (usage.intersects(Usage::VIDEO_ENCODER | Usage::VIDEO_DECODER), self.vpu),
            (usage.intersects(Usage::CAMERA_INPUT | Usage::CAMERA_OUTPUT), self.camera),
        ];

        let mut involved = false;
        let mut caps = FormatCaps::all();
        for (used, block) in blocks {
            if used {
                involved = true;
                caps &= block;
            }
        }
        if involved { caps } else { FormatCaps::empty() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AFBC_FULL: FormatCaps = FormatCaps::OPTIONS_PRESENT
        .union(FormatCaps::AFBC_BASIC)
        .union(FormatCaps::AFBC_SPLITBLK)
        .union(FormatCaps::AFBC_TILED_HEADERS);

    #[test]
    fn no_usage_means_no_caps() {
        let caps = Capabilities::default().with_gpu(AFBC_FULL);
        assert!(caps.supported_for(Usage::empty()).is_empty());
    }

    #[test]
    fn single_block_passes_through() {
        let caps = Capabilities::default().with_gpu(AFBC_FULL);
        assert_eq!(caps.supported_for(Usage::GPU_TEXTURE), AFBC_FULL);
    }

    #[test]
    fn blocks_intersect() {
        let caps = Capabilities::default()
            .with_gpu(AFBC_FULL)
            .with_dpu(FormatCaps::OPTIONS_PRESENT | FormatCaps::AFBC_BASIC);
        let both = caps.supported_for(Usage::GPU_RENDER_TARGET | Usage::COMPOSER_OVERLAY);
        assert_eq!(both, FormatCaps::OPTIONS_PRESENT | FormatCaps::AFBC_BASIC);
    }

    #[test]
    fn cpu_access_strips_compression() {
        let caps = Capabilities::default().with_gpu(AFBC_FULL);
        let mixed = caps.supported_for(Usage::GPU_TEXTURE | Usage::CPU_READ_OFTEN);
        assert!(!mixed.contains(FormatCaps::AFBC_BASIC));
        assert!(mixed.contains(FormatCaps::OPTIONS_PRESENT));
    }

    #[test]
    fn client_target_needs_block_encoder() {
        let caps = Capabilities::default().with_dpu(AFBC_FULL);
        let target = caps.supported_for(Usage::COMPOSER_CLIENT_TARGET);
        assert!(target.is_empty());

        let caps = caps.with_dpu_aeu(AFBC_FULL);
        assert_eq!(caps.supported_for(Usage::COMPOSER_CLIENT_TARGET), AFBC_FULL);
    }
}
