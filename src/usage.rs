//! Producer / consumer usage bits.

bitflags::bitflags! {
    /// Combined producer and consumer usage of a buffer.
    ///
    /// Bit positions follow the platform buffer-usage ABI so that raw masks
    /// from callers can be passed through [`Usage::from_bits_retain`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Usage: u64 {
        const CPU_READ_RARELY = 0x2;
        const CPU_READ_OFTEN = 0x3;
        const CPU_READ_MASK = 0xF;
        const CPU_WRITE_RARELY = 0x20;
        const CPU_WRITE_OFTEN = 0x30;
        const CPU_WRITE_MASK = 0xF0;

        const GPU_TEXTURE = 1 << 8;
        const GPU_RENDER_TARGET = 1 << 9;
        const COMPOSER_OVERLAY = 1 << 11;
        const COMPOSER_CLIENT_TARGET = 1 << 12;
        const PROTECTED = 1 << 14;
        const CURSOR = 1 << 15;
        const VIDEO_ENCODER = 1 << 16;
        const CAMERA_OUTPUT = 1 << 17;
        const CAMERA_INPUT = 1 << 18;
        const RENDERSCRIPT = 1 << 20;
        const VIDEO_DECODER = 1 << 22;
        const SENSOR_DIRECT_DATA = 1 << 23;
        const GPU_DATA_BUFFER = 1 << 24;

        /// Allocator-private: never pick block compression.
        const NO_AFBC = 1 << 29;
        /// Allocator-private: pad block-compressed rows to 4 superblocks.
        const AFBC_PADDING = 1 << 30;
        const PRIVATE_MASK = 0xFFFF_0000_F000_0000;

        const FRONT_BUFFER = 1 << 32;
    }
}

impl Usage {
    /// Any CPU read or write usage.
    #[inline]
    pub fn has_cpu_access(self) -> bool {
        self.intersects(Self::CPU_READ_MASK | Self::CPU_WRITE_MASK)
    }

    /// Any usage other than CPU access and allocator-private bits.
    #[inline]
    pub fn has_hardware_access(self) -> bool {
        !self
            .difference(Self::PRIVATE_MASK | Self::CPU_READ_MASK | Self::CPU_WRITE_MASK)
            .is_empty()
    }
}
