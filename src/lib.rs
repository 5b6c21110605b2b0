//! # tailor
//!
//! *Measure twice, cut once.*
//!
//! Works out how a hardware image buffer is cut from device memory: which
//! physical encoding the hardware will use (uncompressed, block-compressed,
//! fixed-rate-compressed or 16×16 tile-linear), the per-plane strides,
//! offsets and padding that keep every producer and consumer happy, and the
//! total number of bytes to reserve. The same decision also yields a portable
//! wire descriptor (fourcc + 64-bit modifier) for software that only ever
//! sees the finished buffer.
//!
//! Everything here is a pure function of its inputs and the immutable
//! [`FormatCatalog`]; nothing is cached and nothing is shared mutably, so
//! requests can be served from any number of threads.
//!
//! ```rust
//! use tailor::{BufferRequest, Capabilities, FormatCatalog, FormatId, Usage};
//!
//! let request = BufferRequest::internal(FormatId::Rgba8888.into(), 100, 50)
//!     .with_usage(Usage::CPU_READ_OFTEN | Usage::GPU_TEXTURE);
//! let buffer = tailor::derive_buffer(&request, &Capabilities::default(), FormatCatalog::builtin())
//!     .unwrap();
//!
//! assert_eq!(buffer.layout.planes()[0].byte_stride, 448);
//! assert_eq!(buffer.layout.pixel_stride, 112);
//! assert_eq!(buffer.layout.size, 448 * 50);
//! ```
//!
//! ## Pipeline
//!
//! - [`select_format`] turns a requested format and usage into an
//!   [`InternalFormat`] word (base format plus encoding bits).
//! - [`encoding::select`] decodes those bits once into an
//!   [`EncodingDecision`]; [`encoding::validate`] checks it against the
//!   catalog entry.
//! - [`geometry::compute_layout`] produces the [`BufferLayout`].
//! - [`wire::to_wire_descriptor`] maps the decision to a [`WireDescriptor`].
//!
//! ## Feature flags
//!
//! - **`std`** (default): forwards to `log/std`.
//! - **`rgb`**: typed [`rgb`] pixel rows over CPU-visible planes (`rows`).
//! - **`imgref`**: strided [`imgref`] views over CPU-visible planes.
//!   Implies `rgb`.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use core::fmt;

pub mod allocate;
pub mod caps;
pub mod encoding;
pub mod format;
pub mod geometry;
pub mod headers;
pub mod request;
pub mod usage;
pub mod wire;

#[cfg(feature = "imgref")]
pub mod imgref;
#[cfg(feature = "rgb")]
pub mod rows;

pub use allocate::{Allocation, AllocateError, DeviceMemory, SystemMemory, allocate};
pub use caps::{Capabilities, FormatCaps};
pub use encoding::{EncodingDecision, EncodingFamily};
pub use format::{FormatAttributes, FormatCatalog, FormatId, InternalFormat};
pub use geometry::{BufferLayout, PlaneLayout};
pub use headers::{BlockHeaderLayout, write_block_headers};
pub use request::{BufferRequest, DerivedBuffer, FormatType, derive_buffer, select_format};
pub use usage::Usage;
pub use wire::{Fourcc, WireDescriptor};

/// Maximum number of planes any catalog format may have.
pub const MAX_PLANES: usize = 3;

/// Why a buffer layout could not be produced.
///
/// Every failure is detected up front, before any geometry is computed;
/// there is never a partial result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum LayoutError {
    /// The format id is not in the catalog, or the usage leaves no base format.
    UnrecognizedFormat,
    /// The catalog says this format cannot use the requested encoding family.
    UnsupportedFormatForEncoding,
    /// The encoding bits describe a layout the hardware cannot address.
    InvalidEncodingCombination,
    /// A fixed-rate coding-unit field decodes to an unsupported size.
    InvalidCodingUnitSize,
    /// A format-specific dimension rule is violated, or the size overflows.
    InvalidDimensions,
    /// A destination or source span is shorter than the layout requires.
    BufferTooSmall,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedFormat => f.write_str("unrecognized or unsupported format"),
            Self::UnsupportedFormatForEncoding => {
                f.write_str("format does not support the requested encoding")
            }
            Self::InvalidEncodingCombination => {
                f.write_str("invalid combination of encoding flags")
            }
            Self::InvalidCodingUnitSize => f.write_str("invalid fixed-rate coding unit size"),
            Self::InvalidDimensions => f.write_str("dimensions not valid for format"),
            Self::BufferTooSmall => f.write_str("buffer too small for layout"),
        }
    }
}

impl core::error::Error for LayoutError {}

/// Round `value` up to a multiple of `align`. An alignment of 0 or 1 is a no-op.
#[inline]
pub(crate) const fn align_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        value
    } else {
        value.div_ceil(align) * align
    }
}

#[inline]
pub(crate) const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Least common multiple; if either side is 0 the other one wins.
#[inline]
pub(crate) const fn lcm(a: u64, b: u64) -> u64 {
    if a != 0 && b != 0 {
        (a * b) / gcd(a, b)
    } else if a > b {
        a
    } else {
        b
    }
}
