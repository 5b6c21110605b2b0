//! Reserving memory for a derived layout.
//!
//! The engine never owns device memory. A [`DeviceMemory`] provider hands out
//! byte buffers of the requested size; [`allocate`] derives the layout, asks
//! the provider for the bytes, and initializes block-compression headers.

use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::caps::Capabilities;
use crate::format::FormatCatalog;
use crate::headers::{BlockHeaderLayout, write_block_headers};
use crate::request::{BufferRequest, DerivedBuffer, derive_buffer};
use crate::usage::Usage;
use crate::LayoutError;

/// Source of buffer memory.
pub trait DeviceMemory {
    type Buffer: AsMut<[u8]>;
    type Error;

    /// Reserve `size` zeroed bytes for a buffer with `usage`.
    fn reserve(&mut self, size: u64, usage: Usage) -> Result<Self::Buffer, Self::Error>;
}

/// Heap-backed provider for CPU-only use and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemMemory {
    limit: Option<u64>,
}

impl SystemMemory {
    pub const fn new() -> Self {
        Self { limit: None }
    }

    /// Refuse any single reservation larger than `bytes`.
    pub const fn with_limit(bytes: u64) -> Self {
        Self { limit: Some(bytes) }
    }
}

/// [`SystemMemory`] could not satisfy a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutOfMemory {
    pub requested: u64,
}

impl fmt::Display for OutOfMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot reserve {} bytes", self.requested)
    }
}

impl core::error::Error for OutOfMemory {}

impl DeviceMemory for SystemMemory {
    type Buffer = Vec<u8>;
    type Error = OutOfMemory;

    fn reserve(&mut self, size: u64, _usage: Usage) -> Result<Vec<u8>, OutOfMemory> {
        let err = OutOfMemory { requested: size };
        if self.limit.is_some_and(|limit| size > limit) {
            return Err(err);
        }
        let len = usize::try_from(size).map_err(|_| err)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| err)?;
        buf.resize(len, 0);
        Ok(buf)
    }
}

/// Why [`allocate`] failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocateError<E> {
    /// The request could not be laid out; nothing was reserved.
    Layout(LayoutError),
    /// The provider refused the reservation.
    Memory(E),
}

impl<E> From<LayoutError> for AllocateError<E> {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl<E: fmt::Display> fmt::Display for AllocateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "layout: {err}"),
            Self::Memory(err) => write!(f, "memory: {err}"),
        }
    }
}

impl<E: core::error::Error + 'static> core::error::Error for AllocateError<E> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Layout(err) => Some(err),
            Self::Memory(err) => Some(err),
        }
    }
}

/// A reserved, initialized buffer.
#[derive(Debug)]
pub struct Allocation<B> {
    pub buffer: B,
    pub derived: DerivedBuffer,
    /// Unique within this process.
    pub backing_store_id: u64,
}

static NEXT_BACKING_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Derive the layout for `request`, reserve it from `memory`, and write the
/// initial block-compression headers of every layer.
pub fn allocate<M: DeviceMemory>(
    request: &BufferRequest,
    caps: &Capabilities,
    catalog: &FormatCatalog<'_>,
    memory: &mut M,
) -> Result<Allocation<M::Buffer>, AllocateError<M::Error>> {
    let derived = derive_buffer(request, caps, catalog)?;
    let layout = &derived.layout;

    let mut buffer = memory
        .reserve(layout.size, request.usage)
        .map_err(AllocateError::Memory)?;

    let bytes = buffer.as_mut();
    if (bytes.len() as u64) < layout.size {
        return Err(LayoutError::BufferTooSmall.into());
    }

    if let Some(desc) = BlockHeaderLayout::new(layout, &derived.decision, &derived.attrs) {
        for layer in 0..layout.layer_count as u64 {
            let start = usize::try_from(layer * layout.layer_size)
                .map_err(|_| LayoutError::BufferTooSmall)?;
            let dst = bytes.get_mut(start..).ok_or(LayoutError::BufferTooSmall)?;
            write_block_headers(dst, &desc)?;
        }
    }

    let backing_store_id = NEXT_BACKING_STORE_ID.fetch_add(1, Ordering::Relaxed);
    log::debug!(
        "allocated {:?} {}x{} x{}: {} bytes, id {backing_store_id}",
        derived.attrs.id,
        request.width,
        request.height,
        layout.layer_count,
        layout.size
    );

    Ok(Allocation {
        buffer,
        derived,
        backing_store_id,
    })
}
