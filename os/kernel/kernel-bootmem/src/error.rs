//! Error types of the block allocator.

use kernel_memory_addresses::PhysicalAddress;

/// Failure to serve [`allocate`](crate::BlockAllocator::allocate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("invalid block count {count}; expected 1..=32")]
    InvalidArgument { count: u32 },
    #[error("out of memory: no free run of {count} block(s) aligned to {alignment} block(s)")]
    OutOfMemory { count: u32, alignment: u32 },
    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// Failure to serve [`free`](crate::BlockAllocator::free). No bitmap is modified.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FreeError {
    #[error("invalid block count {count}; expected 1..=32")]
    InvalidArgument { count: u32 },
    #[error("invalid free of {count} block(s) at {address}: {reason}")]
    InvalidFree {
        address: PhysicalAddress,
        count: u32,
        reason: InvalidFreeReason,
    },
    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// Why a free was refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidFreeReason {
    #[error("no region owns the address")]
    Unowned,
    #[error("address is not on a block boundary")]
    Unaligned,
    #[error("run would cross a bitmap word")]
    SpansWords,
    #[error("run extends past the end of the region")]
    PastRegionEnd,
}

/// Why a memory-map entry did not become a region.
///
/// Every variant except [`CarveError::NotAvailable`] leaves the entry marked
/// reserved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CarveError {
    #[error("entry is not available memory")]
    NotAvailable,
    #[error("entry lies entirely below the low-memory cutoff")]
    BelowLowMemory,
    #[error("entry lies entirely inside the kernel image")]
    InsideKernelImage,
    #[error("page alignment consumed the entire entry")]
    ConsumedByAlignment,
    #[error("entry starts beyond the addressable region base")]
    BeyondAddressable,
    #[error("entry is too small to hold a single block and its metadata")]
    TooSmall,
    #[error("mapped window is not aligned for the region bitmap")]
    MisalignedWindow,
}

/// Access to the process-wide allocator slot failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("block allocator is not initialized")]
    Uninitialized,
    #[error("block allocator is already initialized")]
    AlreadyInitialized,
    #[error("block allocator is in use")]
    Busy,
}
