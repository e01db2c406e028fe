//! # Process-wide Block Allocator
//!
//! The kernel sets up one [`BlockAllocator`] early in boot and reaches it
//! from everywhere afterwards. It lives in a [`SyncOnceCell`] written by
//! [`init_block_allocator`] and sits behind a [`SpinMutex`].
//!
//! Access never waits. The lock is only ever tried, so a second caller while
//! the allocator is in use (for example a nested call from inside
//! [`with_block_allocator`]) gets [`SlotError::Busy`] rather than spinning
//! forever on a single core.

use crate::block_alloc::{AllocatorStats, BlockAllocator};
use crate::error::{AllocError, FreeError, SlotError};
use crate::phys_mapper::PhysMapper;
use crate::registry::RegionRegistry;
use kernel_info::boot::{KernelImage, MemoryMapEntry};
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::{SpinMutex, SyncOnceCell};

static BLOCK_ALLOCATOR: SyncOnceCell<SpinMutex<BlockAllocator<'static>>> = SyncOnceCell::new();

/// Build the boot regions from `entries` and install the process-wide allocator.
///
/// Logs the resulting regions and returns their totals.
///
/// # Errors
/// [`SlotError::AlreadyInitialized`] on every call after the first; nothing
/// is carved in that case.
///
/// # Safety
/// Same contract as [`RegionRegistry::build`], with the memory handed over
/// for the rest of the kernel's life.
pub unsafe fn init_block_allocator<M: PhysMapper + ?Sized>(
    entries: &mut [MemoryMapEntry],
    kernel: &KernelImage,
    mapper: &M,
) -> Result<AllocatorStats, SlotError> {
    let installed = BLOCK_ALLOCATOR
        .try_init(|| {
            // SAFETY: forwarded to the caller.
            let registry = unsafe { RegionRegistry::build(entries, kernel, mapper) };
            let allocator = BlockAllocator::new(registry);
            allocator.log_regions();
            SpinMutex::new(allocator)
        })
        .ok_or(SlotError::AlreadyInitialized)?;

    installed
        .try_with_lock(|allocator| allocator.stats())
        .ok_or(SlotError::Busy)
}

/// [`BlockAllocator::allocate`] on the process-wide allocator.
///
/// # Errors
/// As [`BlockAllocator::allocate`], plus [`AllocError::Slot`].
pub fn allocate_blocks(count: u32, alignment: u32) -> Result<PhysicalAddress, AllocError> {
    with_block_allocator(|allocator| allocator.allocate(count, alignment))?
}

/// [`BlockAllocator::free`] on the process-wide allocator.
///
/// # Errors
/// As [`BlockAllocator::free`], plus [`FreeError::Slot`].
pub fn free_blocks(address: PhysicalAddress, count: u32) -> Result<(), FreeError> {
    with_block_allocator(|allocator| allocator.free(address, count))?
}

/// Run `f` with exclusive access to the process-wide allocator.
///
/// # Errors
/// - [`SlotError::Uninitialized`] until [`init_block_allocator`] has finished.
/// - [`SlotError::Busy`] when the lock is held, e.g. when called from inside `f`.
pub fn with_block_allocator<R>(
    f: impl FnOnce(&mut BlockAllocator<'static>) -> R,
) -> Result<R, SlotError> {
    let allocator = BLOCK_ALLOCATOR.get().ok_or(SlotError::Uninitialized)?;
    allocator.try_with_lock(f).ok_or(SlotError::Busy)
}
