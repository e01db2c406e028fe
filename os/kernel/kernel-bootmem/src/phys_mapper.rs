//! # Physical Memory Windows
//!
//! The block allocator keeps its bookkeeping *inside* the memory it manages,
//! so carving a region means writing to physical memory. Code can only
//! dereference virtual addresses, which is what a [`PhysMapper`] provides: a
//! writable byte window for a physical range in the current address space.
//!
//! The mapping strategy differs between boot stages and tests:
//! - **Early boot** (Multiboot hands over with paging off or identity mapped):
//!   [`OffsetPhysMapper::identity`].
//! - **Kernel** with a direct map at a fixed virtual offset:
//!   [`OffsetPhysMapper::new`].
//! - **Host tests**: an [`OffsetPhysMapper`] over a heap buffer standing in
//!   for RAM.

use core::ptr::with_exposed_provenance_mut;
use core::slice;
use kernel_memory_addresses::PhysicalAddress;

/// Converts physical ranges to usable byte windows in the current address space.
pub trait PhysMapper {
    /// Borrow `len` bytes of physical memory starting at `pa`.
    ///
    /// # Safety
    /// - `[pa, pa + len)` must be mapped writable in the current address space
    ///   for all of `'a`.
    /// - Nothing else may read or write the range while the window is alive;
    ///   the caller takes exclusive ownership of it.
    unsafe fn phys_to_slice<'a>(&self, pa: PhysicalAddress, len: usize) -> &'a mut [u8];
}

/// [`PhysMapper`] that translates by a constant offset.
///
/// `OffsetPhysMapper::new(phys, virt)` makes `phys` appear at `virt` and
/// every other physical address at the same distance.
#[derive(Debug, Copy, Clone)]
pub struct OffsetPhysMapper {
    offset: usize,
}

impl OffsetPhysMapper {
    /// Physical addresses are usable as-is.
    #[must_use]
    pub const fn identity() -> Self {
        Self { offset: 0 }
    }

    /// Place physical address `phys_base` at `virt_base`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(phys_base: PhysicalAddress, virt_base: *mut u8) -> Self {
        let virt = virt_base.expose_provenance();
        Self {
            offset: virt.wrapping_sub(phys_base.as_u64() as usize),
        }
    }

    /// Virtual address at which `pa` appears.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn translate(&self, pa: PhysicalAddress) -> usize {
        (pa.as_u64() as usize).wrapping_add(self.offset)
    }
}

impl PhysMapper for OffsetPhysMapper {
    unsafe fn phys_to_slice<'a>(&self, pa: PhysicalAddress, len: usize) -> &'a mut [u8] {
        let va = self.translate(pa);
        // SAFETY: Caller guarantees the translated window is valid and exclusively owned.
        unsafe { slice::from_raw_parts_mut(with_exposed_provenance_mut::<u8>(va), len) }
    }
}
