//! # Block Allocator
//!
//! First-fit allocation of short runs of 1 KiB blocks over a
//! [`RegionRegistry`].
//!
//! ## Allocation
//! Regions are tried in chain order. Inside a region the bitmap is scanned
//! from its search cursor; inside a word, a run of `count` clear bits is
//! accepted if its first block index (relative to the region base) is a
//! multiple of `alignment`. Runs never cross a word, so at most
//! [`MAX_RUN_BLOCKS`] blocks can be handed out at once.
//!
//! ## Cursor
//! The first word that still has a free bit becomes the region's search
//! cursor, and the cursor never moves back. A block freed below the cursor
//! is therefore never handed out by that region again.
//!
//! ```rust
//! # use kernel_bootmem::{BlockAllocator, RegionRegistry};
//! # use kernel_bootmem::phys_mapper::OffsetPhysMapper;
//! # use kernel_info::boot::{KernelImage, MemoryMapEntry};
//! # use kernel_memory_addresses::PhysicalAddress;
//! #[repr(C, align(4096))]
//! struct Page([u8; 4096]);
//!
//! let mut ram = vec![Page([0; 4096]), Page([0; 4096])];
//! let mapper = OffsetPhysMapper::new(PhysicalAddress::new(0x20_0000), ram.as_mut_ptr().cast());
//! let kernel = KernelImage::new(PhysicalAddress::new(0x10_0000), PhysicalAddress::new(0x18_0000));
//! let mut map = [MemoryMapEntry::available(0x20_0000, 0x2000)];
//!
//! let registry = unsafe { RegionRegistry::build(&mut map, &kernel, &mapper) };
//! let mut blocks = BlockAllocator::new(registry);
//!
//! let a = blocks.allocate(2, 1).unwrap();
//! assert_eq!(a, PhysicalAddress::new(0x20_0000));
//! blocks.free(a, 2).unwrap();
//! ```

use crate::error::{AllocError, FreeError, InvalidFreeReason};
use crate::registry::RegionRegistry;
use kernel_info::memory::{BITMAP_WORD_BITS, BLOCK_SIZE, MAX_RUN_BLOCKS};
use kernel_memory_addresses::PhysicalAddress;
use log::{info, trace, warn};

/// Totals over every region of a [`BlockAllocator`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub regions: usize,
    pub total_blocks: u64,
    pub free_blocks: u64,
}

impl AllocatorStats {
    #[inline]
    #[must_use]
    pub const fn used_blocks(&self) -> u64 {
        self.total_blocks - self.free_blocks
    }

    #[inline]
    #[must_use]
    pub const fn free_bytes(&self) -> u64 {
        self.free_blocks * BLOCK_SIZE
    }
}

/// Hands out and takes back runs of blocks from the boot regions.
#[derive(Debug)]
pub struct BlockAllocator<'m> {
    registry: RegionRegistry<'m>,
}

impl<'m> BlockAllocator<'m> {
    #[must_use]
    pub const fn new(registry: RegionRegistry<'m>) -> Self {
        Self { registry }
    }

    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &RegionRegistry<'m> {
        &self.registry
    }

    /// Allocate `count` contiguous blocks whose first block index within its
    /// region is a multiple of `alignment` (0 is treated as 1).
    ///
    /// # Errors
    /// - [`AllocError::InvalidArgument`] unless `1 <= count <= 32`.
    /// - [`AllocError::OutOfMemory`] if no region has a fitting run.
    pub fn allocate(&mut self, count: u32, alignment: u32) -> Result<PhysicalAddress, AllocError> {
        self.try_allocate(count, alignment.max(1))
            .inspect(|address| trace!("allocated {count} block(s) at {address}"))
            .inspect_err(|err| warn!("block allocation failed: {err}"))
    }

    fn try_allocate(&mut self, count: u32, alignment: u32) -> Result<PhysicalAddress, AllocError> {
        if !(1..=MAX_RUN_BLOCKS).contains(&count) {
            return Err(AllocError::InvalidArgument { count });
        }

        let mut cursor = self.registry.root();
        while let Some(id) = cursor {
            let Some(region) = self.registry.get_mut(id) else {
                break;
            };

            if let Some(block) = region.find_run(count, alignment) {
                region.set_run(block, count);
                return Ok(region.block_address(block));
            }

            cursor = region.next();
        }

        Err(AllocError::OutOfMemory { count, alignment })
    }

    /// Return `count` blocks starting at `address` to their region.
    ///
    /// Nothing is modified if the request is refused. Freeing blocks that are
    /// already free is not detected.
    ///
    /// # Errors
    /// - [`FreeError::InvalidArgument`] unless `1 <= count <= 32`.
    /// - [`FreeError::InvalidFree`] if no region owns `address`, `address` is
    ///   not on a block boundary, or the run would cross a bitmap word or the
    ///   end of the region.
    /// - An `address` inside a block is refused with
    ///   [`InvalidFreeReason::Unaligned`], not rounded down to the block start.
    pub fn free(&mut self, address: PhysicalAddress, count: u32) -> Result<(), FreeError> {
        self.try_free(address, count)
            .inspect(|()| trace!("freed {count} block(s) at {address}"))
            .inspect_err(|err| warn!("block free refused: {err}"))
    }

    fn try_free(&mut self, address: PhysicalAddress, count: u32) -> Result<(), FreeError> {
        if !(1..=MAX_RUN_BLOCKS).contains(&count) {
            return Err(FreeError::InvalidArgument { count });
        }

        let invalid = |reason| FreeError::InvalidFree {
            address,
            count,
            reason,
        };

        let region = self
            .registry
            .owner_of(address)
            .and_then(|id| self.registry.get_mut(id))
            .ok_or(invalid(InvalidFreeReason::Unowned))?;

        let offset = address
            .offset_from(region.base())
            .ok_or(invalid(InvalidFreeReason::Unowned))?;
        if !offset.is_multiple_of(BLOCK_SIZE) {
            return Err(invalid(InvalidFreeReason::Unaligned));
        }

        let block =
            u32::try_from(offset / BLOCK_SIZE).map_err(|_| invalid(InvalidFreeReason::Unowned))?;
        if block % BITMAP_WORD_BITS + count > BITMAP_WORD_BITS {
            return Err(invalid(InvalidFreeReason::SpansWords));
        }
        if u64::from(block) + u64::from(count) > u64::from(region.block_count()) {
            return Err(invalid(InvalidFreeReason::PastRegionEnd));
        }

        region.clear_run(block, count);
        Ok(())
    }

    /// Region count and block totals.
    #[must_use]
    pub fn stats(&self) -> AllocatorStats {
        self.registry
            .iter()
            .fold(AllocatorStats::default(), |stats, (_, region)| AllocatorStats {
                regions: stats.regions + 1,
                total_blocks: stats.total_blocks + u64::from(region.block_count()),
                free_blocks: stats.free_blocks + u64::from(region.free_blocks()),
            })
    }

    /// Log every region and the totals at `info` level.
    pub fn log_regions(&self) {
        let stats = self.stats();
        info!(
            "block allocator: {} region(s), {} of {} block(s) free ({} KiB)",
            stats.regions,
            stats.free_blocks,
            stats.total_blocks,
            stats.free_bytes() / 1024
        );

        for (id, region) in &self.registry {
            info!(
                "  region {id}: blocks {} ({} total, {} free), bitmap at {} ({} word(s)), header at {}",
                region.block_range(),
                region.block_count(),
                region.free_blocks(),
                region.bitmap_address(),
                region.bitmap_words(),
                region.header_address(),
            );
        }
    }
}
