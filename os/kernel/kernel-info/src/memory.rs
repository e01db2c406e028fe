//! # Memory Layout

use kernel_memory_addresses::{PageSize, Size1K, Size4K};

/// Everything below this physical address (BIOS data, VGA, option ROMs,
/// legacy DMA buffers) is never handed out by the block allocator.
pub const LOW_MEMORY_END: u64 = 0x0010_0000; // 1 MiB

/// Allocation granule of the early-boot block allocator.
pub const BLOCK_SIZE: u64 = Size1K::SIZE;

/// Granule every carved region base is aligned to, and the unit of the
/// frame number a region header stores.
pub type PageGranule = Size4K;

/// Alignment of every carved region base.
pub const PAGE_SIZE: u64 = PageGranule::SIZE;

/// Number of blocks tracked by one bitmap word.
pub const BITMAP_WORD_BITS: u32 = u32::BITS;

/// Largest run a single allocation or free may cover.
///
/// Runs never span two bitmap words, so this is the word width.
pub const MAX_RUN_BLOCKS: u32 = BITMAP_WORD_BITS;

/// Capacity of the boot-time region arena.
pub const MAX_BOOT_REGIONS: usize = 32;

/// Longest span a single region manages (1 TiB); longer entries are clipped.
pub const MAX_REGION_LENGTH: u64 = 1 << 40;

/// Highest physical address a region may start at.
///
/// Region headers record the base as a 32-bit 4 KiB frame number.
pub const MAX_REGION_BASE: u64 = (u32::MAX as u64) << PageGranule::SHIFT;

const _: () = {
    assert!(LOW_MEMORY_END.is_multiple_of(PAGE_SIZE));
    assert!(PAGE_SIZE.is_multiple_of(BLOCK_SIZE));
    assert!(MAX_RUN_BLOCKS == 32);
    assert!(MAX_REGION_LENGTH / BLOCK_SIZE <= u32::MAX as u64);
    assert!(MAX_BOOT_REGIONS < u32::MAX as usize);
};
