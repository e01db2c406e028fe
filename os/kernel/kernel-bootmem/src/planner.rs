//! # Size Planner
//!
//! Decides how many blocks a span of memory can offer once the span also
//! has to hold its own bitmap and region header.
//!
//! ```text
//! ┌──────────────────────────────┬─────────────┬────────┬───────┐
//! │ block_count * BLOCK_SIZE     │ words * 4   │ header │ slack │
//! └──────────────────────────────┴─────────────┴────────┴───────┘
//! ^ start                                                       ^ start + length
//! ```

use crate::region::RegionHeader;
use kernel_info::memory::{BITMAP_WORD_BITS, BLOCK_SIZE};

/// Bytes of self-hosted metadata per region (one [`RegionHeader`]).
pub const REGION_METADATA_SIZE: u64 = size_of::<RegionHeader>() as u64;

/// Bytes per bitmap word.
const WORD_BYTES: u64 = size_of::<u32>() as u64;

/// Result of [`plan`]: how a span is split between blocks and bitmap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SizePlan {
    /// Number of allocatable blocks.
    pub block_count: u64,
    /// Number of 32-bit bitmap words tracking them.
    pub bitmap_words: u64,
}

impl SizePlan {
    #[inline]
    #[must_use]
    pub const fn block_bytes(&self) -> u64 {
        self.block_count * BLOCK_SIZE
    }

    #[inline]
    #[must_use]
    pub const fn bitmap_bytes(&self) -> u64 {
        self.bitmap_words * WORD_BYTES
    }

    /// Total bytes needed for blocks, bitmap, and `metadata_size` bytes of header.
    #[inline]
    #[must_use]
    pub const fn footprint(&self, metadata_size: u64) -> u64 {
        self.block_bytes() + self.bitmap_bytes() + metadata_size
    }
}

/// Plan a span of `length` bytes with the regular region header.
///
/// ```rust
/// # use kernel_bootmem::planner::{plan, SizePlan};
/// assert_eq!(plan(4096), SizePlan { block_count: 3, bitmap_words: 1 });
/// ```
#[must_use]
pub const fn plan(length: u64) -> SizePlan {
    plan_with_metadata(length, REGION_METADATA_SIZE)
}

/// Plan a span of `length` bytes that also hosts `metadata_size` bytes of header.
///
/// Starts from `length / BLOCK_SIZE` blocks and gives up one block at a time
/// until blocks, bitmap, and header fit. Stops at zero blocks even if the
/// bitmap and header alone do not fit.
#[must_use]
pub const fn plan_with_metadata(length: u64, metadata_size: u64) -> SizePlan {
    let mut plan = SizePlan {
        block_count: length / BLOCK_SIZE,
        bitmap_words: words_for(length / BLOCK_SIZE),
    };

    while plan.block_count > 0 && plan.footprint(metadata_size) > length {
        plan.block_count -= 1;
        plan.bitmap_words = words_for(plan.block_count);
    }

    plan
}

/// Bitmap words for `block_count` blocks.
///
/// Always one more than the number of full words, so a count that is a
/// multiple of 32 carries a word of pure padding.
#[inline]
const fn words_for(block_count: u64) -> u64 {
    block_count / BITMAP_WORD_BITS as u64 + 1
}
