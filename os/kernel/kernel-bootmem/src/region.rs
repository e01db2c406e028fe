//! # Bitmap Regions
//!
//! A region is one carved span of physical memory that describes itself:
//!
//! ```text
//! base                         bitmap_address()      header_address()
//! ┌────────────────────────────┬─────────────────────┬──────────────┬───────┐
//! │ block 0 │ block 1 │ ...    │ u32 u32 ... (1 bit  │ RegionHeader │ slack │
//! │ (1 KiB each)               │  per block, 1=used) │ (24 bytes)   │       │
//! └────────────────────────────┴─────────────────────┴──────────────┴───────┘
//! ```
//!
//! [`Region`] is a handle to the bitmap and header living inside that span.
//! Its lifetime `'m` is the lifetime of the mapped window, so a region can
//! never outlive the memory that holds its own bookkeeping.
//!
//! Runs never cross a bitmap word: an allocation of `n` blocks always sits
//! inside one 32-block window.

use crate::error::CarveError;
use crate::planner::SizePlan;
use core::fmt;
use kernel_info::memory::{BITMAP_WORD_BITS, BLOCK_SIZE, PageGranule};
use kernel_memory_addresses::{PhysicalAddress, PhysicalRange};

/// Signature stamped into every [`RegionHeader`].
pub const REGION_MAGIC: u32 = u32::from_le_bytes(*b"BMRG");

/// Encoded "no next region".
const NO_REGION: u32 = u32::MAX;

/// Arena index of a region inside a [`RegionRegistry`](crate::RegionRegistry).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(u32);

impl RegionId {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    const fn encode(id: Option<Self>) -> u32 {
        match id {
            Some(Self(index)) => index,
            None => NO_REGION,
        }
    }

    #[inline]
    const fn decode(raw: u32) -> Option<Self> {
        if raw == NO_REGION { None } else { Some(Self(raw)) }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Self-hosted region metadata, stored right after the bitmap.
///
/// Only 4-byte fields, so the header can follow a bitmap of any length
/// without padding.
#[repr(C)]
#[derive(Debug)]
pub struct RegionHeader {
    /// [`REGION_MAGIC`].
    magic: u32,
    /// `base >> 12`; region bases are page aligned.
    base_frame: u32,
    /// Allocatable blocks.
    block_count: u32,
    /// Length of the bitmap in 32-bit words.
    bitmap_words: u32,
    /// First word that had a free bit during the last scan.
    search_cursor: u32,
    /// Arena index of the next region, or `u32::MAX`.
    next: u32,
}

const _: () = {
    assert!(size_of::<RegionHeader>() == 24);
    assert!(align_of::<RegionHeader>() == align_of::<u32>());
};

/// Handle to a carved region's header and bitmap.
pub struct Region<'m> {
    header: &'m mut RegionHeader,
    bitmap: &'m mut [u32],
}

impl<'m> Region<'m> {
    /// Lay out a region inside `window`, the mapped span starting at `base`.
    ///
    /// The block area comes first, then `plan.bitmap_words` bitmap words,
    /// then the header. Padding bits past `plan.block_count` are set so they
    /// never look free.
    pub(crate) fn format(
        window: &'m mut [u8],
        base: PhysicalAddress,
        plan: &SizePlan,
    ) -> Result<Self, CarveError> {
        debug_assert!(base.is_aligned::<PageGranule>());
        let base_frame = u32::try_from(base.frame_number::<PageGranule>())
            .map_err(|_| CarveError::BeyondAddressable)?;
        let block_count =
            u32::try_from(plan.block_count).map_err(|_| CarveError::BeyondAddressable)?;
        let bitmap_words =
            u32::try_from(plan.bitmap_words).map_err(|_| CarveError::BeyondAddressable)?;
        let block_bytes =
            usize::try_from(plan.block_bytes()).map_err(|_| CarveError::BeyondAddressable)?;
        let bitmap_bytes =
            usize::try_from(plan.bitmap_bytes()).map_err(|_| CarveError::BeyondAddressable)?;

        let (_blocks, rest) = window
            .split_at_mut_checked(block_bytes)
            .ok_or(CarveError::TooSmall)?;
        let (bitmap, rest) = rest
            .split_at_mut_checked(bitmap_bytes)
            .ok_or(CarveError::TooSmall)?;
        let header = rest
            .get_mut(..size_of::<RegionHeader>())
            .ok_or(CarveError::TooSmall)?;

        // SAFETY: every bit pattern is a valid `u32`.
        let (prefix, bitmap, suffix) = unsafe { bitmap.align_to_mut::<u32>() };
        if !prefix.is_empty() || !suffix.is_empty() {
            return Err(CarveError::MisalignedWindow);
        }

        let header = header.as_mut_ptr().cast::<RegionHeader>();
        if !header.is_aligned() {
            return Err(CarveError::MisalignedWindow);
        }

        // SAFETY: `header` points at `size_of::<RegionHeader>()` exclusively
        // borrowed, suitably aligned bytes of `window`, which lives for `'m`.
        let header = unsafe {
            header.write(RegionHeader {
                magic: REGION_MAGIC,
                base_frame,
                block_count,
                bitmap_words,
                search_cursor: 0,
                next: NO_REGION,
            });
            &mut *header
        };

        for (index, word) in (0u64..).zip(bitmap.iter_mut()) {
            *word = padding_mask(u64::from(block_count), index);
        }

        Ok(Self { header, bitmap })
    }

    /// Address of block 0.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        PhysicalAddress::from_frame_number::<PageGranule>(self.header.base_frame as u64)
    }

    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> u32 {
        self.header.block_count
    }

    #[inline]
    #[must_use]
    pub const fn bitmap_words(&self) -> u32 {
        self.header.bitmap_words
    }

    /// The bitmap; bit `b` of word `w` tracks block `w * 32 + b`.
    #[inline]
    #[must_use]
    pub const fn bitmap(&self) -> &[u32] {
        self.bitmap
    }

    #[inline]
    #[must_use]
    pub const fn search_cursor(&self) -> u32 {
        self.header.search_cursor
    }

    /// The region after this one in registry order.
    #[inline]
    #[must_use]
    pub const fn next(&self) -> Option<RegionId> {
        RegionId::decode(self.header.next)
    }

    #[inline]
    pub(crate) const fn set_next(&mut self, next: Option<RegionId>) {
        self.header.next = RegionId::encode(next);
    }

    /// Whether the self-hosted header still carries its signature.
    #[inline]
    #[must_use]
    pub const fn is_intact(&self) -> bool {
        self.header.magic == REGION_MAGIC
    }

    /// The allocatable block area `[base, base + block_count * BLOCK_SIZE)`.
    #[inline]
    #[must_use]
    pub const fn block_range(&self) -> PhysicalRange {
        PhysicalRange::from_base_len(self.base(), self.header.block_count as u64 * BLOCK_SIZE)
    }

    /// Where the bitmap lives: right after the block area.
    #[inline]
    #[must_use]
    pub const fn bitmap_address(&self) -> PhysicalAddress {
        self.block_range().end()
    }

    /// Where the header lives: right after the bitmap.
    #[inline]
    #[must_use]
    pub const fn header_address(&self) -> PhysicalAddress {
        self.bitmap_address()
            .saturating_add(self.header.bitmap_words as u64 * size_of::<u32>() as u64)
    }

    /// Everything the region occupies: blocks, bitmap, and header.
    #[inline]
    #[must_use]
    pub const fn footprint(&self) -> PhysicalRange {
        PhysicalRange::new(
            self.base(),
            self.header_address()
                .saturating_add(size_of::<RegionHeader>() as u64),
        )
    }

    /// Address of block `block`.
    #[inline]
    #[must_use]
    pub const fn block_address(&self, block: u32) -> PhysicalAddress {
        self.base().saturating_add(block as u64 * BLOCK_SIZE)
    }

    /// Whether `block` is marked allocated. Blocks past the end always are.
    #[must_use]
    pub fn is_allocated(&self, block: u32) -> bool {
        let (word, bit) = split_block(block);
        self.bitmap
            .get(word)
            .is_none_or(|&w| w & (1 << bit) != 0)
    }

    /// Number of blocks currently free.
    #[must_use]
    pub fn free_blocks(&self) -> u32 {
        self.bitmap.iter().map(|w| w.count_zeros()).sum()
    }

    /// Scan for `count` free blocks whose first block index is a multiple of
    /// `alignment`, starting at the search cursor. Returns the first block.
    ///
    /// The first word with any free bit becomes the new search cursor. The
    /// cursor only moves forward; words before it are never scanned again.
    pub(crate) fn find_run(&mut self, count: u32, alignment: u32) -> Option<u32> {
        debug_assert!((1..=BITMAP_WORD_BITS).contains(&count));
        debug_assert!(alignment > 0);

        let mut cursor_moved = false;
        for index in self.header.search_cursor..self.header.bitmap_words {
            let word = self.bitmap[index as usize];
            if word == u32::MAX {
                continue;
            }

            if !cursor_moved {
                self.header.search_cursor = index;
                cursor_moved = true;
            }

            let first_block = index * BITMAP_WORD_BITS;
            if let Some(bit) = find_in_word(word, first_block, count, alignment) {
                return Some(first_block + bit);
            }
        }
        None
    }

    /// Mark `count` blocks starting at `block` allocated.
    pub(crate) fn set_run(&mut self, block: u32, count: u32) {
        let (word, bit) = split_block(block);
        debug_assert_eq!(self.bitmap[word] & run_mask(bit, count), 0);
        self.bitmap[word] |= run_mask(bit, count);
    }

    /// Mark `count` blocks starting at `block` free.
    pub(crate) fn clear_run(&mut self, block: u32, count: u32) {
        let (word, bit) = split_block(block);
        self.bitmap[word] &= !run_mask(bit, count);
    }
}

impl fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("base", &self.base())
            .field("block_count", &self.block_count())
            .field("free_blocks", &self.free_blocks())
            .field("bitmap", &self.bitmap_address())
            .field("bitmap_words", &self.bitmap_words())
            .field("search_cursor", &self.search_cursor())
            .field("next", &self.next())
            .finish()
    }
}

/// Word index and bit position of `block`.
#[inline]
const fn split_block(block: u32) -> (usize, u32) {
    (
        (block / BITMAP_WORD_BITS) as usize,
        block % BITMAP_WORD_BITS,
    )
}

/// Bits `bit..bit + count` of a word; `bit + count <= 32`.
#[inline]
const fn run_mask(bit: u32, count: u32) -> u32 {
    debug_assert!(count >= 1 && bit + count <= BITMAP_WORD_BITS);
    (u32::MAX >> (BITMAP_WORD_BITS - count)) << bit
}

/// Initial value of bitmap word `index`: set bits for blocks past `block_count`.
#[inline]
const fn padding_mask(block_count: u64, index: u64) -> u32 {
    let first = index * BITMAP_WORD_BITS as u64;
    let valid = block_count.saturating_sub(first);
    if valid >= BITMAP_WORD_BITS as u64 {
        0
    } else {
        u32::MAX << valid
    }
}

/// Find `count` consecutive clear bits in `word`.
///
/// A run may only start at a bit whose block index (`first_block + bit`) is
/// a multiple of `alignment`. The scan gives up as soon as the bits left in
/// the word cannot complete the run.
const fn find_in_word(word: u32, first_block: u32, count: u32, alignment: u32) -> Option<u32> {
    let mut streak = 0;
    let mut first = 0;
    let mut bit = 0;
    while bit < BITMAP_WORD_BITS {
        if BITMAP_WORD_BITS - bit < count - streak {
            break;
        }

        if word & (1 << bit) != 0 {
            streak = 0;
        } else if streak > 0 || (first_block + bit).is_multiple_of(alignment) {
            if streak == 0 {
                first = bit;
            }
            streak += 1;
            if streak == count {
                return Some(first);
            }
        }
        bit += 1;
    }
    None
}
