//! # Region Carving
//!
//! Turns one `Available` memory-map entry into a [`Region`]. The usable span
//! is what is left of the entry after
//!
//! 1. dropping everything below [`LOW_MEMORY_END`],
//! 2. cutting out the kernel image,
//! 3. aligning the start up to a page boundary,
//! 4. clipping the length to [`MAX_REGION_LENGTH`].
//!
//! The span is then zeroed and formatted in place. On success the entry is
//! narrowed to the span; on failure it is marked reserved so later consumers
//! of the memory map stay clear of it.

use crate::error::CarveError;
use crate::phys_mapper::PhysMapper;
use crate::planner::{SizePlan, plan};
use crate::region::Region;
use kernel_info::boot::{KernelImage, MemoryMapEntry};
use kernel_info::memory::{LOW_MEMORY_END, MAX_REGION_BASE, MAX_REGION_LENGTH, PageGranule};
use kernel_memory_addresses::{PhysicalAddress, PhysicalRange};

/// Compute the span a region carved from `entry` would cover.
///
/// Pure; nothing is mapped or written.
///
/// ```rust
/// # use kernel_bootmem::carve::carve_span;
/// # use kernel_memory_addresses::{PhysicalAddress, PhysicalRange};
/// let r = |s, e| PhysicalRange::new(PhysicalAddress::new(s), PhysicalAddress::new(e));
///
/// // RAM from 0 to 8 MiB with the kernel at [1 MiB, 2 MiB + 0x123).
/// let span = carve_span(r(0, 0x80_0000), r(0x10_0000, 0x20_0123)).unwrap();
/// assert_eq!(span, r(0x20_1000, 0x80_0000));
/// ```
///
/// # Errors
/// - [`CarveError::BelowLowMemory`] if the entry ends at or below 1 MiB.
/// - [`CarveError::InsideKernelImage`] if the kernel image covers what is left.
/// - [`CarveError::ConsumedByAlignment`] if page alignment eats the rest.
/// - [`CarveError::BeyondAddressable`] if the span starts too high for a region header.
pub const fn carve_span(
    entry: PhysicalRange,
    kernel: PhysicalRange,
) -> Result<PhysicalRange, CarveError> {
    let mut start = entry.start().as_u64();
    let mut end = entry.end().as_u64();

    if end <= LOW_MEMORY_END {
        return Err(CarveError::BelowLowMemory);
    }
    if start < LOW_MEMORY_END {
        start = LOW_MEMORY_END;
    }

    let remaining = PhysicalRange::new(PhysicalAddress::new(start), PhysicalAddress::new(end));
    if remaining.overlaps(&kernel) {
        let kernel_start = kernel.start().as_u64();
        let kernel_end = kernel.end().as_u64();
        if end > kernel_end {
            start = kernel_end;
        } else if start < kernel_start {
            end = kernel_start;
        } else {
            return Err(CarveError::InsideKernelImage);
        }
    }

    let Some(aligned) = PhysicalAddress::new(start).align_up::<PageGranule>() else {
        return Err(CarveError::ConsumedByAlignment);
    };
    if aligned.as_u64() >= end {
        return Err(CarveError::ConsumedByAlignment);
    }
    if aligned.as_u64() >= MAX_REGION_BASE {
        return Err(CarveError::BeyondAddressable);
    }

    let mut len = end - aligned.as_u64();
    if len > MAX_REGION_LENGTH {
        len = MAX_REGION_LENGTH;
    }
    Ok(PhysicalRange::from_base_len(aligned, len))
}

/// Carve `entry` into a region hosted inside its own memory.
///
/// On success the entry is narrowed to the region's span. On failure the
/// entry is marked reserved, except for [`CarveError::NotAvailable`], which
/// leaves it untouched.
///
/// # Errors
/// Any [`CarveError`] returned by [`carve_span`], plus
/// [`CarveError::NotAvailable`], [`CarveError::TooSmall`], and
/// [`CarveError::MisalignedWindow`].
///
/// # Safety
/// The entry's memory outside the kernel image must be unused RAM that the
/// caller hands over for `'m`, and `mapper` must map it writable (see
/// [`PhysMapper::phys_to_slice`]).
pub unsafe fn carve<'m, M: PhysMapper + ?Sized>(
    entry: &mut MemoryMapEntry,
    kernel: &KernelImage,
    mapper: &M,
) -> Result<Region<'m>, CarveError> {
    if !entry.is_available() {
        return Err(CarveError::NotAvailable);
    }

    let (span, plan) = match plan_entry(entry, kernel) {
        Ok(planned) => planned,
        Err(err) => {
            entry.mark_reserved();
            return Err(err);
        }
    };

    // SAFETY: forwarded to the caller.
    match unsafe { format_span(span, &plan, mapper) } {
        Ok(region) => {
            entry.set_range(span);
            Ok(region)
        }
        Err(err) => {
            entry.mark_reserved();
            Err(err)
        }
    }
}

fn plan_entry(
    entry: &MemoryMapEntry,
    kernel: &KernelImage,
) -> Result<(PhysicalRange, SizePlan), CarveError> {
    let span = carve_span(entry.range(), kernel.range())?;
    let plan = plan(span.len());
    if plan.block_count == 0 {
        return Err(CarveError::TooSmall);
    }
    Ok((span, plan))
}

/// # Safety
/// See [`carve`].
unsafe fn format_span<'m, M: PhysMapper + ?Sized>(
    span: PhysicalRange,
    plan: &SizePlan,
    mapper: &M,
) -> Result<Region<'m>, CarveError> {
    let len = usize::try_from(span.len()).map_err(|_| CarveError::BeyondAddressable)?;

    // SAFETY: the caller hands the span over exclusively for `'m`.
    let window: &'m mut [u8] = unsafe { mapper.phys_to_slice(span.start(), len) };
    window.fill(0);

    Region::format(window, span.start(), plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_info::memory::PAGE_SIZE;

    const MIB: u64 = 0x10_0000;

    fn r(start: u64, end: u64) -> PhysicalRange {
        PhysicalRange::new(PhysicalAddress::new(start), PhysicalAddress::new(end))
    }

    /// A kernel image well away from every test entry.
    fn no_kernel() -> PhysicalRange {
        r(0x7000_0000, 0x7010_0000)
    }

    #[test]
    fn entry_below_low_memory_is_rejected() {
        assert_eq!(carve_span(r(0, 0x9_F000), no_kernel()), Err(CarveError::BelowLowMemory));
        assert_eq!(carve_span(r(0x8_0000, MIB), no_kernel()), Err(CarveError::BelowLowMemory));
    }

    #[test]
    fn entry_straddling_low_memory_starts_at_one_mib() {
        assert_eq!(carve_span(r(0, 4 * MIB), no_kernel()), Ok(r(MIB, 4 * MIB)));
    }

    #[test]
    fn kernel_inside_entry_keeps_the_tail() {
        let kernel = r(2 * MIB, 3 * MIB);
        assert_eq!(carve_span(r(MIB, 8 * MIB), kernel), Ok(r(3 * MIB, 8 * MIB)));
    }

    #[test]
    fn entry_head_overlapping_kernel_keeps_the_tail() {
        let kernel = r(MIB, 3 * MIB);
        assert_eq!(carve_span(r(2 * MIB, 8 * MIB), kernel), Ok(r(3 * MIB, 8 * MIB)));
    }

    #[test]
    fn entry_tail_overlapping_kernel_keeps_the_head() {
        let kernel = r(4 * MIB, 6 * MIB);
        assert_eq!(carve_span(r(MIB, 5 * MIB), kernel), Ok(r(MIB, 4 * MIB)));
    }

    #[test]
    fn entry_inside_kernel_is_rejected() {
        let kernel = r(MIB, 8 * MIB);
        assert_eq!(
            carve_span(r(2 * MIB, 3 * MIB), kernel),
            Err(CarveError::InsideKernelImage)
        );
        assert_eq!(carve_span(r(MIB, 8 * MIB), kernel), Err(CarveError::InsideKernelImage));
    }

    #[test]
    fn entries_clear_of_the_kernel_are_untouched() {
        let kernel = r(MIB, 2 * MIB);
        assert_eq!(carve_span(r(4 * MIB, 8 * MIB), kernel), Ok(r(4 * MIB, 8 * MIB)));
        assert_eq!(carve_span(r(2 * MIB, 3 * MIB), kernel), Ok(r(2 * MIB, 3 * MIB)));
    }

    #[test]
    fn start_is_page_aligned() {
        let span = carve_span(r(2 * MIB + 1, 3 * MIB), no_kernel()).unwrap();
        assert_eq!(span, r(2 * MIB + 0x1000, 3 * MIB));

        let kernel = r(MIB, 2 * MIB + 0x10);
        let span = carve_span(r(MIB, 3 * MIB), kernel).unwrap();
        assert_eq!(span.start(), PhysicalAddress::new(2 * MIB + 0x1000));
    }

    #[test]
    fn carved_starts_are_the_next_page_boundary() {
        for offset in [0, 1, 0x3FF, 0x400, 0xFFF, PAGE_SIZE, PAGE_SIZE + 1] {
            let start = 2 * MIB + offset;
            let span = carve_span(r(start, 3 * MIB), no_kernel()).unwrap();
            let carved = span.start().as_u64();
            assert!(carved.is_multiple_of(PAGE_SIZE), "{carved:#x} is not page aligned");
            assert!(carved >= start && carved - start < PAGE_SIZE);
        }
    }

    #[test]
    fn alignment_can_consume_the_entry() {
        assert_eq!(
            carve_span(r(2 * MIB + 1, 2 * MIB + 0x1000), no_kernel()),
            Err(CarveError::ConsumedByAlignment)
        );
        assert_eq!(
            carve_span(r(u64::MAX - 10, u64::MAX), no_kernel()),
            Err(CarveError::ConsumedByAlignment)
        );
    }

    #[test]
    fn huge_entries_are_clipped_and_high_ones_rejected() {
        // Kernel in front of the entry, so nothing is cut out of it.
        let kernel = r(MIB, 2 * MIB);
        let span = carve_span(r(4 * MIB, 4 * MIB + 3 * MAX_REGION_LENGTH), kernel).unwrap();
        assert_eq!(span.len(), MAX_REGION_LENGTH);
        assert_eq!(span.start(), PhysicalAddress::new(4 * MIB));

        // A huge entry running through the kernel keeps its tail, clipped.
        let span = carve_span(r(4 * MIB, 4 * MIB + 3 * MAX_REGION_LENGTH), no_kernel()).unwrap();
        assert_eq!(span.start(), PhysicalAddress::new(0x7010_0000));
        assert_eq!(span.len(), MAX_REGION_LENGTH);

        assert_eq!(
            carve_span(r(MAX_REGION_BASE, MAX_REGION_BASE + MIB), no_kernel()),
            Err(CarveError::BeyondAddressable)
        );
    }

    #[test]
    fn empty_kernel_image_excludes_nothing() {
        let kernel = r(2 * MIB, 2 * MIB);
        assert_eq!(carve_span(r(MIB, 4 * MIB), kernel), Ok(r(MIB, 4 * MIB)));
    }
}
