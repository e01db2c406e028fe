use crate::PhysicalAddress;
use core::fmt;

/// Half-open physical range `[start, end)`.
///
/// Constructors normalize an inverted pair to an empty range at `start`, so
/// `start <= end` always holds.
///
/// ```rust
/// # use kernel_memory_addresses::*;
/// let r = PhysicalRange::from_base_len(PhysicalAddress::new(0x1000), 0x1000);
/// assert!(r.contains(PhysicalAddress::new(0x1fff)));
/// assert!(!r.contains(PhysicalAddress::new(0x2000)));
/// ```
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PhysicalRange {
    start: PhysicalAddress,
    end: PhysicalAddress,
}

impl PhysicalRange {
    #[inline]
    #[must_use]
    pub const fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        if end.as_u64() < start.as_u64() {
            Self { start, end: start }
        } else {
            Self { start, end }
        }
    }

    /// Range of `len` bytes starting at `base`; the end saturates at `u64::MAX`.
    #[inline]
    #[must_use]
    pub const fn from_base_len(base: PhysicalAddress, len: u64) -> Self {
        Self::new(base, base.saturating_add(len))
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.as_u64() - self.start.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, pa: PhysicalAddress) -> bool {
        self.start.as_u64() <= pa.as_u64() && pa.as_u64() < self.end.as_u64()
    }

    /// Whether the two ranges share at least one byte.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start.as_u64() < other.end.as_u64()
            && other.start.as_u64() < self.end.as_u64()
    }
}

impl fmt::Debug for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalRange({:#x}..{:#x})", self.start, self.end)
    }
}

impl fmt::Display for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
