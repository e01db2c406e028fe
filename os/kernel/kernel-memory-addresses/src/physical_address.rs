use crate::PageSize;
use core::fmt;
use core::ops::Add;

/// Physical memory address.
///
/// A thin wrapper around a raw `u64` that denotes **physical** addresses
/// (RAM handed over by the boot loader). It carries intent only; no
/// validation happens at construction.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x0010_0042);
/// assert_eq!(pa.align_down::<Size4K>().as_u64(), 0x0010_0000);
/// assert_eq!(pa.align_up::<Size4K>().map(PhysicalAddress::as_u64), Some(0x0010_1000));
/// assert!(!pa.is_aligned::<Size1K>());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Align down to a boundary of granule `S`.
    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0 & !(S::SIZE - 1))
    }

    /// Align up to a boundary of granule `S`; `None` if that would overflow.
    #[inline]
    #[must_use]
    pub const fn align_up<S: PageSize>(self) -> Option<Self> {
        match self.0.checked_add(S::SIZE - 1) {
            Some(v) => Some(Self(v & !(S::SIZE - 1))),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0 & (S::SIZE - 1) == 0
    }

    /// Index of the `S`-granule containing this address (`addr >> S::SHIFT`).
    #[inline]
    #[must_use]
    pub const fn frame_number<S: PageSize>(self) -> u64 {
        self.0 >> S::SHIFT
    }

    /// Base address of the `S`-granule with index `number`.
    #[inline]
    #[must_use]
    pub const fn from_frame_number<S: PageSize>(number: u64) -> Self {
        Self(number << S::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, bytes: u64) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn saturating_add(self, bytes: u64) -> Self {
        Self(self.0.saturating_add(bytes))
    }

    /// Byte distance from `base` up to `self`; `None` if `self` lies below `base`.
    #[inline]
    #[must_use]
    pub const fn offset_from(self, base: Self) -> Option<u64> {
        self.0.checked_sub(base.0)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalAddress(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::LowerHex for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(pa: PhysicalAddress) -> Self {
        pa.0
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Size1K, Size4K};

    #[test]
    fn align_up_and_down() {
        let pa = PhysicalAddress::new(0x9_FC00);
        assert_eq!(pa.align_down::<Size4K>(), PhysicalAddress::new(0x9_F000));
        assert_eq!(pa.align_up::<Size4K>(), Some(PhysicalAddress::new(0xA_0000)));
        assert_eq!(pa.align_up::<Size1K>(), Some(pa));
        assert!(pa.is_aligned::<Size1K>());
        assert!(!pa.is_aligned::<Size4K>());
    }

    #[test]
    fn align_up_reports_overflow() {
        assert_eq!(PhysicalAddress::new(u64::MAX).align_up::<Size4K>(), None);
        let top = PhysicalAddress::new(u64::MAX & !0xfff);
        assert_eq!(top.align_up::<Size4K>(), Some(top));
    }

    #[test]
    fn frame_numbers() {
        let pa = PhysicalAddress::new(0x0020_0000);
        assert_eq!(pa.frame_number::<Size4K>(), 0x200);
        assert_eq!(pa.frame_number::<Size1K>(), 0x800);
        assert_eq!(PhysicalAddress::from_frame_number::<Size4K>(0x200), pa);
    }

    #[test]
    fn offsets() {
        let base = PhysicalAddress::new(0x10_0000);
        assert_eq!((base + 0x400).offset_from(base), Some(0x400));
        assert_eq!(base.offset_from(base + 1), None);
        assert_eq!(PhysicalAddress::new(u64::MAX).checked_add(1), None);
    }
}
