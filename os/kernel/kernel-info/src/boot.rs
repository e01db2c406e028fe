//! # Kernel Boot Information
//!
//! Protocol-neutral description of what the boot loader tells the kernel
//! about physical memory. Boot-protocol specific decoding lives in
//! submodules (see [`multiboot`]); the memory manager only ever sees
//! [`MemoryMapEntry`] and [`KernelImage`].

pub mod multiboot;

use kernel_memory_addresses::{PhysicalAddress, PhysicalRange};

/// What a memory-map entry describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Usable RAM.
    Available,
    /// Firmware, MMIO, or memory the kernel decided not to use.
    Reserved,
    /// ACPI tables; usable once the tables have been consumed.
    AcpiReclaimable,
    /// ACPI non-volatile storage; must be preserved across sleep states.
    AcpiNvs,
    /// Memory the firmware reported as faulty.
    Defective,
    /// A type tag this kernel does not know about.
    Unknown(u32),
}

impl MemoryKind {
    #[inline]
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// One entry of the boot memory map.
///
/// Entries are rewritten in place while the memory manager carves them:
/// unusable entries are marked [`MemoryKind::Reserved`], and carved entries
/// shrink to the span the allocator actually manages.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryMapEntry {
    /// First byte of the range.
    pub base: PhysicalAddress,
    /// Length of the range in **bytes**.
    pub length: u64,
    /// Type tag.
    pub kind: MemoryKind,
}

impl MemoryMapEntry {
    #[must_use]
    pub const fn new(base: PhysicalAddress, length: u64, kind: MemoryKind) -> Self {
        Self { base, length, kind }
    }

    /// Convenience constructor for usable RAM.
    #[must_use]
    pub const fn available(base: u64, length: u64) -> Self {
        Self::new(PhysicalAddress::new(base), length, MemoryKind::Available)
    }

    /// Convenience constructor for reserved memory.
    #[must_use]
    pub const fn reserved(base: u64, length: u64) -> Self {
        Self::new(PhysicalAddress::new(base), length, MemoryKind::Reserved)
    }

    /// The `[base, base + length)` range, saturating at the top of the address space.
    #[inline]
    #[must_use]
    pub const fn range(&self) -> PhysicalRange {
        PhysicalRange::from_base_len(self.base, self.length)
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        self.range().end()
    }

    #[inline]
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.kind.is_available()
    }

    /// Take the entry out of circulation.
    #[inline]
    pub const fn mark_reserved(&mut self) {
        self.kind = MemoryKind::Reserved;
    }

    /// Narrow the entry to `range`, keeping its kind.
    #[inline]
    pub const fn set_range(&mut self, range: PhysicalRange) {
        self.base = range.start();
        self.length = range.len();
    }
}

/// Physical bounds of the running kernel image, as laid down by the linker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KernelImage {
    /// First byte of the image.
    pub start: PhysicalAddress,
    /// One past the last byte of the image.
    pub end: PhysicalAddress,
}

impl KernelImage {
    #[must_use]
    pub const fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self { start, end }
    }

    #[inline]
    #[must_use]
    pub const fn range(&self) -> PhysicalRange {
        PhysicalRange::new(self.start, self.end)
    }
}
