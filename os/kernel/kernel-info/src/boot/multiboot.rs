//! # Multiboot (v1) Memory Map Intake
//!
//! Decodes the two pieces of the Multiboot information structure the memory
//! manager depends on: the `flags` word (bit 6 says whether `mmap_addr` /
//! `mmap_length` are valid) and the memory-map buffer itself.
//!
//! The buffer is a sequence of variable-size records:
//!
//! ```text
//! offset  size  field
//!      0     4  size       (bytes following this field)
//!      4     8  base_addr
//!     12     8  length
//!     20     4  type       (1 = available RAM)
//! ```
//!
//! The next record starts `size + 4` bytes after the current one.

use super::{MemoryKind, MemoryMapEntry};
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// The Multiboot information `flags` word.
///
/// Each bit says whether the corresponding part of the information
/// structure is valid.
#[bitfield(u32)]
pub struct MultibootInfoFlags {
    /// Bit 0: `mem_lower` / `mem_upper` are valid.
    pub mem: bool,
    /// Bit 1: `boot_device` is valid.
    pub boot_device: bool,
    /// Bit 2: `cmdline` is valid.
    pub cmdline: bool,
    /// Bit 3: `mods_count` / `mods_addr` are valid.
    pub mods: bool,
    /// Bit 4: a.out symbol table is valid.
    pub aout_syms: bool,
    /// Bit 5: ELF section header table is valid.
    pub elf_shdr: bool,
    /// Bit 6: `mmap_length` / `mmap_addr` are valid.
    pub mmap: bool,
    /// Bit 7: `drives_length` / `drives_addr` are valid.
    pub drives: bool,
    /// Bit 8: `config_table` is valid.
    pub config_table: bool,
    /// Bit 9: `boot_loader_name` is valid.
    pub boot_loader_name: bool,
    /// Bit 10: `apm_table` is valid.
    pub apm_table: bool,
    /// Bit 11: VBE information is valid.
    pub vbe: bool,
    /// Bit 12: framebuffer information is valid.
    pub framebuffer: bool,
    /// Bits 13-31: Reserved.
    #[bits(19, default = 0)]
    _reserved_13_31: u32,
}

/// Multiboot memory type for usable RAM.
pub const MULTIBOOT_MEMORY_AVAILABLE: u32 = 1;
/// Multiboot memory type for reserved ranges.
pub const MULTIBOOT_MEMORY_RESERVED: u32 = 2;
/// Multiboot memory type for reclaimable ACPI tables.
pub const MULTIBOOT_MEMORY_ACPI_RECLAIMABLE: u32 = 3;
/// Multiboot memory type for ACPI NVS memory.
pub const MULTIBOOT_MEMORY_NVS: u32 = 4;
/// Multiboot memory type for defective RAM.
pub const MULTIBOOT_MEMORY_BADRAM: u32 = 5;

/// Size of the fixed part of a record, excluding the leading `size` field.
const RECORD_PAYLOAD: usize = 20;

impl MemoryKind {
    /// Map a Multiboot memory type tag.
    #[must_use]
    pub const fn from_multiboot(raw: u32) -> Self {
        match raw {
            MULTIBOOT_MEMORY_AVAILABLE => Self::Available,
            MULTIBOOT_MEMORY_RESERVED => Self::Reserved,
            MULTIBOOT_MEMORY_ACPI_RECLAIMABLE => Self::AcpiReclaimable,
            MULTIBOOT_MEMORY_NVS => Self::AcpiNvs,
            MULTIBOOT_MEMORY_BADRAM => Self::Defective,
            other => Self::Unknown(other),
        }
    }
}

/// Iterator over the records of a Multiboot memory-map buffer.
///
/// Iteration ends at the end of the buffer, or early at the first record
/// that is truncated or shorter than the fixed record layout.
#[derive(Debug, Clone)]
pub struct MultibootMmap<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> MultibootMmap<'a> {
    /// Wrap the `mmap_addr`/`mmap_length` buffer.
    ///
    /// Returns `None` if `flags` says the memory map is not present.
    #[must_use]
    pub const fn new(flags: MultibootInfoFlags, bytes: &'a [u8]) -> Option<Self> {
        if flags.mmap() {
            Some(Self { bytes, offset: 0 })
        } else {
            None
        }
    }
}

impl Iterator for MultibootMmap<'_> {
    type Item = MemoryMapEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.bytes.get(self.offset..)?;
        let size = usize::try_from(read_u32(rest, 0)?).ok()?;
        if size < RECORD_PAYLOAD {
            self.offset = self.bytes.len();
            return None;
        }

        let base = read_u64(rest, 4)?;
        let length = read_u64(rest, 12)?;
        let kind = read_u32(rest, 20)?;

        self.offset = self
            .offset
            .saturating_add(size)
            .saturating_add(size_of::<u32>());

        Some(MemoryMapEntry::new(
            PhysicalAddress::new(base),
            length,
            MemoryKind::from_multiboot(kind),
        ))
    }
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at + size_of::<u32>())?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
    let raw = bytes.get(at..at + size_of::<u64>())?;
    Some(u64::from_le_bytes(raw.try_into().ok()?))
}
