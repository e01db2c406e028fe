//! Simulated physical memory for host tests.

#![allow(dead_code)]

use kernel_bootmem::phys_mapper::OffsetPhysMapper;
use kernel_memory_addresses::PhysicalAddress;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;

/// Byte pattern RAM is filled with before carving.
pub const GARBAGE: u8 = 0xCC;

#[repr(C, align(4096))]
struct Frame([u8; 4096]);

/// `len` bytes of fake RAM starting at physical address `base`.
pub struct TestRam {
    frames: Vec<Frame>,
    base: u64,
}

impl TestRam {
    pub fn new(base: u64, len: u64) -> Self {
        assert!(base.is_multiple_of(4096));
        let frames = usize::try_from(len.div_ceil(4096)).unwrap();
        Self {
            frames: (0..frames).map(|_| Frame([GARBAGE; 4096])).collect(),
            base,
        }
    }

    pub fn mapper(&mut self) -> OffsetPhysMapper {
        OffsetPhysMapper::new(PhysicalAddress::new(self.base), self.frames.as_mut_ptr().cast())
    }

    /// Read back `len` bytes at physical address `pa`.
    ///
    /// Only call this once every region carved from this RAM is gone.
    pub fn bytes(&self, pa: u64, len: usize) -> &[u8] {
        let offset = usize::try_from(pa - self.base).unwrap();
        let all = unsafe {
            std::slice::from_raw_parts(self.frames.as_ptr().cast::<u8>(), self.frames.len() * 4096)
        };
        &all[offset..offset + len]
    }
}
