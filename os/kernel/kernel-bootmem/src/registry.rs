//! # Region Registry
//!
//! Owns every carved [`Region`] in a fixed-capacity arena and threads them
//! into a chain through the `next` index each region stores in its own
//! header. The chain follows boot memory-map order.

use crate::carve::carve;
use crate::phys_mapper::PhysMapper;
use crate::region::{Region, RegionId};
use arrayvec::ArrayVec;
use kernel_info::boot::{KernelImage, MemoryMapEntry};
use kernel_info::memory::MAX_BOOT_REGIONS;
use kernel_memory_addresses::PhysicalAddress;
use log::{debug, trace, warn};

/// The chain of regions carved from the boot memory map.
#[derive(Debug, Default)]
pub struct RegionRegistry<'m> {
    regions: ArrayVec<Region<'m>, MAX_BOOT_REGIONS>,
    root: Option<RegionId>,
    tail: Option<RegionId>,
}

impl<'m> RegionRegistry<'m> {
    /// An empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: ArrayVec::new_const(),
            root: None,
            tail: None,
        }
    }

    /// Carve every `Available` entry of `entries` and chain the results.
    ///
    /// Entries that cannot be carved are marked reserved and skipped; they do
    /// not break the chain. Once the arena is full, further available entries
    /// are left untouched.
    ///
    /// # Safety
    /// Every available entry must describe unused RAM that is handed over to
    /// the registry for `'m`, mapped writable through `mapper`. Entries must
    /// not overlap each other.
    pub unsafe fn build<M: PhysMapper + ?Sized>(
        entries: &mut [MemoryMapEntry],
        kernel: &KernelImage,
        mapper: &M,
    ) -> Self {
        let mut registry = Self::new();

        for (index, entry) in entries.iter_mut().enumerate() {
            let range = entry.range();
            if !entry.is_available() {
                trace!("memory map entry {index} {range} is {:?}; skipped", entry.kind);
                continue;
            }

            if registry.is_full() {
                warn!(
                    "memory map entry {index} {range} left unmanaged: all {MAX_BOOT_REGIONS} region slots are in use"
                );
                continue;
            }

            // SAFETY: forwarded to the caller.
            match unsafe { carve(entry, kernel, mapper) } {
                Ok(region) => {
                    if let Some(id) = registry.push(region) {
                        debug!("memory map entry {index} {range} carved into region {id}");
                    }
                }
                Err(err) => debug!("memory map entry {index} {range} skipped: {err}"),
            }
        }

        registry
    }

    /// Append `region` to the end of the chain.
    ///
    /// Returns `None` and drops the region if the arena is full.
    pub fn push(&mut self, mut region: Region<'m>) -> Option<RegionId> {
        let id = RegionId::new(u32::try_from(self.regions.len()).ok()?);
        region.set_next(None);
        self.regions.try_push(region).ok()?;

        match self.tail.and_then(|tail| self.regions.get_mut(tail.index())) {
            Some(tail) => tail.set_next(Some(id)),
            None => self.root = Some(id),
        }
        self.tail = Some(id);
        Some(id)
    }

    /// First region of the chain.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> Option<RegionId> {
        self.root
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.regions.is_full()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: RegionId) -> Option<&Region<'m>> {
        self.regions.get(id.index())
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: RegionId) -> Option<&mut Region<'m>> {
        self.regions.get_mut(id.index())
    }

    /// Regions in chain order.
    #[must_use]
    pub fn iter(&self) -> Chain<'_, 'm> {
        Chain {
            registry: self,
            next: self.root,
            remaining: self.regions.len(),
        }
    }

    /// The region whose block area contains `address`.
    #[must_use]
    pub fn owner_of(&self, address: PhysicalAddress) -> Option<RegionId> {
        self.iter()
            .find(|(_, region)| region.block_range().contains(address))
            .map(|(id, _)| id)
    }
}

impl<'r, 'm> IntoIterator for &'r RegionRegistry<'m> {
    type Item = (RegionId, &'r Region<'m>);
    type IntoIter = Chain<'r, 'm>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a registry in chain order, see [`RegionRegistry::iter`].
#[derive(Debug, Clone)]
pub struct Chain<'r, 'm> {
    registry: &'r RegionRegistry<'m>,
    next: Option<RegionId>,
    /// Bounds the walk even if a header's `next` was overwritten.
    remaining: usize,
}

impl<'r, 'm> Iterator for Chain<'r, 'm> {
    type Item = (RegionId, &'r Region<'m>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        let region = self.registry.get(id)?;
        self.remaining -= 1;
        self.next = region.next();
        Some((id, region))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phys_mapper::OffsetPhysMapper;

    #[repr(C, align(4096))]
    struct Frame([u8; 4096]);

    const RAM_BASE: u64 = 0x40_0000;
    const KERNEL: KernelImage =
        KernelImage::new(PhysicalAddress::new(0x10_0000), PhysicalAddress::new(0x20_0000));

    fn ram(frames: usize) -> Vec<Frame> {
        (0..frames).map(|_| Frame([0xAA; 4096])).collect()
    }

    #[test]
    fn chains_regions_in_map_order_and_skips_failures() {
        let mut ram = ram(8);
        let mapper = OffsetPhysMapper::new(PhysicalAddress::new(RAM_BASE), ram.as_mut_ptr().cast());
        let mut entries = [
            MemoryMapEntry::available(RAM_BASE, 0x2000),
            MemoryMapEntry::reserved(RAM_BASE + 0x2000, 0x1000),
            MemoryMapEntry::available(RAM_BASE + 0x3000, 0x20),
            MemoryMapEntry::available(RAM_BASE + 0x4000, 0x4000),
        ];

        let registry = unsafe { RegionRegistry::build(&mut entries, &KERNEL, &mapper) };

        assert_eq!(registry.len(), 2);
        let ids: Vec<_> = registry.iter().map(|(id, _)| id.index()).collect();
        assert_eq!(ids, [0, 1]);

        let bases: Vec<_> = registry.iter().map(|(_, r)| r.base().as_u64()).collect();
        assert_eq!(bases, [RAM_BASE, RAM_BASE + 0x4000]);

        // The too-small entry is reserved; the reserved one is left alone.
        assert!(!entries[2].is_available());
        assert_eq!(entries[1], MemoryMapEntry::reserved(RAM_BASE + 0x2000, 0x1000));

        assert_eq!(
            registry.owner_of(PhysicalAddress::new(RAM_BASE + 0x4400)),
            Some(RegionId::new(1))
        );
        assert_eq!(registry.owner_of(PhysicalAddress::new(RAM_BASE + 0x2000)), None);
    }

    #[test]
    fn empty_map_builds_empty_registry() {
        let mapper = OffsetPhysMapper::identity();
        let registry = unsafe { RegionRegistry::build(&mut [], &KERNEL, &mapper) };
        assert!(registry.is_empty());
        assert_eq!(registry.root(), None);
        assert_eq!(registry.iter().count(), 0);
    }
}
