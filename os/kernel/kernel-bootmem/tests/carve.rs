mod common;

use common::{GARBAGE, KIB, MIB, TestRam};
use kernel_bootmem::carve::carve;
use kernel_bootmem::planner::{REGION_METADATA_SIZE, plan};
use kernel_bootmem::{CarveError, RegionRegistry};
use kernel_info::boot::multiboot::{MultibootInfoFlags, MultibootMmap};
use kernel_info::boot::{KernelImage, MemoryKind, MemoryMapEntry};
use kernel_info::memory::{MAX_BOOT_REGIONS, PAGE_SIZE};
use kernel_memory_addresses::{PhysicalAddress, PhysicalRange};

/// Kernel loaded at 1 MiB, ending in the middle of a page.
const KERNEL: KernelImage = KernelImage::new(
    PhysicalAddress::new(MIB),
    PhysicalAddress::new(MIB + 0x8_0123),
);

fn pc_map() -> [MemoryMapEntry; 6] {
    [
        MemoryMapEntry::available(0, 0x9_FC00),
        MemoryMapEntry::reserved(0x9_FC00, 0x400),
        MemoryMapEntry::reserved(0xF_0000, 0x1_0000),
        MemoryMapEntry::available(MIB, 5 * MIB),
        MemoryMapEntry::new(PhysicalAddress::new(6 * MIB), MIB, MemoryKind::AcpiReclaimable),
        MemoryMapEntry::available(7 * MIB, MIB),
    ]
}

#[test]
fn pc_memory_map_yields_two_regions() {
    let mut ram = TestRam::new(0, 8 * MIB);
    let mapper = ram.mapper();
    let mut map = pc_map();

    let registry = unsafe { RegionRegistry::build(&mut map, &KERNEL, &mapper) };
    assert_eq!(registry.len(), 2);

    let regions: Vec<_> = registry.iter().map(|(_, region)| region).collect();
    assert_eq!(regions[0].base(), PhysicalAddress::new(MIB + 0x8_1000));
    assert_eq!(regions[1].base(), PhysicalAddress::new(7 * MIB));

    // Low memory is reserved, the other non-RAM entries are left alone.
    assert_eq!(map[0].kind, MemoryKind::Reserved);
    assert_eq!(map[1], MemoryMapEntry::reserved(0x9_FC00, 0x400));
    assert_eq!(map[4].kind, MemoryKind::AcpiReclaimable);

    // Carved entries shrink to the span the region manages.
    assert_eq!(map[3], MemoryMapEntry::available(MIB + 0x8_1000, 5 * MIB - 0x8_1000));
    assert_eq!(map[5], MemoryMapEntry::available(7 * MIB, MIB));
}

#[test]
fn carved_regions_fit_their_span_and_avoid_kernel_and_low_memory() {
    let mut ram = TestRam::new(0, 8 * MIB);
    let mapper = ram.mapper();
    let mut map = pc_map();

    let registry = unsafe { RegionRegistry::build(&mut map, &KERNEL, &mapper) };
    let spans: Vec<PhysicalRange> = map
        .iter()
        .filter(|e| e.is_available())
        .map(MemoryMapEntry::range)
        .collect();

    for ((_, region), span) in registry.iter().zip(&spans) {
        assert!(region.is_intact());
        assert_eq!(region.base(), span.start());

        let planned = plan(span.len());
        assert_eq!(u64::from(region.block_count()), planned.block_count);
        assert!(planned.footprint(REGION_METADATA_SIZE) <= span.len());
        assert!(region.footprint().end() <= span.end());

        assert!(!region.footprint().overlaps(&KERNEL.range()));
        assert!(region.base().as_u64() >= MIB);
        assert!(region.base().as_u64().is_multiple_of(PAGE_SIZE));

        assert_eq!(region.free_blocks(), region.block_count());
        assert_eq!(region.bitmap_address(), region.block_range().end());
        assert_eq!(
            region.header_address(),
            region.bitmap_address() + u64::from(region.bitmap_words()) * 4
        );
    }
}

#[test]
fn carving_zeroes_only_the_span() {
    let mut ram = TestRam::new(0, 8 * MIB);
    let mapper = ram.mapper();
    let mut entry = MemoryMapEntry::available(7 * MIB + 0x800, 64 * KIB);

    let region = unsafe { carve(&mut entry, &KERNEL, &mapper) }.unwrap();
    let header = region.header_address().as_u64();
    drop(region);

    // The partial page in front of the aligned start is not ours.
    assert!(ram.bytes(7 * MIB + 0x800, 0x800).iter().all(|&b| b == GARBAGE));
    assert!(ram.bytes(7 * MIB + 0x1000, 4 * 1024).iter().all(|&b| b == 0));
    assert_eq!(ram.bytes(header, 4), b"BMRG");
    assert!(ram.bytes(7 * MIB + 0x800 + 64 * KIB, 16).iter().all(|&b| b == GARBAGE));
}

#[test]
fn failed_carves_reserve_the_entry() {
    let mut ram = TestRam::new(0, 8 * MIB);
    let mapper = ram.mapper();

    let cases = [
        (MemoryMapEntry::available(0, 0x9_FC00), CarveError::BelowLowMemory),
        (MemoryMapEntry::available(MIB + 0x1000, 0x1000), CarveError::InsideKernelImage),
        (MemoryMapEntry::available(7 * MIB + 1, 0xFFF), CarveError::ConsumedByAlignment),
        (MemoryMapEntry::available(7 * MIB, 1024), CarveError::TooSmall),
    ];

    for (mut entry, expected) in cases {
        let err = unsafe { carve(&mut entry, &KERNEL, &mapper) }.unwrap_err();
        assert_eq!(err, expected);
        assert_eq!(entry.kind, MemoryKind::Reserved);
    }

    let mut acpi = MemoryMapEntry::new(PhysicalAddress::new(6 * MIB), MIB, MemoryKind::AcpiNvs);
    let before = acpi;
    let err = unsafe { carve(&mut acpi, &KERNEL, &mapper) }.unwrap_err();
    assert_eq!(err, CarveError::NotAvailable);
    assert_eq!(acpi, before);
}

#[test]
fn arena_overflow_leaves_entries_untouched() {
    let entries = MAX_BOOT_REGIONS + 8;
    let base = 2 * MIB;
    let mut ram = TestRam::new(base, entries as u64 * 4 * KIB);
    let mapper = ram.mapper();

    let mut map: Vec<_> = (0..entries as u64)
        .map(|i| MemoryMapEntry::available(base + i * 4 * KIB, 4 * KIB))
        .collect();
    let before = map.clone();

    let registry = unsafe { RegionRegistry::build(&mut map, &KERNEL, &mapper) };

    assert_eq!(registry.len(), MAX_BOOT_REGIONS);
    assert!(registry.is_full());
    assert_eq!(&map[MAX_BOOT_REGIONS..], &before[MAX_BOOT_REGIONS..]);

    let last = registry.iter().last().unwrap().1;
    assert_eq!(last.next(), None);
    assert_eq!(last.base().as_u64(), base + (MAX_BOOT_REGIONS as u64 - 1) * 4 * KIB);
}

#[test]
fn multiboot_map_feeds_the_registry() {
    fn record(base: u64, length: u64, kind: u32) -> Vec<u8> {
        let mut v = 20u32.to_le_bytes().to_vec();
        v.extend_from_slice(&base.to_le_bytes());
        v.extend_from_slice(&length.to_le_bytes());
        v.extend_from_slice(&kind.to_le_bytes());
        v
    }

    let mut raw = record(0, 0x9_FC00, 1);
    raw.extend(record(0x9_FC00, 0x400, 2));
    raw.extend(record(MIB, 3 * MIB, 1));

    let flags = MultibootInfoFlags::new().with_mem(true).with_mmap(true);
    let mut map: Vec<_> = MultibootMmap::new(flags, &raw).unwrap().collect();

    let mut ram = TestRam::new(0, 4 * MIB);
    let mapper = ram.mapper();
    let registry = unsafe { RegionRegistry::build(&mut map, &KERNEL, &mapper) };

    assert_eq!(registry.len(), 1);
    let (_, region) = registry.iter().next().unwrap();
    assert_eq!(region.block_range().start(), PhysicalAddress::new(MIB + 0x8_1000));
    assert!(region.footprint().end().as_u64() <= 4 * MIB);
}
