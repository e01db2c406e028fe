//! # Early-Boot Block Allocator
//!
//! The first physical memory allocator the kernel runs. It takes over the
//! boot loader's memory map and hands out small runs of 1 KiB blocks before
//! any page-frame allocator or heap exists. All of its bookkeeping lives
//! inside the memory it manages; it never allocates.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Block Allocator / Boot Slot            │
//! │    • allocate(count, alignment) / free(addr, count) │
//! │    • first fit across regions, 1..=32 blocks        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 Region Registry                     │
//! │    • fixed arena of regions, chained by index       │
//! │    • built once from the memory map                 │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │          Region Carver + Size Planner               │
//! │    • low memory and kernel image exclusion          │
//! │    • blocks | bitmap | header laid out in place     │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                Physical Mapper                      │
//! │    • identity or fixed-offset windows               │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Size Planner ([`planner`])
//! Picks the largest block count whose blocks, bitmap, and header fit a span.
//!
//! ### Region Carver ([`carve`])
//! Trims a memory-map entry to its usable span and formats a [`Region`]
//! in place. Entries that cannot be used are marked reserved.
//!
//! ### Region Registry ([`RegionRegistry`])
//! Carves every available entry once at boot and chains the regions in
//! memory-map order.
//!
//! ### Block Allocator ([`BlockAllocator`])
//! First-fit run search over the chain with per-region search cursors.
//! See the [`block_alloc`] module for the exact placement rules.
//!
//! ### Boot Slot ([`global`])
//! One process-wide allocator reachable from anywhere in the kernel after
//! [`init_block_allocator`](global::init_block_allocator).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kernel_bootmem::global::{allocate_blocks, free_blocks, init_block_allocator};
//! use kernel_bootmem::phys_mapper::OffsetPhysMapper;
//! use kernel_info::boot::{KernelImage, MemoryMapEntry};
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! let mut map = [
//!     MemoryMapEntry::reserved(0, 0x9_FC00),
//!     MemoryMapEntry::available(0x10_0000, 0x7F0_0000),
//! ];
//! let kernel = KernelImage::new(PhysicalAddress::new(0x10_0000), PhysicalAddress::new(0x30_0000));
//!
//! // Paging is off or identity mapped this early.
//! let stats = unsafe { init_block_allocator(&mut map, &kernel, &OffsetPhysMapper::identity()) }?;
//! log::info!("{} blocks free", stats.free_blocks);
//!
//! let buffer = allocate_blocks(4, 4)?;
//! free_blocks(buffer, 4)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//! Everything goes through the `log` facade: `trace!` per allocation and
//! free, `debug!` per skipped memory-map entry, `info!` for the region
//! summary, and `warn!` for refused requests. The kernel installs the sink.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod block_alloc;
pub mod carve;
mod error;
pub mod global;
pub mod phys_mapper;
pub mod planner;
pub mod region;
mod registry;

pub use block_alloc::{AllocatorStats, BlockAllocator};
pub use error::{AllocError, CarveError, FreeError, InvalidFreeReason, SlotError};
pub use region::{Region, RegionId};
pub use registry::{Chain, RegionRegistry};
