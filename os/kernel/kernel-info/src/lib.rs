//! # Kernel Configuration and Boot Interface
//!
//! This crate defines the data structures and layout constants that govern
//! how the kernel takes over physical memory from the boot loader. It is the
//! single source of truth for those values, shared by the boot glue and the
//! memory manager.
//!
//! ## Architecture
//!
//! ### Boot Information ([`boot`])
//! * **Memory Map**: protocol-neutral [`MemoryMapEntry`](boot::MemoryMapEntry)
//!   records with a [`MemoryKind`](boot::MemoryKind) tag
//! * **Kernel Image**: the physical [`KernelImage`](boot::KernelImage) bounds
//!   the allocator must stay clear of
//! * **Multiboot**: decoding of the info `flags` word and the raw memory-map
//!   buffer ([`boot::multiboot`])
//!
//! ### Memory Layout ([`memory`])
//! * **Low Memory**: nothing below [`LOW_MEMORY_END`](memory::LOW_MEMORY_END) is handed out
//! * **Granules**: [`BLOCK_SIZE`](memory::BLOCK_SIZE) allocation blocks inside
//!   [`PAGE_SIZE`](memory::PAGE_SIZE)-aligned regions
//! * **Limits**: run length, arena capacity, and region size bounds
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1MiB)         │
//!             │  (BIOS, VGA, DMA buffers)       │
//!             ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │       Kernel Image              │
//!             ├─────────────────────────────────┤
//!             │    Available RAM                │
//!             │  (Managed by the block          │
//!             │   allocator, one region per     │
//!             │   usable memory-map entry)      │
//!             └─────────────────────────────────┘
//! ```
//!
//! ## Compile-Time Constants
//! All layout constants are `const` values checked by compile-time
//! assertions, so an inconsistent configuration fails the build.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
