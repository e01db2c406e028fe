//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for raw physical addresses, half-open physical
//! ranges, and the power-of-two granules used by early-boot memory code.
//!
//! ## Overview
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A raw 64-bit physical address. |
//! | [`PhysicalRange`] | A half-open `[start, end)` span of physical memory. |
//! | [`PageSize`] | Sealed marker trait for granules ([`Size1K`], [`Size4K`]). |
//!
//! The granule is a type parameter rather than a runtime value, so every
//! alignment is explicit at the call site:
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x0010_0400);
//! assert!(pa.is_aligned::<Size1K>());
//! assert_eq!(pa.align_up::<Size4K>(), Some(PhysicalAddress::new(0x0010_1000)));
//! assert_eq!(pa.frame_number::<Size1K>(), 0x401);
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]`/`Copy` and implement `Eq`, `Ord`,
//!   and `Hash`.
//! - All alignment and offset calculations are `const fn`; overflowing
//!   alignment is reported as `None` rather than wrapping.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]
#![allow(clippy::inline_always)]

mod page_size;
mod physical_address;
mod physical_range;

pub use page_size::{PageSize, Size1K, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_range::PhysicalRange;
