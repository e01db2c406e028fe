//! # Early-boot synchronization primitives
//!
//! Two building blocks for process-wide state that exists before any
//! scheduler does:
//!
//! - [`SyncOnceCell`]: a `static`-friendly cell that is written once.
//! - [`SpinMutex`]: a spinning mutex whose [`try_lock`](Mutex::try_lock)
//!   never waits, so re-entrant use on a single core is reported instead of
//!   deadlocking.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod mutex;
mod raw_spin;
mod sync_once_cell;

pub use mutex::{Mutex, MutexGuard};
pub use raw_spin::RawSpin;
pub use sync_once_cell::SyncOnceCell;

pub type SpinMutex<T> = Mutex<T, RawSpin>;

impl<T> SpinMutex<T> {
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

/// Acquiring half of a lock word.
pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;
}

/// Releasing half of a lock word.
pub trait RawUnlock {
    /// # Safety
    /// The caller must hold the lock.
    unsafe fn raw_unlock(&self);
}
