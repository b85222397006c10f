//! RAII write lock guard implementation.

use super::coordinator::WriteCoordinator;
use crate::error::Result;
use std::marker::PhantomData;

/// RAII guard for one hold on the write lock.
///
/// When dropped, the hold is released. The guard is not `Send`: the lock is
/// owned by the thread that acquired it.
#[derive(Debug)]
pub struct WriteLockGuard<'a> {
    coordinator: &'a WriteCoordinator,

    /// Whether the hold has been released manually.
    released: bool,

    _not_send: PhantomData<*const ()>,
}

impl<'a> WriteLockGuard<'a> {
    pub(super) fn new(coordinator: &'a WriteCoordinator) -> Self {
        Self {
            coordinator,
            released: false,
            _not_send: PhantomData,
        }
    }

    /// Fails with `StuckHolderTimeout` if this hold has been evicted.
    pub fn check(&self) -> Result<()> {
        self.coordinator.check_cancelled()
    }

    /// Release the hold before the guard goes out of scope.
    pub fn release(mut self) {
        self.released = true;
        self.coordinator.release();
    }
}

impl Drop for WriteLockGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.coordinator.release();
        }
    }
}
