//! Writelock: fair, reentrant process-wide write lock with stuck-holder
//! eviction.
//!
//! ```no_run
//! use std::sync::Arc;
//! use writelock::locks::{AcquireOptions, WriteCoordinator};
//!
//! let coordinator = Arc::new(WriteCoordinator::new());
//! let guard = coordinator.lock(AcquireOptions::default());
//! // ... write ...
//! guard.check()?;
//! drop(guard);
//! # Ok::<(), writelock::error::WriteLockError>(())
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod locks;

#[cfg(test)]
pub(crate) mod test_support;
