//! Write-access coordinator.
//!
//! Serializes write access to a shared resource across the threads of one
//! process:
//! - Requests are admitted in FIFO order through a ledger whose head is the
//!   holder
//! - The holder may re-acquire without queueing (reentrant hold count)
//! - The waiter directly behind the holder watches it, warns once after
//!   `warn_after`, and evicts it after `max_wait`
//!
//! # Eviction
//!
//! Eviction removes the holder's ledger entry regardless of its hold count,
//! then (outside the ledger mutex) captures diagnostics, asks the victim to
//! stop through its cancellation token, and alerts administrators. Victims
//! learn about it by polling [`WriteCoordinator::check_cancelled`], which keeps
//! failing until they have unwound every hold, even across a re-acquire; their
//! later releases are ignored.
//!
//! # RAII Guards
//!
//! [`WriteCoordinator::lock`] returns a [`WriteLockGuard`] that releases the
//! hold when dropped. [`WriteCoordinator::acquire`] and
//! [`WriteCoordinator::release`] are available for explicit pairing.

mod collaborators;
mod coordinator;
mod escalation;
mod guard;
mod metadata;
mod operations;
mod types;


// Re-export public API
pub use collaborators::{
    AdminNotifier, CooperativeInterrupter, FixedServerRole, Interrupter, LogOnlyInterrupter,
    ServerMode, ServerRole, SharedServerRole,
};
pub use coordinator::{
    AcquireOptions, DEFAULT_MAX_WAIT, DEFAULT_WARN_AFTER, WriteCoordinator,
    WriteCoordinatorBuilder,
};
pub use guard::WriteLockGuard;
pub use metadata::{AdminAlert, Attachment, DiagnosticSnapshot};
pub use types::{
    CancellationToken, EntryRole, HolderInfo, LedgerEntry, LedgerSnapshot, Requester,
};
