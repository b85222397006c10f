//! Error types for the write coordinator.
//!
//! Uses thiserror for derive macros. Only `StuckHolderTimeout` is ever handed
//! to a lock holder; collaborator failures are logged and swallowed inside the
//! coordinator.

use crate::exit_codes;
use std::time::Duration;
use thiserror::Error;

/// Main error type for writelock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteLockError {
    /// The caller's hold was evicted for exceeding the maximum wait and it has
    /// been asked to abort its current operation.
    #[error("write lock held too long by Thread {holder} ({held_for:?}); hold was evicted")]
    StuckHolderTimeout { holder: String, held_for: Duration },

    /// A non-blocking acquisition found the lock busy.
    #[error("write lock is held by Thread {holder}")]
    WouldBlock { holder: String },

    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(String),

    /// A command result could not be rendered or written.
    #[error("failed to write output: {0}")]
    Output(String),

    /// An interrupter or notifier failed. Never escapes the coordinator.
    #[error("notification failed: {0}")]
    Notification(String),
}

impl WriteLockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            WriteLockError::StuckHolderTimeout { .. } => exit_codes::LOCK_FAILURE,
            WriteLockError::WouldBlock { .. } => exit_codes::LOCK_FAILURE,
            WriteLockError::Config(_) => exit_codes::USER_ERROR,
            WriteLockError::Output(_) => exit_codes::USER_ERROR,
            WriteLockError::Notification(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for writelock operations.
pub type Result<T> = std::result::Result<T, WriteLockError>;
