//! Exit code constants for the writelock binary.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 4: Lock failure (would block, holder evicted)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Lock failure: the write lock was unavailable or the hold was evicted.
pub const LOCK_FAILURE: i32 = 4;
