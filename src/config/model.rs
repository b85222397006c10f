//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};

/// Configuration for the write coordinator.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Milliseconds a holder may keep the lock before the next waiter
    /// evicts it.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Milliseconds after which the next waiter logs a warning about the
    /// holder. Also the period at which waiters wake to re-check.
    #[serde(default = "default_warn_after_ms")]
    pub warn_after_ms: u64,

    /// Whether eviction alerts are sent to the configured admin notifier.
    #[serde(default = "default_true")]
    pub notify_admin: bool,
}

fn default_max_wait_ms() -> u64 {
    120_000
}

fn default_warn_after_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_wait_ms: default_max_wait_ms(),
            warn_after_ms: default_warn_after_ms(),
            notify_admin: true,
        }
    }
}
