//! External collaborators consulted by the coordinator.
//!
//! - [`ServerRole`] reports whether this process is a primary or a replica.
//! - [`Interrupter`] captures diagnostics for a holder and asks it to stop.
//! - [`AdminNotifier`] delivers eviction alerts to administrators.
//!
//! All calls are best-effort from the coordinator's point of view: errors
//! are logged and never propagated.

use super::metadata::{AdminAlert, DiagnosticSnapshot};
use super::types::HolderInfo;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Replication role of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerMode {
    /// Single process, no replication (default).
    #[default]
    Standalone,
    /// Replication primary; writes expected.
    Primary,
    /// Replication secondary; should not be taking write locks.
    Replica,
}

impl ServerMode {
    fn to_u8(self) -> u8 {
        match self {
            ServerMode::Standalone => 0,
            ServerMode::Primary => 1,
            ServerMode::Replica => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ServerMode::Primary,
            2 => ServerMode::Replica,
            _ => ServerMode::Standalone,
        }
    }
}

/// Reports the current server mode.
pub trait ServerRole: Send + Sync {
    fn mode(&self) -> ServerMode;
}

/// Server role that never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedServerRole(pub ServerMode);

impl ServerRole for FixedServerRole {
    fn mode(&self) -> ServerMode {
        self.0
    }
}

/// Server role that can be switched at runtime, e.g. on failover.
#[derive(Debug, Default)]
pub struct SharedServerRole {
    mode: AtomicU8,
}

impl SharedServerRole {
    pub fn new(mode: ServerMode) -> Self {
        Self {
            mode: AtomicU8::new(mode.to_u8()),
        }
    }

    pub fn set(&self, mode: ServerMode) {
        self.mode.store(mode.to_u8(), Ordering::SeqCst);
    }
}

impl ServerRole for SharedServerRole {
    fn mode(&self) -> ServerMode {
        ServerMode::from_u8(self.mode.load(Ordering::SeqCst))
    }
}

/// Captures diagnostics for a holder and requests that it stop.
pub trait Interrupter: Send + Sync {
    /// Capture a diagnostic snapshot of the holder.
    fn capture_diagnostics(&self, holder: &HolderInfo) -> Result<DiagnosticSnapshot>;

    /// Ask the holder to abandon its work.
    ///
    /// Returns `Ok(false)` when this interrupter has no way to reach the
    /// holder, in which case eviction is logged only.
    fn request_cancellation(&self, holder: &HolderInfo) -> Result<bool>;
}

/// Trips the holder's cancellation token. The holder observes it through
/// `WriteCoordinator::check_cancelled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CooperativeInterrupter;

impl Interrupter for CooperativeInterrupter {
    fn capture_diagnostics(&self, holder: &HolderInfo) -> Result<DiagnosticSnapshot> {
        Ok(DiagnosticSnapshot::from_holder(holder))
    }

    fn request_cancellation(&self, holder: &HolderInfo) -> Result<bool> {
        holder.token.cancel();
        Ok(true)
    }
}

/// Captures diagnostics but never cancels; evicted holders run on unaware.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyInterrupter;

impl Interrupter for LogOnlyInterrupter {
    fn capture_diagnostics(&self, holder: &HolderInfo) -> Result<DiagnosticSnapshot> {
        Ok(DiagnosticSnapshot::from_holder(holder))
    }

    fn request_cancellation(&self, _holder: &HolderInfo) -> Result<bool> {
        Ok(false)
    }
}

/// Delivers alerts through an administrative channel (e-mail, pager, ...).
pub trait AdminNotifier: Send + Sync {
    fn notify_admin(&self, alert: &AdminAlert) -> Result<()>;
}
