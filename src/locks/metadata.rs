//! Diagnostic snapshots and administrative alerts produced on eviction.

use super::types::HolderInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::backtrace::BacktraceStatus;
use std::time::Duration;

/// Diagnostics captured for a holder that is being warned about or evicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSnapshot {
    /// Name of the holder thread.
    pub requester: String,

    /// How long the holder had held the lock when the snapshot was taken.
    pub held_for_ms: u64,

    /// Reentrant hold count at capture time.
    pub hold_count: u32,

    /// Rendered trace lines.
    pub trace: Vec<String>,
}

impl DiagnosticSnapshot {
    /// Render the holder's acquisition-site backtrace.
    pub fn from_holder(holder: &HolderInfo) -> Self {
        let trace = match holder.acquire_site.status() {
            BacktraceStatus::Captured => holder
                .acquire_site
                .to_string()
                .lines()
                .map(str::to_string)
                .collect(),
            _ => vec![
                "acquisition backtrace unavailable (set RUST_BACKTRACE=1 to capture)".to_string(),
            ],
        };
        Self::with_trace(holder, trace)
    }

    /// Placeholder used when capturing diagnostics failed.
    pub fn unavailable(holder: &HolderInfo, reason: &str) -> Self {
        Self::with_trace(holder, vec![format!("diagnostics unavailable: {}", reason)])
    }

    fn with_trace(holder: &HolderInfo, trace: Vec<String>) -> Self {
        Self {
            requester: holder.requester.to_string(),
            held_for_ms: duration_ms(holder.held_for),
            hold_count: holder.hold_count,
            trace,
        }
    }

    pub fn render(&self) -> String {
        self.trace.join("\n")
    }
}

/// Attachment delivered with an administrative alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub content: String,
    pub filename: String,
    pub content_type: String,
}

/// Alert sent to administrators when a stuck holder is evicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAlert {
    pub message: String,
    pub attachment: Attachment,

    /// Wall-clock time of the eviction.
    pub evicted_at: DateTime<Utc>,

    /// Process that performed the eviction (`user@HOST`).
    pub reporter: String,
}

impl AdminAlert {
    /// Build the alert for an eviction of `victim` performed by `evictor`.
    pub fn for_eviction(evictor: &str, victim: &str, max_wait: Duration, report: String) -> Self {
        let message = [
            "== Blocking Thread in Write Lock ==".to_string(),
            format!(
                "The thread {} has blocked the write lock for over {:?}",
                victim, max_wait
            ),
            "Attached is the traceback and the attempt to kill it.".to_string(),
            format!(
                "Thread {} is the thread attempting to kill it, which will now take the write lock.",
                evictor
            ),
        ]
        .join("\n");

        Self {
            message,
            attachment: Attachment {
                content: report,
                filename: "debug.txt".to_string(),
                content_type: "text/plain".to_string(),
            },
            evicted_at: Utc::now(),
            reporter: get_reporter_string(),
        }
    }
}

/// Report attached to an eviction alert.
#[derive(Debug, Default)]
pub(crate) struct EvictionReport {
    lines: Vec<String>,
}

impl EvictionReport {
    pub fn new() -> Self {
        Self {
            lines: vec!["=== Tracebacks from attempt to kill blocking thread ===".to_string()],
        }
    }

    pub fn section(&mut self, heading: String) {
        self.lines.push(format!("== {} ==", heading));
    }

    pub fn block(&mut self, content: &[String]) {
        self.lines.push("{{{".to_string());
        self.lines.extend(content.iter().cloned());
        self.lines.push("}}}".to_string());
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Get the reporter string for alerts.
pub(crate) fn get_reporter_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
