//! Staleness checks run by the next-in-line waiter, and the follow-up work
//! done after a stuck holder has been evicted.

use super::coordinator::{AcquireOptions, WriteCoordinator};
use super::metadata::{AdminAlert, DiagnosticSnapshot, EvictionReport};
use super::types::{HolderInfo, LockRequest, Requester};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Action the next-in-line waiter takes against the current holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Escalation {
    /// Holder is within its limits.
    Wait,
    /// Holder passed `warn_after` and has not been warned yet.
    Warn,
    /// Holder passed `max_wait`; remove it.
    Evict,
}

/// Decide what to do about `holder`, timed from its own `acquired_at`.
pub(crate) fn assess(holder: &LockRequest, now: Instant, options: &AcquireOptions) -> Escalation {
    let Some(acquired_at) = holder.acquired_at else {
        return Escalation::Wait;
    };
    let held_for = now.saturating_duration_since(acquired_at);

    if held_for > options.max_wait {
        Escalation::Evict
    } else if held_for > options.warn_after && !holder.warning_issued {
        Escalation::Warn
    } else {
        Escalation::Wait
    }
}

impl WriteCoordinator {
    /// Log the one-time warning about a slow holder. Called without the
    /// ledger mutex held.
    pub(crate) fn warn_holder(&self, waiter: &Requester, holder: &HolderInfo, warn_after: Duration) {
        warn!(
            waiter = %waiter,
            holder = %holder.requester,
            warn_after = ?warn_after,
            "Thread {} still waiting for write lock after {:?} - this may timeout",
            waiter,
            warn_after
        );

        match self.interrupter.capture_diagnostics(holder) {
            Ok(snapshot) => info!(
                holder = %holder.requester,
                "Traceback of thread holding write lock:\n{}",
                snapshot.render()
            ),
            Err(e) => error!(
                waiter = %waiter,
                "Exception occurred while trying to warn write lock timeout on thread {} - {}",
                waiter,
                e
            ),
        }
    }

    /// Follow up on an eviction: capture diagnostics, ask the victim to stop,
    /// and alert administrators.
    ///
    /// Runs outside the ledger mutex. The ledger entry is already gone; no
    /// failure here puts it back.
    pub(crate) fn complete_eviction(
        &self,
        evictor: &Requester,
        victim: &HolderInfo,
        max_wait: Duration,
    ) {
        let snapshot = match self.interrupter.capture_diagnostics(victim) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(
                    victim = %victim.requester,
                    "Could not capture diagnostics for thread {} - {}",
                    victim.requester,
                    e
                );
                DiagnosticSnapshot::unavailable(victim, &e.to_string())
            }
        };

        error!(
            waiter = %evictor,
            victim = %victim.requester,
            held_for = ?victim.held_for,
            "Thread {} timed out waiting for Thread {} to release write lock ... Killing blocking thread ...",
            evictor,
            victim.requester
        );
        info!(
            victim = %victim.requester,
            "Traceback of thread to be killed:\n{}",
            snapshot.render()
        );

        let mut report = EvictionReport::new();
        match self.interrupter.request_cancellation(victim) {
            Ok(true) => {
                report.section(format!(
                    "StuckHolderTimeout raised in Thread {}",
                    victim.requester
                ));
            }
            Ok(false) => {
                let msg = format!(
                    "Could not raise exception in thread {} - cancellation not supported",
                    victim.requester
                );
                warn!(victim = %victim.requester, "{}", msg);
                report.section(msg);
            }
            Err(e) => {
                let msg = format!(
                    "Could not raise exception in thread {} - {}",
                    victim.requester, e
                );
                error!(victim = %victim.requester, "{}", msg);
                report.section(msg);
            }
        }
        report.section(format!("Traceback of killed thread {}", victim.requester));
        report.block(&snapshot.trace);

        let alert = AdminAlert::for_eviction(
            evictor.name(),
            victim.requester.name(),
            max_wait,
            report.finish(),
        );

        match &self.notifier {
            Some(notifier) => {
                if let Err(e) = notifier.notify_admin(&alert) {
                    error!(
                        victim = %victim.requester,
                        "Error creating / sending alert for thread {} we're trying to kill - {}",
                        victim.requester,
                        e
                    );
                }
            }
            None => error!("No admin notifier while trying to send details of evicted thread"),
        }
    }
}
