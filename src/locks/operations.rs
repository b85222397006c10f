//! Acquire, release, and inspection operations on the write coordinator.

use super::collaborators::ServerMode;
use super::coordinator::{AcquireOptions, WriteCoordinator};
use super::escalation::{Escalation, assess};
use super::guard::WriteLockGuard;
use super::types::{LedgerSnapshot, Requester};
use crate::error::{Result, WriteLockError};
use std::backtrace::Backtrace;
use std::sync::PoisonError;
use std::time::Instant;
use tracing::{debug, error, info};

impl WriteCoordinator {
    /// Block until the calling thread holds the write lock.
    ///
    /// A thread that already holds the lock re-enters immediately and must
    /// call [`WriteCoordinator::release`] once per successful acquire.
    /// Otherwise the caller joins the back of the queue. While queued, the
    /// waiter directly behind the holder warns about, and eventually evicts,
    /// a holder that exceeds `options`.
    ///
    /// Zero timeouts fall back to the coordinator defaults.
    pub fn acquire(&self, options: AcquireOptions) {
        let options = options.normalized(self.defaults);
        let me = Requester::current();
        self.check_server_mode(&me);

        let mut state = self.lock_state();
        if state.is_held_by(&me) {
            if let Some(head) = state.queue.front_mut() {
                head.hold_count += 1;
                debug!(holder = %me, count = head.hold_count, "write lock re-entered");
            }
            return;
        }

        state.enqueue(me.clone(), Instant::now());

        let mut eviction = None;
        while !state.is_held_by(&me) {
            if let Some(holder) = state.holder() {
                info!(
                    waiter = %me,
                    holder = %holder,
                    max_wait = ?options.max_wait,
                    "Thread {} waiting for Thread {} to release write lock (maximum wait {:?})",
                    me,
                    holder,
                    options.max_wait
                );
            }

            state = self
                .released
                .wait_timeout(state, options.warn_after)
                .unwrap_or_else(PoisonError::into_inner)
                .0;

            // Only the waiter directly behind the holder watches it.
            if state.is_held_by(&me) || !state.is_next_in_line(&me) {
                continue;
            }

            let now = Instant::now();
            let Some(head) = state.queue.front_mut() else {
                continue;
            };
            match assess(head, now, &options) {
                Escalation::Evict => {
                    eviction = state.evict_head(now);
                }
                Escalation::Warn => {
                    head.warning_issued = true;
                    let holder = head.holder_info(now);
                    drop(state);
                    self.warn_holder(&me, &holder, options.warn_after);
                    state = self.lock_state();
                }
                Escalation::Wait => {}
            }
        }
        drop(state);

        if let Some(victim) = eviction {
            self.complete_eviction(&me, &victim, options.max_wait);
        }
    }

    /// [`WriteCoordinator::acquire`] with the coordinator's default timeouts.
    pub fn acquire_default(&self) {
        self.acquire(self.defaults);
    }

    /// Take the write lock only if that needs no waiting.
    ///
    /// Succeeds on re-entry or when nobody holds or waits for the lock.
    /// Never queues.
    pub fn try_acquire(&self) -> Result<()> {
        let me = Requester::current();
        self.check_server_mode(&me);

        let mut state = self.lock_state();
        if let Some(head) = state.queue.front_mut() {
            if head.requester == me {
                head.hold_count += 1;
                return Ok(());
            }
            return Err(WriteLockError::WouldBlock {
                holder: head.requester.to_string(),
            });
        }

        state.enqueue(me, Instant::now());
        Ok(())
    }

    /// Give up one hold on the write lock.
    ///
    /// Never fails. A thread whose hold was evicted consumes its outstanding
    /// releases silently; any other release by a non-holder is logged.
    pub fn release(&self) {
        let me = Requester::current();
        let mut state = self.lock_state();

        if let Some(dispossession) = state.dispossessed.get_mut(&me) {
            dispossession.outstanding = dispossession.outstanding.saturating_sub(1);
            debug!(
                requester = %me,
                outstanding = dispossession.outstanding,
                "release after eviction ignored"
            );
            if dispossession.outstanding == 0 {
                state.dispossessed.remove(&me);
            }
            return;
        }

        if !state.is_held_by(&me) {
            let holder = state
                .holder()
                .map_or_else(|| "<none>".to_string(), |h| h.to_string());
            error!(
                requester = %me,
                holder = %holder,
                "Thread {} released the write lock without holding it (current holder: {})",
                me,
                holder
            );
            return;
        }

        let Some(head) = state.queue.front_mut() else {
            return;
        };

        head.hold_count -= 1;
        if head.hold_count == 0 {
            state.pop_head(Instant::now());
            self.released.notify_all();
        }
    }

    /// Acquire and return a guard that releases on drop.
    pub fn lock(&self, options: AcquireOptions) -> WriteLockGuard<'_> {
        self.acquire(options);
        WriteLockGuard::new(self)
    }

    /// [`WriteCoordinator::lock`] with the coordinator's default timeouts.
    pub fn lock_default(&self) -> WriteLockGuard<'_> {
        self.lock(self.defaults)
    }

    /// Run `f` while holding the write lock.
    pub fn with_write_lock<T>(
        &self,
        options: AcquireOptions,
        f: impl FnOnce(&WriteLockGuard<'_>) -> T,
    ) -> T {
        let guard = self.lock(options);
        f(&guard)
    }

    /// Fails with `StuckHolderTimeout` once the calling thread's hold has
    /// been evicted and cancelled. Holders should poll this at safe points.
    pub fn check_cancelled(&self) -> Result<()> {
        let me = Requester::current();
        let state = self.lock_state();
        let evicted_after = match state.dispossessed.get(&me) {
            Some(d) if d.token.is_cancelled() => Some(d.held_for),
            Some(_) => None,
            // Re-acquired after an eviction it has not yet unwound from.
            None => state
                .queue
                .iter()
                .find(|request| request.requester == me && request.token.is_cancelled())
                .and_then(|request| request.evicted_after),
        };
        match evicted_after {
            Some(held_for) => Err(WriteLockError::StuckHolderTimeout {
                holder: me.to_string(),
                held_for,
            }),
            None => Ok(()),
        }
    }

    /// Whether the calling thread currently holds the write lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.lock_state().is_held_by(&Requester::current())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock_state().snapshot(Instant::now())
    }

    fn check_server_mode(&self, me: &Requester) {
        if self.server_role.mode() == ServerMode::Replica {
            error!(
                requester = %me,
                "Requesting write lock on replica process. Traceback in info logs"
            );
            info!(requester = %me, "{}", Backtrace::force_capture());
        }
    }
}
