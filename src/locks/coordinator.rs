//! The write coordinator: ledger state, acquisition options, and builder.

use super::collaborators::{
    AdminNotifier, CooperativeInterrupter, FixedServerRole, Interrupter, ServerRole,
};
use super::metadata::duration_ms;
use super::types::{
    CancellationToken, EntryRole, HolderInfo, LedgerEntry, LedgerSnapshot, LockRequest, Requester,
};
use crate::config::Config;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default hard timeout after which a stuck holder is evicted.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(120);

/// Default soft timeout after which a stuck holder is warned about.
pub const DEFAULT_WARN_AFTER: Duration = Duration::from_secs(30);

/// Per-call timeouts for [`WriteCoordinator::acquire`].
///
/// Both values are enforced by the waiter that is next in line, not by the
/// caller itself: `max_wait` bounds how long the current holder may keep the
/// lock, and `warn_after` is both the warning threshold and the period at
/// which waiters wake to re-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOptions {
    pub max_wait: Duration,
    pub warn_after: Duration,
}

impl AcquireOptions {
    pub fn new(max_wait: Duration, warn_after: Duration) -> Self {
        Self {
            max_wait,
            warn_after,
        }
    }

    /// Replace zero timeouts with the coordinator defaults.
    pub fn normalized(self, defaults: AcquireOptions) -> Self {
        Self {
            max_wait: if self.max_wait.is_zero() {
                defaults.max_wait
            } else {
                self.max_wait
            },
            warn_after: if self.warn_after.is_zero() {
                defaults.warn_after
            } else {
                self.warn_after
            },
        }
    }
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WAIT, DEFAULT_WARN_AFTER)
    }
}

/// Record of an evicted holder whose own releases are still outstanding.
#[derive(Debug)]
pub(crate) struct Dispossession {
    pub outstanding: u32,
    pub held_for: Duration,
    pub token: CancellationToken,
}

/// Everything guarded by the coordinator mutex.
#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    /// FIFO of requests; the head is the holder.
    pub queue: VecDeque<LockRequest>,
    pub dispossessed: HashMap<Requester, Dispossession>,
}

impl LedgerState {
    pub fn is_held_by(&self, requester: &Requester) -> bool {
        self.queue
            .front()
            .is_some_and(|head| head.requester == *requester)
    }

    pub fn is_next_in_line(&self, requester: &Requester) -> bool {
        self.queue
            .get(1)
            .is_some_and(|next| next.requester == *requester)
    }

    pub fn holder(&self) -> Option<&Requester> {
        self.queue.front().map(|head| &head.requester)
    }

    /// Append a request for `requester`, promoting it at once if the ledger
    /// is empty.
    ///
    /// An unresolved eviction of the same requester is folded into the new
    /// request: its outstanding holds keep nested releases balanced, and its
    /// tripped token keeps `check_cancelled` failing until the requester has
    /// unwound every hold.
    pub fn enqueue(&mut self, requester: Requester, now: Instant) {
        let carried = self.dispossessed.remove(&requester);
        self.prune_dispossessed();
        let mut request = LockRequest::new(requester, now);
        if let Some(dispossession) = carried {
            request.hold_count += dispossession.outstanding;
            request.token = dispossession.token;
            request.evicted_after = Some(dispossession.held_for);
        }
        if self.queue.is_empty() {
            request.acquired_at = Some(now);
        }
        self.queue.push_back(request);
    }

    /// Remove the head unconditionally and record it as dispossessed.
    pub fn evict_head(&mut self, now: Instant) -> Option<HolderInfo> {
        let victim = self.queue.pop_front()?;
        let info = victim.holder_info(now);
        self.prune_dispossessed();
        self.dispossessed.insert(
            victim.requester,
            Dispossession {
                outstanding: victim.hold_count,
                held_for: info.held_for,
                token: victim.token,
            },
        );
        self.promote_head(now);
        Some(info)
    }

    /// Forget evicted requesters whose threads exited without releasing.
    fn prune_dispossessed(&mut self) {
        self.dispossessed.retain(|requester, _| requester.is_alive());
    }

    /// Remove the head after its final release.
    pub fn pop_head(&mut self, now: Instant) {
        self.queue.pop_front();
        self.promote_head(now);
    }

    fn promote_head(&mut self, now: Instant) {
        if let Some(head) = self.queue.front_mut() {
            head.acquired_at = Some(now);
        }
    }

    pub fn snapshot(&self, now: Instant) -> LedgerSnapshot {
        let entries = self
            .queue
            .iter()
            .enumerate()
            .map(|(i, request)| LedgerEntry {
                requester: request.requester.to_string(),
                role: if i == 0 {
                    EntryRole::Holder
                } else {
                    EntryRole::Waiter
                },
                hold_count: request.hold_count,
                waited_ms: duration_ms(now.saturating_duration_since(request.enqueued_at)),
                held_ms: request.acquired_at.map(|_| duration_ms(request.held_for(now))),
                warning_issued: request.warning_issued,
            })
            .collect();

        let mut dispossessed: Vec<String> =
            self.dispossessed.keys().map(|r| r.to_string()).collect();
        dispossessed.sort();

        LedgerSnapshot {
            entries,
            dispossessed,
        }
    }
}

/// Fair, reentrant, process-wide write lock with stuck-holder eviction.
///
/// Share one coordinator per protected resource, typically behind an `Arc`.
pub struct WriteCoordinator {
    pub(crate) state: Mutex<LedgerState>,
    pub(crate) released: Condvar,
    pub(crate) defaults: AcquireOptions,
    pub(crate) server_role: Arc<dyn ServerRole>,
    pub(crate) interrupter: Arc<dyn Interrupter>,
    pub(crate) notifier: Option<Arc<dyn AdminNotifier>>,
}

impl WriteCoordinator {
    /// Coordinator with default timeouts and collaborators.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> WriteCoordinatorBuilder {
        WriteCoordinatorBuilder::default()
    }

    /// Timeouts used by [`WriteCoordinator::acquire_default`].
    pub fn defaults(&self) -> AcquireOptions {
        self.defaults
    }

    /// Lock the ledger, recovering from poisoning.
    ///
    /// Ledger mutations never leave it half-updated, so a panic in another
    /// thread while holding the mutex does not invalidate the state.
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for WriteCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WriteCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteCoordinator")
            .field("defaults", &self.defaults)
            .field("has_notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`WriteCoordinator`].
pub struct WriteCoordinatorBuilder {
    defaults: AcquireOptions,
    notify_admin: bool,
    server_role: Arc<dyn ServerRole>,
    interrupter: Arc<dyn Interrupter>,
    notifier: Option<Arc<dyn AdminNotifier>>,
}

impl Default for WriteCoordinatorBuilder {
    fn default() -> Self {
        Self {
            defaults: AcquireOptions::default(),
            notify_admin: true,
            server_role: Arc::new(FixedServerRole::default()),
            interrupter: Arc::new(CooperativeInterrupter),
            notifier: None,
        }
    }
}

impl WriteCoordinatorBuilder {
    /// Apply timeouts and alerting from a loaded config.
    pub fn config(mut self, config: &Config) -> Self {
        self.defaults = config.acquire_options();
        self.notify_admin = config.notify_admin;
        self
    }

    pub fn defaults(mut self, defaults: AcquireOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn server_role(mut self, role: Arc<dyn ServerRole>) -> Self {
        self.server_role = role;
        self
    }

    pub fn interrupter(mut self, interrupter: Arc<dyn Interrupter>) -> Self {
        self.interrupter = interrupter;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn AdminNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> WriteCoordinator {
        WriteCoordinator {
            state: Mutex::new(LedgerState::default()),
            released: Condvar::new(),
            defaults: self.defaults.normalized(AcquireOptions::default()),
            server_role: self.server_role,
            interrupter: self.interrupter,
            notifier: if self.notify_admin {
                self.notifier
            } else {
                None
            },
        }
    }
}
