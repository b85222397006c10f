//! Requester identity, ledger entries, and the serializable ledger view.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

thread_local! {
    /// Dropped when the thread exits, which is what lets a [`Requester`]
    /// tell whether its thread is still running.
    static LIVENESS: Arc<()> = Arc::new(());
}

/// Identity of the thread requesting the write lock.
///
/// Equality and hashing use the thread id only; the name is carried along for
/// log lines and diagnostics.
#[derive(Debug, Clone)]
pub struct Requester {
    id: ThreadId,
    name: Arc<str>,
    alive: Weak<()>,
}

impl Requester {
    /// Identity of the calling thread.
    pub fn current() -> Self {
        let thread = thread::current();
        let name: Arc<str> = match thread.name() {
            Some(name) => Arc::from(name),
            None => Arc::from(format!("{:?}", thread.id())),
        };
        Self {
            id: thread.id(),
            name,
            alive: LIVENESS.with(Arc::downgrade),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the requester's thread has not exited yet.
    pub fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

impl PartialEq for Requester {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Requester {}

impl Hash for Requester {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Advisory cancellation flag shared between the coordinator and a holder.
///
/// Tripped when the holder is evicted; the holder is expected to poll it
/// (through `WriteCoordinator::check_cancelled`) at safe points.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One requester's entry in the ledger, holding or waiting.
#[derive(Debug)]
pub(crate) struct LockRequest {
    pub requester: Requester,
    pub enqueued_at: Instant,
    /// Set when the request is promoted to the head of the ledger.
    pub acquired_at: Option<Instant>,
    pub hold_count: u32,
    pub warning_issued: bool,
    pub token: CancellationToken,
    /// How long an earlier hold of the same requester ran before it was
    /// evicted, when that eviction is still unresolved.
    pub evicted_after: Option<Duration>,
    pub acquire_site: Arc<Backtrace>,
}

impl LockRequest {
    pub fn new(requester: Requester, now: Instant) -> Self {
        Self {
            requester,
            enqueued_at: now,
            acquired_at: None,
            hold_count: 1,
            warning_issued: false,
            token: CancellationToken::new(),
            evicted_after: None,
            acquire_site: Arc::new(Backtrace::capture()),
        }
    }

    /// Time spent as holder, or zero if the request never reached the head.
    pub fn held_for(&self, now: Instant) -> Duration {
        self.acquired_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }

    /// Detach the information the escalation path needs outside the mutex.
    pub fn holder_info(&self, now: Instant) -> HolderInfo {
        HolderInfo {
            requester: self.requester.clone(),
            held_for: self.held_for(now),
            hold_count: self.hold_count,
            token: self.token.clone(),
            acquire_site: Arc::clone(&self.acquire_site),
        }
    }
}

/// Snapshot of a holder handed to the interrupter and notifier.
#[derive(Debug, Clone)]
pub struct HolderInfo {
    pub requester: Requester,
    pub held_for: Duration,
    pub hold_count: u32,
    pub token: CancellationToken,
    /// Backtrace taken when the holder first requested the lock.
    pub acquire_site: Arc<Backtrace>,
}

/// Role of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    Holder,
    Waiter,
}

/// Serializable view of one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub requester: String,
    pub role: EntryRole,
    pub hold_count: u32,
    pub waited_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_ms: Option<u64>,
    pub warning_issued: bool,
}

/// Serializable view of the whole ledger, holder first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub entries: Vec<LedgerEntry>,
    /// Evicted requesters whose outstanding releases have not been seen yet.
    pub dispossessed: Vec<String>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn holder(&self) -> Option<&LedgerEntry> {
        self.entries.first()
    }

    pub fn contains(&self, requester: &str) -> bool {
        self.entries.iter().any(|e| e.requester == requester)
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            EntryRole::Holder => write!(
                f,
                "{} (holder, count: {}, held: {}ms{})",
                self.requester,
                self.hold_count,
                self.held_ms.unwrap_or(0),
                if self.warning_issued { ", WARNED" } else { "" }
            ),
            EntryRole::Waiter => write!(
                f,
                "{} (waiting {}ms)",
                self.requester, self.waited_ms
            ),
        }
    }
}
