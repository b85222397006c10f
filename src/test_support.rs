use crate::error::{Result, WriteLockError};
use crate::locks::{
    AdminAlert, AdminNotifier, DiagnosticSnapshot, HolderInfo, Interrupter, LedgerSnapshot,
    Requester, WriteCoordinator,
};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::Dispatch;

#[derive(Clone, Debug)]
struct TestLogWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for TestLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("log buffer lock poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Collects formatted log output from the current thread and from every
/// thread started through [`LogCapture::spawn`].
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    dispatch: Dispatch,
}

impl LogCapture {
    pub(crate) fn new() -> Self {
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let writer_buffer = Arc::clone(&buffer);
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || TestLogWriter {
                buffer: Arc::clone(&writer_buffer),
            })
            .finish();
        Self {
            buffer,
            dispatch: Dispatch::new(subscriber),
        }
    }

    pub(crate) fn in_scope<R>(&self, run: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, run)
    }

    /// Spawn a named thread whose logs go to this capture.
    pub(crate) fn spawn<T, F>(&self, name: &str, run: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let dispatch = self.dispatch.clone();
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || tracing::dispatcher::with_default(&dispatch, run))
            .expect("failed to spawn test thread")
    }

    pub(crate) fn contents(&self) -> String {
        let guard = self.buffer.lock().expect("log buffer lock poisoned");
        String::from_utf8_lossy(&guard).into_owned()
    }

    pub(crate) fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

/// Poll the coordinator until `predicate` holds, panicking after `timeout`.
pub(crate) fn wait_for_ledger(
    coordinator: &WriteCoordinator,
    timeout: Duration,
    predicate: impl Fn(&LedgerSnapshot) -> bool,
) {
    let deadline = Instant::now() + timeout;
    loop {
        let snapshot = coordinator.snapshot();
        if predicate(&snapshot) {
            return;
        }
        if Instant::now() > deadline {
            panic!("ledger never reached expected state: {:?}", snapshot);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Hold the lock for up to `limit`, polling for cancellation.
///
/// Returns the cancellation error if the hold was evicted.
pub(crate) fn stall_until_cancelled(
    coordinator: &WriteCoordinator,
    limit: Duration,
) -> Option<WriteLockError> {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if let Err(e) = coordinator.check_cancelled() {
            return Some(e);
        }
        thread::sleep(Duration::from_millis(10));
    }
    None
}

/// Identity of a freshly spawned, already finished thread with `name`.
pub(crate) fn requester_named(name: &str) -> Requester {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(Requester::current)
        .expect("failed to spawn test thread")
        .join()
        .expect("requester thread panicked")
}

/// Notifier that records every alert it is given.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    alerts: Mutex<Vec<AdminAlert>>,
}

impl RecordingNotifier {
    pub(crate) fn alerts(&self) -> Vec<AdminAlert> {
        self.alerts.lock().expect("alerts lock poisoned").clone()
    }
}

impl AdminNotifier for RecordingNotifier {
    fn notify_admin(&self, alert: &AdminAlert) -> Result<()> {
        self.alerts
            .lock()
            .expect("alerts lock poisoned")
            .push(alert.clone());
        Ok(())
    }
}

/// Notifier whose channel is always down.
pub(crate) struct FailingNotifier;

impl AdminNotifier for FailingNotifier {
    fn notify_admin(&self, _alert: &AdminAlert) -> Result<()> {
        Err(WriteLockError::Notification("smtp unreachable".to_string()))
    }
}

/// Interrupter that can neither capture diagnostics nor cancel.
pub(crate) struct FailingInterrupter;

impl Interrupter for FailingInterrupter {
    fn capture_diagnostics(&self, _holder: &HolderInfo) -> Result<DiagnosticSnapshot> {
        Err(WriteLockError::Notification("no frame for thread".to_string()))
    }

    fn request_cancellation(&self, _holder: &HolderInfo) -> Result<bool> {
        Err(WriteLockError::Notification("thread not found".to_string()))
    }
}
