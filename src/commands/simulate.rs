//! Implementation of the `writelock simulate` command.
//!
//! Spawns named worker threads that contend for one coordinator and reports
//! how many completed, how many were evicted, and what the ledger looks like
//! afterwards.

use super::load_config;
use crate::cli::SimulateArgs;
use serde::Serialize;
use std::sync::{Arc, mpsc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use writelock::config::Config;
use writelock::error::{Result, WriteLockError};
use writelock::locks::{AcquireOptions, LedgerSnapshot, WriteCoordinator};

/// How often a stalling worker checks whether it has been evicted.
const STALL_POLL: Duration = Duration::from_millis(10);

/// What to run.
#[derive(Debug, Clone, Copy)]
struct SimulationPlan {
    workers: usize,
    hold: Duration,
    stall: Duration,
    options: AcquireOptions,
}

/// How one worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerOutcome {
    Completed,
    Evicted,
}

/// Result of a simulation run.
#[derive(Debug, Serialize)]
struct SimulationSummary {
    workers: usize,
    completed: usize,
    evicted: usize,
    panicked: usize,
    counter: u64,
    elapsed_ms: u64,
    ledger: LedgerSnapshot,
}

/// Execute the `writelock simulate` command.
pub fn cmd_simulate(args: SimulateArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    if args.workers == 0 {
        return Err(WriteLockError::Config(
            "--workers must be greater than 0".to_string(),
        ));
    }

    let plan = SimulationPlan {
        workers: args.workers,
        hold: Duration::from_millis(args.hold_ms),
        stall: Duration::from_millis(args.stall_ms),
        options: config.acquire_options(),
    };
    let coordinator = Arc::new(WriteCoordinator::builder().config(&config).build());
    let summary = run_simulation(coordinator, plan);

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| WriteLockError::Output(format!("summary as JSON: {}", e)))?;
        println!("{}", json);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

/// Load the configuration and apply command-line overrides.
///
/// Overriding only `--max-wait-ms` pulls the configured warning threshold
/// down with it rather than tripping validation.
fn resolve_config(args: &SimulateArgs) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(max_wait_ms) = args.max_wait_ms {
        config.max_wait_ms = max_wait_ms;
        if args.warn_after_ms.is_none() {
            config.warn_after_ms = config.warn_after_ms.min(max_wait_ms);
        }
    }
    if let Some(warn_after_ms) = args.warn_after_ms {
        config.warn_after_ms = warn_after_ms;
    }
    config.validate()?;
    Ok(config)
}

fn run_simulation(coordinator: Arc<WriteCoordinator>, plan: SimulationPlan) -> SimulationSummary {
    let counter = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    // worker-0 takes the lock before anyone else is started, so its stall is
    // always observed by a waiter.
    let (first_tx, first_rx) = mpsc::channel();
    let mut first_tx = Some(first_tx);
    let mut handles = Vec::with_capacity(plan.workers);
    for i in 0..plan.workers {
        let coordinator = Arc::clone(&coordinator);
        let counter = Arc::clone(&counter);
        let (stall, holding_tx) = if i == 0 {
            (plan.stall, first_tx.take())
        } else {
            (Duration::ZERO, None)
        };
        let handle = thread::Builder::new()
            .name(format!("worker-{}", i))
            .spawn(move || run_worker(&coordinator, &counter, plan, stall, holding_tx));
        if i == 0 && handle.is_ok() {
            let _ = first_rx.recv();
        }
        handles.push(handle);
    }

    let mut completed = 0;
    let mut evicted = 0;
    let mut panicked = 0;
    for handle in handles {
        match handle.map(|h| h.join()) {
            Ok(Ok(WorkerOutcome::Completed)) => completed += 1,
            Ok(Ok(WorkerOutcome::Evicted)) => evicted += 1,
            Ok(Err(_)) | Err(_) => panicked += 1,
        }
    }

    SimulationSummary {
        workers: plan.workers,
        completed,
        evicted,
        panicked,
        counter: counter.load(Ordering::SeqCst),
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        ledger: coordinator.snapshot(),
    }
}

fn run_worker(
    coordinator: &WriteCoordinator,
    counter: &AtomicU64,
    plan: SimulationPlan,
    stall: Duration,
    holding_tx: Option<mpsc::Sender<()>>,
) -> WorkerOutcome {
    let guard = coordinator.lock(plan.options);
    if let Some(tx) = holding_tx {
        let _ = tx.send(());
    }

    let deadline = Instant::now() + stall;
    while Instant::now() < deadline {
        if let Err(e) = guard.check() {
            warn!("abandoning work: {}", e);
            return WorkerOutcome::Evicted;
        }
        thread::sleep(STALL_POLL);
    }

    counter.fetch_add(1, Ordering::SeqCst);
    thread::sleep(plan.hold);
    info!("worker finished");
    WorkerOutcome::Completed
}

fn print_summary(summary: &SimulationSummary) {
    println!("Simulation Summary");
    println!("==================");
    println!();
    println!("  {:10} {:>6}", "Workers", summary.workers);
    println!("  {:10} {:>6}", "Completed", summary.completed);
    println!("  {:10} {:>6}", "Evicted", summary.evicted);
    if summary.panicked > 0 {
        println!("  {:10} {:>6}", "Panicked", summary.panicked);
    }
    println!("  {:10} {:>6}", "Counter", summary.counter);
    println!("  {:10} {:>6}ms", "Elapsed", summary.elapsed_ms);
    println!();

    if summary.ledger.is_empty() {
        println!("Ledger empty.");
    } else {
        println!("Ledger:");
        for entry in &summary.ledger.entries {
            println!("  - {}", entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(workers: usize, stall_ms: u64, max_wait_ms: u64) -> SimulationPlan {
        SimulationPlan {
            workers,
            hold: Duration::from_millis(5),
            stall: Duration::from_millis(stall_ms),
            options: AcquireOptions::new(
                Duration::from_millis(max_wait_ms),
                Duration::from_millis(max_wait_ms / 4),
            ),
        }
    }

    fn args(max_wait_ms: Option<u64>, warn_after_ms: Option<u64>) -> SimulateArgs {
        SimulateArgs {
            workers: 2,
            hold_ms: 1,
            stall_ms: 0,
            max_wait_ms,
            warn_after_ms,
            config: None,
            json: false,
        }
    }

    #[test]
    fn max_wait_override_alone_lowers_warning_threshold() {
        let config = resolve_config(&args(Some(200), None)).unwrap();

        assert_eq!(config.max_wait_ms, 200);
        assert_eq!(config.warn_after_ms, 200);
    }

    #[test]
    fn max_wait_override_above_warning_keeps_configured_warning() {
        let config = resolve_config(&args(Some(60_000), None)).unwrap();

        assert_eq!(config.max_wait_ms, 60_000);
        assert_eq!(config.warn_after_ms, Config::default().warn_after_ms);
    }

    #[test]
    fn explicit_warning_above_max_wait_is_rejected() {
        let err = resolve_config(&args(Some(200), Some(500))).unwrap_err();

        assert!(matches!(err, WriteLockError::Config(_)));
        assert!(err.to_string().contains("must not exceed max_wait_ms"));
    }

    #[test]
    fn simulate_runs_with_only_max_wait_override() {
        assert!(cmd_simulate(args(Some(200), None)).is_ok());
    }

    #[test]
    fn all_workers_complete_without_stall() {
        let coordinator = Arc::new(WriteCoordinator::new());

        let summary = run_simulation(coordinator, plan(6, 0, 10_000));

        assert_eq!(summary.completed, 6);
        assert_eq!(summary.evicted, 0);
        assert_eq!(summary.counter, 6);
        assert!(summary.ledger.is_empty());
    }

    #[test]
    fn stalled_worker_is_evicted() {
        let coordinator = Arc::new(WriteCoordinator::new());

        let summary = run_simulation(coordinator, plan(3, 3_000, 200));

        assert_eq!(summary.evicted, 1);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.counter, 2);
        assert!(summary.ledger.is_empty());
        assert!(summary.ledger.dispossessed.is_empty());
    }

    #[test]
    fn summary_serializes_to_json() {
        let coordinator = Arc::new(WriteCoordinator::new());
        let summary = run_simulation(coordinator, plan(1, 0, 10_000));

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"completed\":1"));
        assert!(json.contains("\"ledger\""));
    }
}
