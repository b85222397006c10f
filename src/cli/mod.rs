//! CLI argument parsing for writelock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! Implementations live in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Writelock: exercise the fair write-lock coordinator.
#[derive(Parser, Debug)]
#[command(name = "writelock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log filter (e.g. `info`, `writelock=debug`).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for writelock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run worker threads against one coordinator.
    ///
    /// Every worker acquires the lock, increments a shared counter, holds
    /// for `--hold-ms` and releases. Worker 0 additionally stalls for
    /// `--stall-ms`, so a stall longer than the max wait exercises eviction.
    Simulate(SimulateArgs),

    /// Print the effective configuration as YAML.
    Config(ConfigArgs),
}

/// Arguments for the `simulate` command.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Number of worker threads.
    #[arg(short, long, default_value_t = 8)]
    pub workers: usize,

    /// Milliseconds each worker holds the lock.
    #[arg(long, default_value_t = 10)]
    pub hold_ms: u64,

    /// Extra milliseconds worker 0 holds the lock.
    #[arg(long, default_value_t = 0)]
    pub stall_ms: u64,

    /// Override `max_wait_ms` from the config.
    #[arg(long)]
    pub max_wait_ms: Option<u64>,

    /// Override `warn_after_ms` from the config.
    #[arg(long)]
    pub warn_after_ms: Option<u64>,

    /// Path to a YAML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `config` command.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Path to a YAML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_simulate_overrides() {
        let cli = Cli::try_parse_from([
            "writelock",
            "simulate",
            "--workers",
            "3",
            "--stall-ms",
            "500",
            "--max-wait-ms",
            "200",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Command::Simulate(args) => {
                assert_eq!(args.workers, 3);
                assert_eq!(args.stall_ms, 500);
                assert_eq!(args.max_wait_ms, Some(200));
                assert_eq!(args.warn_after_ms, None);
                assert!(args.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn log_level_is_global() {
        let cli = Cli::try_parse_from(["writelock", "config", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
    }
}
