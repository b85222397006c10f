//! Command implementations for writelock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod simulate;

use crate::cli::{Command, ConfigArgs};
use std::path::Path;
use writelock::config::Config;
use writelock::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Simulate(args) => simulate::cmd_simulate(args),
        Command::Config(args) => cmd_config(args),
    }
}

/// Load the config file if one was given, otherwise use defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

fn cmd_config(args: ConfigArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_yaml()?);
    Ok(())
}
