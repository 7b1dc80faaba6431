//! Roster-to-guild role reconciliation.
//!
//! Loads a community roster, matches each person to a platform member by
//! alias containment, and grants the roles the roster asks for. Passes can
//! run once from the CLI or on a fixed interval per roster group.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod model;
pub mod ports;
pub mod reconcile;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}
