//! Command dispatch and handlers.

pub mod assign;
pub mod groups;
pub mod match_roster;
pub mod report;
pub mod watch;

use std::future::Future;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::cli::Command;
use crate::config::Config;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// Configuration is loaded once here; commands that reach the platform build
/// a live context, the rest stay offline.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let config = Config::load(&LiveFileSystem).map_err(|e| e.to_string())?;

    match command {
        Command::Assign { group, grant } => {
            let ctx = live_context(&config)?;
            assign::run(&ctx, &config, group, &grant.to_options())
        }
        Command::Watch { groups, interval_secs, grant } => {
            let ctx = live_context(&config)?;
            watch::run(&ctx, &config, groups, *interval_secs, &grant.to_options())
        }
        Command::Report { group } => report::run(&ServiceContext::offline(), &config, group),
        Command::Match { group } => {
            let ctx = live_context(&config)?;
            match_roster::run(&ctx, &config, group)
        }
        Command::Groups => groups::run(&ServiceContext::offline(), &config),
    }
}

fn live_context(config: &Config) -> Result<ServiceContext, String> {
    ServiceContext::live(config).map_err(|e| e.to_string())
}

/// Drives an async command body to completion on a fresh runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    Ok(runtime.block_on(future))
}
