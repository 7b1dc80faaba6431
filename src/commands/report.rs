//! `rollcall report` command.

use std::sync::Arc;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::store::RosterStore;

/// Execute the `report` command: list people the last pass could not find.
///
/// # Errors
///
/// Returns an error string if no report exists for `group`.
pub fn run(ctx: &ServiceContext, config: &Config, group: &str) -> Result<(), String> {
    let store = RosterStore::new(Arc::clone(&ctx.fs), &config.data_dir);
    print!("{}", render(&store, group)?);
    Ok(())
}

/// Renders the unmatched list from the stored report.
///
/// # Errors
///
/// Returns an error string if the report is missing or malformed.
pub fn render(store: &RosterStore, group: &str) -> Result<String, String> {
    let names = store.load_unmatched(group).map_err(|e| e.to_string())?;
    if names.is_empty() {
        return Ok(format!("Everyone in {group} was matched.\n"));
    }
    let mut out = format!("{} not found in {group}:\n", names.len());
    for name in names {
        out.push_str("  ");
        out.push_str(&name);
        out.push('\n');
    }
    Ok(out)
}
