//! `rollcall groups` command.

use std::sync::Arc;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::store::RosterStore;

/// Execute the `groups` command.
///
/// # Errors
///
/// Returns an error string if the roster directory cannot be listed.
pub fn run(ctx: &ServiceContext, config: &Config) -> Result<(), String> {
    let store = RosterStore::new(Arc::clone(&ctx.fs), &config.data_dir);
    print!("{}", render(&store)?);
    Ok(())
}

fn render(store: &RosterStore) -> Result<String, String> {
    let groups = store.list_groups().map_err(|e| e.to_string())?;
    if groups.is_empty() {
        return Ok(format!("No rosters found in {}\n", store.root().join("rosters").display()));
    }
    Ok(groups.iter().map(|g| format!("{g}\n")).collect())
}
