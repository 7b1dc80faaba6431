//! `rollcall assign` command.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::ports::ReportSink;
use crate::reconcile::{PassOptions, PassRunner, PassSummary};
use crate::store::RosterStore;

/// Execute the `assign` command.
///
/// Runs one pass for `group`, prints the summary, and writes the assignment
/// report unless this is a dry run.
///
/// # Errors
///
/// Returns an error string if the pass cannot run.
pub fn run(
    ctx: &ServiceContext,
    config: &Config,
    group: &str,
    options: &PassOptions,
) -> Result<(), String> {
    let summary = super::block_on(run_with_context(ctx, &config.data_dir, group, options))??;
    print!("{}", summary.format());
    if !summary.dry_run {
        let store = RosterStore::new(Arc::clone(&ctx.fs), &config.data_dir);
        if let Ok(path) = store.report_path(group) {
            println!("Report written to {}", path.display());
        }
    }
    Ok(())
}

/// Runs one pass against the roster store rooted at `data_dir`.
///
/// # Errors
///
/// Returns an error string if the roster, directory, or override role cannot
/// be resolved.
pub async fn run_with_context(
    ctx: &ServiceContext,
    data_dir: &Path,
    group: &str,
    options: &PassOptions,
) -> Result<PassSummary, String> {
    let store = Arc::new(RosterStore::new(Arc::clone(&ctx.fs), data_dir));
    let reports: Option<Arc<dyn ReportSink>> =
        if options.dry_run { None } else { Some(store.clone() as Arc<dyn ReportSink>) };
    let runner = PassRunner::new(ctx, store, reports);
    runner.run(group, options).await.map_err(|e| e.to_string())
}
