//! `rollcall watch` command.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::ports::ReportSink;
use crate::reconcile::{PassError, PassOptions, PassRunner, PassSummary};
use crate::scheduler::ReconciliationScheduler;
use crate::store::RosterStore;

/// Scheduler driving [`PassRunner`] passes.
pub type PassScheduler = ReconciliationScheduler<PassOptions, Result<PassSummary, PassError>>;

/// Execute the `watch` command.
///
/// Schedules every group, then blocks until Ctrl-C and lets in-flight passes
/// finish before returning.
///
/// # Errors
///
/// Returns an error string if a group has no roster or the interval is zero.
pub fn run(
    ctx: &ServiceContext,
    config: &Config,
    groups: &[String],
    interval_secs: Option<u64>,
    options: &PassOptions,
) -> Result<(), String> {
    let period = interval_secs.map_or_else(|| config.interval(), Duration::from_secs);
    super::block_on(async {
        let scheduler = start_all(ctx, &config.data_dir, groups, period, options)?;
        println!(
            "Watching {} every {}s; press Ctrl-C to stop.",
            scheduler.active_groups().join(", "),
            period.as_secs()
        );
        tokio::signal::ctrl_c().await.map_err(|e| format!("Failed to wait for Ctrl-C: {e}"))?;
        info!("shutting down scheduler");
        scheduler.shutdown().await;
        Ok::<(), String>(())
    })?
}

/// Builds a scheduler over the store at `data_dir` and starts every group.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error string if a group has no roster or the interval is zero.
pub fn start_all(
    ctx: &ServiceContext,
    data_dir: &Path,
    groups: &[String],
    period: Duration,
    options: &PassOptions,
) -> Result<PassScheduler, String> {
    let store = Arc::new(RosterStore::new(Arc::clone(&ctx.fs), data_dir));
    let known: BTreeSet<String> =
        store.list_groups().map_err(|e| e.to_string())?.into_iter().collect();
    if let Some(missing) = groups.iter().find(|g| !known.contains(*g)) {
        return Err(format!("No roster for group {missing} in {}", data_dir.display()));
    }

    let runner = PassRunner::new(ctx, store.clone(), Some(store as Arc<dyn ReportSink>));
    let scheduler =
        PassScheduler::with_interval(Arc::new(runner), period).map_err(|e| e.to_string())?;
    for group in groups {
        scheduler.start(group, options.clone()).map_err(|e| e.to_string())?;
    }
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DirectoryEntry;
    use crate::ports::FileSystem;
    use crate::scheduler::GroupState;
    use crate::testing::{context, FakeGuild, MemFs};

    fn setup() -> (Arc<MemFs>, Arc<FakeGuild>, ServiceContext) {
        let fs = MemFs::with_files(&[(
            "/data/rosters/cohort.csv",
            "full_name,email,role_names,alg_names\nJane Doe,jane@example.com,Scholar,janedoe\n",
        )]);
        let guild = FakeGuild::new(vec![DirectoryEntry::new("m1", ["JaneDoe"])]);
        let ctx = context(&fs, &guild);
        (fs, guild, ctx)
    }

    fn groups(keys: &[&str]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_groups_run_and_write_reports() {
        let (fs, guild, ctx) = setup();
        let scheduler = start_all(
            &ctx,
            Path::new("/data"),
            &groups(&["cohort"]),
            Duration::from_secs(60),
            &PassOptions::default(),
        )
        .unwrap();
        assert_eq!(scheduler.active_groups(), ["cohort"]);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(fs.exists(Path::new("/data/reports/cohortreport.csv")));
        assert_eq!(guild.grant_count(), 1);

        // The second tick finds the role already confirmed.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(guild.grant_count(), 1);

        scheduler.shutdown().await;
        assert_eq!(scheduler.state("cohort"), GroupState::Cancelled);
    }

    #[tokio::test]
    async fn unknown_group_is_rejected_before_scheduling() {
        let (_fs, _guild, ctx) = setup();
        let err = start_all(
            &ctx,
            Path::new("/data"),
            &groups(&["cohort", "nobody"]),
            Duration::from_secs(60),
            &PassOptions::default(),
        )
        .err()
        .unwrap();
        assert!(err.contains("nobody"));
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let (_fs, _guild, ctx) = setup();
        let result = start_all(
            &ctx,
            Path::new("/data"),
            &groups(&["cohort"]),
            Duration::ZERO,
            &PassOptions::default(),
        );
        assert!(result.is_err());
    }
}
