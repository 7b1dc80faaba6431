//! `rollcall match` command: show matching without granting.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::model::MatchStatus;
use crate::reconcile::{contested_members, reconcile, MatchCounts};
use crate::store::RosterStore;

/// Execute the `match` command.
///
/// # Errors
///
/// Returns an error string if the roster or directory cannot be loaded.
pub fn run(ctx: &ServiceContext, config: &Config, group: &str) -> Result<(), String> {
    let out = super::block_on(render(ctx, &config.data_dir, group))??;
    print!("{out}");
    Ok(())
}

/// Loads the roster and directory, matches them, and renders one line per
/// record followed by contested members and totals.
///
/// # Errors
///
/// Returns an error string if the roster or directory cannot be loaded.
pub async fn render(ctx: &ServiceContext, data_dir: &Path, group: &str) -> Result<String, String> {
    let store = RosterStore::new(Arc::clone(&ctx.fs), data_dir);
    let load = store.load(group).map_err(|e| e.to_string())?;
    let directory = ctx
        .directory
        .fetch_members()
        .await
        .map_err(|e| format!("Failed to fetch members: {e}"))?;

    let results = reconcile(&load.records, &directory);
    let mut out = String::new();
    for result in &results {
        let name = result.record.full_name();
        let _ = match &result.status {
            MatchStatus::Matched { member, pair } => writeln!(
                out,
                "{name}: matched {} ({} in {})",
                member.member_id, pair.target, pair.candidate
            ),
            MatchStatus::NoMatch => writeln!(out, "{name}: no match"),
            MatchStatus::Unmatchable => writeln!(out, "{name}: unmatchable (no usable aliases)"),
        };
    }
    for diag in &load.diagnostics {
        let _ = writeln!(out, "EXCLUDED line {}: {}", diag.line, diag.message);
    }
    for (member, names) in contested_members(&results) {
        let _ = writeln!(out, "CONTESTED {member}: {}", names.join(", "));
    }

    let counts = MatchCounts::tally(&results);
    let _ = writeln!(
        out,
        "{} records: {} matched, {} unmatched, {} unmatchable",
        counts.total(),
        counts.matched,
        counts.unmatched,
        counts.unmatchable
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DirectoryEntry;
    use crate::testing::{context, FakeGuild, MemFs};

    const ROSTER: &str = "\
full_name,email,role_names,alg_names
Jane Doe,jane@example.com,Scholar,janedoe
Janet Doe,janet@example.com,Scholar,doe
Sam Roe,sam@example.com,Scholar,samroe
Ann Lee,ann@example.com,Scholar,
";

    #[tokio::test]
    async fn renders_every_status_and_grants_nothing() {
        let fs = MemFs::with_files(&[("/data/rosters/cohort.csv", ROSTER)]);
        let guild = FakeGuild::new(vec![DirectoryEntry::new("m1", ["Jane_Doe#1"])]);
        let ctx = context(&fs, &guild);

        let out = render(&ctx, Path::new("/data"), "cohort").await.unwrap();

        assert_eq!(
            out,
            "Jane Doe: matched m1 (janedoe in janedoe)\n\
             Janet Doe: matched m1 (doe in janedoe)\n\
             Sam Roe: no match\n\
             Ann Lee: unmatchable (no usable aliases)\n\
             CONTESTED m1: Jane Doe, Janet Doe\n\
             4 records: 2 matched, 1 unmatched, 1 unmatchable\n"
        );
        assert_eq!(guild.grant_count(), 0);
    }

    #[tokio::test]
    async fn unknown_group_is_an_error() {
        let fs = MemFs::with_files(&[]);
        let guild = FakeGuild::new(Vec::new());
        let err = render(&context(&fs, &guild), Path::new("/data"), "cohort").await.unwrap_err();
        assert!(err.contains("no roster found"));
    }
}
