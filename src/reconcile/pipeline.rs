//! One reconciliation pass for a roster group.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::engine::{contested_members, reconcile, MatchCounts};
use super::grant::GrantApplier;
use crate::context::ServiceContext;
use crate::model::{
    AliasPair, DirectiveBasis, GrantDirective, GrantOutcome, MemberId, RoleId, RoleIndex,
    RosterRecord,
};
use crate::ports::catalog::RoleCatalog;
use crate::ports::{Clock, DirectorySource, IdGenerator, ReportSink, RosterSource, RowDiagnostic};
use crate::scheduler::{PassFuture, PassHandler};

/// What a pass should grant. Replayed unchanged on every scheduled tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOptions {
    /// Grant this role (by name) to every matched member instead of roster roles.
    #[serde(default)]
    pub override_role: Option<String>,
    /// Roster field the role names come from.
    #[serde(default)]
    pub basis: DirectiveBasis,
    /// Compute outcomes without calling the platform.
    #[serde(default)]
    pub dry_run: bool,
}

/// Conditions that abort a whole pass.
#[derive(Debug, Error)]
pub enum PassError {
    /// The roster for the group could not be loaded.
    #[error("failed to load roster for {group}: {source}")]
    Roster {
        /// Group key.
        group: String,
        /// Underlying error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The directory snapshot or role catalog could not be fetched.
    #[error("failed to fetch directory snapshot: {0}")]
    Directory(#[source] Box<dyn Error + Send + Sync>),
    /// The requested override role is not in the catalog.
    #[error("override role not found: {0}")]
    UnknownOverrideRole(String),
}

/// One roster record's line in a pass summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    /// The roster record.
    pub record: RosterRecord,
    /// True when the record has no usable aliases.
    pub unmatchable: bool,
    /// Aliases that produced the match, for auditing.
    pub matched_on: Option<AliasPair>,
    /// Grant results.
    pub outcome: GrantOutcome,
}

impl RecordReport {
    /// Whether the record was matched to a member.
    #[must_use]
    pub fn found(&self) -> bool {
        self.outcome.member.is_some()
    }
}

/// Totals over a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassCounts {
    /// Matching totals.
    #[serde(flatten)]
    pub matching: MatchCounts,
    /// Roles granted (or, in a dry run, that would be granted).
    pub newly_granted: usize,
    /// Roles members already held.
    pub already_held: usize,
    /// Grant requests that failed.
    pub failed: usize,
    /// Role names dropped because the catalog lacked them.
    pub dropped: usize,
    /// Roster rows excluded as malformed.
    pub excluded: usize,
}

/// Everything one pass did, ready for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    /// Unique id of this pass.
    pub pass_id: String,
    /// Roster group key.
    pub group: String,
    /// Whether grants were only previewed.
    pub dry_run: bool,
    /// When the pass began.
    pub started_at: DateTime<Utc>,
    /// When the pass finished.
    pub finished_at: DateTime<Utc>,
    /// Per-record results in roster order.
    pub records: Vec<RecordReport>,
    /// Rows excluded from the roster.
    pub excluded: Vec<RowDiagnostic>,
    /// Members claimed by more than one record.
    pub contested: BTreeMap<MemberId, Vec<String>>,
    /// Totals.
    pub counts: PassCounts,
}

impl PassSummary {
    /// Full names of records that were not matched, sorted.
    #[must_use]
    pub fn unmatched_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .records
            .iter()
            .filter(|r| !r.found())
            .map(|r| r.record.full_name())
            .collect();
        names.sort_unstable();
        names
    }

    /// Human-readable summary.
    #[must_use]
    pub fn format(&self) -> String {
        let c = &self.counts;
        let mut out = String::new();
        let mode = if self.dry_run { " (dry run)" } else { "" };
        let _ = writeln!(out, "Pass {} for {}{mode}", self.pass_id, self.group);
        let _ = writeln!(
            out,
            "  matched: {}  unmatched: {}  unmatchable: {}  excluded: {}",
            c.matching.matched, c.matching.unmatched, c.matching.unmatchable, c.excluded
        );
        let _ = writeln!(
            out,
            "  newly granted: {}  already held: {}  failed: {}  dropped roles: {}",
            c.newly_granted, c.already_held, c.failed, c.dropped
        );
        for (member, names) in &self.contested {
            let _ = writeln!(out, "  CONTESTED {member}: {}", names.join(", "));
        }
        for report in self.records.iter().filter(|r| r.outcome.is_partial_failure()) {
            for failure in &report.outcome.failed {
                let _ = writeln!(
                    out,
                    "  FAILED {} role {}: {}",
                    report.record.full_name(),
                    failure.role,
                    failure.reason
                );
            }
        }
        out
    }
}

/// Runs reconciliation passes: load, match, grant, report.
pub struct PassRunner {
    roster: Arc<dyn RosterSource>,
    directory: Arc<dyn DirectorySource>,
    reports: Option<Arc<dyn ReportSink>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    applier: GrantApplier,
}

impl PassRunner {
    /// Wires a runner from the service context and a roster source.
    ///
    /// `reports` receives each finished summary; pass `None` to skip reporting.
    #[must_use]
    pub fn new(
        ctx: &ServiceContext,
        roster: Arc<dyn RosterSource>,
        reports: Option<Arc<dyn ReportSink>>,
    ) -> Self {
        Self {
            roster,
            directory: Arc::clone(&ctx.directory),
            reports,
            clock: Arc::clone(&ctx.clock),
            ids: Arc::clone(&ctx.id_gen),
            applier: GrantApplier::new(Arc::clone(&ctx.grants)),
        }
    }

    /// Runs one pass for `group`.
    ///
    /// Records are processed sequentially in roster order. Per-record and
    /// per-grant problems are captured in the summary and never abort the pass.
    ///
    /// # Errors
    ///
    /// Returns a [`PassError`] if the roster or directory cannot be loaded, or
    /// if the override role does not exist.
    #[instrument(skip(self, options), fields(dry_run = options.dry_run))]
    pub async fn run(&self, group: &str, options: &PassOptions) -> Result<PassSummary, PassError> {
        let pass_id = self.ids.generate_id();
        let started_at = self.clock.now();
        info!(%pass_id, "starting reconciliation pass");

        let load = self
            .roster
            .load_roster(group)
            .map_err(|source| PassError::Roster { group: group.to_string(), source })?;
        for diag in &load.diagnostics {
            warn!(line = diag.line, reason = %diag.message, "excluded roster row");
        }

        let directory = self.directory.fetch_members().await.map_err(PassError::Directory)?;
        let roles = self.directory.fetch_roles().await.map_err(PassError::Directory)?;
        let catalog = RoleIndex::new(roles);

        let override_role = match &options.override_role {
            Some(name) => Some(
                catalog.lookup(name).ok_or_else(|| PassError::UnknownOverrideRole(name.clone()))?,
            ),
            None => None,
        };

        let results = reconcile(&load.records, &directory);
        let contested = contested_members(&results)
            .into_iter()
            .map(|(member, names)| (member, names.into_iter().map(String::from).collect()))
            .collect::<BTreeMap<MemberId, Vec<String>>>();
        for (member, names) in &contested {
            warn!(%member, claimed_by = ?names, "member matched by several roster records");
        }

        let mut records = Vec::with_capacity(results.len());
        for result in &results {
            let directive = directive_for(result.record, override_role, options.basis, &catalog);
            let outcome = if options.dry_run {
                self.applier.preview(result, &directive)
            } else {
                self.applier.apply(result, &directive).await
            };
            records.push(RecordReport {
                record: result.record.clone(),
                unmatchable: result.unmatchable(),
                matched_on: result.matched_on().cloned(),
                outcome,
            });
        }

        let counts = PassCounts {
            matching: MatchCounts::tally(&results),
            newly_granted: records.iter().map(|r| r.outcome.newly_granted.len()).sum(),
            already_held: records.iter().map(|r| r.outcome.already_held.len()).sum(),
            failed: records.iter().map(|r| r.outcome.failed.len()).sum(),
            dropped: records.iter().map(|r| r.outcome.dropped.len()).sum(),
            excluded: load.diagnostics.len(),
        };

        let summary = PassSummary {
            pass_id,
            group: group.to_string(),
            dry_run: options.dry_run,
            started_at,
            finished_at: self.clock.now(),
            records,
            excluded: load.diagnostics,
            contested,
            counts,
        };

        info!(
            pass_id = %summary.pass_id,
            matched = counts.matching.matched,
            unmatched = counts.matching.unmatched,
            newly_granted = counts.newly_granted,
            failed = counts.failed,
            "finished reconciliation pass"
        );

        if let Some(sink) = &self.reports {
            if let Err(err) = sink.write_report(group, &summary) {
                error!(error = %err, "failed to write assignment report");
            }
        }

        Ok(summary)
    }
}

impl PassHandler<PassOptions, Result<PassSummary, PassError>> for PassRunner {
    fn run_pass<'a>(
        &'a self,
        group: &'a str,
        options: &'a PassOptions,
    ) -> PassFuture<'a, Result<PassSummary, PassError>> {
        Box::pin(async move {
            let result = self.run(group, options).await;
            if let Err(err) = &result {
                error!(group, error = %err, "reconciliation pass failed");
            }
            result
        })
    }
}

fn directive_for(
    record: &RosterRecord,
    override_role: Option<RoleId>,
    basis: DirectiveBasis,
    catalog: &RoleIndex,
) -> GrantDirective {
    match override_role {
        Some(role) => GrantDirective::Override(role),
        None => GrantDirective::for_record(record, basis, catalog),
    }
}
