//! Matches every roster record against a directory snapshot.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use super::alias::{normalize_all, CanonicalAlias};
use super::matcher::find_match;
use crate::model::{DirectoryEntry, MatchResult, MatchStatus, MemberId, RosterRecord};

/// Aggregate counts over one set of match results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    /// Records matched to a member.
    pub matched: usize,
    /// Records with aliases that found no member.
    pub unmatched: usize,
    /// Records with no usable aliases.
    pub unmatchable: usize,
}

impl MatchCounts {
    /// Tallies `results`.
    #[must_use]
    pub fn tally(results: &[MatchResult<'_>]) -> Self {
        results.iter().fold(Self::default(), |mut counts, result| {
            match result.status {
                MatchStatus::Matched { .. } => counts.matched += 1,
                MatchStatus::NoMatch => counts.unmatched += 1,
                MatchStatus::Unmatchable => counts.unmatchable += 1,
            }
            counts
        })
    }

    /// Total records counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matched + self.unmatched + self.unmatchable
    }
}

/// Matches each roster record, in order, to the first directory entry whose
/// aliases contain one of the record's aliases.
///
/// Greedy and order dependent: the directory is scanned in the order given and
/// the scan stops at the first hit. The same inputs in the same order always
/// produce the same results. A record with no usable aliases is flagged
/// [`MatchStatus::Unmatchable`] without scanning.
#[must_use]
pub fn reconcile<'a>(
    roster: &'a [RosterRecord],
    directory: &'a [DirectoryEntry],
) -> Vec<MatchResult<'a>> {
    let normalized: Vec<BTreeSet<CanonicalAlias>> =
        directory.iter().map(|entry| normalize_all(&entry.observed_aliases)).collect();

    let results: Vec<MatchResult<'a>> = roster
        .iter()
        .map(|record| MatchResult { record, status: match_record(record, directory, &normalized) })
        .collect();

    let counts = MatchCounts::tally(&results);
    info!(
        records = counts.total(),
        members = directory.len(),
        matched = counts.matched,
        unmatched = counts.unmatched,
        unmatchable = counts.unmatchable,
        "reconciled roster against directory"
    );
    results
}

fn match_record<'a>(
    record: &RosterRecord,
    directory: &'a [DirectoryEntry],
    normalized: &[BTreeSet<CanonicalAlias>],
) -> MatchStatus<'a> {
    let targets = normalize_all(record.match_aliases());
    if targets.is_empty() {
        debug!(person = record.full_name(), "no usable aliases; unmatchable");
        return MatchStatus::Unmatchable;
    }

    for (entry, candidates) in directory.iter().zip(normalized) {
        if let Some(pair) = find_match(candidates, &targets) {
            debug!(
                person = record.full_name(),
                member = %entry.member_id,
                candidate = %pair.candidate,
                target = %pair.target,
                "matched"
            );
            return MatchStatus::Matched { member: entry, pair };
        }
    }

    debug!(person = record.full_name(), "no directory match");
    MatchStatus::NoMatch
}

/// Members selected by more than one roster record, with the names that claimed them.
///
/// Substring matching favors recall, so a shared member usually means at least
/// one false positive worth a human look.
#[must_use]
pub fn contested_members<'a>(results: &[MatchResult<'a>]) -> BTreeMap<MemberId, Vec<&'a str>> {
    let mut claims: BTreeMap<MemberId, Vec<&'a str>> = BTreeMap::new();
    for result in results {
        if let Some(member) = result.matched_member() {
            claims.entry(member.member_id.clone()).or_default().push(result.record.full_name());
        }
    }
    claims.retain(|_, names| names.len() > 1);
    claims
}
