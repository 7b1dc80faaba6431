//! Per-record results of matching and granting.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::directory::{DirectoryEntry, MemberId, RoleId};
use super::record::RosterRecord;
use crate::reconcile::alias::CanonicalAlias;

/// The alias pair that caused a match, kept for auditing false positives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasPair {
    /// Directory-side alias (the longer display name).
    pub candidate: CanonicalAlias,
    /// Roster-side alias found inside `candidate`.
    pub target: CanonicalAlias,
}

/// How a roster record fared against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus<'a> {
    /// A directory entry was selected.
    Matched {
        /// The first entry, in directory order, that matched.
        member: &'a DirectoryEntry,
        /// Which aliases collided.
        pair: AliasPair,
    },
    /// The record had usable aliases but nothing in the directory matched.
    NoMatch,
    /// The record has no usable aliases and can never match.
    Unmatchable,
}

/// Links one roster record to at most one directory entry.
///
/// Borrows both sides for the duration of a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult<'a> {
    /// The roster record this result describes.
    pub record: &'a RosterRecord,
    /// Match state.
    pub status: MatchStatus<'a>,
}

impl<'a> MatchResult<'a> {
    /// Whether a directory entry was selected.
    #[must_use]
    pub fn matched(&self) -> bool {
        matches!(self.status, MatchStatus::Matched { .. })
    }

    /// Whether the record was flagged as permanently unmatchable.
    #[must_use]
    pub fn unmatchable(&self) -> bool {
        matches!(self.status, MatchStatus::Unmatchable)
    }

    /// The selected directory entry, if any.
    #[must_use]
    pub fn matched_member(&self) -> Option<&'a DirectoryEntry> {
        match &self.status {
            MatchStatus::Matched { member, .. } => Some(*member),
            _ => None,
        }
    }

    /// The alias pair that produced the match, if any.
    #[must_use]
    pub fn matched_on(&self) -> Option<&AliasPair> {
        match &self.status {
            MatchStatus::Matched { pair, .. } => Some(pair),
            _ => None,
        }
    }
}

/// A grant the platform refused or could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFailure {
    /// The role that was requested.
    pub role: RoleId,
    /// Collaborator-reported reason.
    pub reason: String,
}

/// What happened to one roster record's grants during a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantOutcome {
    /// The matched member, when there was one.
    pub member: Option<MemberId>,
    /// Roles the member already held.
    pub already_held: BTreeSet<RoleId>,
    /// Roles the platform confirmed during this pass.
    pub newly_granted: BTreeSet<RoleId>,
    /// True when the record was not matched and nothing was attempted.
    pub skipped_unmatched: bool,
    /// Role names the catalog did not know.
    pub dropped: Vec<String>,
    /// Grant requests that failed.
    pub failed: Vec<GrantFailure>,
}

impl GrantOutcome {
    /// Outcome for a record that had no directory match.
    #[must_use]
    pub fn skipped() -> Self {
        Self { skipped_unmatched: true, ..Self::default() }
    }

    /// Whether at least one grant request failed.
    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty()
    }
}
