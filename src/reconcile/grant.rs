//! Idempotent grant application.
//!
//! Roles already held, or already confirmed by this applier, are never
//! requested again. Failures are recorded per role and never stop the batch.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::model::{GrantDirective, GrantFailure, GrantOutcome, MatchResult, MemberId, RoleId};
use crate::ports::grants::GrantExecutor;

/// Applies grant directives to matched members through a [`GrantExecutor`].
///
/// Keeps a process-lifetime ledger of confirmed grants so that re-running a
/// pass against a stale directory snapshot does not request them twice.
pub struct GrantApplier {
    executor: Arc<dyn GrantExecutor>,
    confirmed: Mutex<HashSet<(MemberId, RoleId)>>,
}

impl GrantApplier {
    /// Creates an applier with an empty ledger.
    #[must_use]
    pub fn new(executor: Arc<dyn GrantExecutor>) -> Self {
        Self { executor, confirmed: Mutex::new(HashSet::new()) }
    }

    /// Grants the directive's roles to the matched member, in directive order.
    ///
    /// Unmatched records come back as [`GrantOutcome::skipped`] with no
    /// platform call. A role lands in `newly_granted` only after the executor
    /// confirms it; a refused role lands in `failed` and the rest continue.
    pub async fn apply(
        &self,
        result: &MatchResult<'_>,
        directive: &GrantDirective,
    ) -> GrantOutcome {
        let Some(entry) = result.matched_member() else {
            debug!(person = result.record.full_name(), "unmatched; skipping grants");
            return GrantOutcome::skipped();
        };

        let member = &entry.member_id;
        let mut outcome = GrantOutcome {
            member: Some(member.clone()),
            dropped: directive.unresolved().to_vec(),
            ..GrantOutcome::default()
        };

        for &role in directive.roles() {
            if entry.current_grants.contains(&role) || self.is_confirmed(member, role) {
                debug!(person = result.record.full_name(), %member, %role, "already held");
                outcome.already_held.insert(role);
                continue;
            }

            match self.executor.grant(member, role).await {
                Ok(()) => {
                    self.remember(member, role);
                    info!(person = result.record.full_name(), %member, %role, "newly granted");
                    outcome.newly_granted.insert(role);
                }
                Err(err) => {
                    warn!(
                        person = result.record.full_name(),
                        %member,
                        %role,
                        error = %err,
                        "grant failed"
                    );
                    outcome.failed.push(GrantFailure { role, reason: err.to_string() });
                }
            }
        }

        outcome
    }

    /// Computes what [`apply`](Self::apply) would do without calling the platform.
    ///
    /// Roles that would be requested are listed under `newly_granted`.
    #[must_use]
    pub fn preview(&self, result: &MatchResult<'_>, directive: &GrantDirective) -> GrantOutcome {
        let Some(entry) = result.matched_member() else {
            return GrantOutcome::skipped();
        };

        let member = &entry.member_id;
        let mut outcome = GrantOutcome {
            member: Some(member.clone()),
            dropped: directive.unresolved().to_vec(),
            ..GrantOutcome::default()
        };
        for &role in directive.roles() {
            if entry.current_grants.contains(&role) || self.is_confirmed(member, role) {
                outcome.already_held.insert(role);
            } else {
                outcome.newly_granted.insert(role);
            }
        }
        outcome
    }

    fn is_confirmed(&self, member: &MemberId, role: RoleId) -> bool {
        self.confirmed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(member.clone(), role))
    }

    fn remember(&self, member: &MemberId, role: RoleId) {
        self.confirmed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((member.clone(), role));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::{DirectoryEntry, MatchStatus, RosterRecord};
    use crate::ports::grants::{GrantError, GrantFuture};
    use crate::reconcile::engine::reconcile;

    /// Records every grant request; refuses the roles listed in `refuse`.
    #[derive(Default)]
    struct FakeExecutor {
        calls: Mutex<Vec<(MemberId, RoleId)>>,
        refuse: HashSet<RoleId>,
    }

    impl GrantExecutor for FakeExecutor {
        fn grant<'a>(&'a self, member: &'a MemberId, role: RoleId) -> GrantFuture<'a> {
            Box::pin(async move {
                self.calls.lock().unwrap().push((member.clone(), role));
                if self.refuse.contains(&role) {
                    Err(GrantError::Rejected { status: 403, message: "Missing Permissions".into() })
                } else {
                    Ok(())
                }
            })
        }
    }

    fn jane() -> RosterRecord {
        RosterRecord::new("Jane Doe", "jane@example.com")
            .unwrap()
            .with_aliases(["janedoe"])
            .with_roles(["Scholar"])
    }

    #[tokio::test]
    async fn unmatched_record_is_skipped_without_calls() {
        let executor = Arc::new(FakeExecutor::default());
        let applier = GrantApplier::new(executor.clone());
        let record = jane();
        let result = MatchResult { record: &record, status: MatchStatus::NoMatch };

        let outcome = applier.apply(&result, &GrantDirective::Override(RoleId(1))).await;

        assert!(outcome.skipped_unmatched);
        assert!(outcome.newly_granted.is_empty());
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_apply_on_same_snapshot_grants_nothing_new() {
        let executor = Arc::new(FakeExecutor::default());
        let applier = GrantApplier::new(executor.clone());
        let roster = vec![jane()];
        let directory = vec![DirectoryEntry::new("m1", ["janedoe2024"]).with_grants([RoleId(3)])];
        let results = reconcile(&roster, &directory);
        let directive = GrantDirective::Derived {
            roles: vec![RoleId(7), RoleId(3), RoleId(8)],
            unresolved: vec![],
        };

        let first = applier.apply(&results[0], &directive).await;
        assert_eq!(first.newly_granted, BTreeSet::from([RoleId(7), RoleId(8)]));
        assert_eq!(first.already_held, BTreeSet::from([RoleId(3)]));

        let second = applier.apply(&results[0], &directive).await;
        assert!(second.newly_granted.is_empty());
        assert_eq!(second.already_held, BTreeSet::from([RoleId(3), RoleId(7), RoleId(8)]));
        assert_eq!(executor.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failure_is_recorded_and_batch_continues() {
        let executor = Arc::new(FakeExecutor {
            refuse: [RoleId(8)].into(),
            ..FakeExecutor::default()
        });
        let applier = GrantApplier::new(executor.clone());
        let roster = vec![jane()];
        let directory = vec![DirectoryEntry::new("m1", ["janedoe"])];
        let results = reconcile(&roster, &directory);
        let directive = GrantDirective::Derived {
            roles: vec![RoleId(8), RoleId(7)],
            unresolved: vec!["Ghost".into()],
        };

        let outcome = applier.apply(&results[0], &directive).await;

        assert!(outcome.is_partial_failure());
        assert_eq!(outcome.failed[0].role, RoleId(8));
        assert!(outcome.failed[0].reason.contains("403"));
        assert_eq!(outcome.newly_granted, BTreeSet::from([RoleId(7)]));
        assert_eq!(outcome.dropped, ["Ghost"]);

        // Grants are requested in directive order.
        let calls: Vec<RoleId> = executor.calls.lock().unwrap().iter().map(|(_, r)| *r).collect();
        assert_eq!(calls, [RoleId(8), RoleId(7)]);

        // A failed role is retried next time; the confirmed one is not.
        let retry = applier.apply(&results[0], &directive).await;
        assert_eq!(retry.already_held, BTreeSet::from([RoleId(7)]));
        assert_eq!(retry.failed.len(), 1);
    }

    #[tokio::test]
    async fn preview_does_not_call_platform() {
        let executor = Arc::new(FakeExecutor::default());
        let applier = GrantApplier::new(executor.clone());
        let roster = vec![jane()];
        let directory = vec![DirectoryEntry::new("m1", ["janedoe"]).with_grants([RoleId(7)])];
        let results = reconcile(&roster, &directory);
        let directive =
            GrantDirective::Derived { roles: vec![RoleId(7), RoleId(9)], unresolved: vec![] };

        let outcome = applier.preview(&results[0], &directive);

        assert_eq!(outcome.already_held, BTreeSet::from([RoleId(7)]));
        assert_eq!(outcome.newly_granted, BTreeSet::from([RoleId(9)]));
        assert!(executor.calls.lock().unwrap().is_empty());
    }
}
