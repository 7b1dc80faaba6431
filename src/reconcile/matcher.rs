//! Directional substring matching between alias sets.

use std::collections::BTreeSet;

use super::alias::CanonicalAlias;
use crate::model::AliasPair;

/// Finds the first alias collision between a directory entry and a roster record.
///
/// A collision is a pair `(c, t)` where `t` (roster side) is a non-empty
/// substring of `c` (directory side). Candidates are scanned in set order,
/// then targets, so the reported pair is deterministic. Empty sets never match.
#[must_use]
pub fn find_match(
    candidate_aliases: &BTreeSet<CanonicalAlias>,
    target_aliases: &BTreeSet<CanonicalAlias>,
) -> Option<AliasPair> {
    candidate_aliases.iter().find_map(|candidate| {
        target_aliases.iter().find(|target| candidate.contains(target)).map(|target| AliasPair {
            candidate: candidate.clone(),
            target: target.clone(),
        })
    })
}

/// Whether any roster alias is contained in any directory alias.
#[must_use]
pub fn is_match(
    candidate_aliases: &BTreeSet<CanonicalAlias>,
    target_aliases: &BTreeSet<CanonicalAlias>,
) -> bool {
    find_match(candidate_aliases, target_aliases).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::alias::normalize;

    fn set(items: &[&str]) -> BTreeSet<CanonicalAlias> {
        items.iter().map(|s| normalize(s)).collect()
    }

    #[test]
    fn short_roster_alias_matches_longer_display_name() {
        assert!(is_match(&set(&["jsmithjr"]), &set(&["jsmith"])));
        assert!(is_match(&set(&["TheJohnSmith_99"]), &set(&["johnsmith"])));
    }

    #[test]
    fn direction_matters() {
        assert!(is_match(&set(&["jsmithjr"]), &set(&["jsmith"])));
        assert!(!is_match(&set(&["jsmith"]), &set(&["jsmithjr"])));
        assert!(!is_match(&set(&["john"]), &set(&["johnsmith"])));
    }

    #[test]
    fn substring_is_contiguous() {
        // "jsmith" is a subsequence of "johnsmith" but not a substring.
        assert!(!is_match(&set(&["johnsmith123"]), &set(&["jsmith"])));
    }

    #[test]
    fn empty_sets_never_match() {
        assert!(!is_match(&set(&[]), &set(&["jsmith"])));
        assert!(!is_match(&set(&["jsmith"]), &set(&[])));
        assert!(!is_match(&set(&[]), &set(&[])));
    }

    #[test]
    fn one_collision_is_enough() {
        let candidates = set(&["xyz", "bobbytables", "qqq"]);
        let targets = set(&["nope", "bobby"]);
        assert!(is_match(&candidates, &targets));
    }

    #[test]
    fn reports_colliding_pair() {
        let pair = find_match(&set(&["realjanedoe", "jd"]), &set(&["janedoe"])).unwrap();
        assert_eq!(pair.candidate.as_str(), "realjanedoe");
        assert_eq!(pair.target.as_str(), "janedoe");

        let pair = find_match(&set(&["thejanedoeshow"]), &set(&["janedoe", "jane"])).unwrap();
        assert_eq!(pair.candidate.as_str(), "thejanedoeshow");
        assert_eq!(pair.target.as_str(), "jane");
    }
}
