//! Directory snapshot types: platform members, roles, and the role catalog.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ports::catalog::RoleCatalog;

/// Opaque, stable identifier of a platform member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a grantable role or permission on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub u64);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A platform member as observed at scan time.
///
/// Entries are a read-only snapshot; reconciliation never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Stable member identifier.
    pub member_id: MemberId,
    /// Username, global name, and nickname, whichever exist.
    #[serde(default)]
    pub observed_aliases: BTreeSet<String>,
    /// Roles the member already holds.
    #[serde(default)]
    pub current_grants: BTreeSet<RoleId>,
}

impl DirectoryEntry {
    /// Creates an entry with no grants.
    pub fn new<I, S>(member_id: impl Into<MemberId>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            member_id: member_id.into(),
            observed_aliases: aliases.into_iter().map(Into::into).collect(),
            current_grants: BTreeSet::new(),
        }
    }

    /// Replaces the set of currently held roles.
    #[must_use]
    pub fn with_grants(mut self, grants: impl IntoIterator<Item = RoleId>) -> Self {
        self.current_grants = grants.into_iter().collect();
        self
    }
}

impl From<String> for MemberId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A named role in the platform's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier.
    pub id: RoleId,
    /// Display name the roster refers to.
    pub name: String,
}

/// Snapshot of the role catalog, looked up by name.
///
/// When two roles share a name the first one listed wins, matching the
/// platform's own name lookup.
#[derive(Debug, Clone, Default)]
pub struct RoleIndex {
    by_name: HashMap<String, RoleId>,
    ordered: Vec<Role>,
}

impl RoleIndex {
    /// Builds an index from catalog roles in platform order.
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut by_name = HashMap::new();
        let mut ordered = Vec::new();
        for role in roles {
            by_name.entry(role.name.clone()).or_insert(role.id);
            ordered.push(role);
        }
        Self { by_name, ordered }
    }

    /// Number of distinct role names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl RoleCatalog for RoleIndex {
    fn lookup(&self, name: &str) -> Option<RoleId> {
        self.by_name.get(name).copied()
    }

    fn lookup_containing(&self, fragment: &str) -> Option<RoleId> {
        if fragment.is_empty() {
            return None;
        }
        self.ordered.iter().find(|role| role.name.contains(fragment)).map(|role| role.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_index_first_name_wins() {
        let index = RoleIndex::new([
            Role { id: RoleId(1), name: "Scholar".into() },
            Role { id: RoleId(2), name: "Scholar".into() },
            Role { id: RoleId(3), name: "Mentor".into() },
        ]);
        assert_eq!(index.lookup("Scholar"), Some(RoleId(1)));
        assert_eq!(index.lookup("Mentor"), Some(RoleId(3)));
        assert_eq!(index.lookup("scholar"), None);
        assert_eq!(index.lookup("scholar"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn entry_builder_collects_aliases_and_grants() {
        let entry = DirectoryEntry::new("m1", ["janedoe2024", "Jane"]).with_grants([RoleId(7)]);
        assert_eq!(entry.member_id, MemberId("m1".into()));
        assert_eq!(entry.observed_aliases.len(), 2);
        assert!(entry.current_grants.contains(&RoleId(7)));
    }

    #[test]
    fn containing_lookup_follows_platform_order() {
        let index = RoleIndex::new([
            Role { id: RoleId(1), name: "Scholar".into() },
            Role { id: RoleId(2), name: "💬│fli-rural".into() },
            Role { id: RoleId(3), name: "fli-rural-alumni".into() },
        ]);
        assert_eq!(index.lookup("fli-rural"), None);
        assert_eq!(index.lookup_containing("fli-rural"), Some(RoleId(2)));
        assert_eq!(index.lookup_containing("alumni"), Some(RoleId(3)));
        assert_eq!(index.lookup_containing(""), None);
        assert_eq!(index.lookup_containing("mentor"), None);
    }
}
