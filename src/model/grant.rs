//! Grant directives: which roles a matched member should end up holding.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::directory::RoleId;
use super::record::RosterRecord;
use crate::ports::catalog::RoleCatalog;

/// Which roster field supplies the names a directive is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveBasis {
    /// The record's desired role names.
    #[default]
    RoleNames,
    /// The record's group tags, matched against role names by containment.
    GroupTags,
}

/// The roles to grant one matched member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantDirective {
    /// A single role chosen by the operator, ignoring the roster.
    Override(RoleId),
    /// Roles resolved from roster names against the live catalog.
    Derived {
        /// Resolved roles in roster order, without duplicates.
        roles: Vec<RoleId>,
        /// Names the catalog did not recognize.
        unresolved: Vec<String>,
    },
}

impl GrantDirective {
    /// Resolves `names` against `catalog` by exact name.
    ///
    /// Unknown names are dropped with a warning and kept in `unresolved`.
    #[must_use]
    pub fn derive<'n>(
        names: impl IntoIterator<Item = &'n str>,
        catalog: &dyn RoleCatalog,
    ) -> Self {
        Self::resolve(names, |name| catalog.lookup(name))
    }

    /// Resolves group tags: an exact role name wins, otherwise the first role
    /// whose name contains the tag (`fli-rural` finds `💬│fli-rural`).
    #[must_use]
    pub fn derive_from_tags<'n>(
        tags: impl IntoIterator<Item = &'n str>,
        catalog: &dyn RoleCatalog,
    ) -> Self {
        Self::resolve(tags, |tag| catalog.lookup(tag).or_else(|| catalog.lookup_containing(tag)))
    }

    fn resolve<'n>(
        names: impl IntoIterator<Item = &'n str>,
        lookup: impl Fn(&str) -> Option<RoleId>,
    ) -> Self {
        let mut roles = Vec::new();
        let mut seen = HashSet::new();
        let mut unresolved = Vec::new();
        for name in names {
            match lookup(name) {
                Some(id) => {
                    if seen.insert(id) {
                        roles.push(id);
                    }
                }
                None => {
                    warn!(role = name, "role not found in catalog; dropping");
                    unresolved.push(name.to_string());
                }
            }
        }
        Self::Derived { roles, unresolved }
    }

    /// Derives a directive for `record` using the chosen basis.
    #[must_use]
    pub fn for_record(
        record: &RosterRecord,
        basis: DirectiveBasis,
        catalog: &dyn RoleCatalog,
    ) -> Self {
        match basis {
            DirectiveBasis::RoleNames => {
                Self::derive(record.role_names().iter().map(String::as_str), catalog)
            }
            DirectiveBasis::GroupTags => {
                Self::derive_from_tags(record.group_tags().iter().map(String::as_str), catalog)
            }
        }
    }

    /// Roles to grant, in application order.
    #[must_use]
    pub fn roles(&self) -> &[RoleId] {
        match self {
            Self::Override(role) => std::slice::from_ref(role),
            Self::Derived { roles, .. } => roles,
        }
    }

    /// Names that could not be resolved.
    #[must_use]
    pub fn unresolved(&self) -> &[String] {
        match self {
            Self::Override(_) => &[],
            Self::Derived { unresolved, .. } => unresolved,
        }
    }
}
