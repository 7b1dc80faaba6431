//! Roster records loaded from an external sheet.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a roster row cannot become a [`RosterRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The full name was empty or whitespace only.
    #[error("full name must not be empty")]
    EmptyFullName,
}

/// One person the roster says should hold roles.
///
/// Immutable once built. `match_aliases` may be empty, in which case the
/// record can never match and is reported as unmatchable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRosterRecord", into = "RawRosterRecord")]
pub struct RosterRecord {
    full_name: String,
    email: String,
    role_names: Vec<String>,
    match_aliases: BTreeSet<String>,
    group_tags: BTreeSet<String>,
}

impl RosterRecord {
    /// Creates a record with no roles, aliases, or groups.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyFullName`] if `full_name` is blank.
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, RecordError> {
        let full_name = full_name.into().trim().to_string();
        if full_name.is_empty() {
            return Err(RecordError::EmptyFullName);
        }
        Ok(Self {
            full_name,
            email: email.into().trim().to_string(),
            role_names: Vec::new(),
            match_aliases: BTreeSet::new(),
            group_tags: BTreeSet::new(),
        })
    }

    /// Sets the desired role names, keeping their order. Blank names are skipped.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role_names = non_blank(roles).collect();
        self
    }

    /// Sets the names used to find this person on the platform.
    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_aliases = non_blank(aliases).collect();
        self
    }

    /// Sets the group tags (affinity groups and the like).
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_tags = non_blank(groups).collect();
        self
    }

    /// The person's full name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The person's email, possibly empty.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Desired role names in roster order.
    #[must_use]
    pub fn role_names(&self) -> &[String] {
        &self.role_names
    }

    /// Raw (unnormalized) match aliases.
    #[must_use]
    pub fn match_aliases(&self) -> &BTreeSet<String> {
        &self.match_aliases
    }

    /// Group tags.
    #[must_use]
    pub fn group_tags(&self) -> &BTreeSet<String> {
        &self.group_tags
    }
}

fn non_blank<I, S>(items: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(|s| s.into().trim().to_string()).filter(|s| !s.is_empty())
}

/// Wire shape for serde; validated into a [`RosterRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRosterRecord {
    full_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role_names: Vec<String>,
    #[serde(default)]
    match_aliases: BTreeSet<String>,
    #[serde(default)]
    group_tags: BTreeSet<String>,
}

impl TryFrom<RawRosterRecord> for RosterRecord {
    type Error = RecordError;

    fn try_from(raw: RawRosterRecord) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.full_name, raw.email)?
            .with_roles(raw.role_names)
            .with_aliases(raw.match_aliases)
            .with_groups(raw.group_tags))
    }
}

impl From<RosterRecord> for RawRosterRecord {
    fn from(record: RosterRecord) -> Self {
        Self {
            full_name: record.full_name,
            email: record.email,
            role_names: record.role_names,
            match_aliases: record.match_aliases,
            group_tags: record.group_tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_full_name() {
        assert_eq!(RosterRecord::new("   ", "x@example.com"), Err(RecordError::EmptyFullName));
    }

    #[test]
    fn trims_and_drops_blank_entries() {
        let record = RosterRecord::new(" Jane Doe ", "jane@example.com")
            .unwrap()
            .with_roles(["Scholar", " ", "Mentor "])
            .with_aliases(["janedoe", ""]);

        assert_eq!(record.full_name(), "Jane Doe");
        assert_eq!(record.role_names(), ["Scholar", "Mentor"]);
        assert_eq!(record.match_aliases().len(), 1);
    }

    #[test]
    fn role_order_is_preserved() {
        let record = RosterRecord::new("A", "").unwrap().with_roles(["Zeta", "Alpha"]);
        assert_eq!(record.role_names(), ["Zeta", "Alpha"]);
    }

    #[test]
    fn deserialize_validates_full_name() {
        let err = serde_json::from_str::<RosterRecord>(r#"{"full_name": ""}"#);
        assert!(err.is_err());

        let ok: RosterRecord =
            serde_json::from_str(r#"{"full_name": "Jane", "match_aliases": ["jd"]}"#).unwrap();
        assert_eq!(ok.full_name(), "Jane");
        assert!(ok.match_aliases().contains("jd"));
    }
}
