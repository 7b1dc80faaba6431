//! Alias normalization.
//!
//! A canonical alias keeps only ASCII letters, lowercased. It is the only key
//! names are compared by.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A display name reduced to lowercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalAlias(String);

impl CanonicalAlias {
    /// The normalized text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether nothing survived normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `other` is a non-empty substring of `self`.
    #[must_use]
    pub fn contains(&self, other: &CanonicalAlias) -> bool {
        !other.is_empty() && self.0.contains(other.as_str())
    }
}

impl fmt::Display for CanonicalAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes a raw display string. Total and idempotent.
#[must_use]
pub fn normalize(raw: &str) -> CanonicalAlias {
    CanonicalAlias(
        raw.chars().filter(char::is_ascii_alphabetic).map(|c| c.to_ascii_lowercase()).collect(),
    )
}

/// Normalizes every alias, dropping the ones that become empty.
pub fn normalize_all<'s>(raw: impl IntoIterator<Item = &'s String>) -> BTreeSet<CanonicalAlias> {
    raw.into_iter().map(|s| normalize(s)).filter(|a| !a.is_empty()).collect()
}
