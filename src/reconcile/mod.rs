//! Roster reconciliation: normalization, matching, grants, and whole passes.
//!
//! `alias`, `matcher` and `engine` are pure and synchronous. `grant` is the
//! only place that talks to the platform, and `pipeline` strings everything
//! together for one group.

pub mod alias;
pub mod engine;
pub mod grant;
pub mod matcher;
pub mod pipeline;

pub use alias::{normalize, CanonicalAlias};
pub use engine::{contested_members, reconcile, MatchCounts};
pub use grant::GrantApplier;
pub use matcher::{find_match, is_match};
pub use pipeline::{PassCounts, PassError, PassOptions, PassRunner, PassSummary, RecordReport};
