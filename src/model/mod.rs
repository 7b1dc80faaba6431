//! Roster, directory, and outcome types.
//!
//! Roster records and directory entries are owned by the caller for one
//! reconciliation pass; match results borrow them and are discarded when the
//! pass ends.

mod directory;
mod grant;
mod outcome;
mod record;

pub use directory::{DirectoryEntry, MemberId, Role, RoleId, RoleIndex};
pub use grant::{DirectiveBasis, GrantDirective};
pub use outcome::{AliasPair, GrantFailure, GrantOutcome, MatchResult, MatchStatus};
pub use record::{RecordError, RosterRecord};
