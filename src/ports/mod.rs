//! Port traits defining external boundaries.
//!
//! Each trait is a seam between the reconciliation core and something it does
//! not own: the roster sheet, the platform, files, time, and ids.
//! Implementations live in `src/adapters/`.

pub mod catalog;
pub mod clock;
pub mod directory;
pub mod filesystem;
pub mod grants;
pub mod id_gen;
pub mod roster;

pub use catalog::RoleCatalog;
pub use clock::Clock;
pub use directory::{DirectoryFuture, DirectorySource};
pub use filesystem::FileSystem;
pub use grants::{GrantError, GrantExecutor, GrantFuture};
pub use id_gen::IdGenerator;
pub use roster::{ReportSink, RosterLoad, RosterSource, RowDiagnostic};
