//! Role catalog port for resolving role names.

use crate::model::RoleId;

/// Resolves role names to platform role identifiers.
///
/// Lookups are synchronous; implementations are snapshots taken
/// before a pass starts and stay read-only for its duration.
pub trait RoleCatalog: Send + Sync {
    /// Returns the role with exactly this name, if the catalog has one.
    fn lookup(&self, name: &str) -> Option<RoleId>;

    /// Returns the first role, in catalog order, whose name contains
    /// `fragment`. Empty fragments match nothing.
    fn lookup_containing(&self, fragment: &str) -> Option<RoleId>;
}
