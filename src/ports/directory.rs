//! Directory source port for snapshotting platform members and roles.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use crate::model::{DirectoryEntry, Role};

/// Boxed future alias used by [`DirectorySource`] to keep the trait dyn-compatible.
pub type DirectoryFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// Produces a snapshot of the platform's members and role catalog.
pub trait DirectorySource: Send + Sync {
    /// Fetches every member in a deterministic order.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot be reached or answers garbage.
    fn fetch_members(&self) -> DirectoryFuture<'_, Vec<DirectoryEntry>>;

    /// Fetches the role catalog in platform order.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot be reached or answers garbage.
    fn fetch_roles(&self) -> DirectoryFuture<'_, Vec<Role>>;
}
