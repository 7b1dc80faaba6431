//! Grant executor port for attaching roles to members.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::model::{MemberId, RoleId};

/// Why the platform did not confirm a grant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrantError {
    /// The platform answered with a non-success status.
    #[error("platform rejected grant ({status}): {message}")]
    Rejected {
        /// HTTP-like status code.
        status: u16,
        /// Platform-provided message.
        message: String,
    },
    /// The platform asked us to slow down.
    #[error("rate limited; retry after {retry_after_secs:.1}s")]
    RateLimited {
        /// Suggested back-off in seconds.
        retry_after_secs: f64,
    },
    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Boxed future alias used by [`GrantExecutor`] to keep the trait dyn-compatible.
pub type GrantFuture<'a> = Pin<Box<dyn Future<Output = Result<(), GrantError>> + Send + 'a>>;

/// Requests role grants from the platform.
pub trait GrantExecutor: Send + Sync {
    /// Grants `role` to `member`. Resolves once the platform confirms.
    ///
    /// # Errors
    ///
    /// Returns a [`GrantError`] when the platform refuses or cannot be reached.
    fn grant<'a>(&'a self, member: &'a MemberId, role: RoleId) -> GrantFuture<'a>;
}
