//! Service context bundling all port trait objects.

use std::error::Error;
use std::sync::Arc;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::platform::DiscordPlatform;
use crate::adapters::live::system::{PassIdGenerator, SystemClock};
use crate::config::{Config, ConfigError};
use crate::model::{DirectoryEntry, MemberId, Role, RoleId};
use crate::ports::clock::Clock;
use crate::ports::directory::{DirectoryFuture, DirectorySource};
use crate::ports::filesystem::FileSystem;
use crate::ports::grants::{GrantError, GrantExecutor, GrantFuture};
use crate::ports::id_gen::IdGenerator;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Ports are shared
/// with the scheduler's background tasks, hence `Arc`.
#[derive(Clone)]
pub struct ServiceContext {
    /// Clock for timestamping passes.
    pub clock: Arc<dyn Clock>,
    /// Filesystem for rosters, reports, and config.
    pub fs: Arc<dyn FileSystem>,
    /// ID generator for pass ids.
    pub id_gen: Arc<dyn IdGenerator>,
    /// Member and role snapshots.
    pub directory: Arc<dyn DirectorySource>,
    /// Role grants.
    pub grants: Arc<dyn GrantExecutor>,
}

impl ServiceContext {
    /// Creates a live context talking to the configured guild.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if platform credentials are missing.
    pub fn live(config: &Config) -> Result<Self, ConfigError> {
        let platform = Arc::new(DiscordPlatform::new(config)?);
        Ok(Self::offline().with_platform(platform.clone(), platform))
    }

    /// Creates a context with live local adapters and no platform.
    ///
    /// Platform calls fail with an error instead of reaching the network.
    #[must_use]
    pub fn offline() -> Self {
        let platform = Arc::new(UnconfiguredPlatform);
        Self {
            clock: Arc::new(SystemClock),
            fs: Arc::new(LiveFileSystem),
            id_gen: Arc::new(PassIdGenerator),
            directory: platform.clone(),
            grants: platform,
        }
    }

    /// Replaces the platform ports.
    #[must_use]
    pub fn with_platform(
        mut self,
        directory: Arc<dyn DirectorySource>,
        grants: Arc<dyn GrantExecutor>,
    ) -> Self {
        self.directory = directory;
        self.grants = grants;
        self
    }
}

// --- Adapter for commands that never reach the platform ---

const UNCONFIGURED: &str = "platform not configured; set ROLLCALL_TOKEN and ROLLCALL_GUILD_ID";

struct UnconfiguredPlatform;

fn unconfigured<T>() -> Result<T, Box<dyn Error + Send + Sync>> {
    Err(UNCONFIGURED.into())
}

impl DirectorySource for UnconfiguredPlatform {
    fn fetch_members(&self) -> DirectoryFuture<'_, Vec<DirectoryEntry>> {
        Box::pin(async { unconfigured() })
    }

    fn fetch_roles(&self) -> DirectoryFuture<'_, Vec<Role>> {
        Box::pin(async { unconfigured() })
    }
}

impl GrantExecutor for UnconfiguredPlatform {
    fn grant<'a>(&'a self, _member: &'a MemberId, _role: RoleId) -> GrantFuture<'a> {
        Box::pin(async { Err(GrantError::Transport(UNCONFIGURED.to_string())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_platform_fails_without_panicking() {
        let ctx = ServiceContext::offline();
        let err = ctx.directory.fetch_members().await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
        assert!(ctx.directory.fetch_roles().await.is_err());

        let member = MemberId("m1".into());
        let granted = ctx.grants.grant(&member, RoleId(1)).await;
        assert!(matches!(granted, Err(GrantError::Transport(_))));
    }

    #[test]
    fn live_requires_credentials() {
        assert!(matches!(
            ServiceContext::live(&Config::default()).err(),
            Some(ConfigError::MissingToken)
        ));
    }

    #[test]
    fn live_context_builds_with_credentials() {
        let config = Config {
            token: Some("token".into()),
            guild_id: Some("42".into()),
            ..Config::default()
        };
        let ctx = ServiceContext::live(&config).unwrap();
        assert!(!ctx.id_gen.generate_id().is_empty());
    }
}
