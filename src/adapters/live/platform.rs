//! Live adapter for the directory and grant ports using the Discord REST API.

use std::error::Error;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{Config, ConfigError};
use crate::model::{DirectoryEntry, MemberId, Role, RoleId};
use crate::ports::directory::{DirectoryFuture, DirectorySource};
use crate::ports::grants::{GrantError, GrantExecutor, GrantFuture};

/// Largest page the member list endpoint returns.
const PAGE_LIMIT: usize = 1000;

const AGENT: &str =
    concat!("DiscordBot (https://example.com/rollcall, ", env!("CARGO_PKG_VERSION"), ")");

/// Directory source and grant executor for one Discord guild.
pub struct DiscordPlatform {
    client: Client,
    api_base: String,
    token: String,
    guild_id: String,
}

impl DiscordPlatform {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the token or guild id is missing, or the
    /// HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let token = config.token.clone().ok_or(ConfigError::MissingToken)?;
        let guild_id = config.guild_id.clone().ok_or(ConfigError::MissingGuild)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            guild_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/guilds/{}{path}", self.api_base, self.guild_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, Box<dyn Error + Send + Sync>> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .header(USER_AGENT, AGENT)
            .send()
            .await
            .map_err(|e| -> Box<dyn Error + Send + Sync> {
                format!("Discord request failed: {e}").into()
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| -> Box<dyn Error + Send + Sync> {
            format!("Failed to read Discord response: {e}").into()
        })?;
        if !status.is_success() {
            let message = api_message(&text);
            return Err(format!("Discord API error ({}): {message}", status.as_u16()).into());
        }
        serde_json::from_str(&text).map_err(|e| -> Box<dyn Error + Send + Sync> {
            format!("Failed to parse Discord response: {e}").into()
        })
    }
}

/// User object nested in a guild member.
#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
}

/// A guild member as listed by the API.
#[derive(Debug, Deserialize)]
struct ApiMember {
    user: Option<ApiUser>,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// A guild role as listed by the API.
#[derive(Debug, Deserialize)]
struct ApiRole {
    id: String,
    name: String,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    retry_after: Option<f64>,
}

fn api_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body).map_or_else(|_| body.to_string(), |e| e.message)
}

/// Converts a listed member into a directory entry. Members without a user
/// object cannot be granted roles and are skipped.
fn member_entry(member: ApiMember) -> Option<DirectoryEntry> {
    let user = member.user?;
    let aliases = std::iter::once(user.username)
        .chain(user.global_name)
        .chain(member.nick)
        .filter(|alias| !alias.is_empty());
    let grants = member.roles.iter().filter_map(|id| match id.parse() {
        Ok(id) => Some(RoleId(id)),
        Err(_) => {
            warn!(role = %id, "ignoring malformed role id");
            None
        }
    });
    Some(DirectoryEntry::new(MemberId(user.id), aliases).with_grants(grants))
}

fn catalog_role(role: ApiRole) -> Option<Role> {
    match role.id.parse() {
        Ok(id) => Some(Role { id: RoleId(id), name: role.name }),
        Err(_) => {
            warn!(role = %role.id, name = %role.name, "ignoring malformed role id");
            None
        }
    }
}

fn grant_error(status: StatusCode, body: &str) -> GrantError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = serde_json::from_str::<ApiError>(body)
            .ok()
            .and_then(|e| e.retry_after)
            .unwrap_or_default();
        return GrantError::RateLimited { retry_after_secs };
    }
    GrantError::Rejected { status: status.as_u16(), message: api_message(body) }
}

impl DirectorySource for DiscordPlatform {
    fn fetch_members(&self) -> DirectoryFuture<'_, Vec<DirectoryEntry>> {
        Box::pin(async move {
            let mut entries = Vec::new();
            let mut after = String::from("0");
            loop {
                let url = self.url(&format!("/members?limit={PAGE_LIMIT}&after={after}"));
                let page: Vec<ApiMember> = self.get_json(&url).await?;
                let page_len = page.len();
                let cursor = page.iter().rev().find_map(|m| m.user.as_ref().map(|u| u.id.clone()));
                entries.extend(page.into_iter().filter_map(member_entry));
                debug!(page_len, total = entries.len(), "fetched member page");
                match cursor {
                    Some(next) if page_len == PAGE_LIMIT && next != after => after = next,
                    _ => break,
                }
            }
            Ok(entries)
        })
    }

    fn fetch_roles(&self) -> DirectoryFuture<'_, Vec<Role>> {
        Box::pin(async move {
            let roles: Vec<ApiRole> = self.get_json(&self.url("/roles")).await?;
            Ok(roles.into_iter().filter_map(catalog_role).collect())
        })
    }
}

impl GrantExecutor for DiscordPlatform {
    fn grant<'a>(&'a self, member: &'a MemberId, role: RoleId) -> GrantFuture<'a> {
        Box::pin(async move {
            let url = self.url(&format!("/members/{member}/roles/{role}"));
            let response = self
                .client
                .put(&url)
                .header(AUTHORIZATION, format!("Bot {}", self.token))
                .header(USER_AGENT, AGENT)
                .header(CONTENT_LENGTH, 0)
                .send()
                .await
                .map_err(|e| GrantError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            Err(grant_error(status, &body))
        })
    }
}
