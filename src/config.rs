//! Runtime configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML
//! file (`rollcall.yaml`, or the path in `ROLLCALL_CONFIG`), then environment
//! variables (a `.env` file is loaded first when present).
//!
//! | Variable                      | Default                          |
//! |-------------------------------|----------------------------------|
//! | `ROLLCALL_TOKEN`              | `DISCORD_TOKEN`, else unset      |
//! | `ROLLCALL_GUILD_ID`           | unset                            |
//! | `ROLLCALL_DATA_DIR`           | `data`                           |
//! | `ROLLCALL_INTERVAL_SECS`      | `900`                            |
//! | `ROLLCALL_API_BASE`           | `https://discord.com/api/v10`    |
//! | `ROLLCALL_HTTP_TIMEOUT_SECS`  | `30`                             |

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::ports::FileSystem;

/// Config file read when `ROLLCALL_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "rollcall.yaml";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_INTERVAL_SECS: u64 = 15 * 60;
const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No bot token was configured.
    #[error("no bot token configured; set ROLLCALL_TOKEN")]
    MissingToken,
    /// No guild id was configured.
    #[error("no guild configured; set ROLLCALL_GUILD_ID")]
    MissingGuild,
    /// A value could not be parsed or is out of range.
    #[error("invalid value for {var}: {message}")]
    InvalidValue {
        /// Variable or key name.
        var: String,
        /// What is wrong with it.
        message: String,
    },
    /// The config file exists but could not be read or parsed.
    #[error("failed to load config file {path}: {message}")]
    File {
        /// File path.
        path: String,
        /// Reason.
        message: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Values accepted in the YAML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    token: Option<String>,
    guild_id: Option<String>,
    data_dir: Option<PathBuf>,
    interval_secs: Option<u64>,
    api_base: Option<String>,
    http_timeout_secs: Option<u64>,
}

/// Resolved configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Bot token used for platform calls.
    pub token: Option<String>,
    /// Guild (server) whose members are reconciled.
    pub guild_id: Option<String>,
    /// Directory holding `rosters/` and `reports/`.
    pub data_dir: PathBuf,
    /// Seconds between scheduled passes.
    pub interval_secs: u64,
    /// Base URL of the platform REST API.
    pub api_base: String,
    /// Per-request timeout for platform calls.
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            guild_id: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            interval_secs: DEFAULT_INTERVAL_SECS,
            api_base: DEFAULT_API_BASE.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("guild_id", &self.guild_id)
            .field("data_dir", &self.data_dir)
            .field("interval_secs", &self.interval_secs)
            .field("api_base", &self.api_base)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Loads configuration from the config file and process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed or a value is invalid.
    pub fn load(fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let explicit = lookup("ROLLCALL_CONFIG");
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_FILE));
        let file = if explicit.is_some() || fs.exists(&path) {
            Some(read_file(fs, &path)?)
        } else {
            None
        };
        Self::resolve(file.as_deref(), lookup)
    }

    /// Builds a config from optional YAML text and an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the YAML is malformed or a value is invalid.
    pub fn resolve(
        yaml: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileConfig = match yaml {
            Some(text) if !text.trim().is_empty() => serde_yaml::from_str(text).map_err(|e| {
                ConfigError::File { path: DEFAULT_CONFIG_FILE.to_string(), message: e.to_string() }
            })?,
            _ => FileConfig::default(),
        };
        let defaults = Self::default();

        let config = Self {
            token: env("ROLLCALL_TOKEN").or_else(|| env("DISCORD_TOKEN")).or(file.token),
            guild_id: env("ROLLCALL_GUILD_ID").or(file.guild_id),
            data_dir: env("ROLLCALL_DATA_DIR")
                .map(PathBuf::from)
                .or(file.data_dir)
                .unwrap_or(defaults.data_dir),
            interval_secs: match env("ROLLCALL_INTERVAL_SECS") {
                Some(raw) => parse_secs("ROLLCALL_INTERVAL_SECS", &raw)?,
                None => file.interval_secs.unwrap_or(defaults.interval_secs),
            },
            api_base: env("ROLLCALL_API_BASE").or(file.api_base).unwrap_or(defaults.api_base),
            http_timeout_secs: match env("ROLLCALL_HTTP_TIMEOUT_SECS") {
                Some(raw) => parse_secs("ROLLCALL_HTTP_TIMEOUT_SECS", &raw)?,
                None => file.http_timeout_secs.unwrap_or(defaults.http_timeout_secs),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// The scheduler interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(invalid("interval_secs", "must be greater than zero"));
        }
        if self.http_timeout_secs == 0 {
            return Err(invalid("http_timeout_secs", "must be greater than zero"));
        }
        if let Some(guild) = &self.guild_id {
            if guild.parse::<u64>().is_err() {
                return Err(invalid("guild_id", "must be a numeric id"));
            }
        }
        Ok(())
    }
}

fn read_file(fs: &dyn FileSystem, path: &Path) -> Result<String, ConfigError> {
    fs.read_to_string(path).map_err(|e| ConfigError::File {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn parse_secs(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| invalid(var, &e.to_string()))
}

fn invalid(var: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue { var: var.to_string(), message: message.to_string() }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_sources() {
        let config = Config::resolve(None, env_of(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.interval(), Duration::from_secs(900));
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn env_overrides_file() {
        let yaml = "guild_id: \"111\"\ninterval_secs: 60\ndata_dir: /srv/rollcall\n";
        let config =
            Config::resolve(Some(yaml), env_of(&[("ROLLCALL_INTERVAL_SECS", "120")])).unwrap();
        assert_eq!(config.guild_id.as_deref(), Some("111"));
        assert_eq!(config.interval_secs, 120);
        assert_eq!(config.data_dir, PathBuf::from("/srv/rollcall"));
    }

    #[test]
    fn token_falls_back_to_discord_token() {
        let config = Config::resolve(None, env_of(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));

        let config = Config::resolve(
            None,
            env_of(&[("DISCORD_TOKEN", "abc"), ("ROLLCALL_TOKEN", "xyz")]),
        )
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("xyz"));
    }

    #[test]
    fn rejects_bad_values() {
        let err = Config::resolve(None, env_of(&[("ROLLCALL_INTERVAL_SECS", "soon")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));

        let err = Config::resolve(None, env_of(&[("ROLLCALL_INTERVAL_SECS", "0")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));

        let err = Config::resolve(None, env_of(&[("ROLLCALL_GUILD_ID", "my-server")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));

        let err = Config::resolve(Some("colour: blue\n"), env_of(&[]));
        assert!(matches!(err, Err(ConfigError::File { .. })));
    }

    #[test]
    fn debug_redacts_token() {
        let config = Config { token: Some("super-secret".into()), ..Config::default() };
        let shown = format!("{config:?}");
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("REDACTED"));
    }
}
