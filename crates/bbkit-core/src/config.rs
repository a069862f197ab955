//! Configuration management for bbkit.
//!
//! [`ApiConfig`] is what the client needs at construction: API endpoints,
//! the failure policy, and the user agent. [`Config`] is the on-disk TOML
//! file used by the CLI, stored in a platform-specific location:
//!
//! - **macOS/Linux**: `~/.config/bbkit/config.toml`
//! - **Windows**: `%APPDATA%\bbkit\config.toml`
//!
//! Passwords are never stored in the config file.
//!
//! # Example
//!
//! ```ignore
//! use bbkit_core::config::{Config, FailurePolicy};
//!
//! let mut config = Config::load()?;
//! config.set("auth.username", "alice")?;
//! config.api.failure_policy = FailurePolicy::Surface;
//! config.save()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "bbkit";

/// Bitbucket REST API 1.0 resource endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.bitbucket.org/1.0/";

/// Bitbucket API top-level endpoint.
pub const DEFAULT_API_TOPLEVEL: &str = "https://api.bitbucket.org/";

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = "bbkit";

// =============================================================================
// Configuration structures
// =============================================================================

/// What the client does when a request fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Mask every transport or parse failure as an empty JSON array.
    #[default]
    EmptyList,
    /// Return the failure to the caller.
    Surface,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::EmptyList => write!(f, "empty_list"),
            FailurePolicy::Surface => write!(f, "surface"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "empty_list" | "empty-list" | "legacy" => Ok(FailurePolicy::EmptyList),
            "surface" | "strict" => Ok(FailurePolicy::Surface),
            other => Err(Error::Config(format!("Unknown failure policy: {}", other))),
        }
    }
}

/// Settings injected into the client at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Resource endpoint, e.g. `https://api.bitbucket.org/1.0/`
    pub api_base: String,
    /// Top-level endpoint, e.g. `https://api.bitbucket.org/`
    pub api_toplevel: String,
    /// Behavior on transport or parse failure
    pub failure_policy: FailurePolicy,
    /// `User-Agent` sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_toplevel: DEFAULT_API_TOPLEVEL.to_string(),
            failure_policy: FailurePolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ApiConfig {
    /// Config pointing both endpoints at `base_url` (for mock servers and
    /// self-hosted mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            api_base: base_url.clone(),
            api_toplevel: base_url,
            ..Self::default()
        }
        .normalized()
    }

    /// Same config with the failure policy replaced.
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Ensure both endpoints end in exactly one `/`, so resource paths can be
    /// appended directly.
    pub fn normalized(mut self) -> Self {
        self.api_base = with_trailing_slash(&self.api_base);
        self.api_toplevel = with_trailing_slash(&self.api_toplevel);
        self
    }
}

fn with_trailing_slash(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

/// Authentication settings kept on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bitbucket username
    #[serde(default)]
    pub username: String,
}

/// Main configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API endpoints and client behavior
    #[serde(default)]
    pub api: ApiConfig,

    /// Stored username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
        config.api = config.api.normalized();

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Stored username, empty when none is configured.
    pub fn username(&self) -> &str {
        self.auth.as_ref().map(|a| a.username.as_str()).unwrap_or("")
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `api.base`, `auth.username`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match section {
            "api" => match field {
                "base" | "api_base" => self.api.api_base = with_trailing_slash(value),
                "toplevel" | "api_toplevel" => self.api.api_toplevel = with_trailing_slash(value),
                "failure_policy" | "policy" => self.api.failure_policy = value.parse()?,
                "user_agent" => self.api.user_agent = value.to_string(),
                _ => {
                    return Err(Error::Config(format!("Unknown api config field: {}", field)));
                }
            },
            "auth" => {
                let config = self.auth.get_or_insert_with(AuthConfig::default);
                match field {
                    "username" | "user" => config.username = value.to_string(),
                    "password" => {
                        return Err(Error::Config(
                            "Passwords are not stored in the config file".to_string(),
                        ));
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown auth config field: {}",
                            field
                        )));
                    }
                }
            }
            _ => {
                return Err(Error::Config(format!("Unknown config section: {}", section)));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `api.base`, `auth.username`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match section {
            "api" => match field {
                "base" | "api_base" => Ok(Some(self.api.api_base.clone())),
                "toplevel" | "api_toplevel" => Ok(Some(self.api.api_toplevel.clone())),
                "failure_policy" | "policy" => Ok(Some(self.api.failure_policy.to_string())),
                "user_agent" => Ok(Some(self.api.user_agent.clone())),
                _ => Err(Error::Config(format!("Unknown api config field: {}", field))),
            },
            "auth" => {
                let Some(config) = &self.auth else {
                    return Ok(None);
                };
                match field {
                    "username" | "user" => Ok(Some(config.username.clone())),
                    _ => Err(Error::Config(format!(
                        "Unknown auth config field: {}",
                        field
                    ))),
                }
            }
            _ => Err(Error::Config(format!("Unknown config section: {}", section))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        [section, field] => Ok((*section, *field)),
        _ => Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: section.field",
            key
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================
