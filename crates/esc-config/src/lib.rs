//! Persisted configuration for the esc console.
//!
//! One TOML file with three required keys, layered under defaults and
//! over `ESC_`-prefixed environment variables. Every write is validated
//! before it reaches disk.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;
use url::Url;

pub const DEFAULT_URL: &str = "http://localhost:8000";
pub const DEFAULT_HTTP_TOKEN: &str = "SECRET_AUTH_TOKEN";
pub const DEFAULT_WS_TOKEN: &str = "SECRET_WS_AUTH_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown config key '{key}'")]
    UnknownKey { key: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Backend base URL; the control channel URL is derived from it.
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "ChannelAuth::http")]
    pub http: ChannelAuth,

    #[serde(default = "ChannelAuth::ws")]
    pub ws: ChannelAuth,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            http: ChannelAuth::http(),
            ws: ChannelAuth::ws(),
        }
    }
}

/// `[api.http.auth]` / `[api.ws.auth]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChannelAuth {
    pub auth: TokenAuth,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenAuth {
    pub token: String,
}

impl ChannelAuth {
    fn with_token(token: &str) -> Self {
        Self {
            auth: TokenAuth {
                token: token.into(),
            },
        }
    }

    fn http() -> Self {
        Self::with_token(DEFAULT_HTTP_TOKEN)
    }

    fn ws() -> Self {
        Self::with_token(DEFAULT_WS_TOKEN)
    }
}

fn default_url() -> String {
    DEFAULT_URL.into()
}

/// The keys a user may read and write, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display)]
pub enum ConfigKey {
    #[strum(serialize = "api.url")]
    ApiUrl,
    #[strum(serialize = "api.http.auth.token")]
    HttpToken,
    #[strum(serialize = "api.ws.auth.token")]
    WsToken,
}

impl ConfigKey {
    /// Parse a dotted key, reporting unknown ones as a config error.
    pub fn parse(key: &str) -> Result<Self, ConfigError> {
        key.parse().map_err(|_| ConfigError::UnknownKey { key: key.into() })
    }
}

impl Config {
    pub fn get(&self, key: ConfigKey) -> &str {
        match key {
            ConfigKey::ApiUrl => &self.api.url,
            ConfigKey::HttpToken => &self.api.http.auth.token,
            ConfigKey::WsToken => &self.api.ws.auth.token,
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        let slot = match key {
            ConfigKey::ApiUrl => &mut self.api.url,
            ConfigKey::HttpToken => &mut self.api.http.auth.token,
            ConfigKey::WsToken => &mut self.api.ws.auth.token,
        };
        *slot = value.into();
    }

    /// Check every required key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in ConfigKey::iter() {
            validate_value(key, self.get(key))?;
        }
        Ok(())
    }

    /// The parsed backend URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        parse_base_url(&self.api.url)
    }

    pub fn http_token(&self) -> SecretString {
        SecretString::from(self.api.http.auth.token.clone())
    }

    pub fn ws_token(&self) -> SecretString {
        SecretString::from(self.api.ws.auth.token.clone())
    }
}

fn validate_value(key: ConfigKey, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: key.to_string(),
            reason: "must not be empty".into(),
        });
    }
    if key == ConfigKey::ApiUrl {
        parse_base_url(value)?;
    }
    Ok(())
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw.parse().map_err(|e| ConfigError::Validation {
        field: ConfigKey::ApiUrl.to_string(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Validation {
            field: ConfigKey::ApiUrl.to_string(),
            reason: format!("expected an http or https URL, got scheme '{other}'"),
        }),
    }
}

// ── Platform paths ──────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "esc", "esc")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Resolve the result cache path via XDG / platform conventions.
pub fn cache_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".cache").join("cache.json"),
        |dirs| dirs.cache_dir().join("cache.json"),
    )
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("esc");
    p
}

// ── Store ───────────────────────────────────────────────────────────

/// The loaded configuration plus the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
}

impl ConfigStore {
    /// Load defaults < file < environment and validate the result.
    /// A missing file is not an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config: Config = file_layers(&path)
            .merge(Env::prefixed("ESC_").split("__"))
            .extract()?;
        config.validate()?;

        tracing::debug!(path = %path.display(), url = %config.api.url, "configuration loaded");
        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get(&self, key: ConfigKey) -> &str {
        self.config.get(key)
    }

    /// All keys with their effective values, in display order.
    pub fn entries(&self) -> Vec<(ConfigKey, String)> {
        ConfigKey::iter()
            .map(|key| (key, self.config.get(key).to_owned()))
            .collect()
    }

    /// Validate and persist one key.
    ///
    /// Only the file layer is rewritten; environment overrides stay out of
    /// the file. An invalid value leaves the file untouched.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        validate_value(key, value)?;

        let mut on_disk: Config = file_layers(&self.path).extract()?;
        on_disk.set(key, value);
        on_disk.validate()?;
        self.save(&on_disk)?;

        self.config.set(key, value);
        tracing::info!(%key, path = %self.path.display(), "configuration updated");
        Ok(())
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(cfg)?;
        std::fs::write(&self.path, toml_str)?;
        Ok(())
    }
}

fn file_layers(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
}
