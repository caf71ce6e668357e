//! Shared configuration for kilosync tools.
//!
//! TOML device profiles, credential resolution (env + keyring + plaintext),
//! and translation to `kilosync_core::EngineConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use kilosync_core::config::MIN_INTERVAL;
use kilosync_core::{DeviceModel, EngineConfig, VideoInterface};

/// Service name under which passwords live in the system keyring.
pub const KEYRING_SERVICE: &str = "kilosync";

/// Env var consulted for the device password when a profile names none.
pub const PASSWORD_ENV: &str = "KILOSYNC_PASSWORD";

const ENV_PREFIX: &str = "KILOSYNC_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

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

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named explicitly.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Explicit name, else `default_profile`, else `"default"`.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Request timeout applied to every profile. Unset leaves requests unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_secs: None,
        }
    }
}

fn default_interval_ms() -> u64 {
    2000
}

/// A named device profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Device host or IP, optionally with a port.
    #[serde(default)]
    pub address: String,

    /// `legacy` (E1/E2) or `token` (E3).
    #[serde(default = "default_device_model")]
    pub device_model: String,

    /// Poll interval override.
    pub interval_ms: Option<u64>,

    pub user: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name holding the password.
    pub password_env: Option<String>,

    /// Log in before polling (token devices only).
    #[serde(default)]
    pub use_auth: bool,

    /// Video interface for token devices: hdmi, sdi, pip, uvc.
    pub interface: Option<String>,

    /// Request timeout override.
    pub timeout_secs: Option<u64>,
}

fn default_device_model() -> String {
    "legacy".into()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            address: String::new(),
            device_model: default_device_model(),
            interval_ms: None,
            user: None,
            password: None,
            password_env: None,
            use_auth: false,
            interface: None,
            timeout_secs: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "kilosync", "kilosync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("kilosync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path`, then `KILOSYNC_*` env vars.
///
/// Nested keys use a double underscore:
/// `KILOSYNC_PROFILES__STUDIO__ADDRESS=10.0.0.5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading configuration");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .map_err(|e| ConfigError::Keyring(e.to_string()))?;
    entry
        .set_password(password.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .ok()?
        .get_password()
        .ok()
}

/// Resolve a profile's password: `password_env` → `KILOSYNC_PASSWORD` →
/// system keyring → plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_password_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

    profile
        .password_env
        .as_deref()
        .and_then(|name| non_empty(env(name)))
        .or_else(|| non_empty(env(PASSWORD_ENV)))
        .or_else(|| non_empty(keyring(profile_name)))
        .or_else(|| non_empty(profile.password.clone()))
        .map(SecretString::from)
}

// ── Profile → EngineConfig ──────────────────────────────────────────

/// Build an `EngineConfig` from a profile, with no flag overrides.
pub fn profile_to_engine_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<EngineConfig, ConfigError> {
    let password = if profile.user.is_some() {
        resolve_password(profile, profile_name)
    } else {
        None
    };
    profile_to_engine_config_with(profile, profile_name, defaults, password)
}

/// Like [`profile_to_engine_config`], with an already-resolved password.
pub fn profile_to_engine_config_with(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    password: Option<SecretString>,
) -> Result<EngineConfig, ConfigError> {
    let address = profile.address.trim();
    if address.is_empty() {
        return Err(ConfigError::Validation {
            field: "address".into(),
            reason: format!("profile '{profile_name}' has no device address"),
        });
    }

    let model: DeviceModel =
        profile
            .device_model
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "device_model".into(),
                reason: format!(
                    "expected 'legacy' or 'token', got '{}'",
                    profile.device_model
                ),
            })?;

    let interface = match profile.interface.as_deref() {
        Some(name) => name
            .parse::<VideoInterface>()
            .map_err(|reason| ConfigError::Validation {
                field: "interface".into(),
                reason,
            })?,
        None => VideoInterface::default(),
    };

    let interval = Duration::from_millis(profile.interval_ms.unwrap_or(defaults.interval_ms));
    if interval < MIN_INTERVAL {
        return Err(ConfigError::Validation {
            field: "interval_ms".into(),
            reason: format!(
                "must be at least {} ms, got {} ms",
                MIN_INTERVAL.as_millis(),
                interval.as_millis()
            ),
        });
    }

    if model == DeviceModel::Token
        && profile.use_auth
        && (profile.user.as_deref().is_none_or(str::is_empty) || password.is_none())
    {
        return Err(ConfigError::NoCredentials {
            profile: profile_name.into(),
        });
    }

    Ok(EngineConfig {
        address: address.to_owned(),
        interval,
        model,
        username: profile.user.clone(),
        password,
        use_auth: profile.use_auth,
        interface,
        timeout: profile
            .timeout_secs
            .or(defaults.timeout_secs)
            .map(Duration::from_secs),
    })
}
