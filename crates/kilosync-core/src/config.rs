// ── Engine configuration ──
//
// Describes how to reach and authenticate against one encoder.
// Constructed by CLI/config layers, consumed by `Engine::apply_config`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use kilosync_api::Credentials;
use kilosync_api::transport::TransportConfig;

use crate::error::CoreError;

pub use kilosync_api::VideoInterface;

/// Poll interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

/// Lowest poll interval a configuration may ask for.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Which generation of the device API to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    /// E1/E2/G1/G2: `.lua` endpoints with Basic auth.
    #[default]
    Legacy,
    /// E3: token-authenticated REST API.
    Token,
}

impl DeviceModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceModel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "e1e2" => Ok(Self::Legacy),
            "token" | "e3" => Ok(Self::Token),
            other => Err(CoreError::Config {
                message: format!("unknown device model '{other}' (expected legacy|e1e2|token|e3)"),
            }),
        }
    }
}

/// Configuration for one engine session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Device host or `host:port`. Empty means "not configured yet".
    pub address: String,
    pub interval: Duration,
    pub model: DeviceModel,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Token model only: log in before polling.
    pub use_auth: bool,
    /// Token model only.
    pub interface: VideoInterface,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            interval: DEFAULT_INTERVAL,
            model: DeviceModel::default(),
            username: None,
            password: None,
            use_auth: false,
            interface: VideoInterface::default(),
            timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.interval < MIN_INTERVAL {
            return Err(CoreError::Config {
                message: format!(
                    "poll interval must be at least {} ms (got {} ms)",
                    MIN_INTERVAL.as_millis(),
                    self.interval.as_millis()
                ),
            });
        }
        if self.model == DeviceModel::Token && self.use_auth && self.credentials().is_none() {
            return Err(CoreError::Config {
                message: "authentication is enabled but username or password is missing".into(),
            });
        }
        Ok(())
    }

    /// Credentials the adapter should use, if any.
    ///
    /// Legacy devices get Basic auth whenever both values are set; token
    /// devices only log in when `use_auth` is on.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.model == DeviceModel::Token && !self.use_auth {
            return None;
        }
        Credentials::from_parts(self.username.as_deref(), self.password.as_ref())
    }

    pub fn transport(&self) -> TransportConfig {
        let transport = TransportConfig::default();
        match self.timeout {
            Some(timeout) => transport.with_timeout(timeout),
            None => transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_aliases() {
        assert_eq!("e1e2".parse::<DeviceModel>().unwrap(), DeviceModel::Legacy);
        assert_eq!("E3".parse::<DeviceModel>().unwrap(), DeviceModel::Token);
        assert!("g3".parse::<DeviceModel>().is_err());
    }

    #[test]
    fn interval_floor() {
        let mut config = EngineConfig::new("10.0.0.5");
        assert!(config.validate().is_ok());

        config.interval = Duration::from_millis(999);
        assert!(config.validate().is_err());
    }

    #[test]
    fn token_credentials_require_use_auth() {
        let mut config = EngineConfig {
            model: DeviceModel::Token,
            username: Some("admin".into()),
            password: Some(SecretString::from("pw")),
            ..EngineConfig::new("10.0.0.5")
        };
        assert!(config.credentials().is_none());

        config.use_auth = true;
        assert!(config.credentials().is_some());

        config.model = DeviceModel::Legacy;
        config.use_auth = false;
        assert!(config.credentials().is_some());
    }

    #[test]
    fn use_auth_without_credentials_is_rejected() {
        let config = EngineConfig {
            model: DeviceModel::Token,
            use_auth: true,
            ..EngineConfig::new("10.0.0.5")
        };
        assert!(config.validate().is_err());
    }
}
