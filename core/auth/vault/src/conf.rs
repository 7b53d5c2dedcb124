//! Configuration options for the Vault identity backend.
use std::fmt;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as Json;

/// Errors in the Vault identity backend configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfError {
    #[error("unable to decode vault identity backend configuration")]
    Decode,

    #[error("vault host must not be empty")]
    EmptyHost,

    #[error("vault auth_token must not be empty")]
    EmptyToken,

    #[error("vault port must not be 0")]
    InvalidPort,

    #[error("vault proto must be 'http' or 'https', not '{0}'")]
    // (proto,)
    InvalidProto(String),

    #[error("vault timeout '{0}' is not a valid duration")]
    // (timeout,)
    InvalidTimeout(String),

    #[error("vault timeout must be greater than 0")]
    ZeroTimeout,
}

/// Connection options for the Vault server users are looked up from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConf {
    /// Token to authenticate with Vault as.
    pub auth_token: String,

    /// Hostname or IP address of the Vault server.
    pub host: String,

    /// Port the Vault server listens on.
    pub port: u16,

    /// Protocol to connect to the Vault server with (`http` or `https`).
    pub proto: String,

    /// Maximum duration of requests to the Vault server (for example `2s` or `500ms`).
    pub timeout: String,
}

impl VaultConf {
    /// Base address of the Vault server.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("{}://[{}]:{}", self.proto, self.host, self.port)
        } else {
            format!("{}://{}:{}", self.proto, self.host, self.port)
        }
    }

    /// Decode and validate the backend options block.
    pub fn decode(conf: &Json) -> Result<VaultConf> {
        let conf: VaultConf = serde_json::from_value(conf.clone()).context(ConfError::Decode)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Parse the request timeout.
    pub fn timeout(&self) -> Result<Duration> {
        let timeout = humantime::parse_duration(&self.timeout)
            .with_context(|| ConfError::InvalidTimeout(self.timeout.clone()))?;
        if timeout.is_zero() {
            anyhow::bail!(ConfError::ZeroTimeout);
        }
        Ok(timeout)
    }

    /// Verify all options are set to usable values.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.proto.as_str(), "http" | "https") {
            anyhow::bail!(ConfError::InvalidProto(self.proto.clone()));
        }
        if self.host.trim().is_empty() {
            anyhow::bail!(ConfError::EmptyHost);
        }
        if self.port == 0 {
            anyhow::bail!(ConfError::InvalidPort);
        }
        if self.auth_token.is_empty() {
            anyhow::bail!(ConfError::EmptyToken);
        }
        self.timeout()?;
        Ok(())
    }
}

impl fmt::Debug for VaultConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConf")
            .field("auth_token", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("proto", &self.proto)
            .field("timeout", &self.timeout)
            .finish()
    }
}
