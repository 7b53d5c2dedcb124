//! Data object storing the service configuration.
use serde::Deserialize;
use serde::Serialize;

/// Global configuration for the registry authentication service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conf {
    /// Identity backend users and their access are looked up from.
    pub identity: BackendConf,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConf,
}

/// Unstructured configuration for runtime selected service backends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendConf {
    /// ID of the backend selected to provide the service.
    pub backend: String,

    /// Backend specific configuration options.
    #[serde(default, flatten)]
    pub options: serde_json::Value,
}

/// Logging configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConf {
    /// Minimum level of events to emit.
    #[serde(default)]
    pub level: LogLevel,
}

/// Verbosity levels for logged events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}
