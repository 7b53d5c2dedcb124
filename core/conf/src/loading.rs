//! Load configuration from files.
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;

use crate::Conf;

/// Errors handling the service configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unable to decode configuration from file at the given path.
    #[error("unable to decode configuration from file at '{0}'")]
    // (path,)
    Decode(String),

    /// Unable to read configuration file at the given path.
    #[error("unable to read configuration file at '{0}'")]
    // (path,)
    Open(String),

    /// Configuration file not found at the given path.
    #[error("configuration file not found at '{0}'")]
    // (path,)
    PathNotFound(String),
}

/// Decode process configuration from a YAML string.
pub fn from_str(source: &str) -> Result<Conf> {
    let conf = serde_yaml::from_str(source).context(Error::Decode("<string>".into()))?;
    Ok(conf)
}

/// Load process configuration from the specified path.
///
/// Unlike other services a missing file is an error: there is no usable default identity backend.
pub fn load(path: &str) -> Result<Conf> {
    if !Path::new(path).exists() {
        let error = Error::PathNotFound(path.to_string());
        let error = anyhow::anyhow!(error);
        return Err(error);
    }

    let file = File::open(path).with_context(|| Error::Open(path.into()))?;
    let conf = serde_yaml::from_reader(file).with_context(|| Error::Decode(path.into()))?;
    Ok(conf)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::Error;
    use crate::LogLevel;

    const VAULT_CONF: &str = r#"
identity:
  backend: vault
  proto: http
  host: 127.0.0.1
  port: 8200
  timeout: 2s
  auth_token: s.token
log:
  level: debug
"#;

    #[test]
    fn decode_backend_options() {
        let conf = super::from_str(VAULT_CONF).unwrap();
        assert_eq!(conf.identity.backend, "vault");
        assert_eq!(
            conf.identity.options,
            serde_json::json!({
                "proto": "http",
                "host": "127.0.0.1",
                "port": 8200,
                "timeout": "2s",
                "auth_token": "s.token",
            })
        );
        assert_eq!(conf.log.level, LogLevel::Debug);
    }

    #[test]
    fn decode_defaults() {
        let conf = super::from_str("identity:\n  backend: static\n").unwrap();
        assert_eq!(conf.identity.backend, "static");
        assert_eq!(conf.log.level, LogLevel::Info);
    }

    #[test]
    fn decode_requires_identity() {
        let error = super::from_str("log:\n  level: info\n").unwrap_err();
        assert!(error.is::<Error>());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VAULT_CONF.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();
        let conf = super::load(path).unwrap();
        assert_eq!(conf.identity.backend, "vault");
    }

    #[test]
    fn load_missing_file() {
        let error = super::load("/this/path/does/not/exist.yaml").unwrap_err();
        match error.downcast_ref::<Error>() {
            Some(Error::PathNotFound(path)) => assert_eq!(path, "/this/path/does/not/exist.yaml"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
