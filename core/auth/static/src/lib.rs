//! Identity backend serving users declared in the service configuration.
//!
//! This backend is intended for small deployments, development cycles or demo instances
//! where running a dedicated secret store is not justified.
//!
//! ```yaml
//! identity:
//!   backend: static
//!   users:
//!     - namespace: ns
//!       username: alice
//!       password: secret123
//!       access: "ns:repo1:rw;ns:repo2:r"
//! ```
use std::collections::HashMap;

use anyhow::Context as AnyContext;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as Json;

use regauth_auth::parse_access;
use regauth_auth::AuthError;
use regauth_auth::Identities;
use regauth_auth::IdentityBackend;
use regauth_auth::IdentityBackendArgs;
use regauth_auth::IdentityBackendFactory;
use regauth_auth::UserInfo;
use regauth_context::Context;

/// Errors in the static identity backend configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfError {
    #[error("unable to decode static identity backend configuration")]
    Decode,

    #[error("user '{namespace}/{username}' is declared more than once")]
    DuplicateUser { namespace: String, username: String },

    #[error("user '{namespace}/{username}' has an invalid access descriptor")]
    InvalidAccess { namespace: String, username: String },
}

/// Users served by the static identity backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticConf {
    /// Users and their access, grouped by namespace.
    #[serde(default)]
    pub users: Vec<StaticUser>,
}

/// A user declared in the static identity backend configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticUser {
    /// Access descriptor for the user.
    pub access: String,

    /// Namespace the user is declared in.
    pub namespace: String,

    /// Credential for the user.
    pub password: String,

    /// Name of the user.
    pub username: String,
}

impl std::fmt::Debug for StaticUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticUser")
            .field("access", &self.access)
            .field("namespace", &self.namespace)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Serve users from an in-memory table built from configuration.
pub struct StaticUsers {
    users: HashMap<(String, String), UserInfo>,
}

impl StaticUsers {
    /// Build the users table, validating every declared user.
    pub fn with(conf: &StaticConf) -> Result<StaticUsers> {
        let mut users = HashMap::new();
        for user in &conf.users {
            let access = parse_access(&user.access).with_context(|| ConfError::InvalidAccess {
                namespace: user.namespace.clone(),
                username: user.username.clone(),
            })?;
            let key = (user.namespace.clone(), user.username.clone());
            let info = UserInfo {
                access,
                password: user.password.clone(),
                username: user.username.clone(),
            };
            if users.insert(key, info).is_some() {
                anyhow::bail!(ConfError::DuplicateUser {
                    namespace: user.namespace.clone(),
                    username: user.username.clone(),
                });
            }
        }
        Ok(StaticUsers { users })
    }
}

#[async_trait::async_trait]
impl IdentityBackend for StaticUsers {
    async fn retrieve_user(
        &self,
        context: &Context,
        namespace: &str,
        username: &str,
    ) -> Result<UserInfo, AuthError> {
        let key = (namespace.to_string(), username.to_string());
        match self.users.get(&key) {
            Some(user) => Ok(user.clone()),
            None => {
                slog::debug!(
                    context.logger, "User not declared in static identity backend";
                    "namespace" => namespace,
                    "username" => username,
                );
                Err(AuthError::Forbidden)
            }
        }
    }
}

/// Initialise [`StaticUsers`] identity backends.
pub struct StaticFactory;

impl StaticFactory {
    fn decode(conf: &Json) -> Result<StaticUsers> {
        let conf: StaticConf = serde_json::from_value(conf.clone()).context(ConfError::Decode)?;
        StaticUsers::with(&conf)
    }
}

#[async_trait::async_trait]
impl IdentityBackendFactory for StaticFactory {
    fn conf_check(&self, _: &Context, conf: &Json) -> Result<()> {
        StaticFactory::decode(conf)?;
        Ok(())
    }

    fn register_metrics(&self, _: &prometheus::Registry) -> Result<()> {
        Ok(())
    }

    async fn init<'a>(&self, args: IdentityBackendArgs<'a>) -> Result<Identities> {
        let users = StaticFactory::decode(args.conf)?;
        slog::debug!(
            args.context.logger, "Static identity backend configured";
            "users" => users.users.len(),
        );
        Ok(Identities::from(users))
    }
}
