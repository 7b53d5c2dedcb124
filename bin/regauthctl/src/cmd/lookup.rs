//! Look a user up from the configured identity backend.
use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use prometheus::Encoder;
use prometheus::Registry;
use prometheus::TextEncoder;
use serde::Serialize;
use uuid::Uuid;

use regauth_auth::AuthError;
use regauth_auth::IdentityBackends;
use regauth_auth::UserInfo;
use regauth_conf::Conf;
use regauth_context::Context;

/// Arguments for the `lookup` command.
#[derive(Clone, Debug, clap::Args)]
pub struct LookupArgs {
    /// Namespace the user belongs to.
    pub namespace: String,

    /// Name of the user to look up.
    pub username: String,

    /// Give up on the lookup after this long (for example `5s` or `750ms`).
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Print identity backend metrics to standard error after the lookup.
    #[arg(long, default_value_t = false)]
    pub metrics: bool,
}

/// Access granted on a single resource.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ResourceAccess {
    pub actions: Vec<&'static str>,
    pub privilege: String,
}

/// Printed result of a successful lookup.
///
/// The password is deliberately absent.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct LookupOutput {
    pub access: BTreeMap<String, ResourceAccess>,
    pub username: String,
}

impl From<&UserInfo> for LookupOutput {
    fn from(user: &UserInfo) -> Self {
        let access = user
            .access
            .iter()
            .map(|(resource, privilege)| {
                let access = ResourceAccess {
                    actions: privilege.actions(),
                    privilege: privilege.to_string(),
                };
                (resource.clone(), access)
            })
            .collect();
        LookupOutput {
            access,
            username: user.username.clone(),
        }
    }
}

/// Printed result of a failed lookup.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    pub error: &'static str,
    pub status: u16,
}

impl From<&AuthError> for LookupFailure {
    fn from(error: &AuthError) -> Self {
        LookupFailure {
            error: error.client_message(),
            status: error.status(),
        }
    }
}

/// Look a user up and print the outcome as JSON to standard output.
///
/// Returns exit code 1 when the lookup fails.
pub async fn run(
    context: &Context,
    backends: &IdentityBackends,
    conf: &Conf,
    args: &LookupArgs,
) -> Result<i32> {
    let registry = Registry::new();
    backends.register_metrics(&registry)?;
    let identities = backends.init(context, &conf.identity).await?;

    let request = context
        .derive()
        .request_id(Uuid::new_v4())
        .timeout(args.timeout)
        .build();
    let result = identities
        .retrieve_user(&request, &args.namespace, &args.username)
        .await;

    if args.metrics {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        eprint!("{}", String::from_utf8_lossy(&buffer));
    }

    match result {
        Ok(user) => {
            let output = LookupOutput::from(&user);
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(0)
        }
        Err(error) => {
            slog::info!(
                request.logger, "Identity lookup failed";
                "namespace" => &args.namespace,
                "username" => &args.username,
                "error" => %error,
            );
            let output = LookupFailure::from(&error);
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use regauth_auth::parse_access;
    use regauth_auth::AuthError;
    use regauth_auth::UserInfo;
    use regauth_context::Context;

    use super::LookupArgs;
    use super::LookupFailure;
    use super::LookupOutput;
    use crate::default_backends;

    const STATIC_CONF: &str = r#"
identity:
  backend: static
  users:
    - namespace: ns
      username: alice
      password: secret123
      access: "ns:repo1:rw;ns:repo2:r;ns:repo3:admin"
"#;

    fn args(username: &str) -> LookupArgs {
        LookupArgs {
            namespace: "ns".into(),
            username: username.into(),
            timeout: Duration::from_secs(1),
            metrics: false,
        }
    }

    #[test]
    fn output_omits_password() {
        let user = UserInfo {
            access: parse_access("ns:repo1:rw;ns:repo2:r;ns:repo3:admin").unwrap(),
            password: "secret123".into(),
            username: "alice".into(),
        };
        let output = LookupOutput::from(&user);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "access": {
                    "repo1": {"actions": ["pull", "push"], "privilege": "pull,push"},
                    "repo2": {"actions": ["pull"], "privilege": "pull"},
                    "repo3": {"actions": [], "privilege": "illegal"},
                },
                "username": "alice",
            }),
        );
        assert!(!json.to_string().contains("secret123"));
    }

    #[test]
    fn failure_reports_client_message() {
        let failure = LookupFailure::from(&AuthError::backend(503, "vault is sealed"));
        assert_eq!(
            failure,
            LookupFailure {
                error: "Identity lookup failed",
                status: 503,
            },
        );
        let failure = LookupFailure::from(&AuthError::Forbidden);
        assert_eq!(failure.status, 403);
        assert_eq!(failure.error, "Forbidden");
    }

    #[tokio::test]
    async fn lookup_known_user() {
        let conf = regauth_conf::from_str(STATIC_CONF).unwrap();
        let context = Context::fixture();
        let code = super::run(&context, &default_backends(), &conf, &args("alice"))
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn lookup_unknown_user_fails() {
        let conf = regauth_conf::from_str(STATIC_CONF).unwrap();
        let context = Context::fixture();
        let code = super::run(&context, &default_backends(), &conf, &args("bob"))
            .await
            .unwrap();
        assert_eq!(code, 1);
    }
}
