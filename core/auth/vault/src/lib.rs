//! Identity backend looking users up from a [Vault](https://www.vaultproject.io/) secret store.
//!
//! Each user is stored as a secret at `/v1/<namespace>/<username>` with the following data:
//!
//! ```json
//! {
//!   "data": {
//!     "access": "<namespace>:<resource>:<privilege>;...",
//!     "password": "<credential>"
//!   }
//! }
//! ```
//!
//! Requests to Vault never follow redirects and are bounded by the configured timeout
//! as well as by the deadline and cancellation of the lookup [`Context`].
use anyhow::Context as AnyContext;
use anyhow::Result;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use reqwest::Client as ReqwestClient;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value as Json;

use regauth_auth::parse_access;
use regauth_auth::AuthError;
use regauth_auth::Identities;
use regauth_auth::IdentityBackend;
use regauth_auth::IdentityBackendArgs;
use regauth_auth::IdentityBackendFactory;
use regauth_auth::UserInfo;
use regauth_context::Context;

mod conf;
mod metrics;


pub use self::conf::ConfError;
pub use self::conf::VaultConf;

/// String to set as the user agent in HTTP request.
static CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Header Vault reads the client token from.
const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// Errors creating the Vault HTTP(S) client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unable to create vault HTTP(S) client")]
    Create,

    #[error("vault address '{0}' is not a valid base URL")]
    // (address,)
    InvalidAddress(String),

    #[error("vault auth_token is not a valid HTTP header value")]
    InvalidToken,
}

/// The Vault server responded with a redirect, which are never followed.
#[derive(Debug, thiserror::Error)]
#[error("refused to follow vault redirect to '{location}'")]
pub struct RedirectRefused {
    pub location: String,
}

/// Secret payload returned by Vault for users.
#[derive(Debug, Deserialize)]
struct SecretResponse {
    data: SecretData,
}

#[derive(Debug, Deserialize)]
struct SecretData {
    access: String,
    password: String,
}

/// Error payload returned by Vault for failed requests.
#[derive(Debug, Deserialize)]
struct VaultErrors {
    #[serde(default)]
    errors: Vec<String>,
}

/// Look users up from a Vault server.
///
/// The underlying HTTP client pools connections and is shared by all concurrent lookups.
pub struct VaultClient {
    /// Base URL of the Vault server.
    base: Url,

    /// Low-level [`Client`](reqwest::Client) to perform HTTP requests with.
    client: ReqwestClient,

    /// Token to authenticate requests to Vault with.
    token: HeaderValue,
}

impl VaultClient {
    /// Initialise a client from validated [`VaultConf`] options.
    pub fn with(conf: &VaultConf) -> Result<VaultClient> {
        let address = conf.address();
        let base = Url::parse(&address).with_context(|| ClientError::InvalidAddress(address))?;
        let mut token =
            HeaderValue::from_str(&conf.auth_token).context(ClientError::InvalidToken)?;
        token.set_sensitive(true);

        let policy = Policy::custom(|attempt| {
            let location = attempt.url().to_string();
            attempt.error(RedirectRefused { location })
        });
        let client = ReqwestClient::builder()
            .redirect(policy)
            .timeout(conf.timeout()?)
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .context(ClientError::Create)?;
        Ok(VaultClient {
            base,
            client,
            token,
        })
    }

    /// URL of the secret for a user in a namespace.
    ///
    /// The namespace and username are encoded as a single path segment each.
    /// Returns `None` for names that can't identify a secret (empty, `.` or `..`).
    fn user_url(&self, namespace: &str, username: &str) -> Option<Url> {
        let invalid = |segment: &str| matches!(segment, "" | "." | "..");
        if invalid(namespace) || invalid(username) {
            return None;
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["v1", namespace, username]);
        Some(url)
    }
}

impl VaultClient {
    /// Perform the user lookup, see [`IdentityBackend::retrieve_user`].
    async fn lookup(
        &self,
        context: &Context,
        namespace: &str,
        username: &str,
    ) -> Result<UserInfo, AuthError> {
        let url = match self.user_url(namespace, username) {
            Some(url) => url,
            None => {
                slog::info!(
                    context.logger,
                    "Rejected vault lookup for an invalid namespace or username";
                    "namespace" => namespace,
                    "username" => username,
                );
                return Err(AuthError::Forbidden);
            }
        };

        let request = self
            .client
            .get(url.clone())
            .header(VAULT_TOKEN_HEADER, self.token.clone())
            .send();
        let response = match context.run(request).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                slog::error!(
                    context.logger,
                    "Unable to call vault API";
                    "url" => %url,
                    "error" => %error,
                    "redirect" => error.is_redirect(),
                    "timeout" => error.is_timeout(),
                );
                return Err(AuthError::Internal);
            }
            Err(interrupted) => {
                slog::warn!(
                    context.logger,
                    "Vault API call interrupted";
                    "url" => %url,
                    "error" => %interrupted,
                );
                return Err(AuthError::Internal);
            }
        };

        let status = response.status();
        if !status.is_success() {
            slog::warn!(
                context.logger,
                "Error while retrieving vault data";
                "url" => %url,
                "status" => status.as_u16(),
            );
            return Err(status_error(context, response).await);
        }

        let body = match context.run(response.bytes()).await {
            Ok(Ok(body)) => body,
            Ok(Err(error)) => {
                slog::error!(
                    context.logger,
                    "Unable to read vault API response";
                    "url" => %url,
                    "error" => %error,
                );
                return Err(AuthError::Internal);
            }
            Err(interrupted) => {
                slog::warn!(
                    context.logger,
                    "Reading vault API response interrupted";
                    "url" => %url,
                    "error" => %interrupted,
                );
                return Err(AuthError::Internal);
            }
        };
        let secret: SecretResponse = serde_json::from_slice(&body).map_err(|error| {
            slog::error!(
                context.logger,
                "Unable to decode vault JSON response";
                "url" => %url,
                "error" => %error,
            );
            AuthError::Internal
        })?;
        let access = parse_access(&secret.data.access).map_err(|error| {
            slog::error!(
                context.logger,
                "Invalid access descriptor in vault secret";
                "url" => %url,
                "error" => %error,
            );
            AuthError::Internal
        })?;

        Ok(UserInfo {
            access,
            password: secret.data.password,
            username: username.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl IdentityBackend for VaultClient {
    async fn retrieve_user(
        &self,
        context: &Context,
        namespace: &str,
        username: &str,
    ) -> Result<UserInfo, AuthError> {
        let timer = self::metrics::LOOKUPS_DURATION.start_timer();
        let result = self.lookup(context, namespace, username).await;
        timer.observe_duration();
        self::metrics::observe(&result);
        result
    }
}

/// Initialise [`VaultClient`] identity backends.
pub struct VaultFactory;

#[async_trait::async_trait]
impl IdentityBackendFactory for VaultFactory {
    fn conf_check(&self, _: &Context, conf: &Json) -> Result<()> {
        VaultConf::decode(conf)?;
        Ok(())
    }

    fn register_metrics(&self, registry: &prometheus::Registry) -> Result<()> {
        self::metrics::register_metrics(registry)
    }

    async fn init<'a>(&self, args: IdentityBackendArgs<'a>) -> Result<Identities> {
        let conf = VaultConf::decode(args.conf)?;
        let client = VaultClient::with(&conf)?;
        slog::debug!(
            args.context.logger, "Vault identity backend configured";
            "address" => conf.address(),
            "timeout" => &conf.timeout,
        );
        Ok(Identities::from(client))
    }
}

/// Classify a non-successful Vault response.
///
/// - 403 means the backend token lacks permissions: that is our problem, not the user's.
/// - 404 means the user does not exist in the namespace: report it as forbidden.
/// - Anything else carries the status and error text reported by Vault.
async fn status_error(context: &Context, response: Response) -> AuthError {
    let status = response.status();
    match status {
        StatusCode::FORBIDDEN => {
            slog::error!(
                context.logger,
                "Vault token does not have enough permissions to read user secrets"
            );
            AuthError::Internal
        }
        StatusCode::NOT_FOUND => AuthError::Forbidden,
        _ => {
            let message = error_message(context, response).await;
            AuthError::backend(status.as_u16(), message)
        }
    }
}

/// Extract the error text from a failed Vault response.
async fn error_message(context: &Context, response: Response) -> String {
    let status = response.status();
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("unknown vault error")
            .to_string()
    };
    let text = match context.run(response.text()).await {
        Ok(Ok(text)) => text,
        _ => return fallback(),
    };
    if let Ok(payload) = serde_json::from_str::<VaultErrors>(&text) {
        if !payload.errors.is_empty() {
            return payload.errors.join("; ");
        }
    }
    let text = text.trim();
    if text.is_empty() {
        return fallback();
    }
    text.to_string()
}
