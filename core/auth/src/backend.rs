//! Interface to the identity backends users and their access are looked up from.
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value as Json;

use regauth_context::Context;

use crate::AuthError;
use crate::UserInfo;

/// Operations implemented by identity backends supported by the authentication service.
#[async_trait::async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Look up the credentials and access of a user in a namespace.
    ///
    /// [`IdentityBackend`] implementations must respect the following expectations:
    ///
    /// - The returned [`UserInfo::username`] is the requested `username`.
    /// - Only [`AuthError`]s are returned and details of failures are logged with the
    ///   [`Context`] logger before returning.
    /// - Users and namespaces that do not exist result in [`AuthError::Forbidden`].
    /// - Lookups return promptly with [`AuthError::Internal`] once the [`Context`] is
    ///   cancelled or its deadline passes.
    /// - No result is cached across calls.
    async fn retrieve_user(
        &self,
        context: &Context,
        namespace: &str,
        username: &str,
    ) -> Result<UserInfo, AuthError>;
}

#[async_trait::async_trait]
impl<T> IdentityBackend for Arc<T>
where
    T: IdentityBackend + ?Sized,
{
    async fn retrieve_user(
        &self,
        context: &Context,
        namespace: &str,
        username: &str,
    ) -> Result<UserInfo, AuthError> {
        self.as_ref()
            .retrieve_user(context, namespace, username)
            .await
    }
}

/// Initialisation logic for [`IdentityBackend`] implementations.
#[async_trait::async_trait]
pub trait IdentityBackendFactory: Send + Sync {
    /// Validate the user provided configuration for the backend.
    fn conf_check(&self, context: &Context, conf: &Json) -> Result<()>;

    /// Register backend specific metrics.
    fn register_metrics(&self, registry: &prometheus::Registry) -> Result<()>;

    /// Initialise an [`Identities`] object.
    async fn init<'a>(&self, args: IdentityBackendArgs<'a>) -> Result<Identities>;
}

/// Arguments passed to the [`IdentityBackendFactory`] initialisation method.
pub struct IdentityBackendArgs<'a> {
    /// The configuration block for the backend to initialise.
    pub conf: &'a Json,

    /// Process wide context to initialise the backend with.
    pub context: &'a Context,
}

/// Look up users from the configured [`IdentityBackend`].
///
/// This is the type request handlers hold: it is cheap to clone and shared by all
/// concurrent lookups.
#[derive(Clone)]
pub struct Identities {
    /// Identity backend to look users up from.
    inner: Arc<dyn IdentityBackend>,
}

impl Identities {
    /// Look up the credentials and access of a user in a namespace.
    ///
    /// Requests on behalf of a [`Context`] that is already cancelled or expired are rejected
    /// without involving the backend.
    /// For details see [`IdentityBackend::retrieve_user`].
    pub async fn retrieve_user(
        &self,
        context: &Context,
        namespace: &str,
        username: &str,
    ) -> Result<UserInfo, AuthError> {
        if let Some(interrupted) = context.interrupted() {
            slog::warn!(
                context.logger,
                "Identity lookup abandoned before it started";
                "namespace" => namespace,
                "username" => username,
                "error" => %interrupted,
            );
            return Err(AuthError::Internal);
        }
        self.inner.retrieve_user(context, namespace, username).await
    }
}

impl<T> From<T> for Identities
where
    T: IdentityBackend + 'static,
{
    fn from(value: T) -> Self {
        let inner = Arc::new(value);
        Identities { inner }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regauth_context::Context;

    use super::Identities;
    use crate::fixture::FixtureBackend;
    use crate::parse_access;
    use crate::AuthError;
    use crate::UserInfo;

    fn fixture() -> Arc<FixtureBackend> {
        let backend = FixtureBackend::new();
        backend.user(
            "ns",
            UserInfo {
                access: parse_access("ns:repo1:rw").unwrap(),
                password: "secret123".into(),
                username: "alice".into(),
            },
        );
        Arc::new(backend)
    }

    #[tokio::test]
    async fn lookup_delegates_to_backend() {
        let backend = fixture();
        let identities = Identities::from(Arc::clone(&backend));
        let context = Context::fixture();

        let user = identities
            .retrieve_user(&context, "ns", "alice")
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password, "secret123");
        assert_eq!(backend.requests(), [("ns".to_string(), "alice".to_string())]);
    }

    #[tokio::test]
    async fn lookup_errors_pass_through() {
        let backend = fixture();
        backend.error("ns", "bob", AuthError::backend(503, "sealed"));
        let identities = Identities::from(Arc::clone(&backend));
        let context = Context::fixture();

        let error = identities
            .retrieve_user(&context, "ns", "bob")
            .await
            .unwrap_err();
        assert_eq!(error, AuthError::backend(503, "sealed"));

        let error = identities
            .retrieve_user(&context, "other", "alice")
            .await
            .unwrap_err();
        assert_eq!(error, AuthError::Forbidden);
    }

    #[tokio::test]
    async fn lookup_skipped_when_cancelled() {
        let backend = fixture();
        let identities = Identities::from(Arc::clone(&backend));
        let context = Context::fixture();
        context.cancel.cancel();

        let error = identities
            .retrieve_user(&context, "ns", "alice")
            .await
            .unwrap_err();
        assert_eq!(error, AuthError::Internal);
        assert!(backend.requests().is_empty());
    }
}
