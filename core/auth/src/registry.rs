//! Registry of identity backend factories selected by configuration.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use regauth_conf::BackendConf;
use regauth_context::Context;

use crate::Identities;
use crate::IdentityBackendArgs;
use crate::IdentityBackendFactory;

/// The configured identity backend is not supported.
#[derive(Debug, thiserror::Error)]
#[error("identity backend '{backend}' is not supported")]
pub struct UnknownBackend {
    pub backend: String,
}

/// Registry of identity backend factories.
///
/// Front ends look up the factory named by the configuration and never depend
/// on concrete backend types.
#[derive(Clone)]
pub struct IdentityBackends {
    factories: HashMap<String, Arc<dyn IdentityBackendFactory>>,
}

impl IdentityBackends {
    /// Validate the configuration of the selected identity backend.
    pub fn conf_check(&self, context: &Context, conf: &BackendConf) -> Result<()> {
        let factory = self.lookup(conf)?;
        factory.conf_check(context, &conf.options)
    }

    /// Create an [`IdentityBackends`] registry with no factories configured.
    pub fn empty() -> IdentityBackends {
        IdentityBackends {
            factories: Default::default(),
        }
    }

    /// Validate the configuration and initialise the selected identity backend.
    pub async fn init(&self, context: &Context, conf: &BackendConf) -> Result<Identities> {
        let factory = self.lookup(conf)?;
        factory.conf_check(context, &conf.options)?;
        let args = IdentityBackendArgs {
            conf: &conf.options,
            context,
        };
        let identities = factory.init(args).await?;
        slog::info!(
            context.logger, "Identity backend initialised";
            "backend" => &conf.backend,
        );
        Ok(identities)
    }

    /// Register metrics for all known backends.
    pub fn register_metrics(&self, registry: &prometheus::Registry) -> Result<()> {
        for factory in self.factories.values() {
            factory.register_metrics(registry)?;
        }
        Ok(())
    }

    /// Register an identity backend factory with an ID.
    pub fn with_factory<F, S>(&mut self, id: S, factory: F) -> &mut Self
    where
        S: Into<String>,
        F: IdentityBackendFactory + 'static,
    {
        let id = id.into();
        let factory = Arc::new(factory);
        self.factories.insert(id, factory);
        self
    }
}

impl IdentityBackends {
    fn lookup(&self, conf: &BackendConf) -> Result<&Arc<dyn IdentityBackendFactory>> {
        match self.factories.get(&conf.backend) {
            Some(factory) => Ok(factory),
            None => {
                let error = UnknownBackend {
                    backend: conf.backend.clone(),
                };
                anyhow::bail!(error);
            }
        }
    }
}

impl Default for IdentityBackends {
    fn default() -> Self {
        IdentityBackends::empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use anyhow::Result;
    use serde_json::Value as Json;

    use regauth_conf::BackendConf;
    use regauth_context::Context;

    use super::IdentityBackends;
    use super::UnknownBackend;
    use crate::fixture::FixtureBackend;
    use crate::AuthError;
    use crate::Identities;
    use crate::IdentityBackendArgs;
    use crate::IdentityBackendFactory;

    /// Invalid configuration for the test backend.
    #[derive(Debug, thiserror::Error)]
    #[error("fixture backend requires a 'valid' option set to true")]
    struct InvalidFixtureConf;

    #[derive(Default)]
    struct Factory {
        inits: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl IdentityBackendFactory for Factory {
        fn conf_check(&self, _: &Context, conf: &Json) -> Result<()> {
            match conf.get("valid").and_then(Json::as_bool) {
                Some(true) => Ok(()),
                _ => anyhow::bail!(InvalidFixtureConf),
            }
        }

        fn register_metrics(&self, _: &prometheus::Registry) -> Result<()> {
            Ok(())
        }

        async fn init<'a>(&self, _: IdentityBackendArgs<'a>) -> Result<Identities> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(Identities::from(FixtureBackend::new()))
        }
    }

    fn conf(backend: &str, valid: bool) -> BackendConf {
        BackendConf {
            backend: backend.to_string(),
            options: serde_json::json!({ "valid": valid }),
        }
    }

    #[tokio::test]
    async fn init_selected_backend() {
        let factory = Factory::default();
        let inits = Arc::clone(&factory.inits);
        let mut backends = IdentityBackends::empty();
        backends.with_factory("fixture", factory);

        let context = Context::fixture();
        let identities = backends
            .init(&context, &conf("fixture", true))
            .await
            .unwrap();
        assert_eq!(inits.load(Ordering::SeqCst), 1);

        let error = identities
            .retrieve_user(&context, "ns", "alice")
            .await
            .unwrap_err();
        assert_eq!(error, AuthError::Forbidden);
    }

    #[tokio::test]
    async fn init_fails_fast_on_invalid_conf() {
        let factory = Factory::default();
        let inits = Arc::clone(&factory.inits);
        let mut backends = IdentityBackends::empty();
        backends.with_factory("fixture", factory);

        let context = Context::fixture();
        let error = match backends.init(&context, &conf("fixture", false)).await {
            Ok(_) => panic!("init should fail"),
            Err(error) => error,
        };
        assert!(error.is::<InvalidFixtureConf>());
        assert_eq!(inits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_backend() {
        let backends = IdentityBackends::default();
        let context = Context::fixture();
        let error = backends
            .conf_check(&context, &conf("ldap", true))
            .unwrap_err();
        let error = error.downcast_ref::<UnknownBackend>().unwrap();
        assert_eq!(error.backend, "ldap");
    }
}
