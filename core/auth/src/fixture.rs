//! Mock identity backend implementation for unit tests.
use std::collections::HashMap;
use std::sync::Mutex;

use regauth_context::Context;

use crate::AuthError;
use crate::IdentityBackend;
use crate::UserInfo;

/// Mock identity backend returning canned results.
///
/// Lookups for users that were not registered fail with [`AuthError::Forbidden`].
pub struct FixtureBackend {
    state: Mutex<FixtureState>,
}

impl FixtureBackend {
    /// Initialise a backend with no users.
    pub fn new() -> FixtureBackend {
        let state = FixtureState {
            requests: Default::default(),
            results: Default::default(),
        };
        FixtureBackend {
            state: Mutex::new(state),
        }
    }

    /// Fail lookups for a user with the given error.
    pub fn error<S1, S2>(&self, namespace: S1, username: S2, error: AuthError) -> &Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let key = (namespace.into(), username.into());
        let mut state = self.state.lock().unwrap();
        state.results.insert(key, Err(error));
        self
    }

    /// List the (namespace, username) lookups performed so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        state.requests.clone()
    }

    /// Add a user to a namespace.
    pub fn user<S>(&self, namespace: S, user: UserInfo) -> &Self
    where
        S: Into<String>,
    {
        let key = (namespace.into(), user.username.clone());
        let mut state = self.state.lock().unwrap();
        state.results.insert(key, Ok(user));
        self
    }
}

impl Default for FixtureBackend {
    fn default() -> Self {
        FixtureBackend::new()
    }
}

#[async_trait::async_trait]
impl IdentityBackend for FixtureBackend {
    async fn retrieve_user(
        &self,
        _: &Context,
        namespace: &str,
        username: &str,
    ) -> Result<UserInfo, AuthError> {
        let key = (namespace.to_string(), username.to_string());
        let mut state = self.state.lock().unwrap();
        state.requests.push(key.clone());
        match state.results.get(&key) {
            None => Err(AuthError::Forbidden),
            Some(result) => result.clone(),
        }
    }
}

/// Internal state to implement identity backend mocking.
struct FixtureState {
    requests: Vec<(String, String)>,
    results: HashMap<(String, String), Result<UserInfo, AuthError>>,
}
