//! Classified failures returned by identity lookups.

/// Failure to resolve the identity and access of a user.
///
/// The variants are the only errors identity backends are allowed to return.
/// Transport, decoding and parsing problems are logged by backends and collapsed into
/// one of these before the lookup returns.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Something went wrong on our side or the backend is misconfigured.
    ///
    /// Details are available in the logs but must not be shown to clients.
    #[error("internal server error")]
    Internal,

    /// The user may not access the requested namespace.
    ///
    /// Also used when the user or namespace does not exist so clients cannot
    /// enumerate existing users or namespaces.
    #[error("forbidden")]
    Forbidden,

    /// The backend failed the request with an unexpected status.
    #[error("identity backend responded with status {status}: {message}")]
    Backend {
        /// Error text reported by the backend.
        message: String,

        /// Status code returned by the backend.
        status: u16,
    },
}

impl AuthError {
    /// Wrap an unexpected backend response status and error text.
    pub fn backend<S>(status: u16, message: S) -> AuthError
    where
        S: Into<String>,
    {
        AuthError::Backend {
            message: message.into(),
            status,
        }
    }

    /// Message that can safely be returned to the end client.
    ///
    /// Backend error text is never included: it is only meant for logs.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::Internal => "Internal server error",
            AuthError::Forbidden => "Forbidden",
            AuthError::Backend { .. } => "Identity lookup failed",
        }
    }

    /// HTTP status code associated with the error.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::Internal => 500,
            AuthError::Forbidden => 403,
            AuthError::Backend { status, .. } => *status,
        }
    }
}
