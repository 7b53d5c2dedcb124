//! Identity and access resolution for the registry token authentication service.
//!
//! Clients of a container registry request scoped tokens from the authentication service.
//! Before a token can be issued the service must answer two questions:
//!
//! - Who is asking? The [`UserInfo`] returned by an [`IdentityBackend`] includes the
//!   credential the caller verifies the request against.
//! - What may they do? The [`Access`] map decodes, for each resource, the [`Priv`]ilege
//!   granted to the user.
//!
//! Lookups are performed by pluggable identity backends selected by configuration
//! through the [`IdentityBackends`] registry.
//! Whatever goes wrong during a lookup is reported as one of the [`AuthError`] variants
//! so that callers never see (or leak) raw transport or decoding failures.
pub mod access;
pub mod backend;
pub mod errors;

#[cfg(any(test, feature = "test-fixture"))]
pub mod fixture;

mod registry;
mod user;

pub use self::access::parse_access;
pub use self::access::Access;
pub use self::access::AccessParseError;
pub use self::access::Priv;
pub use self::backend::Identities;
pub use self::backend::IdentityBackend;
pub use self::backend::IdentityBackendArgs;
pub use self::backend::IdentityBackendFactory;
pub use self::errors::AuthError;
pub use self::registry::IdentityBackends;
pub use self::registry::UnknownBackend;
pub use self::user::UserInfo;
