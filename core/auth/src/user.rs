//! Result of successful identity lookups.
use std::fmt;

use crate::Access;
use crate::Priv;

/// Identity and access of a user, as resolved by an identity backend.
#[derive(Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// Privileges of the user for each resource they can access.
    pub access: Access,

    /// Credential the request must be verified against.
    ///
    /// The value is opaque to identity backends and is never verified by them.
    pub password: String,

    /// Name of the user, as provided by the lookup request.
    pub username: String,
}

impl UserInfo {
    /// Registry actions, out of the requested ones, the user can perform on a resource.
    ///
    /// Unknown actions and actions on resources the user has no access to are dropped.
    pub fn allowed_actions<S>(&self, resource: &str, requested: &[S]) -> Vec<String>
    where
        S: AsRef<str>,
    {
        let granted = match self.privilege(resource) {
            None => return Vec::new(),
            Some(granted) => granted,
        };
        requested
            .iter()
            .map(AsRef::as_ref)
            .filter(|action| {
                Priv::for_action(action)
                    .map(|needed| granted.has(needed))
                    .unwrap_or(false)
            })
            .map(String::from)
            .collect()
    }

    /// Privilege granted to the user on a resource, if any.
    pub fn privilege(&self, resource: &str) -> Option<Priv> {
        self.access.get(resource).copied()
    }
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInfo")
            .field("access", &self.access)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::UserInfo;
    use crate::parse_access;
    use crate::Priv;

    fn alice() -> UserInfo {
        UserInfo {
            access: parse_access("ns:repo1:rw;ns:repo2:r;ns:repo3:bogus").unwrap(),
            password: "secret123".into(),
            username: "alice".into(),
        }
    }

    #[test]
    fn allowed_actions_intersect() {
        let user = alice();
        assert_eq!(user.allowed_actions("repo1", &["pull", "push"]), ["pull", "push"]);
        assert_eq!(user.allowed_actions("repo2", &["pull", "push"]), ["pull"]);
        assert_eq!(user.allowed_actions("repo2", &["*"]), Vec::<String>::new());
        assert_eq!(user.allowed_actions("repo1", &["*", "delete"]), ["*"]);
    }

    #[test]
    fn allowed_actions_illegal_or_missing() {
        let user = alice();
        assert!(user.allowed_actions("repo3", &["pull"]).is_empty());
        assert!(user.allowed_actions("missing", &["pull"]).is_empty());
    }

    #[test]
    fn debug_redacts_password() {
        let user = alice();
        let debug = format!("{:?}", user);
        assert!(!debug.contains("secret123"));
        assert!(debug.contains("alice"));
    }

    #[test]
    fn privilege_lookup() {
        let user = alice();
        assert_eq!(user.privilege("repo1"), Some(Priv::ALL));
        assert_eq!(user.privilege("missing"), None);
    }
}
