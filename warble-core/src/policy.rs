use crate::{
    auth::Identity,
    error::{Classify, ErrorKind},
};
use std::collections::BTreeSet;
use thiserror::Error;
use warble_common::model::user::Role;

/// A role requirement, checked against an already authenticated identity.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Policy {
    /// Passes if the identity holds every listed role. Passes trivially when empty.
    RequireAll(BTreeSet<Role>),
    /// Passes if the identity holds at least one listed role. Never passes when empty.
    RequireAny(BTreeSet<Role>),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("Access denied, required roles missing: {}", display_roles(.missing))]
pub struct AccessDenied {
    pub missing: BTreeSet<Role>,
}

fn display_roles(roles: &BTreeSet<Role>) -> String {
    roles.iter().map(Role::get).collect::<Vec<_>>().join(", ")
}

impl Classify for AccessDenied {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Forbidden
    }
}

impl Policy {
    #[must_use]
    pub fn admin() -> Self {
        Policy::RequireAny(BTreeSet::from([Role::admin()]))
    }

    pub fn check(&self, identity: &Identity) -> Result<(), AccessDenied> {
        match self {
            Policy::RequireAll(required) => {
                let missing: BTreeSet<Role> =
                    required.difference(&identity.roles).cloned().collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(AccessDenied { missing })
                }
            }
            Policy::RequireAny(accepted) => {
                if accepted.iter().any(|role| identity.roles.contains(role)) {
                    Ok(())
                } else {
                    Err(AccessDenied {
                        missing: accepted.clone(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{auth::Identity, policy::Policy};
    use std::collections::BTreeSet;
    use warble_common::model::{Id, user::Role};

    fn role(name: &str) -> Role {
        Role::new(name.to_owned()).unwrap()
    }

    fn identity(roles: &[&str]) -> Identity {
        Identity {
            user: Id::from(1_u64),
            roles: roles.iter().copied().map(role).collect(),
        }
    }

    #[test]
    fn require_all() {
        let policy = Policy::RequireAll(BTreeSet::from([role("admin"), role("moderator")]));

        assert!(policy.check(&identity(&["admin", "moderator", "x"])).is_ok());

        let denied = policy.check(&identity(&["admin"])).unwrap_err();
        assert_eq!(denied.missing, BTreeSet::from([role("moderator")]));
        assert_eq!(
            denied.to_string(),
            "Access denied, required roles missing: moderator"
        );

        assert!(Policy::RequireAll(BTreeSet::new()).check(&identity(&[])).is_ok());
    }

    #[test]
    fn require_any() {
        let policy = Policy::RequireAny(BTreeSet::from([role("admin"), role("moderator")]));

        assert!(policy.check(&identity(&["moderator"])).is_ok());
        assert!(policy.check(&identity(&["user"])).is_err());
        assert!(Policy::RequireAny(BTreeSet::new()).check(&identity(&["admin"])).is_err());
    }

    #[test]
    fn admin_policy() {
        assert!(Policy::admin().check(&identity(&["admin"])).is_ok());
        assert!(Policy::admin().check(&identity(&[])).is_err());
    }
}
