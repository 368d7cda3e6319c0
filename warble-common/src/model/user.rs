use crate::{
    model::{Id, auth::PasswordHash, post::MediaPath},
    util::unix_millis,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::collections::BTreeSet;
use thiserror::Error;
use time::UtcDateTime;

pub const USER_SLUG_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 254;
pub const ROLE_MAX_LEN: usize = 32;
pub const NICKNAME_MAX_LEN: usize = 64;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// The public face of an account. This is what other users get to see.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub slug: UserSlug,
    pub nickname: Option<String>,
    pub avatar: Option<MediaPath>,
    #[serde(with = "unix_millis")]
    pub created_at: UtcDateTime,
}

/// A user together with the credentials and authorization data only the
/// account holder and the server should see.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Account {
    pub user: User,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub roles: BTreeSet<Role>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateAccount {
    pub email: Email,
    pub slug: UserSlug,
    pub nickname: Option<String>,
    pub password_hash: PasswordHash,
    pub created_at: UtcDateTime,
}

impl Account {
    #[must_use]
    pub fn id(&self) -> Id<UserMarker> {
        self.user.id
    }
}

macro_rules! validated_string {
    ($name:ident, $error:ident, $expecting:literal) => {
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
        #[error("Invalid {}: {}", $expecting, .0)]
        pub struct $error(String);

        impl $name {
            #[must_use]
            pub fn get(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = String::deserialize(deserializer)?;
                $name::new(inner)
                    .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &$expecting))
            }
        }
    };
}

/// Human readable handle, unique per user. Mentions refer to users by slug.
///
/// Slugs are ASCII alphanumeric so that every slug can be mentioned, and never
/// consist of digits only so that a slug can not be mistaken for an id.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserSlug(String);

validated_string!(UserSlug, InvalidUserSlugError, "user slug");

impl UserSlug {
    pub fn new(slug: String) -> Result<Self, InvalidUserSlugError> {
        let valid = !slug.is_empty()
            && slug.len() <= USER_SLUG_MAX_LEN
            && slug.chars().all(|c| c.is_ascii_alphanumeric())
            && !slug.chars().all(|c| c.is_ascii_digit());

        if valid {
            Ok(Self(slug))
        } else {
            Err(InvalidUserSlugError(slug))
        }
    }
}

/// Normalized (trimmed, lowercased) email address.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

validated_string!(Email, InvalidEmailError, "email");

impl Email {
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let normalized = email.trim().to_lowercase();

        let valid = normalized.len() <= EMAIL_MAX_LEN
            && !normalized.chars().any(char::is_whitespace)
            && normalized
                .split_once('@')
                .is_some_and(|(local, domain)| {
                    !local.is_empty() && !domain.is_empty() && !domain.contains('@')
                });

        if valid {
            Ok(Self(normalized))
        } else {
            Err(InvalidEmailError(email))
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Role(String);

validated_string!(Role, InvalidRoleError, "role");

impl Role {
    pub const ADMIN: &'static str = "admin";

    pub fn new(role: String) -> Result<Self, InvalidRoleError> {
        if !role.trim().is_empty() && role.chars().count() <= ROLE_MAX_LEN {
            Ok(Self(role))
        } else {
            Err(InvalidRoleError(role))
        }
    }

    #[must_use]
    pub fn admin() -> Self {
        Self(Self::ADMIN.to_owned())
    }
}

/// Trims a nickname and turns blank ones into `None`.
#[must_use]
pub fn normalize_nickname(nickname: Option<String>) -> Option<String> {
    nickname
        .map(|nickname| nickname.trim().chars().take(NICKNAME_MAX_LEN).collect::<String>())
        .filter(|nickname| !nickname.is_empty())
}

#[cfg(test)]
mod tests {
    use crate::model::user::{Email, Role, UserSlug, normalize_nickname};

    #[test]
    fn user_slugs() {
        for legal in ["alice", "Bob42", "x", "0xdead"] {
            assert!(UserSlug::new(legal.to_owned()).is_ok(), "{legal}");
        }
        let too_long = "a".repeat(51);
        for illegal in ["", "12345", "has space", "dash-ed", "ümlaut", too_long.as_str()] {
            assert!(UserSlug::new(illegal.to_owned()).is_err(), "{illegal}");
        }
    }

    #[test]
    fn emails_are_normalized() {
        let email = Email::new("  Alice@Example.COM ".to_owned()).unwrap();
        assert_eq!(email.get(), "alice@example.com");

        for illegal in ["", "alice", "@example.com", "alice@", "a@b@c", "a b@c.d"] {
            assert!(Email::new(illegal.to_owned()).is_err(), "{illegal}");
        }
    }

    #[test]
    fn roles_and_nicknames() {
        assert!(Role::new(String::new()).is_err());
        assert!(Role::new("   ".to_owned()).is_err());
        assert_eq!(Role::admin().get(), Role::ADMIN);

        assert_eq!(normalize_nickname(Some("  Al ".to_owned())), Some("Al".to_owned()));
        assert_eq!(normalize_nickname(Some("   ".to_owned())), None);
        assert_eq!(normalize_nickname(None), None);
    }

    #[test]
    fn slug_deserialization_validates() {
        assert!(serde_json::from_str::<UserSlug>(r#""alice""#).is_ok());
        assert!(serde_json::from_str::<UserSlug>(r#""123""#).is_err());
    }
}
