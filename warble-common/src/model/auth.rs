use crate::{
    model::{Id, user::UserMarker},
    util::PositiveDuration,
};
use argon2::{
    Argon2, Params,
    password_hash::{
        self, PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString,
    },
};
use base64::{DecodeError, Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;

pub const TOKEN_SECRET_LEN: usize = 24;
pub const TOKEN_SALT_LEN: usize = 18;
pub const TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;
pub const PASSWORD_SALT_LEN: usize = 16;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Separates the user id from the encoded key material in a token string.
const TOKEN_SEPARATOR: char = '.';

/// Both tokens and passwords hash with the same argon2 configuration.
fn hasher() -> Argon2<'static> {
    Argon2::default()
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing auth token failed: {0}")]
pub struct AuthTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Token has no '{TOKEN_SEPARATOR}' between user id and key")]
    MissingSeparator,
    #[error("Token user id is not a number: {0}")]
    UserId(ParseIntError),
    #[error("Token key is not url-safe base64: {0}")]
    Base64(#[from] DecodeError),
    #[error("Token key decodes to {got} bytes, expected {}", TOKEN_SECRET_LEN + TOKEN_SALT_LEN)]
    Length { got: usize },
}

/// A bearer token, rendered as `{user_id}.{key}` where `key` is the secret
/// followed by the salt in unpadded url-safe base64.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user_id: Id<UserMarker>,
    pub secret: [u8; TOKEN_SECRET_LEN],
    pub salt: [u8; TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthTokenHash([u8; TOKEN_HASH_LEN]);

/// A stored login session. Only the hash of the token is ever persisted.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub token_hash: AuthTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Authentication {
    #[must_use]
    pub fn is_expired_at(&self, now: UtcDateTime) -> bool {
        self.expires_after
            .is_some_and(|expires_after| self.created_at + expires_after.get() < now)
    }
}

impl AuthToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        Self {
            user_id,
            secret: rand::random(),
            salt: rand::random(),
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let key = [&self.secret[..], &self.salt[..]].concat();
        let key = BASE64_URL_SAFE_NO_PAD.encode(key);

        format!("{}{TOKEN_SEPARATOR}{key}", self.user_id)
    }

    pub fn hash(&self) -> Result<AuthTokenHash, AuthTokenHashError> {
        let mut hash = [0; TOKEN_HASH_LEN];
        hasher()
            .hash_password_into(&self.secret, &self.salt, &mut hash)
            .map_err(AuthTokenHashError)?;

        Ok(AuthTokenHash(hash))
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user_id, key) = s
            .split_once(TOKEN_SEPARATOR)
            .ok_or(AuthTokenDecodeError::MissingSeparator)?;
        let user_id = user_id.parse().map_err(AuthTokenDecodeError::UserId)?;

        let key = BASE64_URL_SAFE_NO_PAD.decode(key)?;
        let wrong_length = || AuthTokenDecodeError::Length { got: key.len() };
        let (secret, salt) = key
            .split_first_chunk::<TOKEN_SECRET_LEN>()
            .ok_or_else(wrong_length)?;
        let salt = salt.try_into().map_err(|_| wrong_length())?;

        Ok(Self {
            user_id,
            secret: *secret,
            salt,
        })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl AuthTokenHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for AuthTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthTokenHash").finish_non_exhaustive()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("Stored token hash is {0} bytes, expected {TOKEN_HASH_LEN}")]
pub struct InvalidAuthTokenHashError(usize);

impl TryFrom<Box<[u8]>> for AuthTokenHash {
    type Error = InvalidAuthTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        let hash = <[u8; TOKEN_HASH_LEN]>::try_from(&*value)
            .map_err(|_| InvalidAuthTokenHashError(value.len()))?;

        Ok(Self(hash))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum PasswordError {
    #[error("Password must be at least {PASSWORD_MIN_LEN} characters long")]
    TooShort,
    #[error("Hashing password failed: {0}")]
    Hash(password_hash::Error),
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The stored password hash is not a valid PHC string")]
pub struct InvalidPasswordHashError;

/// Argon2 password hash in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn create(password: &str) -> Result<Self, PasswordError> {
        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(PasswordError::TooShort);
        }

        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordError::Hash)?;
        let hash = hasher()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordError::Hash)?;

        Ok(Self(hash.to_string()))
    }

    /// Wraps a hash loaded from storage.
    pub fn from_phc(phc: String) -> Result<Self, InvalidPasswordHashError> {
        PhcString::new(&phc).map_err(|_| InvalidPasswordHashError)?;
        Ok(Self(phc))
    }

    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        PhcString::new(&self.0).is_ok_and(|parsed| {
            hasher()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }

    #[must_use]
    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[redacted]").finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            Id,
            auth::{
                AuthToken, AuthTokenDecodeError, AuthTokenHash, Authentication,
                InvalidAuthTokenHashError, PasswordError, PasswordHash,
            },
        },
        util::PositiveDuration,
    };
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn token_string_round_trip() {
        let token = AuthToken::generate_random(Id::from(42_u64));
        let parsed: AuthToken = token.as_token_str().parse().unwrap();

        assert_eq!(parsed, token);
        assert_eq!(parsed.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn token_string_is_header_safe() {
        let token = AuthToken::generate_random(Id::from(42_u64));
        let rendered = token.as_token_str();

        let (user_id, key) = rendered.split_once('.').unwrap();
        assert_eq!(user_id, "42");
        assert_eq!(key.len(), 56);
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(
            "42".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::MissingSeparator)
        );
        assert!(matches!(
            "abc.AAAA".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::UserId(_))
        ));
        assert!(matches!(
            "42.AA==".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::Base64(_))
        ));
        assert_eq!(
            "42.AAAA".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::Length { got: 3 })
        );

        let mut long = AuthToken::generate_random(Id::from(42_u64)).as_token_str();
        long.push_str("AAAA");
        assert_eq!(
            long.parse::<AuthToken>(),
            Err(AuthTokenDecodeError::Length { got: 45 })
        );
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthToken::generate_random(Id::from(42_u64));
        let debug = format!("{token:?}");

        assert!(debug.ends_with(", .. }"));
        assert!(!debug.contains("secret"));
        assert!(!debug.contains(&token.as_token_str()));
        assert_eq!(
            format!("{:?}", token.hash().unwrap()),
            "AuthTokenHash(..)"
        );
    }

    #[test]
    fn stored_hash_length_is_checked() {
        let hash = AuthToken::generate_random(Id::from(7_u64)).hash().unwrap();
        let stored: Box<[u8]> = hash.as_bytes().into();

        assert_eq!(AuthTokenHash::try_from(stored).unwrap(), hash);
        assert_eq!(
            AuthTokenHash::try_from(Box::<[u8]>::from([0_u8; 3])),
            Err(InvalidAuthTokenHashError(3))
        );
    }

    #[test]
    fn authentication_expiry() {
        let created_at = utc_datetime!(2025-06-01 12:00);
        let mut authentication = Authentication {
            user: Id::from(1_u64),
            token_hash: AuthToken::generate_random(Id::from(1_u64)).hash().unwrap(),
            created_at,
            expires_after: None,
        };
        assert!(!authentication.is_expired_at(created_at + Duration::days(10_000)));

        authentication.expires_after = PositiveDuration::days(7);
        assert!(!authentication.is_expired_at(created_at + Duration::days(7)));
        assert!(authentication.is_expired_at(created_at + Duration::days(8)));
    }

    #[test]
    fn password_hashes_verify() {
        let hash = PasswordHash::create("correct horse battery").unwrap();

        assert!(hash.verify("correct horse battery"));
        assert!(!hash.verify("wrong horse battery"));
        assert_eq!(
            PasswordHash::from_phc(hash.as_phc().to_owned()).unwrap(),
            hash
        );
        assert!(PasswordHash::from_phc("plaintext".to_owned()).is_err());
        assert_eq!(PasswordHash::create("short"), Err(PasswordError::TooShort));
    }
}
