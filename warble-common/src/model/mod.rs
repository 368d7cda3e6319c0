pub mod auth;
pub mod friendship;
pub mod mention;
pub mod post;
pub mod user;

use crate::{
    model::{
        auth::{InvalidAuthTokenHashError, InvalidPasswordHashError},
        friendship::UnknownFriendshipStatusError,
        post::{InvalidHashtagError, InvalidMediaPathError},
        user::{InvalidEmailError, InvalidRoleError, InvalidUserSlugError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
    util::NonPositiveDurationError,
};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserSlug(#[from] InvalidUserSlugError),
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
    #[error(transparent)]
    Role(#[from] InvalidRoleError),
    #[error(transparent)]
    MediaPath(#[from] InvalidMediaPathError),
    #[error(transparent)]
    Hashtag(#[from] InvalidHashtagError),
    #[error(transparent)]
    FriendshipStatus(#[from] UnknownFriendshipStatusError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
    #[error(transparent)]
    PasswordHash(#[from] InvalidPasswordHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct WarbleEpoch;
impl Epoch for WarbleEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type WarbleSnowflake = Snowflake<WarbleEpoch>;
pub type WarbleSnowflakeGenerator = SnowflakeGenerator<WarbleEpoch>;

/// A snowflake id tagged with the kind of record it identifies.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(WarbleSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: WarbleSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> WarbleSnowflake {
        self.0
    }

    /// Reinterprets the id as a signed integer for storage in `BIGINT` columns.
    #[must_use]
    pub fn to_db(self) -> i64 {
        self.0.get().cast_signed()
    }

    #[must_use]
    pub fn from_db(value: i64) -> Self {
        value.cast_unsigned().into()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str(s).map(Id::from)
    }
}

impl<Marker> From<WarbleSnowflake> for Id<Marker> {
    fn from(value: WarbleSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for WarbleSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(WarbleSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, user::UserMarker};

    #[test]
    fn id_parses_decimal_form_only() {
        let id: Id<UserMarker> = "3416751341570822244".parse().unwrap();
        assert_eq!(u64::from(id), 3_416_751_341_570_822_244);
        assert_eq!(id.to_string(), "3416751341570822244");

        assert!("alice".parse::<Id<UserMarker>>().is_err());
        assert!("-12".parse::<Id<UserMarker>>().is_err());
        assert!("".parse::<Id<UserMarker>>().is_err());
    }

    #[test]
    fn db_representation_round_trips_high_bit() {
        let id = Id::<UserMarker>::from(u64::MAX - 5);
        assert!(id.to_db() < 0);
        assert_eq!(Id::<UserMarker>::from_db(id.to_db()), id);
    }
}
