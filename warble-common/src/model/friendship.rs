use crate::{
    model::{Id, user::UserMarker},
    util::unix_millis,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct FriendshipMarker;

/// A friendship edge. The edge is undirected for graph queries, but who sent
/// the request decides who may move it between states.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Friendship {
    pub id: Id<FriendshipMarker>,
    pub requester: Id<UserMarker>,
    pub recipient: Id<UserMarker>,
    pub status: FriendshipStatus,
    #[serde(with = "unix_millis")]
    pub created_at: UtcDateTime,
}

impl Friendship {
    /// The party that is not `user`. Anything other than the requester
    /// resolves to the requester.
    #[must_use]
    pub fn other_party(&self, user: Id<UserMarker>) -> Id<UserMarker> {
        if user == self.requester {
            self.recipient
        } else {
            self.requester
        }
    }

    #[must_use]
    pub fn involves(&self, user: Id<UserMarker>) -> bool {
        self.requester == user || self.recipient == user
    }

    #[must_use]
    pub fn connects(&self, a: Id<UserMarker>, b: Id<UserMarker>) -> bool {
        (self.requester == a && self.recipient == b) || (self.requester == b && self.recipient == a)
    }
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl FriendshipStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Declined => "declined",
        }
    }
}

impl Display for FriendshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown friendship status: {0}")]
pub struct UnknownFriendshipStatusError(String);

impl FromStr for FriendshipStatus {
    type Err = UnknownFriendshipStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FriendshipStatus::Pending),
            "accepted" => Ok(FriendshipStatus::Accepted),
            "declined" => Ok(FriendshipStatus::Declined),
            other => Err(UnknownFriendshipStatusError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        friendship::{Friendship, FriendshipStatus},
    };
    use time::macros::utc_datetime;

    fn friendship() -> Friendship {
        Friendship {
            id: Id::from(1_u64),
            requester: Id::from(10_u64),
            recipient: Id::from(20_u64),
            status: FriendshipStatus::Accepted,
            created_at: utc_datetime!(2025-06-01 12:00),
        }
    }

    #[test]
    fn other_party_resolution() {
        let friendship = friendship();

        assert_eq!(friendship.other_party(Id::from(10_u64)), Id::from(20_u64));
        assert_eq!(friendship.other_party(Id::from(20_u64)), Id::from(10_u64));
        assert_eq!(friendship.other_party(Id::from(99_u64)), Id::from(10_u64));
    }

    #[test]
    fn pair_is_unordered() {
        let friendship = friendship();

        assert!(friendship.connects(Id::from(10_u64), Id::from(20_u64)));
        assert!(friendship.connects(Id::from(20_u64), Id::from(10_u64)));
        assert!(!friendship.connects(Id::from(10_u64), Id::from(30_u64)));
        assert!(friendship.involves(Id::from(20_u64)));
        assert!(!friendship.involves(Id::from(30_u64)));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            FriendshipStatus::Pending,
            FriendshipStatus::Accepted,
            FriendshipStatus::Declined,
        ] {
            assert_eq!(status.as_str().parse::<FriendshipStatus>(), Ok(status));
        }
        assert!("friends".parse::<FriendshipStatus>().is_err());
    }
}
