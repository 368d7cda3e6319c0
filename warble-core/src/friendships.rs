//! Friend requests and the moves a friendship can make afterwards.

use crate::{
    Engine,
    account::FriendEntry,
    error::{StoreError, operation_error},
};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
};
use time::UtcDateTime;
use tracing::{info, warn};
use warble_common::model::{
    Id,
    friendship::{Friendship, FriendshipMarker, FriendshipStatus},
    user::{User, UserMarker},
};

/// Which side of a friendship may perform an action.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
enum Party {
    Requester,
    Recipient,
    Either,
}

impl Party {
    fn matches(self, friendship: &Friendship, user: Id<UserMarker>) -> bool {
        match self {
            Party::Requester => friendship.requester == user,
            Party::Recipient => friendship.recipient == user,
            Party::Either => friendship.involves(user),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
enum Outcome {
    Becomes(FriendshipStatus),
    Deleted,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipAction {
    Accept,
    Decline,
    Undecline,
    Cancel,
    Unfriend,
}

impl FriendshipAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FriendshipAction::Accept => "accept",
            FriendshipAction::Decline => "decline",
            FriendshipAction::Undecline => "undecline",
            FriendshipAction::Cancel => "cancel",
            FriendshipAction::Unfriend => "unfriend",
        }
    }

    /// Who may act, which status the friendship must be in, and what becomes of it.
    fn rule(self) -> (Party, FriendshipStatus, Outcome) {
        use FriendshipStatus::{Accepted, Declined, Pending};

        match self {
            FriendshipAction::Accept => (Party::Recipient, Pending, Outcome::Becomes(Accepted)),
            FriendshipAction::Decline => (Party::Recipient, Pending, Outcome::Becomes(Declined)),
            FriendshipAction::Undecline => (Party::Recipient, Declined, Outcome::Becomes(Pending)),
            FriendshipAction::Cancel => (Party::Requester, Pending, Outcome::Deleted),
            FriendshipAction::Unfriend => (Party::Either, Accepted, Outcome::Deleted),
        }
    }
}

impl Display for FriendshipAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

operation_error! {
    pub enum SendFriendRequestError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Recipient not found")]
        RecipientNotFound => NotFound,
        #[error("Users cannot befriend themselves")]
        SelfRequest => BadRequest,
        #[error("A friendship between these users already exists")]
        RequestAlreadySent => Conflict,
    }
}

operation_error! {
    pub enum FriendshipActionError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Friend request not found")]
        RequestNotFound => NotFound,
        #[error("The user may not do this to the friendship")]
        UserNotMatched => Forbidden,
        #[error("The friendship is {0}")]
        InvalidTransition(FriendshipStatus) => Conflict,
    }
}

operation_error! {
    pub enum GetFriendsError {
        #[error("User not found")]
        UserNotFound => NotFound,
    }
}

impl Engine {
    pub async fn send_friend_request(
        &self,
        requester: Id<UserMarker>,
        recipient: Id<UserMarker>,
    ) -> Result<Friendship, SendFriendRequestError> {
        if self.store().fetch_user(requester).await?.is_none() {
            return Err(SendFriendRequestError::UserNotFound);
        }
        if self.store().fetch_user(recipient).await?.is_none() {
            return Err(SendFriendRequestError::RecipientNotFound);
        }
        if requester == recipient {
            return Err(SendFriendRequestError::SelfRequest);
        }
        if self
            .graph()
            .relationship_between(requester, recipient)
            .await?
            .is_some()
        {
            return Err(SendFriendRequestError::RequestAlreadySent);
        }

        let friendship = self
            .store()
            .create_friendship(requester, recipient, UtcDateTime::now())
            .await
            .map_err(|error| match error {
                StoreError::Conflict(_) => SendFriendRequestError::RequestAlreadySent,
                error => error.into(),
            })?;
        info!(friendship = %friendship.id, %requester, %recipient, "Friend request sent");

        Ok(friendship)
    }

    pub async fn accept_friendship(
        &self,
        user: Id<UserMarker>,
        friendship: Id<FriendshipMarker>,
    ) -> Result<Friendship, FriendshipActionError> {
        self.transition(user, friendship, FriendshipAction::Accept)
            .await
    }

    pub async fn decline_friendship(
        &self,
        user: Id<UserMarker>,
        friendship: Id<FriendshipMarker>,
    ) -> Result<Friendship, FriendshipActionError> {
        self.transition(user, friendship, FriendshipAction::Decline)
            .await
    }

    pub async fn undecline_friendship(
        &self,
        user: Id<UserMarker>,
        friendship: Id<FriendshipMarker>,
    ) -> Result<Friendship, FriendshipActionError> {
        self.transition(user, friendship, FriendshipAction::Undecline)
            .await
    }

    pub async fn cancel_friendship(
        &self,
        user: Id<UserMarker>,
        friendship: Id<FriendshipMarker>,
    ) -> Result<(), FriendshipActionError> {
        self.apply_friendship_action(user, friendship, FriendshipAction::Cancel)
            .await
            .map(drop)
    }

    pub async fn unfriend(
        &self,
        user: Id<UserMarker>,
        friendship: Id<FriendshipMarker>,
    ) -> Result<(), FriendshipActionError> {
        self.apply_friendship_action(user, friendship, FriendshipAction::Unfriend)
            .await
            .map(drop)
    }

    async fn transition(
        &self,
        user: Id<UserMarker>,
        friendship: Id<FriendshipMarker>,
        action: FriendshipAction,
    ) -> Result<Friendship, FriendshipActionError> {
        self.apply_friendship_action(user, friendship, action)
            .await?
            .ok_or(FriendshipActionError::RequestNotFound)
    }

    /// Returns the friendship as it is afterwards, `None` if it was deleted.
    ///
    /// The write only happens if the friendship is still in the status the
    /// action requires; losing a race to another action reports the status
    /// the friendship ended up in.
    pub async fn apply_friendship_action(
        &self,
        user: Id<UserMarker>,
        friendship: Id<FriendshipMarker>,
        action: FriendshipAction,
    ) -> Result<Option<Friendship>, FriendshipActionError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(FriendshipActionError::UserNotFound);
        }
        let current = self
            .store()
            .fetch_friendship(friendship)
            .await?
            .ok_or(FriendshipActionError::RequestNotFound)?;

        let (party, required, outcome) = action.rule();
        if !party.matches(&current, user) {
            return Err(FriendshipActionError::UserNotMatched);
        }
        if current.status != required {
            return Err(FriendshipActionError::InvalidTransition(current.status));
        }

        let applied = match outcome {
            Outcome::Becomes(status) => {
                self.store()
                    .transition_friendship(friendship, required, status)
                    .await?
            }
            Outcome::Deleted => self.store().delete_friendship(friendship, required).await?,
        };
        if !applied {
            return Err(match self.store().fetch_friendship(friendship).await? {
                Some(raced) => FriendshipActionError::InvalidTransition(raced.status),
                None => FriendshipActionError::RequestNotFound,
            });
        }
        info!(%friendship, %user, ?action, "Friendship changed");

        Ok(match outcome {
            Outcome::Becomes(status) => Some(Friendship { status, ..current }),
            Outcome::Deleted => None,
        })
    }

    /// Accepted friendships of `user` with the friend's profile.
    pub async fn friends(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<FriendEntry>, GetFriendsError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(GetFriendsError::UserNotFound);
        }

        let accepted = self.graph().accepted_friendships(user).await?;
        Ok(self.friend_entries(accepted).await?)
    }

    /// Every friendship of `user` in any status, with the other party's profile.
    pub async fn friendships(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<FriendEntry>, GetFriendsError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(GetFriendsError::UserNotFound);
        }

        let friendships = self
            .store()
            .friendships_of(user, None)
            .await?
            .into_iter()
            .map(|friendship| (friendship.other_party(user), friendship))
            .collect();
        Ok(self.friend_entries(friendships).await?)
    }

    /// Attaches profiles, dropping friendships whose other party is gone.
    pub(crate) async fn friend_entries(
        &self,
        friendships: Vec<(Id<UserMarker>, Friendship)>,
    ) -> Result<Vec<FriendEntry>, StoreError> {
        let ids: Vec<Id<UserMarker>> = friendships.iter().map(|(id, _)| *id).collect();
        let mut users: HashMap<Id<UserMarker>, User> = self
            .store()
            .fetch_users(&ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let mut entries = Vec::with_capacity(friendships.len());
        for (id, friendship) in friendships {
            // A user can only appear once among one user's friendships.
            let Some(friend) = users.remove(&id) else {
                warn!(friend = %id, friendship = %friendship.id, "Friend is missing");
                continue;
            };
            entries.push(FriendEntry { friend, friendship });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Classify, ErrorKind},
        friendships::{FriendshipAction, FriendshipActionError, SendFriendRequestError},
        testing::{befriend, engine, register, unknown_user},
    };
    use serde::{
        Deserialize,
        de::{IntoDeserializer, value::Error as ValueError},
    };
    use warble_common::model::{Id, friendship::FriendshipStatus};

    #[test]
    fn action_names_parse_back() {
        let actions = [
            FriendshipAction::Accept,
            FriendshipAction::Decline,
            FriendshipAction::Undecline,
            FriendshipAction::Cancel,
            FriendshipAction::Unfriend,
        ];

        for action in actions {
            let name = action.to_string();
            let parsed =
                FriendshipAction::deserialize(name.as_str().into_deserializer()).map_err(
                    |err: ValueError| err.to_string(),
                );
            assert_eq!(parsed, Ok(action));
        }
        assert_eq!(FriendshipAction::Undecline.to_string(), "undecline");
    }

    #[tokio::test]
    async fn request_lifecycle() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        let request = engine.send_friend_request(alice.id, bob.id).await.unwrap();
        assert_eq!(request.status, FriendshipStatus::Pending);
        assert_eq!(request.requester, alice.id);

        let declined = engine.decline_friendship(bob.id, request.id).await.unwrap();
        assert_eq!(declined.status, FriendshipStatus::Declined);
        let pending = engine
            .undecline_friendship(bob.id, request.id)
            .await
            .unwrap();
        assert_eq!(pending.status, FriendshipStatus::Pending);
        let accepted = engine.accept_friendship(bob.id, request.id).await.unwrap();
        assert_eq!(accepted.status, FriendshipStatus::Accepted);

        let friends = engine.friends(alice.id).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].friend.id, bob.id);

        engine.unfriend(alice.id, request.id).await.unwrap();
        assert!(engine.friends(bob.id).await.unwrap().is_empty());
        assert!(matches!(
            engine.unfriend(alice.id, request.id).await,
            Err(FriendshipActionError::RequestNotFound)
        ));
    }

    #[tokio::test]
    async fn only_the_right_party_may_act() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;
        let eve = register(&engine, "eve").await;

        let request = engine.send_friend_request(alice.id, bob.id).await.unwrap();

        let error = engine
            .accept_friendship(alice.id, request.id)
            .await
            .unwrap_err();
        assert!(matches!(error, FriendshipActionError::UserNotMatched));
        assert_eq!(error.kind(), ErrorKind::Forbidden);
        assert!(matches!(
            engine.cancel_friendship(bob.id, request.id).await,
            Err(FriendshipActionError::UserNotMatched)
        ));
        assert!(matches!(
            engine.decline_friendship(eve.id, request.id).await,
            Err(FriendshipActionError::UserNotMatched)
        ));

        engine.cancel_friendship(alice.id, request.id).await.unwrap();
        assert!(engine.friendships(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transitions_require_the_right_status() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        let request = engine.send_friend_request(alice.id, bob.id).await.unwrap();
        assert!(matches!(
            engine.unfriend(bob.id, request.id).await,
            Err(FriendshipActionError::InvalidTransition(
                FriendshipStatus::Pending
            ))
        ));
        assert!(matches!(
            engine.undecline_friendship(bob.id, request.id).await,
            Err(FriendshipActionError::InvalidTransition(
                FriendshipStatus::Pending
            ))
        ));

        engine.accept_friendship(bob.id, request.id).await.unwrap();
        let error = engine
            .accept_friendship(bob.id, request.id)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            FriendshipActionError::InvalidTransition(FriendshipStatus::Accepted)
        ));
        assert_eq!(error.kind(), ErrorKind::Conflict);
        assert!(matches!(
            engine.cancel_friendship(alice.id, request.id).await,
            Err(FriendshipActionError::InvalidTransition(
                FriendshipStatus::Accepted
            ))
        ));
    }

    #[tokio::test]
    async fn one_friendship_per_pair() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        engine.send_friend_request(alice.id, bob.id).await.unwrap();
        assert!(matches!(
            engine.send_friend_request(alice.id, bob.id).await,
            Err(SendFriendRequestError::RequestAlreadySent)
        ));
        assert!(matches!(
            engine.send_friend_request(bob.id, alice.id).await,
            Err(SendFriendRequestError::RequestAlreadySent)
        ));
        assert_eq!(engine.friendships(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn the_store_rejects_duplicate_pairs() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        let now = time::UtcDateTime::now();
        engine
            .store()
            .create_friendship(alice.id, bob.id, now)
            .await
            .unwrap();
        let error = engine
            .store()
            .create_friendship(bob.id, alice.id, now)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn request_validation() {
        let engine = engine();
        let alice = register(&engine, "alice").await;

        assert!(matches!(
            engine.send_friend_request(unknown_user(), alice.id).await,
            Err(SendFriendRequestError::UserNotFound)
        ));
        assert!(matches!(
            engine.send_friend_request(alice.id, unknown_user()).await,
            Err(SendFriendRequestError::RecipientNotFound)
        ));
        assert!(matches!(
            engine.send_friend_request(alice.id, alice.id).await,
            Err(SendFriendRequestError::SelfRequest)
        ));
        assert!(matches!(
            engine.accept_friendship(alice.id, Id::from(3_u64)).await,
            Err(FriendshipActionError::RequestNotFound)
        ));
    }

    #[tokio::test]
    async fn friendships_list_every_status() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;
        let carol = register(&engine, "carol").await;

        befriend(&engine, &alice, &bob).await;
        engine.send_friend_request(carol.id, alice.id).await.unwrap();

        let friendships = engine.friendships(alice.id).await.unwrap();
        let statuses: Vec<_> = friendships
            .iter()
            .map(|entry| (entry.friend.id, entry.friendship.status))
            .collect();
        assert_eq!(
            statuses,
            [
                (bob.id, FriendshipStatus::Accepted),
                (carol.id, FriendshipStatus::Pending),
            ]
        );
        assert_eq!(engine.friends(alice.id).await.unwrap().len(), 1);
    }
}
