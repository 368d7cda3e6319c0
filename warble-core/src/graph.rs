//! Read-only queries over the friendship graph.

use crate::store::{Result, SocialStore};
use serde::Serialize;
use warble_common::model::{
    Id,
    friendship::{Friendship, FriendshipStatus},
    user::UserMarker,
};

/// How the viewer relates to another user, from the viewer's side.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    None,
    Myself,
    Friends,
    RequestSent,
    RequestReceived,
    Declined,
}

impl Relationship {
    #[must_use]
    pub fn resolve(viewer: Id<UserMarker>, friendship: Option<&Friendship>) -> Self {
        let Some(friendship) = friendship else {
            return Relationship::None;
        };

        match friendship.status {
            FriendshipStatus::Accepted => Relationship::Friends,
            FriendshipStatus::Declined => Relationship::Declined,
            FriendshipStatus::Pending if friendship.requester == viewer => {
                Relationship::RequestSent
            }
            FriendshipStatus::Pending => Relationship::RequestReceived,
        }
    }
}

#[derive(Copy, Clone)]
pub struct FriendshipGraph<'a> {
    store: &'a dyn SocialStore,
}

impl<'a> FriendshipGraph<'a> {
    pub fn new(store: &'a dyn SocialStore) -> Self {
        Self { store }
    }

    /// The other party of every accepted friendship of `user`, in store order.
    pub async fn friends_of(&self, user: Id<UserMarker>) -> Result<Vec<Id<UserMarker>>> {
        Ok(self
            .accepted_friendships(user)
            .await?
            .into_iter()
            .map(|(friend, _)| friend)
            .collect())
    }

    /// Like [`Self::friends_of`], paired with the friendship record each
    /// friend was resolved from.
    pub async fn accepted_friendships(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<(Id<UserMarker>, Friendship)>> {
        let friendships = self
            .store
            .friendships_of(user, Some(FriendshipStatus::Accepted))
            .await?;

        Ok(friendships
            .into_iter()
            .map(|friendship| (friendship.other_party(user), friendship))
            .collect())
    }

    /// The friendship connecting the unordered pair, in any status.
    pub async fn relationship_between(
        &self,
        a: Id<UserMarker>,
        b: Id<UserMarker>,
    ) -> Result<Option<Friendship>> {
        self.store.friendship_between(a, b).await
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        graph::Relationship,
        testing::{befriend, engine, register},
    };
    use warble_common::model::friendship::FriendshipStatus;

    #[tokio::test]
    async fn friendship_is_symmetric() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;
        let carol = register(&engine, "carol").await;

        befriend(&engine, &alice, &bob).await;
        befriend(&engine, &carol, &alice).await;

        let graph = engine.graph();
        assert_eq!(graph.friends_of(alice.id).await.unwrap(), [bob.id, carol.id]);
        assert_eq!(graph.friends_of(bob.id).await.unwrap(), [alice.id]);
        assert_eq!(graph.friends_of(carol.id).await.unwrap(), [alice.id]);
    }

    #[tokio::test]
    async fn pending_requests_are_not_friends() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        let request = engine.send_friend_request(alice.id, bob.id).await.unwrap();

        let graph = engine.graph();
        assert!(graph.friends_of(alice.id).await.unwrap().is_empty());
        assert!(graph.friends_of(bob.id).await.unwrap().is_empty());

        let between = graph.relationship_between(bob.id, alice.id).await.unwrap();
        assert_eq!(between.as_ref().map(|f| f.id), Some(request.id));
        assert_eq!(
            Relationship::resolve(alice.id, between.as_ref()),
            Relationship::RequestSent
        );
        assert_eq!(
            Relationship::resolve(bob.id, between.as_ref()),
            Relationship::RequestReceived
        );
    }

    #[tokio::test]
    async fn relationship_states() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        assert_eq!(Relationship::resolve(alice.id, None), Relationship::None);

        let request = engine.send_friend_request(alice.id, bob.id).await.unwrap();
        let declined = engine.decline_friendship(bob.id, request.id).await.unwrap();
        assert_eq!(declined.status, FriendshipStatus::Declined);
        assert_eq!(
            Relationship::resolve(alice.id, Some(&declined)),
            Relationship::Declined
        );
    }
}
