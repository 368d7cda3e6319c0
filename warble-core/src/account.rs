//! The profile view of a single account.

use crate::{
    Engine,
    error::{StoreError, operation_error},
    graph::Relationship,
};
use serde::Serialize;
use std::str::FromStr;
use warble_common::model::{
    Id,
    friendship::Friendship,
    post::MediaPath,
    user::{User, UserMarker, UserSlug},
};

pub const GALLERY_LIMIT: usize = 20;

/// How a client names an account: either its id or its slug.
///
/// Slugs can never consist of digits only, so the id form is unambiguous.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum AccountSpecifier {
    Id(Id<UserMarker>),
    Slug(UserSlug),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, thiserror::Error)]
#[error("Neither a user id nor a user slug: {0}")]
pub struct InvalidAccountSpecifierError(String);

impl FromStr for AccountSpecifier {
    type Err = InvalidAccountSpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.parse() {
            return Ok(AccountSpecifier::Id(id));
        }

        UserSlug::new(s.to_owned())
            .map(AccountSpecifier::Slug)
            .map_err(|_| InvalidAccountSpecifierError(s.to_owned()))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct FriendEntry {
    pub friend: User,
    pub friendship: Friendship,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct AccountStats {
    pub tweet_count: u64,
    pub friends_count: u64,
    pub likes_count: u64,
    pub shares_count: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct AccountView {
    pub account: User,
    pub friends: Vec<FriendEntry>,
    /// The friendship between viewer and account, whatever its status.
    pub viewer_friendship: Option<Friendship>,
    pub relationship: Relationship,
    pub gallery: Vec<MediaPath>,
    pub stats: AccountStats,
}

operation_error! {
    pub enum AccountViewError {
        #[error("User not found")]
        UserNotFound => NotFound,
    }
}

impl Engine {
    pub async fn resolve_account(
        &self,
        specifier: &AccountSpecifier,
    ) -> Result<Option<User>, StoreError> {
        match specifier {
            AccountSpecifier::Id(id) => self.store().fetch_user(*id).await,
            AccountSpecifier::Slug(slug) => self.store().fetch_user_by_slug(slug).await,
        }
    }

    pub async fn account_view(
        &self,
        viewer: Id<UserMarker>,
        specifier: &AccountSpecifier,
    ) -> Result<AccountView, AccountViewError> {
        let account = self
            .resolve_account(specifier)
            .await?
            .ok_or(AccountViewError::UserNotFound)?;

        let accepted = self.graph().accepted_friendships(account.id).await?;
        let friends_count = accepted.len() as u64;
        let friends = self.friend_entries(accepted).await?;

        let (viewer_friendship, relationship) = if viewer == account.id {
            (None, Relationship::Myself)
        } else {
            let friendship = self
                .graph()
                .relationship_between(viewer, account.id)
                .await?;
            let relationship = Relationship::resolve(viewer, friendship.as_ref());
            (friendship, relationship)
        };

        let gallery = self
            .store()
            .media_posts(account.id, GALLERY_LIMIT)
            .await?
            .into_iter()
            .filter_map(|post| post.media)
            .collect();

        let post_stats = self.store().post_stats(account.id).await?;
        let stats = AccountStats {
            tweet_count: post_stats.tweet_count,
            friends_count,
            likes_count: post_stats.likes_count,
            shares_count: post_stats.shares_count,
        };

        Ok(AccountView {
            account,
            friends,
            viewer_friendship,
            relationship,
            gallery,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        account::{AccountSpecifier, AccountViewError, GALLERY_LIMIT},
        graph::Relationship,
        social::NewTweet,
        testing::{befriend, engine, register},
    };
    use warble_common::model::{Id, post::MediaPath, user::UserSlug};

    #[test]
    fn specifier_prefers_ids() {
        assert_eq!(
            "12345".parse::<AccountSpecifier>().unwrap(),
            AccountSpecifier::Id(Id::from(12345_u64))
        );
        assert_eq!(
            "alice".parse::<AccountSpecifier>().unwrap(),
            AccountSpecifier::Slug(UserSlug::new("alice".to_owned()).unwrap())
        );
        assert!("not a slug".parse::<AccountSpecifier>().is_err());
    }

    #[tokio::test]
    async fn view_aggregates_friends_gallery_and_counters() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;
        let carol = register(&engine, "carol").await;
        befriend(&engine, &alice, &bob).await;
        befriend(&engine, &carol, &alice).await;

        for index in 0..GALLERY_LIMIT + 2 {
            engine
                .tweet(
                    alice.id,
                    NewTweet {
                        content: format!("picture {index}"),
                        media: Some(MediaPath::new(format!("uploads/{index}.png")).unwrap()),
                    },
                )
                .await
                .unwrap();
        }
        let plain = engine
            .tweet(
                alice.id,
                NewTweet {
                    content: "no picture".to_owned(),
                    media: None,
                },
            )
            .await
            .unwrap();
        engine.like(bob.id, plain.id).await.unwrap();
        engine.like(carol.id, plain.id).await.unwrap();
        engine.share(bob.id, plain.id).await.unwrap();

        let view = engine
            .account_view(bob.id, &"alice".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(view.account.id, alice.id);
        let friend_ids: Vec<_> = view.friends.iter().map(|entry| entry.friend.id).collect();
        assert_eq!(friend_ids, [bob.id, carol.id]);
        assert_eq!(view.relationship, Relationship::Friends);
        assert!(view.viewer_friendship.is_some());
        assert_eq!(view.gallery.len(), GALLERY_LIMIT);
        assert_eq!(view.stats.tweet_count, GALLERY_LIMIT as u64 + 3);
        assert_eq!(view.stats.friends_count, 2);
        assert_eq!(view.stats.likes_count, 2);
        assert_eq!(view.stats.shares_count, 1);
    }

    #[tokio::test]
    async fn viewing_yourself_and_strangers() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        let own = engine
            .account_view(alice.id, &AccountSpecifier::Id(alice.id))
            .await
            .unwrap();
        assert_eq!(own.relationship, Relationship::Myself);

        let stranger = engine
            .account_view(alice.id, &AccountSpecifier::Id(bob.id))
            .await
            .unwrap();
        assert_eq!(stranger.relationship, Relationship::None);
        assert!(stranger.viewer_friendship.is_none());
        assert!(stranger.friends.is_empty());

        let missing = engine
            .account_view(alice.id, &"nobody".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(missing, AccountViewError::UserNotFound));
    }
}
