//! Assembly of the friend feed and of a single account's timeline.

use crate::{
    Engine,
    error::operation_error,
    posts::TimelineEntry,
    store::{Page, SocialStore},
};
use std::collections::{BTreeSet, HashMap};
use time::UtcDateTime;
use tracing::{debug, warn};
use warble_common::model::{
    Id,
    post::FeedItem,
    user::{User, UserMarker},
};

operation_error! {
    pub enum FeedError {
        #[error("User not found")]
        UserNotFound => NotFound,
    }
}

impl Engine {
    /// The viewer's friends' posts and reshares from the configured window,
    /// newest first.
    pub async fn feed(
        &self,
        viewer: Id<UserMarker>,
        page: Page,
    ) -> Result<Vec<FeedItem>, FeedError> {
        self.feed_at(viewer, page, UtcDateTime::now()).await
    }

    /// [`Self::feed`] as seen at `now`.
    ///
    /// A post shows up once per friend it reaches the viewer through, so two
    /// friends resharing the same post yield two entries. Reshares of posts
    /// by another friend are not repeated; the author's entry covers them.
    pub async fn feed_at(
        &self,
        viewer: Id<UserMarker>,
        page: Page,
        now: UtcDateTime,
    ) -> Result<Vec<FeedItem>, FeedError> {
        if self.store().fetch_user(viewer).await?.is_none() {
            return Err(FeedError::UserNotFound);
        }

        let since = now - self.config().feed_window.get();
        let friends = self.graph().friends_of(viewer).await?;

        let mut contributions = Vec::new();
        for &friend in &friends {
            let entries = self
                .posts()
                .contributions_of(friend, &friends, since)
                .await?;
            contributions.extend(entries);
        }
        debug!(
            %viewer,
            friends = friends.len(),
            entries = contributions.len(),
            "Assembled feed"
        );

        // Stable, so equal timestamps keep the order the store produced.
        contributions.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));

        Ok(resolve_posters(self.store(), page.slice(contributions)).await?)
    }

    /// Posts owned or reshared by `user`, newest first.
    pub async fn account_tweets(
        &self,
        user: Id<UserMarker>,
        page: Page,
    ) -> Result<Vec<FeedItem>, FeedError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(FeedError::UserNotFound);
        }

        let entries = self.posts().timeline_of(user, page).await?;
        Ok(resolve_posters(self.store(), entries).await?)
    }
}

/// Attaches author and reposter profiles. Entries whose users no longer
/// exist are dropped.
async fn resolve_posters(
    store: &dyn SocialStore,
    entries: Vec<TimelineEntry>,
) -> crate::store::Result<Vec<FeedItem>> {
    let ids: BTreeSet<Id<UserMarker>> = entries
        .iter()
        .flat_map(|entry| std::iter::once(entry.post.author).chain(entry.reposter))
        .collect();
    let ids: Vec<Id<UserMarker>> = ids.into_iter().collect();

    let users: HashMap<Id<UserMarker>, User> = store
        .fetch_users(&ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(poster) = users.get(&entry.post.author) else {
            warn!(post = %entry.post.id, author = %entry.post.author, "Post author is missing");
            continue;
        };
        let reposter = match entry.reposter {
            Some(id) => match users.get(&id) {
                Some(user) => Some(user.clone()),
                None => {
                    warn!(post = %entry.post.id, reposter = %id, "Reposter is missing");
                    continue;
                }
            },
            None => None,
        };

        items.push(FeedItem {
            post: entry.post,
            poster: poster.clone(),
            reposter,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use crate::{
        Engine,
        error::{Classify, ErrorKind},
        feed::FeedError,
        store::Page,
        testing::{befriend, engine, register, unknown_user},
    };
    use std::collections::BTreeSet;
    use time::{Duration, UtcDateTime};
    use warble_common::{
        model::{
            Id,
            post::{CreatePost, FeedItem, Post},
            user::{User, UserMarker},
        },
        scan::scan_content,
    };

    async fn post_at(
        engine: &Engine,
        author: &User,
        content: &str,
        created_at: UtcDateTime,
    ) -> Post {
        engine
            .store()
            .create_post(&CreatePost {
                author: author.id,
                content: content.to_owned(),
                media: None,
                hashtags: scan_content(content).hashtags,
                created_at,
            })
            .await
            .unwrap()
    }

    type Summary = (String, Id<UserMarker>, Option<Id<UserMarker>>);

    fn summary(items: &[FeedItem]) -> Vec<Summary> {
        items
            .iter()
            .map(|item| {
                (
                    item.post.content.clone(),
                    item.poster.id,
                    item.reposter.as_ref().map(|user| user.id),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn friend_posts_and_reshares_merge_newest_first() {
        let engine = engine();
        let a = register(&engine, "a").await;
        let b = register(&engine, "b").await;
        let c = register(&engine, "c").await;
        befriend(&engine, &a, &b).await;

        let now = UtcDateTime::now();
        post_at(&engine, &b, "#hello world", now - Duration::hours(1)).await;
        let p2 = post_at(&engine, &c, "stranger", now - Duration::days(3)).await;
        engine.store().add_share(p2.id, b.id).await.unwrap();

        let feed = engine.feed_at(a.id, Page::new(0, 10), now).await.unwrap();

        assert_eq!(
            summary(&feed),
            [
                ("#hello world".to_owned(), b.id, None),
                ("stranger".to_owned(), c.id, Some(b.id)),
            ]
        );
    }

    #[tokio::test]
    async fn strangers_never_appear() {
        let engine = engine();
        let a = register(&engine, "a").await;
        let b = register(&engine, "b").await;
        let stranger = register(&engine, "stranger").await;
        befriend(&engine, &a, &b).await;

        let now = UtcDateTime::now();
        post_at(&engine, &stranger, "not for a", now - Duration::minutes(5)).await;
        post_at(&engine, &a, "own post", now - Duration::minutes(4)).await;

        let feed = engine.feed_at(a.id, Page::new(0, 10), now).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn each_resharing_friend_adds_an_entry() {
        let engine = engine();
        let a = register(&engine, "a").await;
        let b = register(&engine, "b").await;
        let c = register(&engine, "c").await;
        let author = register(&engine, "author").await;
        befriend(&engine, &a, &b).await;
        befriend(&engine, &a, &c).await;

        let now = UtcDateTime::now();
        let post = post_at(&engine, &author, "viral", now - Duration::hours(2)).await;
        engine.store().add_share(post.id, b.id).await.unwrap();
        engine.store().add_share(post.id, c.id).await.unwrap();

        let feed = engine.feed_at(a.id, Page::new(0, 10), now).await.unwrap();

        let reposters: BTreeSet<_> = feed
            .iter()
            .map(|item| {
                assert_eq!(item.poster.id, author.id);
                item.reposter.as_ref().map(|user| user.id)
            })
            .collect();
        assert_eq!(feed.len(), 2);
        assert_eq!(reposters, BTreeSet::from([Some(b.id), Some(c.id)]));
    }

    #[tokio::test]
    async fn reshares_among_friends_are_not_repeated() {
        let engine = engine();
        let a = register(&engine, "a").await;
        let b = register(&engine, "b").await;
        let c = register(&engine, "c").await;
        befriend(&engine, &a, &b).await;
        befriend(&engine, &a, &c).await;

        let now = UtcDateTime::now();
        let post = post_at(&engine, &c, "by c", now - Duration::hours(2)).await;
        engine.store().add_share(post.id, b.id).await.unwrap();
        let own = post_at(&engine, &a, "by a", now - Duration::hours(3)).await;
        engine.store().add_share(own.id, b.id).await.unwrap();

        let feed = engine.feed_at(a.id, Page::new(0, 10), now).await.unwrap();
        assert_eq!(
            summary(&feed),
            [
                ("by c".to_owned(), c.id, None),
                ("by a".to_owned(), a.id, Some(b.id)),
            ]
        );
    }

    #[tokio::test]
    async fn window_is_thirty_days() {
        let engine = engine();
        let a = register(&engine, "a").await;
        let b = register(&engine, "b").await;
        befriend(&engine, &a, &b).await;

        let now = UtcDateTime::now();
        post_at(&engine, &b, "edge", now - Duration::days(30)).await;
        post_at(
            &engine,
            &b,
            "too old",
            now - Duration::days(30) - Duration::milliseconds(1),
        )
        .await;

        let feed = engine.feed_at(a.id, Page::new(0, 10), now).await.unwrap();
        assert_eq!(summary(&feed), [("edge".to_owned(), b.id, None)]);
    }

    #[tokio::test]
    async fn pages_partition_the_feed() {
        let engine = engine();
        let a = register(&engine, "a").await;
        let b = register(&engine, "b").await;
        befriend(&engine, &a, &b).await;

        let now = UtcDateTime::now();
        for minutes in 1..=7 {
            post_at(&engine, &b, &format!("{minutes}"), now - Duration::minutes(minutes)).await;
        }

        let all = engine.feed_at(a.id, Page::new(0, 100), now).await.unwrap();
        let first = engine.feed_at(a.id, Page::new(0, 4), now).await.unwrap();
        let second = engine.feed_at(a.id, Page::new(4, 4), now).await.unwrap();
        let beyond = engine.feed_at(a.id, Page::new(8, 4), now).await.unwrap();

        assert_eq!(all.len(), 7);
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 3);
        assert!(beyond.is_empty());
        assert_eq!([first, second].concat(), all);
    }

    #[tokio::test]
    async fn unknown_viewer() {
        let engine = engine();

        let error = engine
            .feed(unknown_user(), Page::new(0, 10))
            .await
            .unwrap_err();
        assert!(matches!(error, FeedError::UserNotFound));
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn account_tweets_include_reshares() {
        let engine = engine();
        let a = register(&engine, "a").await;
        let b = register(&engine, "b").await;

        let now = UtcDateTime::now();
        post_at(&engine, &a, "own", now - Duration::hours(1)).await;
        let other = post_at(&engine, &b, "other", now - Duration::hours(2)).await;
        post_at(&engine, &b, "unrelated", now - Duration::hours(3)).await;
        engine.store().add_share(other.id, a.id).await.unwrap();

        let tweets = engine.account_tweets(a.id, Page::new(0, 10)).await.unwrap();
        assert_eq!(
            summary(&tweets),
            [
                ("own".to_owned(), a.id, None),
                ("other".to_owned(), b.id, Some(a.id)),
            ]
        );

        let tweets = engine.account_tweets(a.id, Page::new(1, 10)).await.unwrap();
        assert_eq!(tweets.len(), 1);
    }
}
