use crate::store::{Page, Result, SocialStore};
use std::collections::BTreeSet;
use time::UtcDateTime;
use warble_common::model::{
    Id,
    post::{Hashtag, Post},
    user::UserMarker,
};

pub const HASHTAG_SEARCH_LIMIT: usize = 50;

/// A post as it appears on someone's timeline. `reposter` is set when the
/// post shows up because that user reshared it.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct TimelineEntry {
    pub post: Post,
    pub reposter: Option<Id<UserMarker>>,
}

#[derive(Copy, Clone)]
pub struct PostRepository<'a> {
    store: &'a dyn SocialStore,
}

impl<'a> PostRepository<'a> {
    pub fn new(store: &'a dyn SocialStore) -> Self {
        Self { store }
    }

    /// Posts owned by any of `authors`, created at or after `since`, newest first.
    pub async fn by_authors(
        &self,
        authors: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>> {
        self.store.posts_by_authors(authors, since).await
    }

    /// Posts owned by none of `authors` that one of `sharers` reshared.
    pub async fn shared_by_non_authors(
        &self,
        authors: &[Id<UserMarker>],
        sharers: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>> {
        self.store
            .posts_shared_by_non_authors(authors, sharers, since)
            .await
    }

    /// Newest first, at most [`HASHTAG_SEARCH_LIMIT`] posts.
    pub async fn by_hashtags(&self, hashtags: &BTreeSet<Hashtag>) -> Result<Vec<Post>> {
        if hashtags.is_empty() {
            return Ok(Vec::new());
        }

        let hashtags: Vec<Hashtag> = hashtags.iter().cloned().collect();
        self.store
            .posts_by_hashtags(&hashtags, HASHTAG_SEARCH_LIMIT)
            .await
    }

    /// What `user` contributes to a friend's feed: their own posts and the
    /// posts they reshared, newest first.
    ///
    /// Reshares of posts owned by anyone in `circle` are left out, since
    /// those reach the feed through their author already. `user` itself
    /// always counts as part of the circle.
    pub async fn contributions_of(
        &self,
        user: Id<UserMarker>,
        circle: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<TimelineEntry>> {
        let mut excluded = circle.to_vec();
        if !excluded.contains(&user) {
            excluded.push(user);
        }

        let authored = self.by_authors(&[user], since).await?;
        let reshared = self.shared_by_non_authors(&excluded, &[user], since).await?;

        let mut entries: Vec<TimelineEntry> = authored
            .into_iter()
            .map(|post| TimelineEntry {
                post,
                reposter: None,
            })
            .chain(reshared.into_iter().map(|post| TimelineEntry {
                post,
                reposter: Some(user),
            }))
            .collect();
        entries.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));

        Ok(entries)
    }

    /// Posts owned or reshared by `user`, newest first, with the reshare
    /// attributed to `user` where they are not the author.
    pub async fn timeline_of(
        &self,
        user: Id<UserMarker>,
        page: Page,
    ) -> Result<Vec<TimelineEntry>> {
        let posts = self.store.posts_by_author_or_sharer(user, page).await?;

        Ok(posts
            .into_iter()
            .map(|post| TimelineEntry {
                reposter: (post.author != user).then_some(user),
                post,
            })
            .collect())
    }
}
