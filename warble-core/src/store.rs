//! The persistent record store the engine runs against.
//!
//! Implementations hand out snapshots. Every method is a single atomic step
//! on the store's side, which is what the engine relies on for the
//! check-and-write operations (likes, shares, mentions, friendship status).

use crate::error::StoreError;
use async_trait::async_trait;
use serde::Deserialize;
use time::UtcDateTime;
use warble_common::model::{
    Id,
    auth::{AuthTokenHash, Authentication, PasswordHash},
    friendship::{Friendship, FriendshipMarker, FriendshipStatus},
    mention::Mention,
    post::{
        Comment, CommentMarker, CreateComment, CreatePost, Hashtag, MediaPath, Post, PostEdit,
        PostMarker, PostStats,
    },
    user::{Account, CreateAccount, Email, Role, User, UserMarker, UserSlug},
};

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Offset pagination as requested by clients.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize)]
pub struct Page {
    pub start: usize,
    pub amount: usize,
}

impl Page {
    #[must_use]
    pub fn new(start: usize, amount: usize) -> Self {
        Self { start, amount }
    }

    /// The `[start, start + amount)` window of `items`. Out of range is empty.
    #[must_use]
    pub fn slice<T>(self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.start)
            .take(self.amount)
            .collect()
    }
}

/// Outcome of a conditional add to or removal from one of a post's user sets.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum MembershipChange {
    Changed,
    Unchanged,
    MissingPost,
}

#[async_trait]
pub trait SocialStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] if the email or slug is taken.
    async fn create_account(&self, account: &CreateAccount) -> Result<Account>;

    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>>;

    /// Users that do not exist are left out.
    async fn fetch_users(&self, ids: &[Id<UserMarker>]) -> Result<Vec<User>>;

    async fn fetch_user_by_slug(&self, slug: &UserSlug) -> Result<Option<User>>;

    async fn fetch_account(&self, id: Id<UserMarker>) -> Result<Option<Account>>;

    async fn fetch_account_by_email(&self, email: &Email) -> Result<Option<Account>>;

    /// The `bool` results of the account setters report whether the user exists.
    async fn set_password(&self, id: Id<UserMarker>, hash: &PasswordHash) -> Result<bool>;

    async fn add_role(&self, id: Id<UserMarker>, role: &Role) -> Result<bool>;

    async fn remove_role(&self, id: Id<UserMarker>, role: &Role) -> Result<bool>;

    async fn set_avatar(&self, id: Id<UserMarker>, avatar: Option<&MediaPath>) -> Result<bool>;

    async fn set_nickname(&self, id: Id<UserMarker>, nickname: Option<&str>) -> Result<bool>;

    /// Case-insensitive substring match on nickname or email.
    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>>;

    /// Inserts unless `mentioned` already has a mention for the same post.
    async fn add_mention(&self, mentioned: Id<UserMarker>, mention: &Mention) -> Result<bool>;

    /// Newest first.
    async fn fetch_mentions(&self, user: Id<UserMarker>) -> Result<Vec<Mention>>;

    async fn mark_mentions_seen(&self, user: Id<UserMarker>) -> Result<u64>;

    async fn create_authentication(&self, authentication: &Authentication) -> Result<()>;

    async fn fetch_authentication(&self, hash: &AuthTokenHash) -> Result<Option<Authentication>>;

    async fn delete_authentication(&self, hash: &AuthTokenHash) -> Result<bool>;

    /// New friendships start out pending. Fails with [`StoreError::Conflict`]
    /// if any friendship already connects the two users, in either direction.
    async fn create_friendship(
        &self,
        requester: Id<UserMarker>,
        recipient: Id<UserMarker>,
        created_at: UtcDateTime,
    ) -> Result<Friendship>;

    async fn fetch_friendship(&self, id: Id<FriendshipMarker>) -> Result<Option<Friendship>>;

    /// Friendships `user` is either party of, optionally only those in `status`.
    async fn friendships_of(
        &self,
        user: Id<UserMarker>,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>>;

    async fn friendship_between(
        &self,
        a: Id<UserMarker>,
        b: Id<UserMarker>,
    ) -> Result<Option<Friendship>>;

    /// Moves the friendship to `to` only if it is currently in `from`.
    async fn transition_friendship(
        &self,
        id: Id<FriendshipMarker>,
        from: FriendshipStatus,
        to: FriendshipStatus,
    ) -> Result<bool>;

    /// Deletes the friendship only if it is currently in `expected`.
    async fn delete_friendship(
        &self,
        id: Id<FriendshipMarker>,
        expected: FriendshipStatus,
    ) -> Result<bool>;

    async fn create_post(&self, post: &CreatePost) -> Result<Post>;

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>>;

    async fn update_post(&self, id: Id<PostMarker>, edit: &PostEdit) -> Result<Option<Post>>;

    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool>;

    async fn add_like(&self, post: Id<PostMarker>, user: Id<UserMarker>)
    -> Result<MembershipChange>;

    async fn remove_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange>;

    async fn add_share(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange>;

    async fn remove_share(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange>;

    /// `None` if the post does not exist.
    async fn add_comment(
        &self,
        post: Id<PostMarker>,
        comment: &CreateComment,
    ) -> Result<Option<Comment>>;

    async fn update_comment(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        content: &str,
    ) -> Result<bool>;

    async fn delete_comment(&self, post: Id<PostMarker>, comment: Id<CommentMarker>)
    -> Result<bool>;

    /// Posts owned by any of `authors` created at or after `since`, newest first.
    async fn posts_by_authors(
        &self,
        authors: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>>;

    /// Posts not owned by any of `authors` but reshared by one of `sharers`,
    /// created at or after `since`, newest first.
    async fn posts_shared_by_non_authors(
        &self,
        authors: &[Id<UserMarker>],
        sharers: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>>;

    /// Posts carrying at least one of `hashtags`, newest first.
    async fn posts_by_hashtags(&self, hashtags: &[Hashtag], limit: usize) -> Result<Vec<Post>>;

    /// Posts owned or reshared by `user`, newest first.
    async fn posts_by_author_or_sharer(&self, user: Id<UserMarker>, page: Page)
    -> Result<Vec<Post>>;

    /// Posts by `author` that carry media, newest first.
    async fn media_posts(&self, author: Id<UserMarker>, limit: usize) -> Result<Vec<Post>>;

    async fn post_stats(&self, author: Id<UserMarker>) -> Result<PostStats>;
}

#[cfg(test)]
mod tests {
    use crate::store::Page;

    #[test]
    fn page_slices() {
        let items: Vec<u32> = (0..5).collect();

        assert_eq!(Page::new(0, 2).slice(items.clone()), [0, 1]);
        assert_eq!(Page::new(3, 10).slice(items.clone()), [3, 4]);
        assert!(Page::new(5, 1).slice(items.clone()).is_empty());
        assert!(Page::new(1, 0).slice(items.clone()).is_empty());
        assert!(Page::new(usize::MAX, usize::MAX).slice(items).is_empty());
    }
}
