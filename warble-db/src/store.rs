//! [`SocialStore`] on top of [`DbClient`].

use crate::client::{DbClient, DbError};
use async_trait::async_trait;
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
use warble_core::{
    error::{Constraint, StoreError},
    store::{MembershipChange, Page, Result, SocialStore},
};

/// Maps the unique indexes from the migrations to the constraints the engine knows.
fn violated_constraint(error: &sqlx::Error) -> Option<Constraint> {
    let database_error = error
        .as_database_error()
        .filter(|error| error.is_unique_violation())?;

    match database_error.constraint()? {
        "users_email_key" => Some(Constraint::UserEmail),
        "users_slug_key" => Some(Constraint::UserSlug),
        "friendships_pair_key" => Some(Constraint::FriendshipPair),
        _ => None,
    }
}

impl From<DbError> for StoreError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::Data(error) => StoreError::Data(error),
            DbError::Sqlx(error) => match violated_constraint(&error) {
                Some(constraint) => StoreError::Conflict(constraint),
                None => StoreError::backend(error),
            },
        }
    }
}

#[async_trait]
impl SocialStore for DbClient {
    async fn create_account(&self, account: &CreateAccount) -> Result<Account> {
        Ok(DbClient::create_account(self, account).await?)
    }

    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(DbClient::fetch_user(self, id).await?)
    }

    async fn fetch_users(&self, ids: &[Id<UserMarker>]) -> Result<Vec<User>> {
        Ok(DbClient::fetch_users(self, ids).await?)
    }

    async fn fetch_user_by_slug(&self, slug: &UserSlug) -> Result<Option<User>> {
        Ok(DbClient::fetch_user_by_slug(self, slug).await?)
    }

    async fn fetch_account(&self, id: Id<UserMarker>) -> Result<Option<Account>> {
        Ok(DbClient::fetch_account(self, id).await?)
    }

    async fn fetch_account_by_email(&self, email: &Email) -> Result<Option<Account>> {
        Ok(DbClient::fetch_account_by_email(self, email).await?)
    }

    async fn set_password(&self, id: Id<UserMarker>, hash: &PasswordHash) -> Result<bool> {
        Ok(DbClient::set_password(self, id, hash).await?)
    }

    async fn add_role(&self, id: Id<UserMarker>, role: &Role) -> Result<bool> {
        Ok(DbClient::add_role(self, id, role).await?)
    }

    async fn remove_role(&self, id: Id<UserMarker>, role: &Role) -> Result<bool> {
        Ok(DbClient::remove_role(self, id, role).await?)
    }

    async fn set_avatar(&self, id: Id<UserMarker>, avatar: Option<&MediaPath>) -> Result<bool> {
        Ok(DbClient::set_avatar(self, id, avatar).await?)
    }

    async fn set_nickname(&self, id: Id<UserMarker>, nickname: Option<&str>) -> Result<bool> {
        Ok(DbClient::set_nickname(self, id, nickname).await?)
    }

    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>> {
        Ok(DbClient::search_users(self, query, limit).await?)
    }

    async fn add_mention(&self, mentioned: Id<UserMarker>, mention: &Mention) -> Result<bool> {
        Ok(DbClient::add_mention(self, mentioned, mention).await?)
    }

    async fn fetch_mentions(&self, user: Id<UserMarker>) -> Result<Vec<Mention>> {
        Ok(DbClient::fetch_mentions(self, user).await?)
    }

    async fn mark_mentions_seen(&self, user: Id<UserMarker>) -> Result<u64> {
        Ok(DbClient::mark_mentions_seen(self, user).await?)
    }

    async fn create_authentication(&self, authentication: &Authentication) -> Result<()> {
        Ok(DbClient::create_authentication(self, authentication).await?)
    }

    async fn fetch_authentication(&self, hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self.fetch_auth(hash).await?)
    }

    async fn delete_authentication(&self, hash: &AuthTokenHash) -> Result<bool> {
        Ok(self.delete_auth(hash).await?)
    }

    async fn create_friendship(
        &self,
        requester: Id<UserMarker>,
        recipient: Id<UserMarker>,
        created_at: UtcDateTime,
    ) -> Result<Friendship> {
        Ok(DbClient::create_friendship(self, requester, recipient, created_at).await?)
    }

    async fn fetch_friendship(&self, id: Id<FriendshipMarker>) -> Result<Option<Friendship>> {
        Ok(DbClient::fetch_friendship(self, id).await?)
    }

    async fn friendships_of(
        &self,
        user: Id<UserMarker>,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>> {
        Ok(DbClient::friendships_of(self, user, status).await?)
    }

    async fn friendship_between(
        &self,
        a: Id<UserMarker>,
        b: Id<UserMarker>,
    ) -> Result<Option<Friendship>> {
        Ok(DbClient::friendship_between(self, a, b).await?)
    }

    async fn transition_friendship(
        &self,
        id: Id<FriendshipMarker>,
        from: FriendshipStatus,
        to: FriendshipStatus,
    ) -> Result<bool> {
        Ok(DbClient::transition_friendship(self, id, from, to).await?)
    }

    async fn delete_friendship(
        &self,
        id: Id<FriendshipMarker>,
        expected: FriendshipStatus,
    ) -> Result<bool> {
        Ok(DbClient::delete_friendship(self, id, expected).await?)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        Ok(DbClient::create_post(self, post).await?)
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(DbClient::fetch_post(self, id).await?)
    }

    async fn update_post(&self, id: Id<PostMarker>, edit: &PostEdit) -> Result<Option<Post>> {
        Ok(DbClient::update_post(self, id, edit).await?)
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool> {
        Ok(DbClient::delete_post(self, id).await?)
    }

    async fn add_like(&self, post: Id<PostMarker>, user: Id<UserMarker>)
    -> Result<MembershipChange> {
        Ok(DbClient::add_like(self, post, user).await?)
    }

    async fn remove_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        Ok(DbClient::remove_like(self, post, user).await?)
    }

    async fn add_share(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        Ok(DbClient::add_share(self, post, user).await?)
    }

    async fn remove_share(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        Ok(DbClient::remove_share(self, post, user).await?)
    }

    async fn add_comment(
        &self,
        post: Id<PostMarker>,
        comment: &CreateComment,
    ) -> Result<Option<Comment>> {
        Ok(DbClient::add_comment(self, post, comment).await?)
    }

    async fn update_comment(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        content: &str,
    ) -> Result<bool> {
        Ok(DbClient::update_comment(self, post, comment, content).await?)
    }

    async fn delete_comment(&self, post: Id<PostMarker>, comment: Id<CommentMarker>)
    -> Result<bool> {
        Ok(DbClient::delete_comment(self, post, comment).await?)
    }

    async fn posts_by_authors(
        &self,
        authors: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>> {
        Ok(DbClient::posts_by_authors(self, authors, since).await?)
    }

    async fn posts_shared_by_non_authors(
        &self,
        authors: &[Id<UserMarker>],
        sharers: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>> {
        Ok(DbClient::posts_shared_by_non_authors(self, authors, sharers, since).await?)
    }

    async fn posts_by_hashtags(&self, hashtags: &[Hashtag], limit: usize) -> Result<Vec<Post>> {
        Ok(DbClient::posts_by_hashtags(self, hashtags, limit).await?)
    }

    async fn posts_by_author_or_sharer(&self, user: Id<UserMarker>, page: Page)
    -> Result<Vec<Post>> {
        Ok(DbClient::posts_by_author_or_sharer(self, user, page).await?)
    }

    async fn media_posts(&self, author: Id<UserMarker>, limit: usize) -> Result<Vec<Post>> {
        Ok(DbClient::media_posts(self, author, limit).await?)
    }

    async fn post_stats(&self, author: Id<UserMarker>) -> Result<PostStats> {
        Ok(DbClient::post_stats(self, author).await?)
    }
}
