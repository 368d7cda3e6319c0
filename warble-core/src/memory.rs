//! In-process [`SocialStore`] holding everything behind a single lock.
//!
//! Records are kept in insertion order so that queries return ties in the
//! order they were stored, the same as the database does.

use crate::{
    error::{Constraint, StoreError},
    store::{MembershipChange, Page, Result, SocialStore},
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use time::UtcDateTime;
use tokio::sync::RwLock;
use warble_common::model::{
    Id, WarbleSnowflakeGenerator,
    auth::{AuthTokenHash, Authentication, PasswordHash},
    friendship::{Friendship, FriendshipMarker, FriendshipStatus},
    mention::Mention,
    post::{
        Comment, CommentMarker, CreateComment, CreatePost, Hashtag, MediaPath, Post, PostEdit,
        PostMarker, PostStats,
    },
    user::{Account, CreateAccount, Email, Role, User, UserMarker, UserSlug},
};

#[derive(Default)]
struct State {
    generator: WarbleSnowflakeGenerator,
    accounts: Vec<Account>,
    mentions: HashMap<Id<UserMarker>, Vec<Mention>>,
    authentications: Vec<Authentication>,
    friendships: Vec<Friendship>,
    posts: Vec<Post>,
}

impl State {
    fn next_id<Marker>(&mut self) -> Id<Marker> {
        self.generator.generate().into()
    }

    /// Applies `update` to the account and reports whether it exists.
    fn update_account(&mut self, id: Id<UserMarker>, update: impl FnOnce(&mut Account)) -> bool {
        match self.accounts.iter_mut().find(|account| account.id() == id) {
            Some(account) => {
                update(account);
                true
            }
            None => false,
        }
    }

    fn post_mut(&mut self, id: Id<PostMarker>) -> Option<&mut Post> {
        self.posts.iter_mut().find(|post| post.id == id)
    }

    fn newest_first(&self, filter: impl Fn(&Post) -> bool) -> Vec<Post> {
        let mut posts: Vec<Post> = self.posts.iter().filter(|post| filter(post)).cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    fn change_membership(
        &mut self,
        post: Id<PostMarker>,
        change: impl FnOnce(&mut Post) -> bool,
    ) -> MembershipChange {
        match self.post_mut(post) {
            None => MembershipChange::MissingPost,
            Some(post) => {
                if change(post) {
                    MembershipChange::Changed
                } else {
                    MembershipChange::Unchanged
                }
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SocialStore for MemoryStore {
    async fn create_account(&self, account: &CreateAccount) -> Result<Account> {
        let mut state = self.state.write().await;

        if state
            .accounts
            .iter()
            .any(|existing| existing.email == account.email)
        {
            return Err(StoreError::Conflict(Constraint::UserEmail));
        }
        if state
            .accounts
            .iter()
            .any(|existing| existing.user.slug == account.slug)
        {
            return Err(StoreError::Conflict(Constraint::UserSlug));
        }

        let created = Account {
            user: User {
                id: state.next_id(),
                slug: account.slug.clone(),
                nickname: account.nickname.clone(),
                avatar: None,
                created_at: account.created_at,
            },
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            roles: BTreeSet::new(),
        };
        state.accounts.push(created.clone());

        Ok(created)
    }

    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.fetch_account(id).await?.map(|account| account.user))
    }

    async fn fetch_users(&self, ids: &[Id<UserMarker>]) -> Result<Vec<User>> {
        let state = self.state.read().await;

        Ok(state
            .accounts
            .iter()
            .filter(|account| ids.contains(&account.id()))
            .map(|account| account.user.clone())
            .collect())
    }

    async fn fetch_user_by_slug(&self, slug: &UserSlug) -> Result<Option<User>> {
        let state = self.state.read().await;

        Ok(state
            .accounts
            .iter()
            .find(|account| &account.user.slug == slug)
            .map(|account| account.user.clone()))
    }

    async fn fetch_account(&self, id: Id<UserMarker>) -> Result<Option<Account>> {
        let state = self.state.read().await;

        Ok(state
            .accounts
            .iter()
            .find(|account| account.id() == id)
            .cloned())
    }

    async fn fetch_account_by_email(&self, email: &Email) -> Result<Option<Account>> {
        let state = self.state.read().await;

        Ok(state
            .accounts
            .iter()
            .find(|account| &account.email == email)
            .cloned())
    }

    async fn set_password(&self, id: Id<UserMarker>, hash: &PasswordHash) -> Result<bool> {
        let mut state = self.state.write().await;

        Ok(state.update_account(id, |account| account.password_hash = hash.clone()))
    }

    async fn add_role(&self, id: Id<UserMarker>, role: &Role) -> Result<bool> {
        let mut state = self.state.write().await;

        Ok(state.update_account(id, |account| {
            account.roles.insert(role.clone());
        }))
    }

    async fn remove_role(&self, id: Id<UserMarker>, role: &Role) -> Result<bool> {
        let mut state = self.state.write().await;

        Ok(state.update_account(id, |account| {
            account.roles.remove(role);
        }))
    }

    async fn set_avatar(&self, id: Id<UserMarker>, avatar: Option<&MediaPath>) -> Result<bool> {
        let mut state = self.state.write().await;

        Ok(state.update_account(id, |account| account.user.avatar = avatar.cloned()))
    }

    async fn set_nickname(&self, id: Id<UserMarker>, nickname: Option<&str>) -> Result<bool> {
        let mut state = self.state.write().await;

        Ok(state.update_account(id, |account| {
            account.user.nickname = nickname.map(str::to_owned);
        }))
    }

    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let needle = query.to_lowercase();

        Ok(state
            .accounts
            .iter()
            .filter(|account| {
                account.email.get().contains(&needle)
                    || account
                        .user
                        .nickname
                        .as_ref()
                        .is_some_and(|nickname| nickname.to_lowercase().contains(&needle))
            })
            .take(limit)
            .map(|account| account.user.clone())
            .collect())
    }

    async fn add_mention(&self, mentioned: Id<UserMarker>, mention: &Mention) -> Result<bool> {
        let mut state = self.state.write().await;
        let mentions = state.mentions.entry(mentioned).or_default();

        if mentions.iter().any(|existing| existing.post == mention.post) {
            return Ok(false);
        }
        mentions.insert(0, mention.clone());

        Ok(true)
    }

    async fn fetch_mentions(&self, user: Id<UserMarker>) -> Result<Vec<Mention>> {
        let state = self.state.read().await;

        Ok(state.mentions.get(&user).cloned().unwrap_or_default())
    }

    async fn mark_mentions_seen(&self, user: Id<UserMarker>) -> Result<u64> {
        let mut state = self.state.write().await;

        let mut marked = 0;
        for mention in state.mentions.entry(user).or_default() {
            if !mention.seen {
                mention.seen = true;
                marked += 1;
            }
        }

        Ok(marked)
    }

    async fn create_authentication(&self, authentication: &Authentication) -> Result<()> {
        self.state
            .write()
            .await
            .authentications
            .push(authentication.clone());

        Ok(())
    }

    async fn fetch_authentication(&self, hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let state = self.state.read().await;

        Ok(state
            .authentications
            .iter()
            .find(|authentication| &authentication.token_hash == hash)
            .cloned())
    }

    async fn delete_authentication(&self, hash: &AuthTokenHash) -> Result<bool> {
        let mut state = self.state.write().await;

        let before = state.authentications.len();
        state
            .authentications
            .retain(|authentication| &authentication.token_hash != hash);

        Ok(state.authentications.len() < before)
    }

    async fn create_friendship(
        &self,
        requester: Id<UserMarker>,
        recipient: Id<UserMarker>,
        created_at: UtcDateTime,
    ) -> Result<Friendship> {
        let mut state = self.state.write().await;

        if state
            .friendships
            .iter()
            .any(|friendship| friendship.connects(requester, recipient))
        {
            return Err(StoreError::Conflict(Constraint::FriendshipPair));
        }

        let friendship = Friendship {
            id: state.next_id(),
            requester,
            recipient,
            status: FriendshipStatus::Pending,
            created_at,
        };
        state.friendships.push(friendship.clone());

        Ok(friendship)
    }

    async fn fetch_friendship(&self, id: Id<FriendshipMarker>) -> Result<Option<Friendship>> {
        let state = self.state.read().await;

        Ok(state
            .friendships
            .iter()
            .find(|friendship| friendship.id == id)
            .cloned())
    }

    async fn friendships_of(
        &self,
        user: Id<UserMarker>,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>> {
        let state = self.state.read().await;

        Ok(state
            .friendships
            .iter()
            .filter(|friendship| friendship.involves(user))
            .filter(|friendship| status.is_none_or(|status| friendship.status == status))
            .cloned()
            .collect())
    }

    async fn friendship_between(
        &self,
        a: Id<UserMarker>,
        b: Id<UserMarker>,
    ) -> Result<Option<Friendship>> {
        let state = self.state.read().await;

        Ok(state
            .friendships
            .iter()
            .find(|friendship| friendship.connects(a, b))
            .cloned())
    }

    async fn transition_friendship(
        &self,
        id: Id<FriendshipMarker>,
        from: FriendshipStatus,
        to: FriendshipStatus,
    ) -> Result<bool> {
        let mut state = self.state.write().await;

        let Some(friendship) = state
            .friendships
            .iter_mut()
            .find(|friendship| friendship.id == id && friendship.status == from)
        else {
            return Ok(false);
        };
        friendship.status = to;

        Ok(true)
    }

    async fn delete_friendship(
        &self,
        id: Id<FriendshipMarker>,
        expected: FriendshipStatus,
    ) -> Result<bool> {
        let mut state = self.state.write().await;

        let before = state.friendships.len();
        state
            .friendships
            .retain(|friendship| !(friendship.id == id && friendship.status == expected));

        Ok(state.friendships.len() < before)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut state = self.state.write().await;

        let created = Post {
            id: state.next_id(),
            author: post.author,
            content: post.content.clone(),
            media: post.media.clone(),
            created_at: post.created_at,
            likes: BTreeSet::new(),
            shares: BTreeSet::new(),
            comments: Vec::new(),
            hashtags: post.hashtags.clone(),
        };
        state.posts.push(created.clone());

        Ok(created)
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        let state = self.state.read().await;

        Ok(state.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn update_post(&self, id: Id<PostMarker>, edit: &PostEdit) -> Result<Option<Post>> {
        let mut state = self.state.write().await;

        Ok(state.post_mut(id).map(|post| {
            post.content.clone_from(&edit.content);
            post.hashtags.clone_from(&edit.hashtags);
            post.media = edit.media.apply(post.media.take());
            post.clone()
        }))
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool> {
        let mut state = self.state.write().await;

        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);

        Ok(state.posts.len() < before)
    }

    async fn add_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        let mut state = self.state.write().await;

        Ok(state.change_membership(post, |post| post.likes.insert(user)))
    }

    async fn remove_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        let mut state = self.state.write().await;

        Ok(state.change_membership(post, |post| post.likes.remove(&user)))
    }

    async fn add_share(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        let mut state = self.state.write().await;

        Ok(state.change_membership(post, |post| post.shares.insert(user)))
    }

    async fn remove_share(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        let mut state = self.state.write().await;

        Ok(state.change_membership(post, |post| post.shares.remove(&user)))
    }

    async fn add_comment(
        &self,
        post: Id<PostMarker>,
        comment: &CreateComment,
    ) -> Result<Option<Comment>> {
        let mut state = self.state.write().await;

        let id = state.next_id();
        Ok(state.post_mut(post).map(|post| {
            let created = Comment {
                id,
                author: comment.author,
                content: comment.content.clone(),
                created_at: comment.created_at,
            };
            post.comments.push(created.clone());
            created
        }))
    }

    async fn update_comment(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        content: &str,
    ) -> Result<bool> {
        let mut state = self.state.write().await;

        let Some(comment) = state
            .post_mut(post)
            .and_then(|post| post.comments.iter_mut().find(|c| c.id == comment))
        else {
            return Ok(false);
        };
        content.clone_into(&mut comment.content);

        Ok(true)
    }

    async fn delete_comment(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;

        let Some(post) = state.post_mut(post) else {
            return Ok(false);
        };
        let before = post.comments.len();
        post.comments.retain(|c| c.id != comment);

        Ok(post.comments.len() < before)
    }

    async fn posts_by_authors(
        &self,
        authors: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        Ok(state.newest_first(|post| authors.contains(&post.author) && post.created_at >= since))
    }

    async fn posts_shared_by_non_authors(
        &self,
        authors: &[Id<UserMarker>],
        sharers: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        Ok(state.newest_first(|post| {
            !authors.contains(&post.author)
                && sharers.iter().any(|sharer| post.shares.contains(sharer))
                && post.created_at >= since
        }))
    }

    async fn posts_by_hashtags(&self, hashtags: &[Hashtag], limit: usize) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        let mut posts =
            state.newest_first(|post| hashtags.iter().any(|tag| post.hashtags.contains(tag)));
        posts.truncate(limit);

        Ok(posts)
    }

    async fn posts_by_author_or_sharer(
        &self,
        user: Id<UserMarker>,
        page: Page,
    ) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        Ok(page.slice(state.newest_first(|post| post.author == user || post.is_shared_by(user))))
    }

    async fn media_posts(&self, author: Id<UserMarker>, limit: usize) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        let mut posts = state.newest_first(|post| post.author == author && post.media.is_some());
        posts.truncate(limit);

        Ok(posts)
    }

    async fn post_stats(&self, author: Id<UserMarker>) -> Result<PostStats> {
        let state = self.state.read().await;

        let mut stats = PostStats::default();
        for post in state.posts.iter().filter(|post| post.author == author) {
            stats.tweet_count += 1;
            stats.likes_count += post.likes.len() as u64;
            stats.shares_count += post.shares.len() as u64;
        }

        Ok(stats)
    }
}
