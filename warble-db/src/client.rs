use crate::record::{
    AccountRecord, AuthenticationRecord, CommentRecord, FriendshipRecord, MentionRecord,
    PostRecord, PostStatsRecord, UserRecord, timestamp,
};
use sqlx::{PgPool, query, query_as, query_scalar};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use thiserror::Error;
use time::UtcDateTime;
use tracing::debug;
use warble_common::{
    model::{
        Id, ModelValidationError, WarbleSnowflakeGenerator,
        auth::{AuthTokenHash, Authentication, PasswordHash},
        friendship::{Friendship, FriendshipMarker, FriendshipStatus},
        mention::Mention,
        post::{
            Comment, CommentMarker, CreateComment, CreatePost, Hashtag, MediaEdit, MediaPath,
            Post, PostEdit, PostMarker, PostStats,
        },
        user::{Account, CreateAccount, Email, Role, User, UserMarker, UserSlug},
    },
    snowflake::{ProcessId, WorkerId},
};
use warble_core::store::{MembershipChange, Page};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<WarbleSnowflakeGenerator>,
}

const USER_COLUMNS: &str = "
    users.user_snowflake,
    users.slug,
    users.nickname,
    users.avatar,
    users.created_at";

const POST_COLUMNS: &str = "
    full_posts.post_snowflake,
    full_posts.user_snowflake,
    full_posts.content,
    full_posts.media,
    full_posts.hashtags,
    full_posts.created_at,
    full_posts.likes,
    full_posts.shares";

const FRIENDSHIP_COLUMNS: &str = "
    friendships.friendship_snowflake,
    friendships.requester_snowflake,
    friendships.recipient_snowflake,
    friendships.status,
    friendships.created_at";

fn db_ids<Marker: Copy>(ids: &[Id<Marker>]) -> Vec<i64> {
    ids.iter().copied().map(Id::to_db).collect()
}

fn db_hashtags<'a>(hashtags: impl IntoIterator<Item = &'a Hashtag>) -> Vec<String> {
    hashtags
        .into_iter()
        .map(|tag| tag.get().to_owned())
        .collect()
}

fn db_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Wraps `query` in `%` for `ILIKE`, escaping the pattern characters it contains.
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator = Mutex::new(WarbleSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    fn next_id<Marker>(&self) -> Id<Marker> {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            .into()
    }

    pub async fn create_account(&self, account: &CreateAccount) -> Result<Account> {
        let user_id: Id<UserMarker> = self.next_id();

        let record = query_as::<_, AccountRecord>(&format!(
            "
            INSERT INTO users.users (
                user_snowflake, email, slug, nickname, password_hash, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}, users.email, users.password_hash, users.roles
            "
        ))
        .bind(user_id.to_db())
        .bind(account.email.get())
        .bind(account.slug.get())
        .bind(account.nickname.as_deref())
        .bind(account.password_hash.as_phc())
        .bind(timestamp(account.created_at))
        .fetch_one(&self.pool)
        .await?;
        debug!(user = %user_id, "Inserted user");

        Ok(record.try_into()?)
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users.users WHERE users.user_snowflake = $1"
        ))
        .bind(user_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    pub async fn fetch_users(&self, user_ids: &[Id<UserMarker>]) -> Result<Vec<User>> {
        let records = query_as::<_, UserRecord>(&format!(
            "
            SELECT {USER_COLUMNS}
            FROM users.users
            WHERE users.user_snowflake = ANY($1)
            ORDER BY users.user_snowflake
            "
        ))
        .bind(db_ids(user_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?)
    }

    pub async fn fetch_user_by_slug(&self, slug: &UserSlug) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users.users WHERE users.slug = $1"
        ))
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    pub async fn fetch_account(&self, user_id: Id<UserMarker>) -> Result<Option<Account>> {
        let record = query_as::<_, AccountRecord>(&format!(
            "
            SELECT {USER_COLUMNS}, users.email, users.password_hash, users.roles
            FROM users.users
            WHERE users.user_snowflake = $1
            "
        ))
        .bind(user_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Account::try_from).transpose()?)
    }

    pub async fn fetch_account_by_email(&self, email: &Email) -> Result<Option<Account>> {
        let record = query_as::<_, AccountRecord>(&format!(
            "
            SELECT {USER_COLUMNS}, users.email, users.password_hash, users.roles
            FROM users.users
            WHERE users.email = $1
            "
        ))
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Account::try_from).transpose()?)
    }

    pub async fn set_password(&self, user_id: Id<UserMarker>, hash: &PasswordHash) -> Result<bool> {
        let result = query("UPDATE users.users SET password_hash = $2 WHERE user_snowflake = $1")
            .bind(user_id.to_db())
            .bind(hash.as_phc())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn add_role(&self, user_id: Id<UserMarker>, role: &Role) -> Result<bool> {
        let result = query(
            "
            UPDATE users.users
            SET roles = CASE
                WHEN $2 = ANY(roles) THEN roles
                ELSE array_append(roles, $2)
            END
            WHERE user_snowflake = $1
            ",
        )
        .bind(user_id.to_db())
        .bind(role.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_role(&self, user_id: Id<UserMarker>, role: &Role) -> Result<bool> {
        let result = query(
            "UPDATE users.users SET roles = array_remove(roles, $2) WHERE user_snowflake = $1",
        )
        .bind(user_id.to_db())
        .bind(role.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_avatar(
        &self,
        user_id: Id<UserMarker>,
        avatar: Option<&MediaPath>,
    ) -> Result<bool> {
        let result = query("UPDATE users.users SET avatar = $2 WHERE user_snowflake = $1")
            .bind(user_id.to_db())
            .bind(avatar.map(MediaPath::get))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_nickname(
        &self,
        user_id: Id<UserMarker>,
        nickname: Option<&str>,
    ) -> Result<bool> {
        let result = query("UPDATE users.users SET nickname = $2 WHERE user_snowflake = $1")
            .bind(user_id.to_db())
            .bind(nickname)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn search_users(&self, search: &str, limit: usize) -> Result<Vec<User>> {
        let records = query_as::<_, UserRecord>(&format!(
            "
            SELECT {USER_COLUMNS}
            FROM users.users
            WHERE users.email ILIKE $1 OR users.nickname ILIKE $1
            ORDER BY users.user_snowflake
            LIMIT $2
            "
        ))
        .bind(contains_pattern(search))
        .bind(db_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?)
    }

    pub async fn add_mention(&self, mentioned: Id<UserMarker>, mention: &Mention) -> Result<bool> {
        let result = query(
            "
            INSERT INTO users.mentions (
                mentioned_snowflake, mentioner_snowflake, post_snowflake, mentioned_at, seen
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(mentioned.to_db())
        .bind(mention.mentioner.id.to_db())
        .bind(mention.post.to_db())
        .bind(timestamp(mention.mentioned_at))
        .bind(mention.seen)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_mentions(&self, user_id: Id<UserMarker>) -> Result<Vec<Mention>> {
        let records = query_as::<_, MentionRecord>(&format!(
            "
            SELECT
                {USER_COLUMNS},
                mentions.post_snowflake,
                mentions.mentioned_at,
                mentions.seen
            FROM
                users.mentions
                JOIN users.users ON users.user_snowflake = mentions.mentioner_snowflake
            WHERE
                mentions.mentioned_snowflake = $1
            ORDER BY
                mentions.mentioned_at DESC,
                mentions.post_snowflake DESC
            "
        ))
        .bind(user_id.to_db())
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Mention::try_from)
            .collect::<Result<_, _>>()?)
    }

    pub async fn mark_mentions_seen(&self, user_id: Id<UserMarker>) -> Result<u64> {
        let result = query(
            "UPDATE users.mentions SET seen = TRUE WHERE mentioned_snowflake = $1 AND NOT seen",
        )
        .bind(user_id.to_db())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn create_authentication(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO users.authentications (
                token_hash, user_snowflake, created_at, expires_after_seconds
            )
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(authentication.token_hash.as_bytes())
        .bind(authentication.user.to_db())
        .bind(timestamp(authentication.created_at))
        .bind(
            authentication
                .expires_after
                .map(|duration| duration.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_snowflake,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM
                users.authentications
            WHERE
                authentications.token_hash = $1
            ",
        )
        .bind(token_hash.as_bytes())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Authentication::try_from).transpose()?)
    }

    pub async fn delete_auth(&self, token_hash: &AuthTokenHash) -> Result<bool> {
        let result = query("DELETE FROM users.authentications WHERE token_hash = $1")
            .bind(token_hash.as_bytes())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_friendship(
        &self,
        requester: Id<UserMarker>,
        recipient: Id<UserMarker>,
        created_at: UtcDateTime,
    ) -> Result<Friendship> {
        let friendship_id: Id<FriendshipMarker> = self.next_id();

        let record = query_as::<_, FriendshipRecord>(&format!(
            "
            INSERT INTO users.friendships (
                friendship_snowflake, requester_snowflake, recipient_snowflake, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FRIENDSHIP_COLUMNS}
            "
        ))
        .bind(friendship_id.to_db())
        .bind(requester.to_db())
        .bind(recipient.to_db())
        .bind(FriendshipStatus::Pending.as_str())
        .bind(timestamp(created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn fetch_friendship(
        &self,
        friendship_id: Id<FriendshipMarker>,
    ) -> Result<Option<Friendship>> {
        let record = query_as::<_, FriendshipRecord>(&format!(
            "
            SELECT {FRIENDSHIP_COLUMNS}
            FROM users.friendships
            WHERE friendships.friendship_snowflake = $1
            "
        ))
        .bind(friendship_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Friendship::try_from).transpose()?)
    }

    pub async fn friendships_of(
        &self,
        user_id: Id<UserMarker>,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>> {
        let records = query_as::<_, FriendshipRecord>(&format!(
            "
            SELECT {FRIENDSHIP_COLUMNS}
            FROM users.friendships
            WHERE
                (friendships.requester_snowflake = $1 OR friendships.recipient_snowflake = $1)
                AND ($2::TEXT IS NULL OR friendships.status = $2)
            ORDER BY friendships.friendship_snowflake
            "
        ))
        .bind(user_id.to_db())
        .bind(status.map(FriendshipStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Friendship::try_from)
            .collect::<Result<_, _>>()?)
    }

    pub async fn friendship_between(
        &self,
        a: Id<UserMarker>,
        b: Id<UserMarker>,
    ) -> Result<Option<Friendship>> {
        let record = query_as::<_, FriendshipRecord>(&format!(
            "
            SELECT {FRIENDSHIP_COLUMNS}
            FROM users.friendships
            WHERE
                LEAST(friendships.requester_snowflake, friendships.recipient_snowflake)
                    = LEAST($1::BIGINT, $2::BIGINT)
                AND GREATEST(friendships.requester_snowflake, friendships.recipient_snowflake)
                    = GREATEST($1::BIGINT, $2::BIGINT)
            "
        ))
        .bind(a.to_db())
        .bind(b.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Friendship::try_from).transpose()?)
    }

    pub async fn transition_friendship(
        &self,
        friendship_id: Id<FriendshipMarker>,
        from: FriendshipStatus,
        to: FriendshipStatus,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE users.friendships
            SET status = $3
            WHERE friendship_snowflake = $1 AND status = $2
            ",
        )
        .bind(friendship_id.to_db())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_friendship(
        &self,
        friendship_id: Id<FriendshipMarker>,
        expected: FriendshipStatus,
    ) -> Result<bool> {
        let result =
            query("DELETE FROM users.friendships WHERE friendship_snowflake = $1 AND status = $2")
                .bind(friendship_id.to_db())
                .bind(expected.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Attaches comments to the given post rows, keeping their order.
    async fn assemble_posts(&self, records: Vec<PostRecord>) -> Result<Vec<Post>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<i64> = records.iter().map(|record| record.post_snowflake).collect();
        let comment_records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.user_snowflake,
                comments.content,
                comments.created_at
            FROM
                posts.comments
            WHERE
                comments.post_snowflake = ANY($1)
            ORDER BY
                comments.created_at,
                comments.comment_snowflake
            ",
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut comments: HashMap<i64, Vec<Comment>> = HashMap::new();
        for record in comment_records {
            comments
                .entry(record.post_snowflake)
                .or_default()
                .push(record.try_into()?);
        }

        let posts = records
            .into_iter()
            .map(|record| {
                let post_comments = comments.remove(&record.post_snowflake).unwrap_or_default();
                record.into_post(post_comments)
            })
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let post_id: Id<PostMarker> = self.next_id();

        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts.posts (
                post_snowflake, user_snowflake, content, media, hashtags, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                posts.post_snowflake,
                posts.user_snowflake,
                posts.content,
                posts.media,
                posts.hashtags,
                posts.created_at,
                ARRAY[]::BIGINT[] AS likes,
                ARRAY[]::BIGINT[] AS shares
            ",
        )
        .bind(post_id.to_db())
        .bind(post.author.to_db())
        .bind(post.content.as_str())
        .bind(post.media.as_ref().map(MediaPath::get))
        .bind(db_hashtags(&post.hashtags))
        .bind(timestamp(post.created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into_post(Vec::new())?)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts.full_posts
            WHERE full_posts.post_snowflake = $1
            "
        ))
        .bind(post_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };
        Ok(self.assemble_posts(vec![record]).await?.pop())
    }

    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        edit: &PostEdit,
    ) -> Result<Option<Post>> {
        let (replace_media, media) = match &edit.media {
            MediaEdit::Keep => (false, None),
            MediaEdit::Replace(path) => (true, Some(path.get())),
            MediaEdit::Remove => (true, None),
        };

        let result = query(
            "
            UPDATE posts.posts
            SET
                content = $2,
                hashtags = $3,
                media = CASE WHEN $4 THEN $5 ELSE media END
            WHERE post_snowflake = $1
            ",
        )
        .bind(post_id.to_db())
        .bind(edit.content.as_str())
        .bind(db_hashtags(&edit.hashtags))
        .bind(replace_media)
        .bind(media)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_post(post_id).await
    }

    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(post_id.to_db())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Runs `statement` (bound to post and user) while holding a share lock on the post row.
    async fn change_membership(
        &self,
        statement: &'static str,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        let mut transaction = self.pool.begin().await?;

        let locked = query_scalar::<_, i64>(
            "SELECT post_snowflake FROM posts.posts WHERE post_snowflake = $1 FOR SHARE",
        )
        .bind(post_id.to_db())
        .fetch_optional(&mut *transaction)
        .await?;
        if locked.is_none() {
            return Ok(MembershipChange::MissingPost);
        }

        let result = query(statement)
            .bind(post_id.to_db())
            .bind(user_id.to_db())
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await?;

        if result.rows_affected() > 0 {
            Ok(MembershipChange::Changed)
        } else {
            Ok(MembershipChange::Unchanged)
        }
    }

    pub async fn add_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        self.change_membership(
            "INSERT INTO posts.likes (post_snowflake, user_snowflake) VALUES ($1, $2) \
            ON CONFLICT DO NOTHING",
            post_id,
            user_id,
        )
        .await
    }

    pub async fn remove_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        self.change_membership(
            "DELETE FROM posts.likes WHERE post_snowflake = $1 AND user_snowflake = $2",
            post_id,
            user_id,
        )
        .await
    }

    pub async fn add_share(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        self.change_membership(
            "INSERT INTO posts.shares (post_snowflake, user_snowflake) VALUES ($1, $2) \
            ON CONFLICT DO NOTHING",
            post_id,
            user_id,
        )
        .await
    }

    pub async fn remove_share(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<MembershipChange> {
        self.change_membership(
            "DELETE FROM posts.shares WHERE post_snowflake = $1 AND user_snowflake = $2",
            post_id,
            user_id,
        )
        .await
    }

    pub async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        comment: &CreateComment,
    ) -> Result<Option<Comment>> {
        let comment_id: Id<CommentMarker> = self.next_id();

        let record = query_as::<_, CommentRecord>(
            "
            INSERT INTO posts.comments (
                comment_snowflake, post_snowflake, user_snowflake, content, created_at
            )
            SELECT $1, posts.post_snowflake, $3, $4, $5
            FROM posts.posts
            WHERE posts.post_snowflake = $2
            RETURNING
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.user_snowflake,
                comments.content,
                comments.created_at
            ",
        )
        .bind(comment_id.to_db())
        .bind(post_id.to_db())
        .bind(comment.author.to_db())
        .bind(comment.content.as_str())
        .bind(timestamp(comment.created_at))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::try_from).transpose()?)
    }

    pub async fn update_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
        content: &str,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE posts.comments
            SET content = $3
            WHERE post_snowflake = $1 AND comment_snowflake = $2
            ",
        )
        .bind(post_id.to_db())
        .bind(comment_id.to_db())
        .bind(content)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<bool> {
        let result =
            query("DELETE FROM posts.comments WHERE post_snowflake = $1 AND comment_snowflake = $2")
                .bind(post_id.to_db())
                .bind(comment_id.to_db())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn posts_by_authors(
        &self,
        authors: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts.full_posts
            WHERE full_posts.user_snowflake = ANY($1) AND full_posts.created_at >= $2
            ORDER BY full_posts.created_at DESC, full_posts.post_snowflake
            "
        ))
        .bind(db_ids(authors))
        .bind(timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_posts(records).await
    }

    pub async fn posts_shared_by_non_authors(
        &self,
        authors: &[Id<UserMarker>],
        sharers: &[Id<UserMarker>],
        since: UtcDateTime,
    ) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts.full_posts
            WHERE
                NOT (full_posts.user_snowflake = ANY($1))
                AND full_posts.shares && $2
                AND full_posts.created_at >= $3
            ORDER BY full_posts.created_at DESC, full_posts.post_snowflake
            "
        ))
        .bind(db_ids(authors))
        .bind(db_ids(sharers))
        .bind(timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_posts(records).await
    }

    pub async fn posts_by_hashtags(&self, hashtags: &[Hashtag], limit: usize) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts.full_posts
            WHERE full_posts.hashtags && $1
            ORDER BY full_posts.created_at DESC, full_posts.post_snowflake
            LIMIT $2
            "
        ))
        .bind(db_hashtags(hashtags))
        .bind(db_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_posts(records).await
    }

    pub async fn posts_by_author_or_sharer(
        &self,
        user_id: Id<UserMarker>,
        page: Page,
    ) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts.full_posts
            WHERE full_posts.user_snowflake = $1 OR $1 = ANY(full_posts.shares)
            ORDER BY full_posts.created_at DESC, full_posts.post_snowflake
            OFFSET $2
            LIMIT $3
            "
        ))
        .bind(user_id.to_db())
        .bind(db_limit(page.start))
        .bind(db_limit(page.amount))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_posts(records).await
    }

    pub async fn media_posts(&self, author: Id<UserMarker>, limit: usize) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts.full_posts
            WHERE full_posts.user_snowflake = $1 AND full_posts.media IS NOT NULL
            ORDER BY full_posts.created_at DESC, full_posts.post_snowflake
            LIMIT $2
            "
        ))
        .bind(author.to_db())
        .bind(db_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_posts(records).await
    }

    pub async fn post_stats(&self, author: Id<UserMarker>) -> Result<PostStats> {
        let record = query_as::<_, PostStatsRecord>(
            "
            SELECT
                COUNT(*) AS tweet_count,
                COALESCE(SUM(cardinality(full_posts.likes)), 0)::BIGINT AS likes_count,
                COALESCE(SUM(cardinality(full_posts.shares)), 0)::BIGINT AS shares_count
            FROM
                posts.full_posts
            WHERE
                full_posts.user_snowflake = $1
            ",
        )
        .bind(author.to_db())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{contains_pattern, db_ids};
    use warble_common::model::{Id, user::UserMarker};

    #[test]
    fn search_patterns_escape_wildcards() {
        assert_eq!(contains_pattern("alice"), "%alice%");
        assert_eq!(contains_pattern("100%_\\"), "%100\\%\\_\\\\%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn ids_bind_as_signed_integers() {
        let ids: [Id<UserMarker>; 2] = [Id::from(42_u64), Id::from(u64::MAX)];

        assert_eq!(db_ids(&ids), vec![42, -1]);
    }
}
