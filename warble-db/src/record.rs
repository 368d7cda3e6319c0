use sqlx::FromRow;
use std::collections::BTreeSet;
use time::{Duration, PrimitiveDateTime, UtcDateTime};
use warble_common::model::{
    Id, ModelValidationError,
    auth::{Authentication, PasswordHash},
    friendship::Friendship,
    mention::Mention,
    post::{Comment, Hashtag, MediaPath, Post, PostStats},
    user::{Account, Email, Role, User, UserSlug},
};

/// `TIMESTAMP` columns hold UTC without an offset.
pub(crate) fn timestamp(at: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(at.date(), at.time())
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub slug: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AccountRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct MentionRecord {
    #[sqlx(flatten)]
    pub mentioner: UserRecord,
    pub post_snowflake: i64,
    pub mentioned_at: PrimitiveDateTime,
    pub seen: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FriendshipRecord {
    pub friendship_snowflake: i64,
    pub requester_snowflake: i64,
    pub recipient_snowflake: i64,
    pub status: String,
    pub created_at: PrimitiveDateTime,
}

/// A row of the `posts.full_posts` view. Comments are loaded separately.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub content: String,
    pub media: Option<String>,
    pub hashtags: Vec<String>,
    pub created_at: PrimitiveDateTime,
    pub likes: Vec<i64>,
    pub shares: Vec<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub content: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostStatsRecord {
    pub tweet_count: i64,
    pub likes_count: i64,
    pub shares_count: i64,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.user_snowflake),
            slug: UserSlug::new(value.slug)?,
            nickname: value.nickname,
            avatar: value.avatar.map(MediaPath::new).transpose()?,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<AccountRecord> for Account {
    type Error = ModelValidationError;

    fn try_from(value: AccountRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user.try_into()?,
            email: Email::new(value.email)?,
            password_hash: PasswordHash::from_phc(value.password_hash)?,
            roles: value
                .roles
                .into_iter()
                .map(Role::new)
                .collect::<Result<BTreeSet<_>, _>>()?,
        })
    }
}

impl TryFrom<MentionRecord> for Mention {
    type Error = ModelValidationError;

    fn try_from(value: MentionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            mentioner: value.mentioner.try_into()?,
            post: Id::from_db(value.post_snowflake),
            mentioned_at: value.mentioned_at.as_utc(),
            seen: value.seen,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_db(value.user_snowflake),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

impl TryFrom<FriendshipRecord> for Friendship {
    type Error = ModelValidationError;

    fn try_from(value: FriendshipRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.friendship_snowflake),
            requester: Id::from_db(value.requester_snowflake),
            recipient: Id::from_db(value.recipient_snowflake),
            status: value.status.parse()?,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.comment_snowflake),
            author: Id::from_db(value.user_snowflake),
            content: value.content,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl PostRecord {
    pub fn into_post(self, comments: Vec<Comment>) -> Result<Post, ModelValidationError> {
        Ok(Post {
            id: Id::from_db(self.post_snowflake),
            author: Id::from_db(self.user_snowflake),
            content: self.content,
            media: self.media.map(MediaPath::new).transpose()?,
            created_at: self.created_at.as_utc(),
            likes: self.likes.into_iter().map(Id::from_db).collect(),
            shares: self.shares.into_iter().map(Id::from_db).collect(),
            comments,
            hashtags: self
                .hashtags
                .iter()
                .map(|tag| Hashtag::new(tag))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl From<PostStatsRecord> for PostStats {
    fn from(value: PostStatsRecord) -> Self {
        Self {
            tweet_count: value.tweet_count.cast_unsigned(),
            likes_count: value.likes_count.cast_unsigned(),
            shares_count: value.shares_count.cast_unsigned(),
        }
    }
}
