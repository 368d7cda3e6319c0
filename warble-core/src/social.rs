//! Everything users do to posts: authoring, likes, reshares and comments.

use crate::{Engine, error::operation_error, store::MembershipChange};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use time::UtcDateTime;
use tracing::{debug, info};
use warble_common::{
    model::{
        Id,
        mention::Mention,
        post::{
            CommentMarker, CommentView, CreateComment, CreatePost, MediaEdit, MediaPath, Post,
            PostEdit, PostMarker,
        },
        user::{User, UserMarker},
    },
    scan::{query_hashtags, scan_content},
};

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewTweet {
    pub content: String,
    pub media: Option<MediaPath>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct TweetEdit {
    pub content: String,
    pub media: MediaEdit,
}

/// A post together with its author's profile.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct TweetView {
    pub post: Post,
    pub poster: User,
}

operation_error! {
    pub enum TweetError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("A post needs content or media")]
        EmptyContent => BadRequest,
    }
}

operation_error! {
    pub enum EditTweetError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("The post belongs to someone else")]
        NotYourPost => Forbidden,
        #[error("A post needs content or media")]
        EmptyContent => BadRequest,
    }
}

operation_error! {
    pub enum RemoveTweetError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("The post belongs to someone else")]
        NotYourPost => Forbidden,
    }
}

operation_error! {
    pub enum AddLikeError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("The post is already liked")]
        AlreadyLiked => Conflict,
    }
}

operation_error! {
    pub enum RemoveLikeError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("The post is not liked")]
        NotLiked => Conflict,
    }
}

operation_error! {
    pub enum AddShareError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("The post is already shared")]
        AlreadyShared => Conflict,
        #[error("Own posts cannot be shared")]
        SelfShare => Conflict,
    }
}

operation_error! {
    pub enum RemoveShareError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("The post is not shared")]
        NotShared => Conflict,
    }
}

operation_error! {
    pub enum AddCommentError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("A comment needs content")]
        EmptyContent => BadRequest,
    }
}

operation_error! {
    pub enum EditCommentError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("Comment not found")]
        CommentNotFound => NotFound,
        #[error("The comment belongs to someone else")]
        NotYourComment => Forbidden,
        #[error("A comment needs content")]
        EmptyContent => BadRequest,
    }
}

operation_error! {
    pub enum RemoveCommentError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("Comment not found")]
        CommentNotFound => NotFound,
        #[error("The comment belongs to someone else")]
        NotYourComment => Forbidden,
    }
}

operation_error! {
    pub enum GetTweetError {
        #[error("Post not found")]
        PostNotFound => NotFound,
        #[error("The author of the post no longer exists")]
        UserNotFound => NotFound,
    }
}

operation_error! {
    pub enum GetCommentsError {
        #[error("Post not found")]
        PostNotFound => NotFound,
    }
}

operation_error! {
    pub enum SearchTweetsError {}
}

impl Engine {
    pub async fn tweet(
        &self,
        author: Id<UserMarker>,
        tweet: NewTweet,
    ) -> Result<Post, TweetError> {
        let user = self
            .store()
            .fetch_user(author)
            .await?
            .ok_or(TweetError::UserNotFound)?;
        if tweet.content.trim().is_empty() && tweet.media.is_none() {
            return Err(TweetError::EmptyContent);
        }

        let scanned = scan_content(&tweet.content);
        let post = self
            .store()
            .create_post(&CreatePost {
                author,
                content: tweet.content,
                media: tweet.media,
                hashtags: scanned.hashtags,
                created_at: UtcDateTime::now(),
            })
            .await?;
        info!(post = %post.id, %author, "Post created");

        self.notify_mentions(&user, &post).await?;

        Ok(post)
    }

    pub async fn edit_tweet(
        &self,
        editor: Id<UserMarker>,
        post: Id<PostMarker>,
        edit: TweetEdit,
    ) -> Result<Post, EditTweetError> {
        let user = self
            .store()
            .fetch_user(editor)
            .await?
            .ok_or(EditTweetError::UserNotFound)?;
        let current = self
            .store()
            .fetch_post(post)
            .await?
            .ok_or(EditTweetError::PostNotFound)?;
        if current.author != editor {
            return Err(EditTweetError::NotYourPost);
        }
        if edit.content.trim().is_empty() && edit.media.apply(current.media).is_none() {
            return Err(EditTweetError::EmptyContent);
        }

        let scanned = scan_content(&edit.content);
        let updated = self
            .store()
            .update_post(
                post,
                &PostEdit {
                    content: edit.content,
                    hashtags: scanned.hashtags,
                    media: edit.media,
                },
            )
            .await?
            .ok_or(EditTweetError::PostNotFound)?;
        debug!(%post, "Post edited");

        self.notify_mentions(&user, &updated).await?;

        Ok(updated)
    }

    pub async fn remove_tweet(
        &self,
        remover: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<(), RemoveTweetError> {
        if self.store().fetch_user(remover).await?.is_none() {
            return Err(RemoveTweetError::UserNotFound);
        }
        let current = self
            .store()
            .fetch_post(post)
            .await?
            .ok_or(RemoveTweetError::PostNotFound)?;
        if current.author != remover {
            return Err(RemoveTweetError::NotYourPost);
        }

        if !self.store().delete_post(post).await? {
            return Err(RemoveTweetError::PostNotFound);
        }
        info!(%post, "Post removed");

        Ok(())
    }

    pub async fn like(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<(), AddLikeError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(AddLikeError::UserNotFound);
        }

        match self.store().add_like(post, user).await? {
            MembershipChange::Changed => Ok(()),
            MembershipChange::Unchanged => Err(AddLikeError::AlreadyLiked),
            MembershipChange::MissingPost => Err(AddLikeError::PostNotFound),
        }
    }

    pub async fn unlike(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<(), RemoveLikeError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(RemoveLikeError::UserNotFound);
        }

        match self.store().remove_like(post, user).await? {
            MembershipChange::Changed => Ok(()),
            MembershipChange::Unchanged => Err(RemoveLikeError::NotLiked),
            MembershipChange::MissingPost => Err(RemoveLikeError::PostNotFound),
        }
    }

    pub async fn share(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<(), AddShareError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(AddShareError::UserNotFound);
        }
        let current = self
            .store()
            .fetch_post(post)
            .await?
            .ok_or(AddShareError::PostNotFound)?;
        if current.author == user {
            return Err(AddShareError::SelfShare);
        }

        match self.store().add_share(post, user).await? {
            MembershipChange::Changed => Ok(()),
            MembershipChange::Unchanged => Err(AddShareError::AlreadyShared),
            MembershipChange::MissingPost => Err(AddShareError::PostNotFound),
        }
    }

    pub async fn unshare(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<(), RemoveShareError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(RemoveShareError::UserNotFound);
        }

        match self.store().remove_share(post, user).await? {
            MembershipChange::Changed => Ok(()),
            MembershipChange::Unchanged => Err(RemoveShareError::NotShared),
            MembershipChange::MissingPost => Err(RemoveShareError::PostNotFound),
        }
    }

    pub async fn add_comment(
        &self,
        author: Id<UserMarker>,
        post: Id<PostMarker>,
        content: String,
    ) -> Result<CommentView, AddCommentError> {
        let user = self
            .store()
            .fetch_user(author)
            .await?
            .ok_or(AddCommentError::UserNotFound)?;
        if content.trim().is_empty() {
            return Err(AddCommentError::EmptyContent);
        }

        let comment = self
            .store()
            .add_comment(
                post,
                &CreateComment {
                    author,
                    content,
                    created_at: UtcDateTime::now(),
                },
            )
            .await?
            .ok_or(AddCommentError::PostNotFound)?;

        Ok(CommentView {
            comment,
            poster: Some(user),
        })
    }

    pub async fn edit_comment(
        &self,
        editor: Id<UserMarker>,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        content: &str,
    ) -> Result<(), EditCommentError> {
        if self.store().fetch_user(editor).await?.is_none() {
            return Err(EditCommentError::UserNotFound);
        }
        let current = self
            .store()
            .fetch_post(post)
            .await?
            .ok_or(EditCommentError::PostNotFound)?;
        let existing = current
            .comment(comment)
            .ok_or(EditCommentError::CommentNotFound)?;
        if existing.author != editor {
            return Err(EditCommentError::NotYourComment);
        }
        if content.trim().is_empty() {
            return Err(EditCommentError::EmptyContent);
        }

        if !self.store().update_comment(post, comment, content).await? {
            return Err(EditCommentError::CommentNotFound);
        }

        Ok(())
    }

    pub async fn remove_comment(
        &self,
        remover: Id<UserMarker>,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> Result<(), RemoveCommentError> {
        if self.store().fetch_user(remover).await?.is_none() {
            return Err(RemoveCommentError::UserNotFound);
        }
        let current = self
            .store()
            .fetch_post(post)
            .await?
            .ok_or(RemoveCommentError::PostNotFound)?;
        let existing = current
            .comment(comment)
            .ok_or(RemoveCommentError::CommentNotFound)?;
        if existing.author != remover {
            return Err(RemoveCommentError::NotYourComment);
        }

        if !self.store().delete_comment(post, comment).await? {
            return Err(RemoveCommentError::CommentNotFound);
        }

        Ok(())
    }

    pub async fn get_tweet(&self, post: Id<PostMarker>) -> Result<TweetView, GetTweetError> {
        let post = self
            .store()
            .fetch_post(post)
            .await?
            .ok_or(GetTweetError::PostNotFound)?;
        let poster = self
            .store()
            .fetch_user(post.author)
            .await?
            .ok_or(GetTweetError::UserNotFound)?;

        Ok(TweetView { post, poster })
    }

    /// Newest first. Comments whose author is gone keep `poster` empty.
    pub async fn get_comments(
        &self,
        post: Id<PostMarker>,
    ) -> Result<Vec<CommentView>, GetCommentsError> {
        let mut comments = self
            .store()
            .fetch_post(post)
            .await?
            .ok_or(GetCommentsError::PostNotFound)?
            .comments;
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let authors = self.users_by_id(comments.iter().map(|comment| comment.author)).await?;

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                poster: authors.get(&comment.author).cloned(),
                comment,
            })
            .collect())
    }

    /// Posts tagged with any hashtag named in `query`.
    pub async fn search_tweets(&self, query: &str) -> Result<Vec<TweetView>, SearchTweetsError> {
        let posts = self.posts().by_hashtags(&query_hashtags(query)).await?;
        let authors = self.users_by_id(posts.iter().map(|post| post.author)).await?;

        Ok(posts
            .into_iter()
            .filter_map(|post| {
                let poster = authors.get(&post.author)?.clone();
                Some(TweetView { post, poster })
            })
            .collect())
    }

    async fn users_by_id(
        &self,
        ids: impl Iterator<Item = Id<UserMarker>>,
    ) -> crate::store::Result<HashMap<Id<UserMarker>, User>> {
        let ids: BTreeSet<Id<UserMarker>> = ids.collect();
        let ids: Vec<Id<UserMarker>> = ids.into_iter().collect();

        Ok(self
            .store()
            .fetch_users(&ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect())
    }

    /// Leaves a mention on every user named in the post, once per post.
    ///
    /// Unknown handles and the author mentioning themselves are skipped. All
    /// writes have completed when this returns.
    async fn notify_mentions(&self, author: &User, post: &Post) -> crate::store::Result<usize> {
        let mut notified = 0;

        for slug in scan_content(&post.content).mentions {
            let Some(mentioned) = self.store().fetch_user_by_slug(&slug).await? else {
                continue;
            };

            let mention = Mention::new(author.clone(), post.id, UtcDateTime::now());
            if self.store().add_mention(mentioned.id, &mention).await? {
                notified += 1;
            }
        }
        if notified > 0 {
            debug!(post = %post.id, notified, "Mentions delivered");
        }

        Ok(notified)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Classify, ErrorKind},
        social::{
            AddCommentError, AddLikeError, AddShareError, EditCommentError, EditTweetError,
            NewTweet, RemoveCommentError, RemoveLikeError, RemoveShareError, RemoveTweetError,
            TweetEdit,
        },
        testing::{engine, register, unknown_user},
    };
    use time::{Duration, UtcDateTime};
    use warble_common::model::{
        Id,
        post::{CreateComment, MediaEdit, MediaPath},
    };

    fn text(content: &str) -> NewTweet {
        NewTweet {
            content: content.to_owned(),
            media: None,
        }
    }

    #[tokio::test]
    async fn liking_twice_is_rejected() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;
        let post = engine.tweet(alice.id, text("likeable")).await.unwrap();

        engine.like(bob.id, post.id).await.unwrap();
        let error = engine.like(bob.id, post.id).await.unwrap_err();
        assert!(matches!(error, AddLikeError::AlreadyLiked));
        assert_eq!(error.kind(), ErrorKind::Conflict);

        let post = engine.get_tweet(post.id).await.unwrap().post;
        assert_eq!(post.likes.len(), 1);
        assert!(post.is_liked_by(bob.id));

        engine.unlike(bob.id, post.id).await.unwrap();
        assert!(matches!(
            engine.unlike(bob.id, post.id).await,
            Err(RemoveLikeError::NotLiked)
        ));
        assert!(matches!(
            engine.like(bob.id, Id::from(1_u64)).await,
            Err(AddLikeError::PostNotFound)
        ));
        assert!(matches!(
            engine.like(unknown_user(), post.id).await,
            Err(AddLikeError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn self_shares_never_mutate() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let post = engine.tweet(alice.id, text("mine")).await.unwrap();

        for _ in 0..2 {
            assert!(matches!(
                engine.share(alice.id, post.id).await,
                Err(AddShareError::SelfShare)
            ));
        }
        assert!(engine.get_tweet(post.id).await.unwrap().post.shares.is_empty());
    }

    #[tokio::test]
    async fn share_lifecycle() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;
        let post = engine.tweet(alice.id, text("shareable")).await.unwrap();

        engine.share(bob.id, post.id).await.unwrap();
        assert!(matches!(
            engine.share(bob.id, post.id).await,
            Err(AddShareError::AlreadyShared)
        ));
        engine.unshare(bob.id, post.id).await.unwrap();
        assert!(matches!(
            engine.unshare(bob.id, post.id).await,
            Err(RemoveShareError::NotShared)
        ));
        assert!(engine.get_tweet(post.id).await.unwrap().post.shares.is_empty());
    }

    #[tokio::test]
    async fn only_authors_edit_and_remove_posts() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;
        let post = engine
            .tweet(
                alice.id,
                NewTweet {
                    content: "#first draft".to_owned(),
                    media: Some(MediaPath::new("uploads/a.png".to_owned()).unwrap()),
                },
            )
            .await
            .unwrap();

        let edit = TweetEdit {
            content: "#second take".to_owned(),
            media: MediaEdit::Remove,
        };
        let error = engine
            .edit_tweet(bob.id, post.id, edit.clone())
            .await
            .unwrap_err();
        assert!(matches!(error, EditTweetError::NotYourPost));
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        let edited = engine.edit_tweet(alice.id, post.id, edit).await.unwrap();
        assert_eq!(edited.content, "#second take");
        assert_eq!(edited.media, None);
        let tags: Vec<_> = edited.hashtags.iter().map(|tag| tag.get()).collect();
        assert_eq!(tags, ["second"]);

        assert!(matches!(
            engine.remove_tweet(bob.id, post.id).await,
            Err(RemoveTweetError::NotYourPost)
        ));
        engine.remove_tweet(alice.id, post.id).await.unwrap();
        assert!(matches!(
            engine.remove_tweet(alice.id, post.id).await,
            Err(RemoveTweetError::PostNotFound)
        ));
    }

    #[tokio::test]
    async fn empty_posts_are_rejected() {
        let engine = engine();
        let alice = register(&engine, "alice").await;

        assert!(engine.tweet(alice.id, text("  ")).await.is_err());

        let post = engine
            .tweet(
                alice.id,
                NewTweet {
                    content: String::new(),
                    media: Some(MediaPath::new("uploads/only.png".to_owned()).unwrap()),
                },
            )
            .await
            .unwrap();
        let error = engine
            .edit_tweet(
                alice.id,
                post.id,
                TweetEdit {
                    content: String::new(),
                    media: MediaEdit::Remove,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, EditTweetError::EmptyContent));
    }

    #[tokio::test]
    async fn comment_ownership() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;
        let post = engine.tweet(alice.id, text("discuss")).await.unwrap();

        let comment = engine
            .add_comment(bob.id, post.id, "first".to_owned())
            .await
            .unwrap();
        assert_eq!(comment.poster.as_ref().map(|user| user.id), Some(bob.id));
        let comment = comment.comment;

        assert!(matches!(
            engine.edit_comment(alice.id, post.id, comment.id, "hijacked").await,
            Err(EditCommentError::NotYourComment)
        ));
        assert!(matches!(
            engine.remove_comment(alice.id, post.id, comment.id).await,
            Err(RemoveCommentError::NotYourComment)
        ));
        let comments = engine.get_comments(post.id).await.unwrap();
        assert_eq!(comments[0].comment.content, "first");

        engine
            .edit_comment(bob.id, post.id, comment.id, "second")
            .await
            .unwrap();
        let comments = engine.get_comments(post.id).await.unwrap();
        assert_eq!(comments[0].comment.content, "second");

        engine
            .remove_comment(bob.id, post.id, comment.id)
            .await
            .unwrap();
        assert!(engine.get_comments(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn comment_existence_is_checked_before_ownership() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let post = engine.tweet(alice.id, text("quiet")).await.unwrap();

        assert!(matches!(
            engine.edit_comment(alice.id, post.id, Id::from(5_u64), "x").await,
            Err(EditCommentError::CommentNotFound)
        ));
        assert!(matches!(
            engine.remove_comment(alice.id, Id::from(5_u64), Id::from(5_u64)).await,
            Err(RemoveCommentError::PostNotFound)
        ));
        assert!(matches!(
            engine.add_comment(alice.id, Id::from(5_u64), "x".to_owned()).await,
            Err(AddCommentError::PostNotFound)
        ));
        assert!(matches!(
            engine.add_comment(alice.id, post.id, " ".to_owned()).await,
            Err(AddCommentError::EmptyContent)
        ));
    }

    #[tokio::test]
    async fn comments_are_listed_newest_first() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let post = engine.tweet(alice.id, text("thread")).await.unwrap();

        let now = UtcDateTime::now();
        for (content, age) in [("old", 3), ("new", 1), ("middle", 2)] {
            engine
                .store()
                .add_comment(
                    post.id,
                    &CreateComment {
                        author: alice.id,
                        content: content.to_owned(),
                        created_at: now - Duration::minutes(age),
                    },
                )
                .await
                .unwrap();
        }

        let contents: Vec<_> = engine
            .get_comments(post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|view| view.comment.content)
            .collect();
        assert_eq!(contents, ["new", "middle", "old"]);
    }

    #[tokio::test]
    async fn mentions_are_delivered_once_per_post() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        let post = engine
            .tweet(alice.id, text("hi @bob and @bob, also @nobody"))
            .await
            .unwrap();

        let mentions = engine.store().fetch_mentions(bob.id).await.unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].post, post.id);
        assert_eq!(mentions[0].mentioner.id, alice.id);
        assert!(!mentions[0].seen);
        assert!(engine.store().fetch_mentions(alice.id).await.unwrap().is_empty());

        engine
            .edit_tweet(
                alice.id,
                post.id,
                TweetEdit {
                    content: "still @bob".to_owned(),
                    media: MediaEdit::Keep,
                },
            )
            .await
            .unwrap();
        assert_eq!(engine.store().fetch_mentions(bob.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authors_can_mention_themselves() {
        let engine = engine();
        let alice = register(&engine, "alice").await;

        let post = engine.tweet(alice.id, text("note to @alice")).await.unwrap();

        let mentions = engine.store().fetch_mentions(alice.id).await.unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].post, post.id);
        assert_eq!(mentions[0].mentioner.id, alice.id);
    }

    #[tokio::test]
    async fn mentions_match_slugs_exactly() {
        let engine = engine();
        let alice = register(&engine, "alice").await;
        let bob = register(&engine, "bob").await;

        engine.tweet(alice.id, text("hey @Bob")).await.unwrap();
        assert!(engine.store().fetch_mentions(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_finds_hashtags_only() {
        let engine = engine();
        let alice = register(&engine, "alice").await;

        let p1 = engine.tweet(alice.id, text("#hello world")).await.unwrap();
        engine.tweet(alice.id, text("#world")).await.unwrap();

        let results = engine.search_tweets("hello").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].post.id, p1.id);
        assert_eq!(results[0].poster.id, alice.id);
    }
}
