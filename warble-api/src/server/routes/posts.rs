use crate::server::{
    CoreError, Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
    query::Query,
    routes::SearchQuery,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use warble_common::model::{
    Id,
    post::{CommentMarker, CommentView, MediaEdit, MediaPath, Post, PostMarker},
};
use warble_core::{
    Engine,
    social::{NewTweet, TweetEdit, TweetView},
};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_post)
        .typed_get(search_posts)
        .typed_get(get_post)
        .typed_patch(edit_post)
        .typed_delete(remove_post)
        .typed_put(like_post)
        .typed_delete(unlike_post)
        .typed_put(share_post)
        .typed_delete(unshare_post)
        .typed_get(get_comments)
        .typed_post(add_comment)
        .typed_patch(edit_comment)
        .typed_delete(remove_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(Deserialize)]
struct NewPostRequest {
    #[serde(default)]
    content: String,
    media: Option<MediaPath>,
}

async fn create_post(
    PostsPath(): PostsPath,
    State(engine): State<Engine>,
    author: AuthenticatedUser,
    Json(NewPostRequest { content, media }): Json<NewPostRequest>,
) -> Result<Created<Post>> {
    let post = engine
        .tweet(author.user_id(), NewTweet { content, media })
        .await
        .map_err(CoreError::from)?;

    Ok(Created(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/search", rejection(ServerError))]
struct SearchPostsPath();

async fn search_posts(
    SearchPostsPath(): SearchPostsPath,
    State(engine): State<Engine>,
    _: AuthenticatedUser,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> Result<Json<Vec<TweetView>>> {
    let posts = engine.search_tweets(&q).await.map_err(CoreError::from)?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}", rejection(ServerError))]
struct PostPath {
    post: Id<PostMarker>,
}

async fn get_post(
    PostPath { post }: PostPath,
    State(engine): State<Engine>,
    _: AuthenticatedUser,
) -> Result<Json<TweetView>> {
    let post = engine.get_tweet(post).await.map_err(CoreError::from)?;

    Ok(Json(post))
}

/// `media` replaces the attachment, `remove_media` drops it; neither keeps it.
#[derive(Deserialize)]
struct EditPostRequest {
    content: String,
    media: Option<MediaPath>,
    #[serde(default)]
    remove_media: bool,
}

async fn edit_post(
    PostPath { post }: PostPath,
    State(engine): State<Engine>,
    editor: AuthenticatedUser,
    Json(request): Json<EditPostRequest>,
) -> Result<Json<Post>> {
    let edit = TweetEdit {
        content: request.content,
        media: MediaEdit::from_request(request.media, request.remove_media),
    };

    let post = engine
        .edit_tweet(editor.user_id(), post, edit)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(post))
}

async fn remove_post(
    PostPath { post }: PostPath,
    State(engine): State<Engine>,
    remover: AuthenticatedUser,
) -> Result<StatusCode> {
    engine
        .remove_tweet(remover.user_id(), post)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/likes", rejection(ServerError))]
struct LikesPath {
    post: Id<PostMarker>,
}

async fn like_post(
    LikesPath { post }: LikesPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    engine
        .like(user.user_id(), post)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn unlike_post(
    LikesPath { post }: LikesPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    engine
        .unlike(user.user_id(), post)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/shares", rejection(ServerError))]
struct SharesPath {
    post: Id<PostMarker>,
}

async fn share_post(
    SharesPath { post }: SharesPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    engine
        .share(user.user_id(), post)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn unshare_post(
    SharesPath { post }: SharesPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    engine
        .unshare(user.user_id(), post)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/comments", rejection(ServerError))]
struct CommentsPath {
    post: Id<PostMarker>,
}

#[derive(Deserialize)]
struct CommentRequest {
    content: String,
}

async fn get_comments(
    CommentsPath { post }: CommentsPath,
    State(engine): State<Engine>,
    _: AuthenticatedUser,
) -> Result<Json<Vec<CommentView>>> {
    let comments = engine.get_comments(post).await.map_err(CoreError::from)?;

    Ok(Json(comments))
}

async fn add_comment(
    CommentsPath { post }: CommentsPath,
    State(engine): State<Engine>,
    author: AuthenticatedUser,
    Json(CommentRequest { content }): Json<CommentRequest>,
) -> Result<Created<CommentView>> {
    let comment = engine
        .add_comment(author.user_id(), post, content)
        .await
        .map_err(CoreError::from)?;

    Ok(Created(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/comments/{comment}", rejection(ServerError))]
struct CommentPath {
    post: Id<PostMarker>,
    comment: Id<CommentMarker>,
}

async fn edit_comment(
    CommentPath { post, comment }: CommentPath,
    State(engine): State<Engine>,
    editor: AuthenticatedUser,
    Json(CommentRequest { content }): Json<CommentRequest>,
) -> Result<StatusCode> {
    engine
        .edit_comment(editor.user_id(), post, comment, &content)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn remove_comment(
    CommentPath { post, comment }: CommentPath,
    State(engine): State<Engine>,
    remover: AuthenticatedUser,
) -> Result<StatusCode> {
    engine
        .remove_comment(remover.user_id(), post, comment)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
