use crate::server::{
    CoreError, Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use warble_common::model::{mention::Mention, post::MediaPath};
use warble_core::Engine;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_put(change_password)
        .typed_put(change_nickname)
        .typed_put(change_avatar)
        .typed_get(get_mentions)
        .typed_post(mark_mentions_seen)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/password", rejection(ServerError))]
struct PasswordPath();

#[derive(Deserialize)]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

async fn change_password(
    PasswordPath(): PasswordPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    engine
        .change_password(user.user_id(), &request.old_password, &request.new_password)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/nickname", rejection(ServerError))]
struct NicknamePath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
struct Nickname {
    nickname: Option<String>,
}

async fn change_nickname(
    NicknamePath(): NicknamePath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
    Json(Nickname { nickname }): Json<Nickname>,
) -> Result<Json<Nickname>> {
    let nickname = engine
        .change_nickname(user.user_id(), nickname)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(Nickname { nickname }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/avatar", rejection(ServerError))]
struct AvatarPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
struct Avatar {
    avatar: Option<MediaPath>,
}

async fn change_avatar(
    AvatarPath(): AvatarPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
    Json(Avatar { avatar }): Json<Avatar>,
) -> Result<Json<Avatar>> {
    let avatar = engine
        .change_avatar(user.user_id(), avatar)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(Avatar { avatar }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/mentions", rejection(ServerError))]
struct MentionsPath();

async fn get_mentions(
    MentionsPath(): MentionsPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Mention>>> {
    let mentions = engine
        .mentions(user.user_id())
        .await
        .map_err(CoreError::from)?;

    Ok(Json(mentions))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/mentions/seen", rejection(ServerError))]
struct MentionsSeenPath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct MarkedSeen {
    marked: u64,
}

async fn mark_mentions_seen(
    MentionsSeenPath(): MentionsSeenPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<Json<MarkedSeen>> {
    let marked = engine
        .set_seen(user.user_id())
        .await
        .map_err(CoreError::from)?;

    Ok(Json(MarkedSeen { marked }))
}
