use crate::server::{
    CoreError, Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use warble_common::model::{
    Id,
    friendship::{Friendship, FriendshipMarker},
    user::UserMarker,
};
use warble_core::{Engine, account::FriendEntry, friendships::FriendshipAction};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_friends)
        .typed_get(get_friendships)
        .typed_post(send_friend_request)
        .typed_post(act_on_friendship)
        .typed_delete(unfriend)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/friends", rejection(ServerError))]
struct FriendsPath();

async fn get_friends(
    FriendsPath(): FriendsPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<FriendEntry>>> {
    let friends = engine
        .friends(user.user_id())
        .await
        .map_err(CoreError::from)?;

    Ok(Json(friends))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/friendships", rejection(ServerError))]
struct FriendshipsPath();

async fn get_friendships(
    FriendshipsPath(): FriendshipsPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<FriendEntry>>> {
    let friendships = engine
        .friendships(user.user_id())
        .await
        .map_err(CoreError::from)?;

    Ok(Json(friendships))
}

#[derive(Deserialize)]
struct FriendRequest {
    recipient: Id<UserMarker>,
}

async fn send_friend_request(
    FriendshipsPath(): FriendshipsPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
    Json(FriendRequest { recipient }): Json<FriendRequest>,
) -> Result<Created<Friendship>> {
    let friendship = engine
        .send_friend_request(user.user_id(), recipient)
        .await
        .map_err(CoreError::from)?;

    Ok(Created(friendship))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/friendships/{friendship}/{action}", rejection(ServerError))]
struct FriendshipActionPath {
    friendship: Id<FriendshipMarker>,
    action: FriendshipAction,
}

/// Replies with the updated friendship, or `204` if the action removed it.
async fn act_on_friendship(
    FriendshipActionPath { friendship, action }: FriendshipActionPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let friendship = engine
        .apply_friendship_action(user.user_id(), friendship, action)
        .await
        .map_err(CoreError::from)?;

    Ok(match friendship {
        Some(friendship) => Json(friendship).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/friendships/{friendship}", rejection(ServerError))]
struct FriendshipPath {
    friendship: Id<FriendshipMarker>,
}

async fn unfriend(
    FriendshipPath { friendship }: FriendshipPath,
    State(engine): State<Engine>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    engine
        .unfriend(user.user_id(), friendship)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
