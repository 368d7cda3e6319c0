use crate::server::{
    CoreError, Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
    query::Query,
    routes::{PageQuery, SearchQuery},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use warble_common::model::{
    Id,
    post::FeedItem,
    user::{Account, Email, Role, User, UserMarker, UserSlug},
};
use warble_core::{
    Engine,
    account::{AccountSpecifier, AccountView},
    users::RegisterAccount,
};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_get(search_users)
        .typed_get(get_user)
        .typed_get(get_user_posts)
        .typed_post(add_role)
        .typed_delete(remove_role)
}

/// What an account holder gets to see about their own account.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub user: User,
    pub email: Email,
    pub roles: BTreeSet<Role>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            user: account.user,
            email: account.email,
            roles: account.roles,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

#[derive(Deserialize)]
struct RegisterRequest {
    email: Email,
    slug: UserSlug,
    nickname: Option<String>,
    password: String,
}

async fn register(
    UsersPath(): UsersPath,
    State(engine): State<Engine>,
    Json(request): Json<RegisterRequest>,
) -> Result<Created<AccountResponse>> {
    let account = engine
        .register(RegisterAccount {
            email: request.email,
            slug: request.slug,
            nickname: request.nickname,
            password: request.password,
        })
        .await
        .map_err(CoreError::from)?;

    Ok(Created(account.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/search", rejection(ServerError))]
struct SearchUsersPath();

async fn search_users(
    SearchUsersPath(): SearchUsersPath,
    State(engine): State<Engine>,
    _: AuthenticatedUser,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> Result<Json<Vec<User>>> {
    let users = engine.search_users(&q).await.map_err(CoreError::from)?;

    Ok(Json(users))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{user}", rejection(ServerError))]
struct GetUserPath {
    user: String,
}

async fn get_user(
    GetUserPath { user }: GetUserPath,
    State(engine): State<Engine>,
    viewer: AuthenticatedUser,
) -> Result<Json<AccountView>> {
    let specifier: AccountSpecifier = user.parse()?;

    let view = engine
        .account_view(viewer.user_id(), &specifier)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(view))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{user}/posts", rejection(ServerError))]
struct GetUserPostsPath {
    user: Id<UserMarker>,
}

async fn get_user_posts(
    GetUserPostsPath { user }: GetUserPostsPath,
    State(engine): State<Engine>,
    _: AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<FeedItem>>> {
    let posts = engine
        .account_tweets(user, page.into())
        .await
        .map_err(CoreError::from)?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{user}/roles", rejection(ServerError))]
struct UserRolesPath {
    user: Id<UserMarker>,
}

#[derive(Deserialize)]
struct RoleRequest {
    role: Role,
}

async fn add_role(
    UserRolesPath { user }: UserRolesPath,
    State(engine): State<Engine>,
    actor: AuthenticatedUser,
    Json(RoleRequest { role }): Json<RoleRequest>,
) -> Result<StatusCode> {
    engine
        .add_role(&actor.0, user, &role)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{user}/roles/{role}", rejection(ServerError))]
struct UserRolePath {
    user: Id<UserMarker>,
    role: Role,
}

async fn remove_role(
    UserRolePath { user, role }: UserRolePath,
    State(engine): State<Engine>,
    actor: AuthenticatedUser,
) -> Result<StatusCode> {
    engine
        .remove_role(&actor.0, user, &role)
        .await
        .map_err(CoreError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
