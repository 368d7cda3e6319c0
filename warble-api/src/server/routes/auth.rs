use crate::server::{
    CoreError, Result, ServerError, ServerRouter,
    auth::BearerToken,
    json::Json,
    routes::users::AccountResponse,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use warble_common::model::{mention::Mention, user::Email};
use warble_core::{Engine, auth::Session};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_token)
        .typed_post(refresh_token)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct SessionResponse {
    token: String,
    account: AccountResponse,
    mentions: Vec<Mention>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token.as_token_str(),
            account: session.account.into(),
            mentions: session.mentions,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/token", rejection(ServerError))]
struct CreateTokenPath();

#[derive(Deserialize)]
struct LoginRequest {
    email: Email,
    password: String,
}

async fn create_token(
    CreateTokenPath(): CreateTokenPath,
    State(engine): State<Engine>,
    Json(LoginRequest { email, password }): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let session = engine
        .login(&email, &password)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(session.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/refresh", rejection(ServerError))]
struct RefreshTokenPath();

async fn refresh_token(
    RefreshTokenPath(): RefreshTokenPath,
    State(engine): State<Engine>,
    BearerToken(token): BearerToken,
) -> Result<Json<SessionResponse>> {
    let session = engine.refresh(&token).await.map_err(CoreError::from)?;

    Ok(Json(session.into()))
}
