use crate::server::{CoreError, ServerError};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use warble_common::model::{Id, auth::AuthToken, user::UserMarker};
use warble_core::{Engine, auth::Identity};

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The decoded bearer token of a request. Nothing has been checked against the store yet.
#[derive(Clone, Debug)]
pub struct BearerToken(pub AuthToken);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        Ok(Self(token))
    }
}

/// A request whose bearer token belongs to a live session.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser(pub Identity);

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.0.user
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Engine: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        let identity = Engine::from_ref(state)
            .authenticate(&token)
            .await
            .map_err(CoreError::from)?;

        Ok(Self(identity))
    }
}
