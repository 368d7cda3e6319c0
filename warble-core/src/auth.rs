//! Sessions: logging in with a password, and resolving bearer tokens back
//! into an identity.

use crate::{
    Engine,
    error::{StoreError, operation_error},
};
use std::collections::BTreeSet;
use time::UtcDateTime;
use tracing::{debug, info};
use warble_common::model::{
    Id,
    auth::{AuthToken, AuthTokenHashError, Authentication},
    mention::Mention,
    user::{Account, Email, Role, UserMarker},
};

/// Who is making a request, as established by their token.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Identity {
    pub user: Id<UserMarker>,
    pub roles: BTreeSet<Role>,
}

/// A freshly issued token. The token itself is only ever handed out here.
#[derive(Clone, Debug)]
pub struct Session {
    pub token: AuthToken,
    pub account: Account,
    pub mentions: Vec<Mention>,
}

operation_error! {
    pub enum LoginError {
        #[error("Email or password is wrong")]
        InvalidCredentials => Unauthorized,
        #[error("{0}")]
        TokenHash(AuthTokenHashError) => Internal,
    }
}

operation_error! {
    pub enum AuthenticateError {
        #[error("The token is not valid")]
        InvalidToken => Unauthorized,
        #[error("The token has expired")]
        Expired => Unauthorized,
        #[error("The token's user no longer exists")]
        UserNotFound => Unauthorized,
        #[error("{0}")]
        TokenHash(AuthTokenHashError) => Internal,
    }
}

impl Engine {
    pub async fn login(&self, email: &Email, password: &str) -> Result<Session, LoginError> {
        let account = self
            .store()
            .fetch_account_by_email(email)
            .await?
            .ok_or(LoginError::InvalidCredentials)?;
        if !account.password_hash.verify(password) {
            debug!(user = %account.id(), "Login with wrong password");
            return Err(LoginError::InvalidCredentials);
        }

        let token = self.issue_token::<LoginError>(account.id()).await?;
        let mentions = self.store().fetch_mentions(account.id()).await?;
        info!(user = %account.id(), "Logged in");

        Ok(Session {
            token,
            account,
            mentions,
        })
    }

    /// Swaps a valid token for a new one. The old token stops working.
    pub async fn refresh(&self, token: &AuthToken) -> Result<Session, AuthenticateError> {
        let (authentication, account) = self.resolve_token(token).await?;

        let new_token = self
            .issue_token::<AuthenticateError>(account.id())
            .await?;
        self.store()
            .delete_authentication(&authentication.token_hash)
            .await?;
        let mentions = self.store().fetch_mentions(account.id()).await?;
        debug!(user = %account.id(), "Token refreshed");

        Ok(Session {
            token: new_token,
            account,
            mentions,
        })
    }

    pub async fn authenticate(&self, token: &AuthToken) -> Result<Identity, AuthenticateError> {
        let (_, account) = self.resolve_token(token).await?;

        Ok(Identity {
            user: account.id(),
            roles: account.roles,
        })
    }

    async fn resolve_token(
        &self,
        token: &AuthToken,
    ) -> Result<(Authentication, Account), AuthenticateError> {
        let token_hash = token.hash()?;
        let authentication = self
            .store()
            .fetch_authentication(&token_hash)
            .await?
            .ok_or(AuthenticateError::InvalidToken)?;

        if authentication.user != token.user_id {
            return Err(AuthenticateError::InvalidToken);
        }
        if authentication.is_expired_at(UtcDateTime::now()) {
            self.store().delete_authentication(&token_hash).await?;
            return Err(AuthenticateError::Expired);
        }

        let account = self
            .store()
            .fetch_account(authentication.user)
            .await?
            .ok_or(AuthenticateError::UserNotFound)?;

        Ok((authentication, account))
    }

    async fn issue_token<E>(&self, user: Id<UserMarker>) -> Result<AuthToken, E>
    where
        E: From<StoreError> + From<AuthTokenHashError>,
    {
        let token = AuthToken::generate_random(user);

        self.store()
            .create_authentication(&Authentication {
                user,
                token_hash: token.hash()?,
                created_at: UtcDateTime::now(),
                expires_after: self.config().token_lifetime,
            })
            .await?;

        Ok(token)
    }
}

impl From<AuthTokenHashError> for LoginError {
    fn from(error: AuthTokenHashError) -> Self {
        LoginError::TokenHash(error)
    }
}

impl From<AuthTokenHashError> for AuthenticateError {
    fn from(error: AuthTokenHashError) -> Self {
        AuthenticateError::TokenHash(error)
    }
}
