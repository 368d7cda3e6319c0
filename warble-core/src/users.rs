//! Account lifecycle and profile settings.

use crate::{
    Engine,
    auth::Identity,
    error::{Constraint, StoreError, operation_error},
    policy::{AccessDenied, Policy},
};
use time::UtcDateTime;
use tracing::info;
use warble_common::model::{
    Id,
    auth::{PasswordError, PasswordHash},
    mention::Mention,
    post::MediaPath,
    user::{Account, CreateAccount, Email, Role, User, UserMarker, UserSlug, normalize_nickname},
};

pub const USER_SEARCH_LIMIT: usize = 50;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct RegisterAccount {
    pub email: Email,
    pub slug: UserSlug,
    pub nickname: Option<String>,
    pub password: String,
}

operation_error! {
    pub enum RegisterError {
        #[error("The email address is already registered")]
        EmailTaken => Conflict,
        #[error("The slug is already taken")]
        SlugTaken => Conflict,
        #[error("{0}")]
        Password(PasswordError) => BadRequest,
    }
}

operation_error! {
    pub enum ChangePasswordError {
        #[error("User not found")]
        UserNotFound => NotFound,
        #[error("The old password is wrong")]
        InvalidOldPassword => BadRequest,
        #[error("{0}")]
        Password(PasswordError) => BadRequest,
    }
}

operation_error! {
    pub enum UserError {
        #[error("User not found")]
        UserNotFound => NotFound,
    }
}

operation_error! {
    pub enum ChangeRoleError {
        #[error("{0}")]
        AccessDenied(AccessDenied) => Forbidden,
        #[error("User not found")]
        UserNotFound => NotFound,
    }
}

operation_error! {
    pub enum SearchUsersError {}
}

impl From<PasswordError> for RegisterError {
    fn from(error: PasswordError) -> Self {
        match error {
            PasswordError::Hash(_) => RegisterError::Store(StoreError::backend(error)),
            PasswordError::TooShort => RegisterError::Password(error),
        }
    }
}

impl From<PasswordError> for ChangePasswordError {
    fn from(error: PasswordError) -> Self {
        match error {
            PasswordError::Hash(_) => ChangePasswordError::Store(StoreError::backend(error)),
            PasswordError::TooShort => ChangePasswordError::Password(error),
        }
    }
}

impl Engine {
    pub async fn register(&self, request: RegisterAccount) -> Result<Account, RegisterError> {
        let password_hash = PasswordHash::create(&request.password)?;

        let account = self
            .store()
            .create_account(&CreateAccount {
                email: request.email,
                slug: request.slug,
                nickname: normalize_nickname(request.nickname),
                password_hash,
                created_at: UtcDateTime::now(),
            })
            .await
            .map_err(|error| match error {
                StoreError::Conflict(Constraint::UserEmail) => RegisterError::EmailTaken,
                StoreError::Conflict(Constraint::UserSlug) => RegisterError::SlugTaken,
                error => error.into(),
            })?;
        info!(user = %account.id(), slug = %account.user.slug, "Account registered");

        Ok(account)
    }

    pub async fn change_password(
        &self,
        user: Id<UserMarker>,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ChangePasswordError> {
        let account = self
            .store()
            .fetch_account(user)
            .await?
            .ok_or(ChangePasswordError::UserNotFound)?;
        if !account.password_hash.verify(old_password) {
            return Err(ChangePasswordError::InvalidOldPassword);
        }

        let hash = PasswordHash::create(new_password)?;
        if !self.store().set_password(user, &hash).await? {
            return Err(ChangePasswordError::UserNotFound);
        }
        info!(%user, "Password changed");

        Ok(())
    }

    /// Grants `role` to `user`. Only admins may do this.
    pub async fn add_role(
        &self,
        actor: &Identity,
        user: Id<UserMarker>,
        role: &Role,
    ) -> Result<(), ChangeRoleError> {
        Policy::admin()
            .check(actor)
            .map_err(ChangeRoleError::AccessDenied)?;

        if !self.store().add_role(user, role).await? {
            return Err(ChangeRoleError::UserNotFound);
        }
        info!(%user, role = %role, by = %actor.user, "Role granted");

        Ok(())
    }

    /// Revokes `role` from `user`. Only admins may do this.
    pub async fn remove_role(
        &self,
        actor: &Identity,
        user: Id<UserMarker>,
        role: &Role,
    ) -> Result<(), ChangeRoleError> {
        Policy::admin()
            .check(actor)
            .map_err(ChangeRoleError::AccessDenied)?;

        if !self.store().remove_role(user, role).await? {
            return Err(ChangeRoleError::UserNotFound);
        }
        info!(%user, role = %role, by = %actor.user, "Role revoked");

        Ok(())
    }

    pub async fn change_avatar(
        &self,
        user: Id<UserMarker>,
        avatar: Option<MediaPath>,
    ) -> Result<Option<MediaPath>, UserError> {
        if !self.store().set_avatar(user, avatar.as_ref()).await? {
            return Err(UserError::UserNotFound);
        }

        Ok(avatar)
    }

    /// Blank nicknames clear the nickname.
    pub async fn change_nickname(
        &self,
        user: Id<UserMarker>,
        nickname: Option<String>,
    ) -> Result<Option<String>, UserError> {
        let nickname = normalize_nickname(nickname);
        if !self.store().set_nickname(user, nickname.as_deref()).await? {
            return Err(UserError::UserNotFound);
        }

        Ok(nickname)
    }

    /// Case-insensitive substring search on nickname and email.
    pub async fn search_users(&self, query: &str) -> Result<Vec<User>, SearchUsersError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.store().search_users(query, USER_SEARCH_LIMIT).await?)
    }

    /// Newest first.
    pub async fn mentions(&self, user: Id<UserMarker>) -> Result<Vec<Mention>, UserError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(UserError::UserNotFound);
        }

        Ok(self.store().fetch_mentions(user).await?)
    }

    /// Marks every mention of `user` as seen and returns how many were unseen.
    pub async fn set_seen(&self, user: Id<UserMarker>) -> Result<u64, UserError> {
        if self.store().fetch_user(user).await?.is_none() {
            return Err(UserError::UserNotFound);
        }

        Ok(self.store().mark_mentions_seen(user).await?)
    }
}
