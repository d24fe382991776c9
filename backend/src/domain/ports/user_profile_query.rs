//! Driving port for reading the signed-in account.

use async_trait::async_trait;

use crate::domain::{Error, User, UserId};

use super::login_service::fixture_user;

/// Port for resolving a session's account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserProfileQuery: Send + Sync {
    /// Fetch the account behind a session. Deleted accounts yield
    /// `unauthorized`.
    async fn fetch_user(&self, user_id: UserId) -> Result<User, Error>;
}

/// Profile query serving the demo account only.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserProfileQuery;

#[async_trait]
impl UserProfileQuery for FixtureUserProfileQuery {
    async fn fetch_user(&self, user_id: UserId) -> Result<User, Error> {
        let user = fixture_user()?;
        if user.id() == user_id {
            Ok(user)
        } else {
            Err(Error::unauthorized("session user no longer exists"))
        }
    }
}
