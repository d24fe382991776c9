//! Account use-cases: login, registration and profile lookup.
//!
//! One service implements the three account driving ports over a
//! [`UserRepository`] and a [`PasswordHasher`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use zeroize::Zeroizing;

use crate::domain::ports::{
    LoginService, NewUserRecord, PasswordHashError, PasswordHasher, RegistrationService,
    UserPersistenceError, UserProfileQuery, UserRepository, invalid_credentials,
};
use crate::domain::{Error, LoginCredentials, Registration, User, UserId};

fn map_repository_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserPersistenceError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserPersistenceError::Duplicate { .. } => Error::conflict("user already exists")
            .with_details(serde_json::json!({ "code": "user_exists" })),
    }
}

fn map_hash_error(error: PasswordHashError) -> Error {
    Error::internal(error.to_string())
}

/// Account service implementing login, registration and profile ports.
#[derive(Clone)]
pub struct AccountService<U, H> {
    users: Arc<U>,
    hasher: Arc<H>,
}

impl<U, H> AccountService<U, H> {
    /// Create a service over a user repository and a password hasher.
    pub fn new(users: Arc<U>, hasher: Arc<H>) -> Self {
        Self { users, hasher }
    }
}

impl<U, H> AccountService<U, H>
where
    H: PasswordHasher + 'static,
{
    /// Hash on the blocking pool.
    async fn hash_password(&self, password: &str) -> Result<String, Error> {
        let hasher = Arc::clone(&self.hasher);
        let password = Zeroizing::new(password.to_owned());
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| Error::internal(format!("password hashing task failed: {err}")))?
            .map_err(map_hash_error)
    }

    async fn verify_password(
        &self,
        password: &str,
        hash: &str,
    ) -> Result<Result<bool, PasswordHashError>, Error> {
        let hasher = Arc::clone(&self.hasher);
        let password = Zeroizing::new(password.to_owned());
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|err| Error::internal(format!("password verification task failed: {err}")))
    }
}

#[async_trait]
impl<U, H> LoginService for AccountService<U, H>
where
    U: UserRepository,
    H: PasswordHasher + 'static,
{
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        let Some(stored) = self
            .users
            .find_by_username(credentials.username())
            .await
            .map_err(map_repository_error)?
        else {
            return Err(invalid_credentials());
        };

        match self
            .verify_password(credentials.password(), &stored.password_hash)
            .await?
        {
            Ok(true) => Ok(stored.user),
            Ok(false) => Err(invalid_credentials()),
            Err(err) => {
                warn!(user_id = %stored.user.id(), error = %err, "stored password hash rejected");
                Err(invalid_credentials())
            }
        }
    }
}

#[async_trait]
impl<U, H> RegistrationService for AccountService<U, H>
where
    U: UserRepository,
    H: PasswordHasher + 'static,
{
    async fn register(&self, registration: &Registration) -> Result<User, Error> {
        let password_hash = self.hash_password(registration.password()).await?;
        let record = NewUserRecord {
            username: registration.username().clone(),
            phone: registration.phone().clone(),
            display_name: registration.display_name().clone(),
            password_hash,
        };
        self.users
            .create(&record)
            .await
            .map_err(map_repository_error)
    }
}

#[async_trait]
impl<U, H> UserProfileQuery for AccountService<U, H>
where
    U: UserRepository,
    H: PasswordHasher,
{
    async fn fetch_user(&self, user_id: UserId) -> Result<User, Error> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::unauthorized("session user no longer exists"))
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
