//! Driven port for account persistence.

use async_trait::async_trait;

use crate::domain::{DisplayName, PhoneNumber, User, UserId, Username};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Username or phone number already registered.
        Duplicate { message: String } => "user already exists: {message}",
    }
}

/// Account row including its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    /// Public account data.
    pub user: User,
    /// PHC-format password hash.
    pub password_hash: String,
}

/// Account to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    /// Login name.
    pub username: Username,
    /// Contact phone number.
    pub phone: PhoneNumber,
    /// Display name.
    pub display_name: DisplayName,
    /// PHC-format password hash.
    pub password_hash: String,
}

/// Port for reading and creating accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up an account and its hash by login name.
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StoredUser>, UserPersistenceError>;

    /// Fetch an account by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Insert an account. Taken usernames or phone numbers yield
    /// [`UserPersistenceError::Duplicate`].
    async fn create(&self, record: &NewUserRecord) -> Result<User, UserPersistenceError>;
}
