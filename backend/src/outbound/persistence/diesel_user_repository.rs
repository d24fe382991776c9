//! PostgreSQL-backed `UserRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{NewUserRecord, StoredUser, UserPersistenceError, UserRepository};
use crate::domain::{User, UserId};

use super::diesel_helpers::{DbFailure, classify, row_error_message};
use super::models::{NewUserRow, RowError, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    UserPersistenceError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error, operation: &'static str) -> UserPersistenceError {
    match classify(error, operation) {
        DbFailure::Connection(message) => UserPersistenceError::connection(message),
        DbFailure::Unique { constraint } => UserPersistenceError::duplicate(
            constraint.unwrap_or_else(|| "username or phone".to_owned()),
        ),
        DbFailure::Query(message) => UserPersistenceError::query(message),
    }
}

fn map_row_error(error: &RowError) -> UserPersistenceError {
    UserPersistenceError::query(row_error_message(error))
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StoredUser>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::username.eq(username.trim()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find user by username"))?;
        row.map(|r| {
            r.into_user()
                .map(|(user, password_hash)| StoredUser {
                    user,
                    password_hash,
                })
                .map_err(|err| map_row_error(&err))
        })
        .transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .find(id.get())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find user by id"))?;
        row.map(|r| r.into_user().map(|(user, _)| user).map_err(|err| map_row_error(&err)))
            .transpose()
    }

    async fn create(&self, record: &NewUserRecord) -> Result<User, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: UserRow = diesel::insert_into(users::table)
            .values(NewUserRow {
                username: record.username.as_ref(),
                user_tel: record.phone.as_ref(),
                user_password: &record.password_hash,
                name: record.display_name.as_ref(),
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "create user"))?;
        row.into_user()
            .map(|(user, _)| user)
            .map_err(|err| map_row_error(&err))
    }
}
