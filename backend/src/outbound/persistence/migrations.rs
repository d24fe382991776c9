//! Embedded schema migrations.
//!
//! The migrations under `backend/migrations` are compiled into the binary and
//! applied at startup on a blocking thread, since `diesel_migrations` drives
//! a synchronous `PgConnection`.

use diesel::pg::PgConnection;
use diesel::Connection as _;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness as _, embed_migrations};
use tracing::info;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The database could not be reached.
    #[error("failed to connect for migrations: {message}")]
    Connect { message: String },
    /// A migration failed to apply.
    #[error("failed to apply migrations: {message}")]
    Apply { message: String },
    /// The blocking task panicked or was cancelled.
    #[error("migration task failed: {message}")]
    Task { message: String },
}

/// Apply every pending migration, including the reference data seeds.
/// Re-running is a no-op.
///
/// # Errors
///
/// Returns [`MigrationError`] when the connection or a migration fails.
pub async fn apply_migrations(database_url: &str) -> Result<usize, MigrationError> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url).map_err(|err| MigrationError::Connect {
            message: err.to_string(),
        })?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| MigrationError::Apply {
                message: err.to_string(),
            })?;
        info!(count = applied.len(), "applied database migrations");
        Ok(applied.len())
    })
    .await
    .map_err(|err| MigrationError::Task {
        message: err.to_string(),
    })?
}
