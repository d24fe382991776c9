//! Shared Diesel error classification for the repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::models::RowError;

/// Coarse outcome of a failed Diesel call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DbFailure {
    /// The connection dropped mid-query.
    Connection(String),
    /// A unique constraint rejected the write.
    Unique { constraint: Option<String> },
    /// Anything else.
    Query(String),
}

/// Classify a Diesel error and emit debug context.
pub(crate) fn classify(error: DieselError, operation: &'static str) -> DbFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        other => debug!(error = %other, %operation, "diesel operation failed"),
    }
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DbFailure::Connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => DbFailure::Unique {
            constraint: info.constraint_name().map(str::to_owned),
        },
        DieselError::NotFound => DbFailure::Query("record not found".to_owned()),
        _ => DbFailure::Query(format!("database error during {operation}")),
    }
}

/// Message for stored rows that no longer decode into domain records.
pub(crate) fn row_error_message(error: &RowError) -> String {
    debug!(%error, "stored row failed domain validation");
    format!("invalid stored row: {error}")
}
