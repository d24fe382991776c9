//! Driven port for field persistence.

use async_trait::async_trait;

use crate::domain::{Field, FieldDraft, FieldId, FieldSummary, FieldVertex, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by field repository adapters.
    pub enum FieldRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "field repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "field repository query failed: {message}",
    }
}

/// Port for reading and writing fields and their boundaries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FieldRepository: Send + Sync {
    /// Fields owned by `owner`, ordered by name, with vertex counts.
    async fn list_for_owner(&self, owner: UserId)
    -> Result<Vec<FieldSummary>, FieldRepositoryError>;

    /// Fetch a field by identifier, whoever owns it.
    async fn find(&self, id: FieldId) -> Result<Option<Field>, FieldRepositoryError>;

    /// Boundary vertices ordered by `point_order`.
    async fn vertices(&self, id: FieldId) -> Result<Vec<FieldVertex>, FieldRepositoryError>;

    /// Insert a field and its boundary in one transaction.
    async fn create(&self, owner: UserId, draft: &FieldDraft)
    -> Result<Field, FieldRepositoryError>;

    /// Update name and size. The boundary is replaced only when the draft
    /// carries one.
    async fn update(&self, id: FieldId, draft: &FieldDraft) -> Result<Field, FieldRepositoryError>;

    /// Delete a field and, through cascades, its vertices.
    async fn delete(&self, id: FieldId) -> Result<(), FieldRepositoryError>;

    /// Number of zones attached to a field.
    async fn zone_count(&self, id: FieldId) -> Result<i64, FieldRepositoryError>;
}
