//! Driven port for zone and tree mark persistence.

use async_trait::async_trait;

use crate::domain::{
    CreatedZone, FieldId, MarkTally, TreeMark, TreeMarkDraft, UserId, Zone, ZoneDraft, ZoneId,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by zone repository adapters.
    pub enum ZoneRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "zone repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "zone repository query failed: {message}",
        /// A `(zone_id, tree_no)` pair already exists.
        DuplicateMark { message: String } => "tree mark already exists: {message}",
    }
}

/// Port for reading and writing zones and marks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    /// Zones of one field ordered by name.
    async fn list_for_field(&self, field_id: FieldId) -> Result<Vec<Zone>, ZoneRepositoryError>;

    /// All zones of fields owned by `owner`, ordered by field then name.
    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Zone>, ZoneRepositoryError>;

    /// Fetch a zone by identifier, whoever owns it.
    async fn find(&self, id: ZoneId) -> Result<Option<Zone>, ZoneRepositoryError>;

    /// Insert a zone with its initial marks in one transaction.
    async fn create(
        &self,
        field_id: FieldId,
        draft: &ZoneDraft,
        marks: &[TreeMarkDraft],
    ) -> Result<CreatedZone, ZoneRepositoryError>;

    /// Update a zone's name and tree count.
    async fn update(&self, id: ZoneId, draft: &ZoneDraft) -> Result<Zone, ZoneRepositoryError>;

    /// Delete a zone and, through cascades, its marks.
    async fn delete(&self, id: ZoneId) -> Result<(), ZoneRepositoryError>;

    /// Marks ordered by `tree_no`, then id.
    async fn marks(&self, id: ZoneId) -> Result<Vec<TreeMark>, ZoneRepositoryError>;

    /// Append marks and recount `num_trees`.
    async fn add_marks(
        &self,
        id: ZoneId,
        marks: &[TreeMarkDraft],
    ) -> Result<MarkTally, ZoneRepositoryError>;

    /// Replace every mark atomically and recount `num_trees`.
    async fn replace_marks(
        &self,
        id: ZoneId,
        marks: &[TreeMarkDraft],
    ) -> Result<MarkTally, ZoneRepositoryError>;
}
