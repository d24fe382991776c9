//! Driving port for field mutations.

use async_trait::async_trait;

use crate::domain::{Error, Field, FieldDraft, FieldId, UserId};

/// Port for creating, updating and deleting fields.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FieldCommand: Send + Sync {
    /// Create a field owned by `owner`.
    async fn create_field(&self, owner: UserId, draft: FieldDraft) -> Result<Field, Error>;

    /// Update a field owned by `owner`.
    async fn update_field(
        &self,
        owner: UserId,
        id: FieldId,
        draft: FieldDraft,
    ) -> Result<Field, Error>;

    /// Delete a field owned by `owner`. Fields that still have zones are
    /// refused.
    async fn delete_field(&self, owner: UserId, id: FieldId) -> Result<(), Error>;
}

/// Field command used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureFieldCommand;

fn persistence_required() -> Error {
    Error::service_unavailable("field changes require a configured database")
}

#[async_trait]
impl FieldCommand for FixtureFieldCommand {
    async fn create_field(&self, _owner: UserId, _draft: FieldDraft) -> Result<Field, Error> {
        Err(persistence_required())
    }

    async fn update_field(
        &self,
        _owner: UserId,
        _id: FieldId,
        _draft: FieldDraft,
    ) -> Result<Field, Error> {
        Err(persistence_required())
    }

    async fn delete_field(&self, _owner: UserId, _id: FieldId) -> Result<(), Error> {
        Err(persistence_required())
    }
}
