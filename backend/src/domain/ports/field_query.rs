//! Driving port for field reads.

use async_trait::async_trait;

use crate::domain::{Error, FieldDetail, FieldId, FieldSummary, UserId, Zone};

/// Port for listing and reading fields.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FieldQuery: Send + Sync {
    /// Fields owned by `owner`, ordered by name.
    async fn list_fields(&self, owner: UserId) -> Result<Vec<FieldSummary>, Error>;

    /// One field with its boundary. Fields of other users read as missing.
    async fn get_field(&self, owner: UserId, id: FieldId) -> Result<FieldDetail, Error>;

    /// Zones of a field owned by `owner`.
    async fn list_field_zones(&self, owner: UserId, id: FieldId) -> Result<Vec<Zone>, Error>;
}

/// Field query serving an empty farm.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureFieldQuery;

#[async_trait]
impl FieldQuery for FixtureFieldQuery {
    async fn list_fields(&self, _owner: UserId) -> Result<Vec<FieldSummary>, Error> {
        Ok(Vec::new())
    }

    async fn get_field(&self, _owner: UserId, id: FieldId) -> Result<FieldDetail, Error> {
        Err(Error::not_found(format!("field {id} not found")))
    }

    async fn list_field_zones(&self, _owner: UserId, id: FieldId) -> Result<Vec<Zone>, Error> {
        Err(Error::not_found(format!("field {id} not found")))
    }
}
