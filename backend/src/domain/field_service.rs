//! Field use-cases.

use std::sync::Arc;

use async_trait::async_trait;

use super::ownership::{Foreign, owned};
use crate::domain::ports::{
    FieldCommand, FieldQuery, FieldRepository, FieldRepositoryError, ZoneRepository,
    ZoneRepositoryError,
};
use crate::domain::{Error, Field, FieldDetail, FieldDraft, FieldId, FieldSummary, UserId, Zone};

pub(crate) fn map_field_error(error: FieldRepositoryError) -> Error {
    match error {
        FieldRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("field repository unavailable: {message}"))
        }
        FieldRepositoryError::Query { message } => {
            Error::internal(format!("field repository error: {message}"))
        }
    }
}

pub(crate) fn map_zone_error(error: ZoneRepositoryError) -> Error {
    match error {
        ZoneRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("zone repository unavailable: {message}"))
        }
        ZoneRepositoryError::Query { message } => {
            Error::internal(format!("zone repository error: {message}"))
        }
        ZoneRepositoryError::DuplicateMark { message } => {
            Error::conflict(format!("tree already marked: {message}"))
        }
    }
}

/// Load a field and check that `caller` owns it.
pub(crate) async fn owned_field<F>(
    fields: &F,
    caller: UserId,
    id: FieldId,
    foreign: Foreign,
) -> Result<Field, Error>
where
    F: FieldRepository + ?Sized,
{
    let found = fields.find(id).await.map_err(map_field_error)?;
    owned(found, |f| f.owner_id, caller, "field", id, foreign)
}

/// Field service implementing the field driving ports.
#[derive(Clone)]
pub struct FieldService<F, Z> {
    fields: Arc<F>,
    zones: Arc<Z>,
}

impl<F, Z> FieldService<F, Z> {
    /// Create a service over the field and zone repositories.
    pub fn new(fields: Arc<F>, zones: Arc<Z>) -> Self {
        Self { fields, zones }
    }
}

#[async_trait]
impl<F, Z> FieldCommand for FieldService<F, Z>
where
    F: FieldRepository,
    Z: ZoneRepository,
{
    async fn create_field(&self, owner: UserId, draft: FieldDraft) -> Result<Field, Error> {
        self.fields
            .create(owner, &draft)
            .await
            .map_err(map_field_error)
    }

    async fn update_field(
        &self,
        owner: UserId,
        id: FieldId,
        draft: FieldDraft,
    ) -> Result<Field, Error> {
        owned_field(self.fields.as_ref(), owner, id, Foreign::Forbid).await?;
        self.fields
            .update(id, &draft)
            .await
            .map_err(map_field_error)
    }

    async fn delete_field(&self, owner: UserId, id: FieldId) -> Result<(), Error> {
        owned_field(self.fields.as_ref(), owner, id, Foreign::Forbid).await?;
        let zones = self.fields.zone_count(id).await.map_err(map_field_error)?;
        if zones > 0 {
            return Err(Error::invalid_request("field still has zones")
                .with_details(serde_json::json!({ "code": "field_has_zones", "zones": zones })));
        }
        self.fields.delete(id).await.map_err(map_field_error)
    }
}

#[async_trait]
impl<F, Z> FieldQuery for FieldService<F, Z>
where
    F: FieldRepository,
    Z: ZoneRepository,
{
    async fn list_fields(&self, owner: UserId) -> Result<Vec<FieldSummary>, Error> {
        self.fields
            .list_for_owner(owner)
            .await
            .map_err(map_field_error)
    }

    async fn get_field(&self, owner: UserId, id: FieldId) -> Result<FieldDetail, Error> {
        let field = owned_field(self.fields.as_ref(), owner, id, Foreign::Hide).await?;
        let vertices = self.fields.vertices(id).await.map_err(map_field_error)?;
        Ok(FieldDetail { field, vertices })
    }

    async fn list_field_zones(&self, owner: UserId, id: FieldId) -> Result<Vec<Zone>, Error> {
        owned_field(self.fields.as_ref(), owner, id, Foreign::Forbid).await?;
        self.zones.list_for_field(id).await.map_err(map_zone_error)
    }
}

#[cfg(test)]
#[path = "field_service_tests.rs"]
mod tests;
