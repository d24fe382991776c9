//! Driving port for zone and tree mark reads.

use async_trait::async_trait;

use crate::domain::{Error, FieldId, TreeMark, UserId, Zone, ZoneId};

/// Port for zone and mark reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ZoneQuery: Send + Sync {
    /// Zones of one owned field, or of every field the owner has.
    async fn list_zones(&self, owner: UserId, field_id: Option<FieldId>)
    -> Result<Vec<Zone>, Error>;

    /// One zone. Zones of other users read as missing.
    async fn get_zone(&self, owner: UserId, id: ZoneId) -> Result<Zone, Error>;

    /// Marks of an owned zone.
    async fn list_marks(&self, owner: UserId, id: ZoneId) -> Result<Vec<TreeMark>, Error>;
}

/// Zone query serving an empty farm.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureZoneQuery;

#[async_trait]
impl ZoneQuery for FixtureZoneQuery {
    async fn list_zones(
        &self,
        _owner: UserId,
        field_id: Option<FieldId>,
    ) -> Result<Vec<Zone>, Error> {
        match field_id {
            Some(id) => Err(Error::not_found(format!("field {id} not found"))),
            None => Ok(Vec::new()),
        }
    }

    async fn get_zone(&self, _owner: UserId, id: ZoneId) -> Result<Zone, Error> {
        Err(Error::not_found(format!("zone {id} not found")))
    }

    async fn list_marks(&self, _owner: UserId, id: ZoneId) -> Result<Vec<TreeMark>, Error> {
        Err(Error::not_found(format!("zone {id} not found")))
    }
}
