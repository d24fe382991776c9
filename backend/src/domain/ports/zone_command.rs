//! Driving port for zone and tree mark mutations.

use async_trait::async_trait;

use crate::domain::{
    CreatedZone, Error, FieldId, MarkTally, TreeMarkDraft, UserId, Zone, ZoneDraft, ZoneId,
};

/// Port for zone and mark writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ZoneCommand: Send + Sync {
    /// Create a zone in a field owned by `owner`.
    ///
    /// `marks` is `Some` whenever the request carried a marks list, even one
    /// with no usable entries; the tree count then follows the stored marks.
    async fn create_zone(
        &self,
        owner: UserId,
        field_id: FieldId,
        draft: ZoneDraft,
        marks: Option<Vec<TreeMarkDraft>>,
    ) -> Result<CreatedZone, Error>;

    /// Rename a zone or change its tree count.
    async fn update_zone(&self, owner: UserId, id: ZoneId, draft: ZoneDraft)
    -> Result<Zone, Error>;

    /// Delete a zone without inspections.
    async fn delete_zone(&self, owner: UserId, id: ZoneId) -> Result<(), Error>;

    /// Add marks. Tree numbers already marked in the zone conflict.
    async fn add_marks(
        &self,
        owner: UserId,
        id: ZoneId,
        marks: Vec<TreeMarkDraft>,
    ) -> Result<MarkTally, Error>;

    /// Replace all marks of a zone.
    async fn replace_marks(
        &self,
        owner: UserId,
        id: ZoneId,
        marks: Vec<TreeMarkDraft>,
    ) -> Result<MarkTally, Error>;
}

/// Zone command used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureZoneCommand;

fn persistence_required() -> Error {
    Error::service_unavailable("zone changes require a configured database")
}

#[async_trait]
impl ZoneCommand for FixtureZoneCommand {
    async fn create_zone(
        &self,
        _owner: UserId,
        _field_id: FieldId,
        _draft: ZoneDraft,
        _marks: Option<Vec<TreeMarkDraft>>,
    ) -> Result<CreatedZone, Error> {
        Err(persistence_required())
    }

    async fn update_zone(
        &self,
        _owner: UserId,
        _id: ZoneId,
        _draft: ZoneDraft,
    ) -> Result<Zone, Error> {
        Err(persistence_required())
    }

    async fn delete_zone(&self, _owner: UserId, _id: ZoneId) -> Result<(), Error> {
        Err(persistence_required())
    }

    async fn add_marks(
        &self,
        _owner: UserId,
        _id: ZoneId,
        _marks: Vec<TreeMarkDraft>,
    ) -> Result<MarkTally, Error> {
        Err(persistence_required())
    }

    async fn replace_marks(
        &self,
        _owner: UserId,
        _id: ZoneId,
        _marks: Vec<TreeMarkDraft>,
    ) -> Result<MarkTally, Error> {
        Err(persistence_required())
    }
}
