//! Zone and tree mark use-cases.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::field_service::{map_zone_error, owned_field};
use super::ownership::{Foreign, owned};
use crate::domain::ports::{FieldRepository, ZoneCommand, ZoneQuery, ZoneRepository};
use crate::domain::{
    CreatedZone, Error, FieldId, MarkTally, TreeMark, TreeMarkDraft, UserId, Zone, ZoneDraft,
    ZoneId,
};

/// Load a zone and check that `caller` owns its field.
pub(crate) async fn owned_zone<Z>(
    zones: &Z,
    caller: UserId,
    id: ZoneId,
    foreign: Foreign,
) -> Result<Zone, Error>
where
    Z: ZoneRepository + ?Sized,
{
    let found = zones.find(id).await.map_err(map_zone_error)?;
    owned(found, |z| z.owner_id, caller, "zone", id, foreign)
}

fn count_of(marks: &[TreeMarkDraft]) -> i32 {
    i32::try_from(marks.len()).unwrap_or(i32::MAX)
}

/// Zone service implementing the zone driving ports.
#[derive(Clone)]
pub struct ZoneService<F, Z> {
    fields: Arc<F>,
    zones: Arc<Z>,
}

impl<F, Z> ZoneService<F, Z> {
    /// Create a service over the field and zone repositories.
    pub fn new(fields: Arc<F>, zones: Arc<Z>) -> Self {
        Self { fields, zones }
    }
}

impl<F, Z> ZoneService<F, Z>
where
    F: FieldRepository,
    Z: ZoneRepository,
{
    async fn reject_marked_trees(&self, id: ZoneId, marks: &[TreeMarkDraft]) -> Result<(), Error> {
        let existing: HashSet<i32> = self
            .zones
            .marks(id)
            .await
            .map_err(map_zone_error)?
            .iter()
            .map(|mark| mark.tree_no)
            .collect();
        let taken: Vec<i32> = marks
            .iter()
            .map(|mark| mark.tree_no)
            .filter(|tree_no| existing.contains(tree_no))
            .collect();
        if taken.is_empty() {
            return Ok(());
        }
        Err(Error::conflict("tree numbers already marked in this zone")
            .with_details(serde_json::json!({ "code": "tree_no_taken", "treeNos": taken })))
    }
}

#[async_trait]
impl<F, Z> ZoneCommand for ZoneService<F, Z>
where
    F: FieldRepository,
    Z: ZoneRepository,
{
    async fn create_zone(
        &self,
        owner: UserId,
        field_id: FieldId,
        draft: ZoneDraft,
        marks: Option<Vec<TreeMarkDraft>>,
    ) -> Result<CreatedZone, Error> {
        owned_field(self.fields.as_ref(), owner, field_id, Foreign::Forbid).await?;
        let (draft, marks) = match marks {
            Some(marks) => (draft.with_num_trees(count_of(&marks)), marks),
            None => (draft, Vec::new()),
        };
        self.zones
            .create(field_id, &draft, &marks)
            .await
            .map_err(map_zone_error)
    }

    async fn update_zone(
        &self,
        owner: UserId,
        id: ZoneId,
        draft: ZoneDraft,
    ) -> Result<Zone, Error> {
        owned_zone(self.zones.as_ref(), owner, id, Foreign::Forbid).await?;
        self.zones.update(id, &draft).await.map_err(map_zone_error)
    }

    async fn delete_zone(&self, owner: UserId, id: ZoneId) -> Result<(), Error> {
        let zone = owned_zone(self.zones.as_ref(), owner, id, Foreign::Forbid).await?;
        if zone.inspection_count > 0 {
            return Err(Error::invalid_request("zone has inspection rounds").with_details(
                serde_json::json!({
                    "code": "zone_has_inspections",
                    "inspections": zone.inspection_count,
                }),
            ));
        }
        self.zones.delete(id).await.map_err(map_zone_error)
    }

    async fn add_marks(
        &self,
        owner: UserId,
        id: ZoneId,
        marks: Vec<TreeMarkDraft>,
    ) -> Result<MarkTally, Error> {
        owned_zone(self.zones.as_ref(), owner, id, Foreign::Forbid).await?;
        self.reject_marked_trees(id, &marks).await?;
        self.zones
            .add_marks(id, &marks)
            .await
            .map_err(map_zone_error)
    }

    async fn replace_marks(
        &self,
        owner: UserId,
        id: ZoneId,
        marks: Vec<TreeMarkDraft>,
    ) -> Result<MarkTally, Error> {
        owned_zone(self.zones.as_ref(), owner, id, Foreign::Forbid).await?;
        self.zones
            .replace_marks(id, &marks)
            .await
            .map_err(map_zone_error)
    }
}

#[async_trait]
impl<F, Z> ZoneQuery for ZoneService<F, Z>
where
    F: FieldRepository,
    Z: ZoneRepository,
{
    async fn list_zones(
        &self,
        owner: UserId,
        field_id: Option<FieldId>,
    ) -> Result<Vec<Zone>, Error> {
        match field_id {
            Some(field_id) => {
                owned_field(self.fields.as_ref(), owner, field_id, Foreign::Forbid).await?;
                self.zones
                    .list_for_field(field_id)
                    .await
                    .map_err(map_zone_error)
            }
            None => self
                .zones
                .list_for_owner(owner)
                .await
                .map_err(map_zone_error),
        }
    }

    async fn get_zone(&self, owner: UserId, id: ZoneId) -> Result<Zone, Error> {
        owned_zone(self.zones.as_ref(), owner, id, Foreign::Hide).await
    }

    async fn list_marks(&self, owner: UserId, id: ZoneId) -> Result<Vec<TreeMark>, Error> {
        owned_zone(self.zones.as_ref(), owner, id, Foreign::Forbid).await?;
        self.zones.marks(id).await.map_err(map_zone_error)
    }
}

#[cfg(test)]
#[path = "zone_service_tests.rs"]
mod tests;
