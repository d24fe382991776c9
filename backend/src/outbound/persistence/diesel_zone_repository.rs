//! PostgreSQL-backed `ZoneRepository`.
//!
//! Mark mutations recount `zone.num_trees` from the stored marks inside the
//! same transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{ZoneRepository, ZoneRepositoryError};
use crate::domain::{
    CreatedZone, FieldId, MarkTally, TreeMark, TreeMarkDraft, UserId, Zone, ZoneDraft, ZoneId,
};

use super::diesel_helpers::{DbFailure, classify, row_error_message};
use super::models::{MarkRow, NewMarkRow, NewZoneRow, RowError, ZoneRow, ZoneUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::{field, mark_zone, zone, zone_inspection};

/// Diesel-backed implementation of the `ZoneRepository` port.
#[derive(Clone)]
pub struct DieselZoneRepository {
    pool: DbPool,
}

impl DieselZoneRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ZoneRepositoryError {
    ZoneRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error, operation: &'static str) -> ZoneRepositoryError {
    match classify(error, operation) {
        DbFailure::Connection(message) => ZoneRepositoryError::connection(message),
        DbFailure::Unique { constraint } => ZoneRepositoryError::duplicate_mark(
            constraint.unwrap_or_else(|| "mark_zone_zone_id_tree_no_key".to_owned()),
        ),
        DbFailure::Query(message) => ZoneRepositoryError::query(message),
    }
}

fn map_row_error(error: &RowError) -> ZoneRepositoryError {
    ZoneRepositoryError::query(row_error_message(error))
}

fn mark_rows(zone_id: i32, marks: &[TreeMarkDraft]) -> Vec<NewMarkRow> {
    marks
        .iter()
        .map(|mark| NewMarkRow {
            zone_id,
            tree_no: mark.tree_no,
            latitude: mark.position.latitude(),
            longitude: mark.position.longitude(),
        })
        .collect()
}

async fn inspection_counts(
    conn: &mut AsyncPgConnection,
    zone_ids: &[i32],
) -> Result<HashMap<i32, i64>, diesel::result::Error> {
    Ok(zone_inspection::table
        .filter(zone_inspection::zone_id.eq_any(zone_ids))
        .group_by(zone_inspection::zone_id)
        .select((zone_inspection::zone_id, count_star()))
        .load::<(i32, i64)>(conn)
        .await?
        .into_iter()
        .collect())
}

/// Attach round counts to `(zone, owner)` rows.
async fn hydrate(
    conn: &mut AsyncPgConnection,
    rows: Vec<(ZoneRow, i32)>,
) -> Result<Vec<Zone>, ZoneRepositoryError> {
    let ids: Vec<i32> = rows.iter().map(|(row, _)| row.zone_id).collect();
    let counts = inspection_counts(conn, &ids)
        .await
        .map_err(|err| map_diesel_error(err, "count zone inspections"))?;
    rows.into_iter()
        .map(|(row, owner)| {
            let count = counts.get(&row.zone_id).copied().unwrap_or(0);
            row.into_zone(owner, count).map_err(|err| map_row_error(&err))
        })
        .collect()
}

async fn load_zone(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Option<Zone>, ZoneRepositoryError> {
    let row: Option<(ZoneRow, i32)> = zone::table
        .inner_join(field::table)
        .filter(zone::zone_id.eq(id))
        .select((ZoneRow::as_select(), field::user_id))
        .first(conn)
        .await
        .optional()
        .map_err(|err| map_diesel_error(err, "find zone"))?;
    Ok(hydrate(conn, row.into_iter().collect()).await?.pop())
}

/// Recount marks and store the result as the zone's tree count.
async fn recount(conn: &mut AsyncPgConnection, zone_id: i32) -> Result<i32, diesel::result::Error> {
    let count: i64 = mark_zone::table
        .filter(mark_zone::zone_id.eq(zone_id))
        .count()
        .get_result(conn)
        .await?;
    let num_trees = i32::try_from(count).unwrap_or(i32::MAX);
    diesel::update(zone::table.find(zone_id))
        .set(zone::num_trees.eq(num_trees))
        .execute(conn)
        .await?;
    Ok(num_trees)
}

async fn insert_marks(
    conn: &mut AsyncPgConnection,
    zone_id: i32,
    marks: &[TreeMarkDraft],
) -> Result<usize, diesel::result::Error> {
    if marks.is_empty() {
        return Ok(0);
    }
    diesel::insert_into(mark_zone::table)
        .values(mark_rows(zone_id, marks))
        .execute(conn)
        .await
}

#[async_trait]
impl ZoneRepository for DieselZoneRepository {
    async fn list_for_field(&self, field_id: FieldId) -> Result<Vec<Zone>, ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(ZoneRow, i32)> = zone::table
            .inner_join(field::table)
            .filter(zone::field_id.eq(field_id.get()))
            .order_by((zone::zone_name.asc(), zone::zone_id.asc()))
            .select((ZoneRow::as_select(), field::user_id))
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list field zones"))?;
        hydrate(&mut conn, rows).await
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Zone>, ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(ZoneRow, i32)> = zone::table
            .inner_join(field::table)
            .filter(field::user_id.eq(owner.get()))
            .order_by((zone::field_id.asc(), zone::zone_name.asc(), zone::zone_id.asc()))
            .select((ZoneRow::as_select(), field::user_id))
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list owner zones"))?;
        hydrate(&mut conn, rows).await
    }

    async fn find(&self, id: ZoneId) -> Result<Option<Zone>, ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_zone(&mut conn, id.get()).await
    }

    async fn create(
        &self,
        field_id: FieldId,
        draft: &ZoneDraft,
        marks: &[TreeMarkDraft],
    ) -> Result<CreatedZone, ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let (zone_id, inserted_marks) = conn
            .transaction(|conn| {
                async move {
                    let zone_id: i32 = diesel::insert_into(zone::table)
                        .values(NewZoneRow {
                            field_id: field_id.get(),
                            zone_name: draft.name(),
                            num_trees: draft.num_trees(),
                        })
                        .returning(zone::zone_id)
                        .get_result(conn)
                        .await?;
                    let inserted = insert_marks(conn, zone_id, marks).await?;
                    if inserted > 0 {
                        recount(conn, zone_id).await?;
                    }
                    Ok((zone_id, inserted))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "create zone"))?;
        let stored = load_zone(&mut conn, zone_id)
            .await?
            .ok_or_else(|| ZoneRepositoryError::query("zone vanished after insert"))?;
        Ok(CreatedZone {
            zone: stored,
            inserted_marks,
        })
    }

    async fn update(&self, id: ZoneId, draft: &ZoneDraft) -> Result<Zone, ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(zone::table.find(id.get()))
            .set(ZoneUpdate {
                zone_name: draft.name(),
                num_trees: draft.num_trees(),
            })
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "update zone"))?;
        load_zone(&mut conn, id.get())
            .await?
            .ok_or_else(|| ZoneRepositoryError::query("record not found"))
    }

    async fn delete(&self, id: ZoneId) -> Result<(), ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(zone::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "delete zone"))?;
        Ok(())
    }

    async fn marks(&self, id: ZoneId) -> Result<Vec<TreeMark>, ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MarkRow> = mark_zone::table
            .filter(mark_zone::zone_id.eq(id.get()))
            .order_by((mark_zone::tree_no.asc(), mark_zone::mark_id.asc()))
            .select(MarkRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list marks"))?;
        rows.into_iter()
            .map(|row| TreeMark::try_from(row).map_err(|err| map_row_error(&err)))
            .collect()
    }

    async fn add_marks(
        &self,
        id: ZoneId,
        marks: &[TreeMarkDraft],
    ) -> Result<MarkTally, ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let inserted = insert_marks(conn, id.get(), marks).await?;
                let num_trees = recount(conn, id.get()).await?;
                Ok(MarkTally {
                    inserted,
                    num_trees,
                })
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_diesel_error(err, "add marks"))
    }

    async fn replace_marks(
        &self,
        id: ZoneId,
        marks: &[TreeMarkDraft],
    ) -> Result<MarkTally, ZoneRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::delete(mark_zone::table.filter(mark_zone::zone_id.eq(id.get())))
                    .execute(conn)
                    .await?;
                let inserted = insert_marks(conn, id.get(), marks).await?;
                let num_trees = recount(conn, id.get()).await?;
                Ok(MarkTally {
                    inserted,
                    num_trees,
                })
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_diesel_error(err, "replace marks"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoPoint;
    use rstest::rstest;

    #[rstest]
    fn mark_rows_carry_positions() {
        let position = GeoPoint::new(7.25, 99.5).expect("valid point");
        let rows = mark_rows(3, &[TreeMarkDraft { tree_no: 12, position }]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tree_no, 12);
        assert!((rows[0].latitude - 7.25).abs() < f64::EPSILON);
    }

    #[rstest]
    fn unique_violations_become_duplicate_marks() {
        let err = map_diesel_error(
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                Box::new("duplicate key value violates unique constraint".to_owned()),
            ),
            "add marks",
        );
        assert!(matches!(err, ZoneRepositoryError::DuplicateMark { .. }));
    }
}
