//! PostgreSQL-backed `FieldRepository`.
//!
//! Field rows and their boundary vertices are written in one transaction so a
//! field is never stored with half a polygon.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{FieldRepository, FieldRepositoryError};
use crate::domain::{Boundary, Field, FieldDraft, FieldId, FieldSummary, FieldVertex, UserId};

use super::diesel_helpers::{DbFailure, classify, row_error_message};
use super::models::{FieldPointRow, FieldRow, FieldUpdate, NewFieldPointRow, NewFieldRow, RowError};
use super::pool::{DbPool, PoolError};
use super::schema::{field, field_point, zone};

/// Diesel-backed implementation of the `FieldRepository` port.
#[derive(Clone)]
pub struct DieselFieldRepository {
    pool: DbPool,
}

impl DieselFieldRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FieldRepositoryError {
    FieldRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error, operation: &'static str) -> FieldRepositoryError {
    match classify(error, operation) {
        DbFailure::Connection(message) => FieldRepositoryError::connection(message),
        DbFailure::Unique { constraint } => FieldRepositoryError::query(format!(
            "unique constraint violated: {}",
            constraint.unwrap_or_default()
        )),
        DbFailure::Query(message) => FieldRepositoryError::query(message),
    }
}

fn map_row_error(error: &RowError) -> FieldRepositoryError {
    FieldRepositoryError::query(row_error_message(error))
}

fn point_rows(field_id: i32, boundary: &Boundary) -> Vec<NewFieldPointRow> {
    boundary
        .vertices()
        .iter()
        .map(|vertex| NewFieldPointRow {
            field_id,
            latitude: vertex.position.latitude(),
            longitude: vertex.position.longitude(),
            point_order: vertex.point_order,
        })
        .collect()
}

async fn insert_points(
    conn: &mut AsyncPgConnection,
    field_id: i32,
    boundary: &Boundary,
) -> Result<(), diesel::result::Error> {
    if boundary.is_empty() {
        return Ok(());
    }
    diesel::insert_into(field_point::table)
        .values(point_rows(field_id, boundary))
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl FieldRepository for DieselFieldRepository {
    async fn list_for_owner(
        &self,
        owner: UserId,
    ) -> Result<Vec<FieldSummary>, FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<FieldRow> = field::table
            .filter(field::user_id.eq(owner.get()))
            .order_by((field::field_name.asc(), field::field_id.asc()))
            .select(FieldRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list fields"))?;
        let ids: Vec<i32> = rows.iter().map(|row| row.field_id).collect();
        let counts: HashMap<i32, i64> = field_point::table
            .filter(field_point::field_id.eq_any(&ids))
            .group_by(field_point::field_id)
            .select((field_point::field_id, count_star()))
            .load::<(i32, i64)>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "count field vertices"))?
            .into_iter()
            .collect();

        rows.into_iter()
            .map(|row| {
                let vertex_count = counts.get(&row.field_id).copied().unwrap_or(0);
                Field::try_from(row)
                    .map(|f| FieldSummary {
                        field: f,
                        vertex_count,
                    })
                    .map_err(|err| map_row_error(&err))
            })
            .collect()
    }

    async fn find(&self, id: FieldId) -> Result<Option<Field>, FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<FieldRow> = field::table
            .find(id.get())
            .select(FieldRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find field"))?;
        row.map(|r| Field::try_from(r).map_err(|err| map_row_error(&err)))
            .transpose()
    }

    async fn vertices(&self, id: FieldId) -> Result<Vec<FieldVertex>, FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<FieldPointRow> = field_point::table
            .filter(field_point::field_id.eq(id.get()))
            .order_by(field_point::point_order.asc())
            .select(FieldPointRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "load field vertices"))?;
        rows.into_iter()
            .map(|row| FieldVertex::try_from(row).map_err(|err| map_row_error(&err)))
            .collect()
    }

    async fn create(
        &self,
        owner: UserId,
        draft: &FieldDraft,
    ) -> Result<Field, FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: FieldRow = conn
            .transaction(|conn| {
                async move {
                    let row: FieldRow = diesel::insert_into(field::table)
                        .values(NewFieldRow {
                            user_id: owner.get(),
                            field_name: draft.name(),
                            size_square_meter: draft.size_square_meter(),
                        })
                        .returning(FieldRow::as_returning())
                        .get_result(conn)
                        .await?;
                    if let Some(boundary) = draft.boundary() {
                        insert_points(conn, row.field_id, boundary).await?;
                    }
                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "create field"))?;
        Field::try_from(row).map_err(|err| map_row_error(&err))
    }

    async fn update(&self, id: FieldId, draft: &FieldDraft) -> Result<Field, FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: FieldRow = conn
            .transaction(|conn| {
                async move {
                    let row: FieldRow = diesel::update(field::table.find(id.get()))
                        .set(FieldUpdate {
                            field_name: draft.name(),
                            size_square_meter: draft.size_square_meter(),
                        })
                        .returning(FieldRow::as_returning())
                        .get_result(conn)
                        .await?;
                    if let Some(boundary) = draft.boundary() {
                        diesel::delete(field_point::table.filter(field_point::field_id.eq(id.get())))
                            .execute(conn)
                            .await?;
                        insert_points(conn, row.field_id, boundary).await?;
                    }
                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "update field"))?;
        Field::try_from(row).map_err(|err| map_row_error(&err))
    }

    async fn delete(&self, id: FieldId) -> Result<(), FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(field::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "delete field"))?;
        Ok(())
    }

    async fn zone_count(&self, id: FieldId) -> Result<i64, FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        zone::table
            .filter(zone::field_id.eq(id.get()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "count zones"))
    }
}
