//! PostgreSQL-backed `ReferenceRepository` over the seeded nutrient and
//! fertilizer tables.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ReferenceRepository, ReferenceRepositoryError};
use crate::domain::{Fertilizer, Nutrient};

use super::diesel_helpers::{DbFailure, classify, row_error_message};
use super::models::{FertilizerRow, NutrientRow};
use super::pool::{DbPool, PoolError};
use super::schema::{fertilizer, nutrient_deficiency};

/// Diesel-backed implementation of the `ReferenceRepository` port.
#[derive(Clone)]
pub struct DieselReferenceRepository {
    pool: DbPool,
}

impl DieselReferenceRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ReferenceRepositoryError {
    ReferenceRepositoryError::connection(error.into_message())
}

fn map_diesel_error(
    error: diesel::result::Error,
    operation: &'static str,
) -> ReferenceRepositoryError {
    match classify(error, operation) {
        DbFailure::Connection(message) => ReferenceRepositoryError::connection(message),
        DbFailure::Unique { .. } => ReferenceRepositoryError::query("unexpected unique violation"),
        DbFailure::Query(message) => ReferenceRepositoryError::query(message),
    }
}

#[async_trait]
impl ReferenceRepository for DieselReferenceRepository {
    async fn nutrients(&self) -> Result<Vec<Nutrient>, ReferenceRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<NutrientRow> = nutrient_deficiency::table
            .order_by(nutrient_deficiency::nutrient_code.asc())
            .select(NutrientRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list nutrients"))?;
        rows.into_iter()
            .map(|row| {
                Nutrient::try_from(row)
                    .map_err(|err| ReferenceRepositoryError::query(row_error_message(&err)))
            })
            .collect()
    }

    async fn fertilizers(&self) -> Result<Vec<Fertilizer>, ReferenceRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<FertilizerRow> = fertilizer::table
            .order_by(fertilizer::fertilizer_id.asc())
            .select(FertilizerRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list fertilizers"))?;
        rows.into_iter()
            .map(|row| {
                Fertilizer::try_from(row)
                    .map_err(|err| ReferenceRepositoryError::query(row_error_message(&err)))
            })
            .collect()
    }
}
