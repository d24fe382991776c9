//! PostgreSQL-backed `InspectionRepository`.
//!
//! Rounds are joined to `field` for the owning user and to `zone` for the
//! display names. Per-round tallies (images, findings, recommendations) are
//! loaded with grouped counts over the ids of the page being returned.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use diesel::dsl::{count_star, max, sql};
use diesel::prelude::*;
use diesel::sql_types::{Bool, Integer};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use pagination::{PageRequest, Paginated};

use crate::domain::ports::{InspectionRepository, InspectionRepositoryError};
use crate::domain::{
    Finding, HistoryBucket, HistoryQuery, Inspection, InspectionDetail, InspectionFilter,
    InspectionHistory, InspectionId, InspectionImage, InspectionStatus, InspectionSummary,
    NewInspection, NewInspectionImage, NewRecommendation, NutrientCount, Recommendation,
    RecommendationId, RecommendationStatus, RecommendationUpdate, TOP_NUTRIENTS, UserId, ZoneId,
};

use super::diesel_helpers::{DbFailure, classify, row_error_message};
use super::models::{
    FindingRow, ImageRow, InspectionRow, NewFindingRow, NewImageRow, NewInspectionRow,
    NewRecommendationRow, RecommendationJoin, RecommendationRow, RowError,
    recommendation_from_join,
};
use super::pool::{DbPool, PoolError};
use super::schema::{
    fertilizer, field, nutrient_deficiency, zone, zone_inspection, zone_inspection_finding,
    zone_inspection_image, zone_inspection_recommendation,
};

/// Diesel-backed implementation of the `InspectionRepository` port.
#[derive(Clone)]
pub struct DieselInspectionRepository {
    pool: DbPool,
}

impl DieselInspectionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> InspectionRepositoryError {
    InspectionRepositoryError::connection(error.into_message())
}

fn map_diesel_error(
    error: diesel::result::Error,
    operation: &'static str,
) -> InspectionRepositoryError {
    match classify(error, operation) {
        DbFailure::Connection(message) => InspectionRepositoryError::connection(message),
        DbFailure::Unique { constraint } => InspectionRepositoryError::round_taken(
            constraint.unwrap_or_else(|| "zone_inspection_zone_id_round_no_key".to_owned()),
        ),
        DbFailure::Query(message) => InspectionRepositoryError::query(message),
    }
}

fn map_row_error(error: &RowError) -> InspectionRepositoryError {
    InspectionRepositoryError::query(row_error_message(error))
}

type CountMap = HashMap<i32, i64>;

async fn load_inspection(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Option<Inspection>, InspectionRepositoryError> {
    let row: Option<(InspectionRow, i32)> = zone_inspection::table
        .inner_join(field::table.on(field::field_id.eq(zone_inspection::field_id)))
        .filter(zone_inspection::inspection_id.eq(id))
        .select((InspectionRow::as_select(), field::user_id))
        .first(conn)
        .await
        .optional()
        .map_err(|err| map_diesel_error(err, "find inspection"))?;
    row.map(|(r, owner)| r.into_inspection(owner).map_err(|err| map_row_error(&err)))
        .transpose()
}

async fn load_images(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Vec<InspectionImage>, InspectionRepositoryError> {
    let rows: Vec<ImageRow> = zone_inspection_image::table
        .filter(zone_inspection_image::inspection_id.eq(id))
        .order_by(zone_inspection_image::image_id.asc())
        .select(ImageRow::as_select())
        .load(conn)
        .await
        .map_err(|err| map_diesel_error(err, "list inspection images"))?;
    rows.into_iter()
        .map(|row| InspectionImage::try_from(row).map_err(|err| map_row_error(&err)))
        .collect()
}

async fn load_findings(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Vec<Finding>, InspectionRepositoryError> {
    let rows: Vec<FindingRow> = zone_inspection_finding::table
        .filter(zone_inspection_finding::inspection_id.eq(id))
        .order_by(zone_inspection_finding::finding_id.asc())
        .select(FindingRow::as_select())
        .load(conn)
        .await
        .map_err(|err| map_diesel_error(err, "list inspection findings"))?;
    rows.into_iter()
        .map(|row| Finding::try_from(row).map_err(|err| map_row_error(&err)))
        .collect()
}

async fn tallies(
    conn: &mut AsyncPgConnection,
    ids: &[i32],
) -> Result<(CountMap, CountMap, CountMap), diesel::result::Error> {
    let images = zone_inspection_image::table
        .filter(zone_inspection_image::inspection_id.eq_any(ids))
        .group_by(zone_inspection_image::inspection_id)
        .select((zone_inspection_image::inspection_id, count_star()))
        .load::<(i32, i64)>(conn)
        .await?;
    let findings = zone_inspection_finding::table
        .filter(zone_inspection_finding::inspection_id.eq_any(ids))
        .group_by(zone_inspection_finding::inspection_id)
        .select((zone_inspection_finding::inspection_id, count_star()))
        .load::<(i32, i64)>(conn)
        .await?;
    let recommendations = zone_inspection_recommendation::table
        .filter(zone_inspection_recommendation::inspection_id.eq_any(ids))
        .group_by(zone_inspection_recommendation::inspection_id)
        .select((zone_inspection_recommendation::inspection_id, count_star()))
        .load::<(i32, i64)>(conn)
        .await?;
    Ok((
        images.into_iter().collect(),
        findings.into_iter().collect(),
        recommendations.into_iter().collect(),
    ))
}

/// Fold per-round finding counts into buckets, oldest first.
fn bucketize(
    query: &HistoryQuery,
    rounds: &[(i32, chrono::DateTime<chrono::Utc>)],
    findings: &CountMap,
) -> Vec<HistoryBucket> {
    let mut buckets: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for (id, at) in rounds {
        let entry = buckets.entry(query.group.bucket(*at)).or_default();
        entry.0 += 1;
        entry.1 += findings.get(id).copied().unwrap_or(0);
    }
    buckets
        .into_iter()
        .map(|(bucket, (inspections, finding_count))| HistoryBucket {
            bucket,
            inspections,
            findings: finding_count,
        })
        .collect()
}

fn top_nutrients(mut counts: Vec<(String, i64)>) -> Vec<NutrientCount> {
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
        .into_iter()
        .take(TOP_NUTRIENTS)
        .map(|(nutrient_code, count)| NutrientCount {
            nutrient_code,
            count,
        })
        .collect()
}

#[async_trait]
impl InspectionRepository for DieselInspectionRepository {
    async fn find_pending(
        &self,
        zone_id: ZoneId,
    ) -> Result<Option<Inspection>, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id: Option<i32> = zone_inspection::table
            .filter(zone_inspection::zone_id.eq(zone_id.get()))
            .filter(zone_inspection::status.eq(InspectionStatus::Pending.as_str()))
            .order_by(zone_inspection::inspection_id.desc())
            .select(zone_inspection::inspection_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find pending round"))?;
        match id {
            Some(found) => load_inspection(&mut conn, found).await,
            None => Ok(None),
        }
    }

    async fn next_round_no(&self, zone_id: ZoneId) -> Result<i32, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let current: Option<i32> = zone_inspection::table
            .filter(zone_inspection::zone_id.eq(zone_id.get()))
            .select(max(zone_inspection::round_no))
            .first(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "next round number"))?;
        Ok(current.map_or(1, |n| n.saturating_add(1)))
    }

    async fn create(&self, round: &NewInspection) -> Result<Inspection, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id: i32 = diesel::insert_into(zone_inspection::table)
            .values(NewInspectionRow {
                field_id: round.field_id.get(),
                zone_id: round.zone_id.get(),
                round_no: round.round_no,
                status: InspectionStatus::Pending.as_str(),
                notes: round.notes.as_deref(),
                inspected_at: round.inspected_at,
            })
            .returning(zone_inspection::inspection_id)
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "create inspection"))?;
        load_inspection(&mut conn, id)
            .await?
            .ok_or_else(|| InspectionRepositoryError::query("inspection vanished after insert"))
    }

    async fn find(
        &self,
        id: InspectionId,
    ) -> Result<Option<Inspection>, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_inspection(&mut conn, id.get()).await
    }

    async fn detail(
        &self,
        id: InspectionId,
    ) -> Result<Option<InspectionDetail>, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<(InspectionRow, i32, String, String)> = zone_inspection::table
            .inner_join(field::table.on(field::field_id.eq(zone_inspection::field_id)))
            .inner_join(zone::table.on(zone::zone_id.eq(zone_inspection::zone_id)))
            .filter(zone_inspection::inspection_id.eq(id.get()))
            .select((
                InspectionRow::as_select(),
                field::user_id,
                zone::zone_name,
                field::field_name,
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "load inspection detail"))?;
        let Some((row, owner, zone_name, field_name)) = row else {
            return Ok(None);
        };
        let inspection = row.into_inspection(owner).map_err(|err| map_row_error(&err))?;
        let images = load_images(&mut conn, id.get()).await?;
        let findings = load_findings(&mut conn, id.get()).await?;
        Ok(Some(InspectionDetail {
            inspection,
            zone_name,
            field_name,
            images,
            findings,
            warnings: Vec::new(),
        }))
    }

    async fn images(
        &self,
        id: InspectionId,
    ) -> Result<Vec<InspectionImage>, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_images(&mut conn, id.get()).await
    }

    async fn image_count(&self, id: InspectionId) -> Result<i64, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        zone_inspection_image::table
            .filter(zone_inspection_image::inspection_id.eq(id.get()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "count inspection images"))
    }

    async fn add_image(
        &self,
        id: InspectionId,
        image: &NewInspectionImage,
        max_images: i64,
    ) -> Result<InspectionImage, InspectionRepositoryError> {
        let meta = serde_json::to_value(&image.meta)
            .map_err(|err| InspectionRepositoryError::query(format!("image meta: {err}")))?;
        let new_row = NewImageRow {
            inspection_id: id.get(),
            image_path: &image.image_path,
            captured_at: image.captured_at,
            meta,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // Ok(Err(existing)) commits nothing and reports a full round.
        let inserted: Result<ImageRow, i64> = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    zone_inspection::table
                        .find(id.get())
                        .select(zone_inspection::inspection_id)
                        .for_update()
                        .first::<i32>(conn)
                        .await?;
                    let existing: i64 = zone_inspection_image::table
                        .filter(zone_inspection_image::inspection_id.eq(id.get()))
                        .count()
                        .get_result(conn)
                        .await?;
                    if existing >= max_images {
                        return Ok(Err(existing));
                    }
                    let row = diesel::insert_into(zone_inspection_image::table)
                        .values(new_row)
                        .returning(ImageRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(Ok(row))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "add inspection image"))?;
        let row = inserted.map_err(InspectionRepositoryError::quota_full)?;
        InspectionImage::try_from(row).map_err(|err| map_row_error(&err))
    }

    async fn replace_analysis(
        &self,
        id: InspectionId,
        findings: &[Finding],
        recommendations: &[NewRecommendation],
    ) -> Result<(), InspectionRepositoryError> {
        let finding_rows: Vec<NewFindingRow<'_>> = findings
            .iter()
            .map(|finding| NewFindingRow {
                inspection_id: id.get(),
                image_id: finding.image_id.map(|image| image.get()),
                tree_no: finding.tree_no,
                nutrient_code: &finding.nutrient_code,
                severity: finding.severity.as_str(),
                confidence: finding.confidence,
                notes: finding.notes.as_deref(),
            })
            .collect();
        let recommendation_rows: Vec<NewRecommendationRow<'_>> = recommendations
            .iter()
            .map(|rec| NewRecommendationRow {
                inspection_id: id.get(),
                fertilizer_id: rec.fertilizer_id.map(|f| f.get()),
                nutrient_code: Some(&rec.nutrient_code),
                recommendation_text: &rec.text,
                status: RecommendationStatus::Suggested.as_str(),
            })
            .collect();

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::delete(
                    zone_inspection_finding::table
                        .filter(zone_inspection_finding::inspection_id.eq(id.get())),
                )
                .execute(conn)
                .await?;
                diesel::delete(
                    zone_inspection_recommendation::table
                        .filter(zone_inspection_recommendation::inspection_id.eq(id.get()))
                        .filter(
                            zone_inspection_recommendation::status
                                .eq(RecommendationStatus::Suggested.as_str()),
                        ),
                )
                .execute(conn)
                .await?;
                if !finding_rows.is_empty() {
                    diesel::insert_into(zone_inspection_finding::table)
                        .values(&finding_rows)
                        .execute(conn)
                        .await?;
                }
                if !recommendation_rows.is_empty() {
                    diesel::insert_into(zone_inspection_recommendation::table)
                        .values(&recommendation_rows)
                        .execute(conn)
                        .await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_diesel_error(err, "replace analysis"))
    }

    async fn set_status(
        &self,
        id: InspectionId,
        status: InspectionStatus,
    ) -> Result<Inspection, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(zone_inspection::table.find(id.get()))
            .set(zone_inspection::status.eq(status.as_str()))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "set inspection status"))?;
        load_inspection(&mut conn, id.get())
            .await?
            .ok_or_else(|| InspectionRepositoryError::query("record not found"))
    }

    async fn recommendations(
        &self,
        id: InspectionId,
    ) -> Result<Vec<Recommendation>, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RecommendationJoin> = zone_inspection_recommendation::table
            .left_join(
                fertilizer::table.on(fertilizer::fertilizer_id
                    .nullable()
                    .eq(zone_inspection_recommendation::fertilizer_id)),
            )
            .left_join(
                nutrient_deficiency::table.on(nutrient_deficiency::nutrient_code
                    .nullable()
                    .eq(zone_inspection_recommendation::nutrient_code)),
            )
            .filter(zone_inspection_recommendation::inspection_id.eq(id.get()))
            .order_by(zone_inspection_recommendation::recommendation_id.asc())
            .select((
                RecommendationRow::as_select(),
                fertilizer::fert_name.nullable(),
                fertilizer::formulation.nullable(),
                nutrient_deficiency::nutrient_name.nullable(),
            ))
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list recommendations"))?;
        rows.into_iter()
            .map(|row| recommendation_from_join(row).map_err(|err| map_row_error(&err)))
            .collect()
    }

    async fn recommendation_owner(
        &self,
        id: RecommendationId,
    ) -> Result<Option<UserId>, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owner: Option<i32> = zone_inspection_recommendation::table
            .inner_join(
                zone_inspection::table.on(zone_inspection::inspection_id
                    .eq(zone_inspection_recommendation::inspection_id)),
            )
            .inner_join(field::table.on(field::field_id.eq(zone_inspection::field_id)))
            .filter(zone_inspection_recommendation::recommendation_id.eq(id.get()))
            .select(field::user_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find recommendation owner"))?;
        owner
            .map(|raw| UserId::new(raw).map_err(|err| map_row_error(&RowError::from(err))))
            .transpose()
    }

    async fn update_recommendation(
        &self,
        id: RecommendationId,
        update: RecommendationUpdate,
    ) -> Result<(), InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(zone_inspection_recommendation::table.find(id.get()))
            .set((
                zone_inspection_recommendation::status.eq(update.status().as_str()),
                zone_inspection_recommendation::applied_date.eq(update.applied_date()),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "update recommendation"))?;
        Ok(())
    }

    async fn history(
        &self,
        owner: UserId,
        query: &HistoryQuery,
    ) -> Result<InspectionHistory, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut rounds_query = zone_inspection::table
            .inner_join(field::table.on(field::field_id.eq(zone_inspection::field_id)))
            .filter(field::user_id.eq(owner.get()))
            .select((zone_inspection::inspection_id, zone_inspection::inspected_at))
            .into_boxed();
        if let Some(from) = query.range.from {
            rounds_query = rounds_query.filter(zone_inspection::inspected_at.ge(from));
        }
        if let Some(to) = query.range.to {
            rounds_query = rounds_query.filter(zone_inspection::inspected_at.le(to));
        }
        if let Some(field_id) = query.field_id {
            rounds_query = rounds_query.filter(zone_inspection::field_id.eq(field_id.get()));
        }
        if let Some(zone_id) = query.zone_id {
            rounds_query = rounds_query.filter(zone_inspection::zone_id.eq(zone_id.get()));
        }
        let rounds: Vec<(i32, chrono::DateTime<chrono::Utc>)> = rounds_query
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "load history rounds"))?;
        let ids: Vec<i32> = rounds.iter().map(|(id, _)| *id).collect();

        let findings: CountMap = zone_inspection_finding::table
            .filter(zone_inspection_finding::inspection_id.eq_any(&ids))
            .group_by(zone_inspection_finding::inspection_id)
            .select((zone_inspection_finding::inspection_id, count_star()))
            .load::<(i32, i64)>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "count history findings"))?
            .into_iter()
            .collect();
        let nutrients: Vec<(String, i64)> = zone_inspection_finding::table
            .filter(zone_inspection_finding::inspection_id.eq_any(&ids))
            .group_by(zone_inspection_finding::nutrient_code)
            .select((zone_inspection_finding::nutrient_code, count_star()))
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "count history nutrients"))?;

        Ok(InspectionHistory {
            group: query.group,
            buckets: bucketize(query, &rounds, &findings),
            top_nutrients: top_nutrients(nutrients),
        })
    }

    async fn list(
        &self,
        owner: UserId,
        filter: &InspectionFilter,
        page: PageRequest,
    ) -> Result<Paginated<InspectionSummary>, InspectionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let filtered = || {
            let mut q = zone_inspection::table
                .inner_join(field::table.on(field::field_id.eq(zone_inspection::field_id)))
                .inner_join(zone::table.on(zone::zone_id.eq(zone_inspection::zone_id)))
                .filter(field::user_id.eq(owner.get()))
                .into_boxed();
            if let Some(year) = filter.year {
                q = q.filter(
                    sql::<Bool>("EXTRACT(YEAR FROM zone_inspection.inspected_at) = ")
                        .bind::<Integer, _>(year),
                );
            }
            if let Some(month) = filter.month {
                q = q.filter(
                    sql::<Bool>("EXTRACT(MONTH FROM zone_inspection.inspected_at) = ")
                        .bind::<Integer, _>(i32::try_from(month).unwrap_or(0)),
                );
            }
            if let Some(field_id) = filter.field_id {
                q = q.filter(zone_inspection::field_id.eq(field_id.get()));
            }
            if let Some(zone_id) = filter.zone_id {
                q = q.filter(zone_inspection::zone_id.eq(zone_id.get()));
            }
            q
        };

        let total: i64 = filtered()
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "count inspections"))?;
        let rows: Vec<(InspectionRow, i32, String, String)> = filtered()
            .select((
                InspectionRow::as_select(),
                field::user_id,
                zone::zone_name,
                field::field_name,
            ))
            .order_by((
                zone_inspection::inspected_at.desc(),
                zone_inspection::inspection_id.desc(),
            ))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list inspections"))?;

        let ids: Vec<i32> = rows.iter().map(|(row, ..)| row.inspection_id).collect();
        let (images, findings, recommendations) = tallies(&mut conn, &ids)
            .await
            .map_err(|err| map_diesel_error(err, "count inspection tallies"))?;
        let data = rows
            .into_iter()
            .map(|(row, owner_id, zone_name, field_name)| {
                let key = row.inspection_id;
                let inspection = row
                    .into_inspection(owner_id)
                    .map_err(|err| map_row_error(&err))?;
                Ok(InspectionSummary {
                    inspection,
                    zone_name,
                    field_name,
                    images: images.get(&key).copied().unwrap_or(0),
                    findings: findings.get(&key).copied().unwrap_or(0),
                    recommendations: recommendations.get(&key).copied().unwrap_or(0),
                })
            })
            .collect::<Result<Vec<_>, InspectionRepositoryError>>()?;
        Ok(Paginated::new(data, page, total))
    }
}
