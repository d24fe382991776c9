//! Internal Diesel row structs and their conversion into domain records.
//!
//! Rows never leave the persistence layer. Conversions return [`RowError`]
//! when stored data no longer satisfies a domain invariant (e.g. a
//! non-positive id or an unknown status string).

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use crate::domain::{
    DisplayName, Fertilizer, FertilizerId, Field, FieldId, FieldVertex, Finding, GeoPoint, ImageId,
    ImageMeta, Inspection, InspectionId, InspectionImage, InspectionStatus, InvalidId, MarkId,
    Nutrient, PhoneNumber, Recommendation, RecommendationId, RecommendationStatus, Severity,
    TreeMark, User, UserId, UserValidationError, Username, Zone, ZoneId,
};

use super::schema::{
    fertilizer, field, field_point, mark_zone, nutrient_deficiency, users, zone, zone_inspection,
    zone_inspection_finding, zone_inspection_image, zone_inspection_recommendation,
};

/// Stored data that fails domain validation.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RowError {
    #[error(transparent)]
    Id(#[from] InvalidId),
    #[error(transparent)]
    User(#[from] UserValidationError),
    #[error("invalid stored value for {column}: {value}")]
    Value { column: &'static str, value: String },
}

impl RowError {
    fn value(column: &'static str, value: impl ToString) -> Self {
        Self::Value {
            column,
            value: value.to_string(),
        }
    }
}

fn position(latitude: f64, longitude: f64) -> Result<GeoPoint, RowError> {
    GeoPoint::new(latitude, longitude)
        .ok_or_else(|| RowError::value("position", format!("{latitude},{longitude}")))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub user_id: i32,
    pub username: String,
    pub user_tel: String,
    pub user_password: String,
    pub name: String,
}

impl UserRow {
    pub(crate) fn into_user(self) -> Result<(User, String), RowError> {
        let user = User::new(
            UserId::new(self.user_id)?,
            Username::new(&self.username)?,
            PhoneNumber::new(&self.user_tel)?,
            DisplayName::new(&self.name)?,
        );
        Ok((user, self.user_password))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub username: &'a str,
    pub user_tel: &'a str,
    pub user_password: &'a str,
    pub name: &'a str,
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = field)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FieldRow {
    pub field_id: i32,
    pub user_id: i32,
    pub field_name: String,
    pub size_square_meter: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FieldRow> for Field {
    type Error = RowError;

    fn try_from(row: FieldRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FieldId::new(row.field_id)?,
            owner_id: UserId::new(row.user_id)?,
            name: row.field_name,
            size_square_meter: row.size_square_meter,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = field)]
pub(crate) struct NewFieldRow<'a> {
    pub user_id: i32,
    pub field_name: &'a str,
    pub size_square_meter: f64,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = field)]
pub(crate) struct FieldUpdate<'a> {
    pub field_name: &'a str,
    pub size_square_meter: f64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = field_point)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FieldPointRow {
    pub point_order: i32,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<FieldPointRow> for FieldVertex {
    type Error = RowError;

    fn try_from(row: FieldPointRow) -> Result<Self, Self::Error> {
        Ok(Self {
            point_order: row.point_order,
            position: position(row.latitude, row.longitude)?,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = field_point)]
pub(crate) struct NewFieldPointRow {
    pub field_id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub point_order: i32,
}

// ---------------------------------------------------------------------------
// Zones and marks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = zone)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ZoneRow {
    pub zone_id: i32,
    pub field_id: i32,
    pub zone_name: String,
    pub num_trees: i32,
    pub created_at: DateTime<Utc>,
}

impl ZoneRow {
    /// Attach the owning user (from `field`) and the round count.
    pub(crate) fn into_zone(self, owner: i32, inspection_count: i64) -> Result<Zone, RowError> {
        Ok(Zone {
            id: ZoneId::new(self.zone_id)?,
            field_id: FieldId::new(self.field_id)?,
            owner_id: UserId::new(owner)?,
            name: self.zone_name,
            num_trees: self.num_trees,
            inspection_count,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = zone)]
pub(crate) struct NewZoneRow<'a> {
    pub field_id: i32,
    pub zone_name: &'a str,
    pub num_trees: i32,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = zone)]
pub(crate) struct ZoneUpdate<'a> {
    pub zone_name: &'a str,
    pub num_trees: i32,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = mark_zone)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MarkRow {
    pub mark_id: i32,
    pub zone_id: i32,
    pub tree_no: i32,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<MarkRow> for TreeMark {
    type Error = RowError;

    fn try_from(row: MarkRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MarkId::new(row.mark_id)?,
            zone_id: ZoneId::new(row.zone_id)?,
            tree_no: row.tree_no,
            position: position(row.latitude, row.longitude)?,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mark_zone)]
pub(crate) struct NewMarkRow {
    pub zone_id: i32,
    pub tree_no: i32,
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = fertilizer)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FertilizerRow {
    pub fertilizer_id: i32,
    pub fert_name: String,
    pub formulation: Option<String>,
    pub description: Option<String>,
}

impl TryFrom<FertilizerRow> for Fertilizer {
    type Error = RowError;

    fn try_from(row: FertilizerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FertilizerId::new(row.fertilizer_id)?,
            name: row.fert_name,
            formulation: row.formulation,
            description: row.description,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = nutrient_deficiency)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NutrientRow {
    pub nutrient_code: String,
    pub nutrient_name: String,
    pub common_symptoms: Option<String>,
    pub diagnostic_notes: Option<String>,
    pub fertilizer_id: Option<i32>,
}

impl TryFrom<NutrientRow> for Nutrient {
    type Error = RowError;

    fn try_from(row: NutrientRow) -> Result<Self, Self::Error> {
        Ok(Self {
            code: row.nutrient_code,
            name: row.nutrient_name,
            symptoms: row.common_symptoms,
            notes: row.diagnostic_notes,
            fertilizer_id: row.fertilizer_id.map(FertilizerId::new).transpose()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Inspections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = zone_inspection)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InspectionRow {
    pub inspection_id: i32,
    pub field_id: i32,
    pub zone_id: i32,
    pub round_no: i32,
    pub status: String,
    pub notes: Option<String>,
    pub inspected_at: DateTime<Utc>,
}

impl InspectionRow {
    pub(crate) fn into_inspection(self, owner: i32) -> Result<Inspection, RowError> {
        Ok(Inspection {
            id: InspectionId::new(self.inspection_id)?,
            field_id: FieldId::new(self.field_id)?,
            zone_id: ZoneId::new(self.zone_id)?,
            owner_id: UserId::new(owner)?,
            round_no: self.round_no,
            status: self
                .status
                .parse::<InspectionStatus>()
                .map_err(|err| RowError::value("zone_inspection.status", err.0))?,
            notes: self.notes,
            inspected_at: self.inspected_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = zone_inspection)]
pub(crate) struct NewInspectionRow<'a> {
    pub field_id: i32,
    pub zone_id: i32,
    pub round_no: i32,
    pub status: &'a str,
    pub notes: Option<&'a str>,
    pub inspected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = zone_inspection_image)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ImageRow {
    pub image_id: i32,
    pub inspection_id: i32,
    pub image_path: String,
    pub detection_path: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub meta: serde_json::Value,
}

impl TryFrom<ImageRow> for InspectionImage {
    type Error = RowError;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        let meta = serde_json::from_value::<ImageMeta>(row.meta)
            .map_err(|err| RowError::value("zone_inspection_image.meta", err))?;
        Ok(Self {
            id: ImageId::new(row.image_id)?,
            inspection_id: InspectionId::new(row.inspection_id)?,
            image_path: row.image_path,
            detection_path: row.detection_path,
            captured_at: row.captured_at,
            meta,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = zone_inspection_image)]
pub(crate) struct NewImageRow<'a> {
    pub inspection_id: i32,
    pub image_path: &'a str,
    pub captured_at: DateTime<Utc>,
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = zone_inspection_finding)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FindingRow {
    pub image_id: Option<i32>,
    pub tree_no: Option<i32>,
    pub nutrient_code: String,
    pub severity: String,
    pub confidence: f64,
    pub notes: Option<String>,
}

impl TryFrom<FindingRow> for Finding {
    type Error = RowError;

    fn try_from(row: FindingRow) -> Result<Self, Self::Error> {
        let severity = match row.severity.as_str() {
            "mild" => Severity::Mild,
            "moderate" => Severity::Moderate,
            "severe" => Severity::Severe,
            other => return Err(RowError::value("zone_inspection_finding.severity", other)),
        };
        Ok(Self {
            image_id: row.image_id.map(ImageId::new).transpose()?,
            tree_no: row.tree_no,
            nutrient_code: row.nutrient_code,
            severity,
            confidence: row.confidence,
            notes: row.notes,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = zone_inspection_finding)]
pub(crate) struct NewFindingRow<'a> {
    pub inspection_id: i32,
    pub image_id: Option<i32>,
    pub tree_no: Option<i32>,
    pub nutrient_code: &'a str,
    pub severity: &'a str,
    pub confidence: f64,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = zone_inspection_recommendation)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RecommendationRow {
    pub recommendation_id: i32,
    pub inspection_id: i32,
    pub fertilizer_id: Option<i32>,
    pub nutrient_code: Option<String>,
    pub recommendation_text: String,
    pub rate_per_area: Option<String>,
    pub application_method: Option<String>,
    pub status: String,
    pub applied_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Recommendation joined with its fertilizer and nutrient names.
pub(crate) type RecommendationJoin = (
    RecommendationRow,
    Option<String>,
    Option<String>,
    Option<String>,
);

pub(crate) fn recommendation_from_join(
    (row, fertilizer_name, formulation, nutrient_name): RecommendationJoin,
) -> Result<Recommendation, RowError> {
    Ok(Recommendation {
        id: RecommendationId::new(row.recommendation_id)?,
        inspection_id: InspectionId::new(row.inspection_id)?,
        fertilizer_id: row.fertilizer_id.map(FertilizerId::new).transpose()?,
        nutrient_code: row.nutrient_code,
        text: row.recommendation_text,
        rate_per_area: row.rate_per_area,
        application_method: row.application_method,
        status: row
            .status
            .parse::<RecommendationStatus>()
            .map_err(|err| RowError::value("zone_inspection_recommendation.status", err.0))?,
        applied_date: row.applied_date,
        created_at: row.created_at,
        fertilizer_name,
        formulation,
        nutrient_name,
    })
}

#[derive(Debug, Insertable)]
#[diesel(table_name = zone_inspection_recommendation)]
pub(crate) struct NewRecommendationRow<'a> {
    pub inspection_id: i32,
    pub fertilizer_id: Option<i32>,
    pub nutrient_code: Option<&'a str>,
    pub recommendation_text: &'a str,
    pub status: &'a str,
}
