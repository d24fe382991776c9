//! Inspection round handlers.
//!
//! ```text
//! GET   /api/inspections?page=1&page_size=20&year=2025&month=3
//! GET   /api/inspections/history?group=month&from=2025-01-01&to=2025-03-31
//! POST  /api/inspections/start {"field_id":1,"zone_id":2,"notes":"after rain"}
//! POST  /api/inspections/{id}/images?filename=leaf.jpg   (raw image body)
//! GET   /api/inspections/{id}
//! POST  /api/inspections/{id}/analyze
//! PATCH /api/inspections/{id}/status {"status":"completed"}
//! GET   /api/inspections/{id}/recommendations
//! PATCH /api/inspections/recommendations/{rec_id} {"status":"applied"}
//! ```

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, patch, post, route, web};
use futures_util::StreamExt;
use pagination::{PageRequest, Paginated};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::RecommendationChange;
use crate::domain::{
    AnalysisOutcome, DateRange, Error, FieldId, Finding, HistoryGrouping, HistoryQuery,
    ImageUpload, Inspection, InspectionDetail, InspectionFilter, InspectionHistory, InspectionId,
    InspectionImage, InspectionStatus, InspectionSummary, MAX_IMAGE_BYTES, Recommendation,
    RecommendationId, RecommendationStatus, Severity, StartedRound, UploadedImage, ZoneId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::responses::ListResponse;
use crate::inbound::http::schemas::{
    ErrorSchema, HistoryGroupingSchema, InspectionStatusSchema, RecommendationStatusSchema,
    SeveritySchema,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, body_id, invalid_number_error, invalid_status_error, missing_field_error,
    non_blank, optional_i32, optional_id, path_id,
};

const FIELD_ID: FieldName = FieldName::new("field_id");
const ZONE_ID: FieldName = FieldName::new("zone_id");
const MONTH: FieldName = FieldName::new("month");
const STATUS: FieldName = FieldName::new("status");

/// Inspection round as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InspectionResponse {
    pub inspection_id: i32,
    pub field_id: i32,
    pub zone_id: i32,
    pub round_no: i32,
    #[schema(value_type = InspectionStatusSchema)]
    pub status: InspectionStatus,
    pub notes: Option<String>,
    #[schema(format = "date-time")]
    pub inspected_at: String,
}

impl From<Inspection> for InspectionResponse {
    fn from(inspection: Inspection) -> Self {
        Self {
            inspection_id: inspection.id.get(),
            field_id: inspection.field_id.get(),
            zone_id: inspection.zone_id.get(),
            round_no: inspection.round_no,
            status: inspection.status,
            notes: inspection.notes,
            inspected_at: inspection.inspected_at.to_rfc3339(),
        }
    }
}

/// Provenance recorded for a stored image.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageMetaResponse {
    pub original_name: String,
    pub saved_name: String,
    #[schema(example = "20250301101500123456")]
    pub saved_at_utc: String,
}

/// Stored inspection image.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageResponse {
    pub image_id: i32,
    pub inspection_id: i32,
    #[schema(example = "inspections/4/4_20250301101500123456.jpg")]
    pub image_path: String,
    pub detection_path: Option<String>,
    #[schema(format = "date-time")]
    pub captured_at: String,
    pub meta: ImageMetaResponse,
}

impl From<InspectionImage> for ImageResponse {
    fn from(image: InspectionImage) -> Self {
        Self {
            image_id: image.id.get(),
            inspection_id: image.inspection_id.get(),
            image_path: image.image_path,
            detection_path: image.detection_path,
            captured_at: image.captured_at.to_rfc3339(),
            meta: ImageMetaResponse {
                original_name: image.meta.original_name,
                saved_name: image.meta.saved_name,
                saved_at_utc: image.meta.saved_at_utc,
            },
        }
    }
}

/// Detected deficiency.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FindingResponse {
    pub image_id: Option<i32>,
    pub tree_no: Option<i32>,
    #[schema(example = "N")]
    pub nutrient_code: String,
    #[schema(value_type = SeveritySchema)]
    pub severity: Severity,
    pub confidence: f64,
    pub notes: Option<String>,
}

impl From<Finding> for FindingResponse {
    fn from(finding: Finding) -> Self {
        Self {
            image_id: finding.image_id.map(|id| id.get()),
            tree_no: finding.tree_no,
            nutrient_code: finding.nutrient_code,
            severity: finding.severity,
            confidence: finding.confidence,
            notes: finding.notes,
        }
    }
}

/// Round with zone and field names, images, findings and warnings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InspectionDetailResponse {
    #[serde(flatten)]
    pub inspection: InspectionResponse,
    pub zone_name: String,
    pub field_name: String,
    pub images: Vec<ImageResponse>,
    pub findings: Vec<FindingResponse>,
    pub warnings: Vec<String>,
}

impl From<InspectionDetail> for InspectionDetailResponse {
    fn from(detail: InspectionDetail) -> Self {
        Self {
            inspection: InspectionResponse::from(detail.inspection),
            zone_name: detail.zone_name,
            field_name: detail.field_name,
            images: detail.images.into_iter().map(ImageResponse::from).collect(),
            findings: detail.findings.into_iter().map(FindingResponse::from).collect(),
            warnings: detail.warnings,
        }
    }
}

/// Round returned by `start`, flagged when it already existed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StartedRoundResponse {
    #[serde(flatten)]
    pub inspection: InspectionResponse,
    pub idempotent: bool,
}

impl From<StartedRound> for StartedRoundResponse {
    fn from(started: StartedRound) -> Self {
        Self {
            inspection: InspectionResponse::from(started.inspection),
            idempotent: started.idempotent,
        }
    }
}

/// Stored image and the remaining per-round quota.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadedImageResponse {
    pub image: ImageResponse,
    pub quota_remain: i64,
}

impl From<UploadedImage> for UploadedImageResponse {
    fn from(uploaded: UploadedImage) -> Self {
        Self {
            image: ImageResponse::from(uploaded.image),
            quota_remain: uploaded.quota_remain,
        }
    }
}

/// Result of running detection over a round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisResponse {
    pub findings: Vec<FindingResponse>,
    pub recommendations: usize,
    pub warnings: Vec<String>,
}

impl From<AnalysisOutcome> for AnalysisResponse {
    fn from(outcome: AnalysisOutcome) -> Self {
        Self {
            findings: outcome.findings.into_iter().map(FindingResponse::from).collect(),
            recommendations: outcome.recommendations,
            warnings: outcome.warnings,
        }
    }
}

/// Fertilizer recommendation joined with its reference names.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecommendationResponse {
    pub recommendation_id: i32,
    pub inspection_id: i32,
    pub fertilizer_id: Option<i32>,
    pub nutrient_code: Option<String>,
    pub text: String,
    pub rate_per_area: Option<String>,
    pub application_method: Option<String>,
    #[schema(value_type = RecommendationStatusSchema)]
    pub status: RecommendationStatus,
    #[schema(format = "date", example = "2025-03-09")]
    pub applied_date: Option<String>,
    #[schema(format = "date-time")]
    pub created_at: String,
    pub fertilizer_name: Option<String>,
    pub formulation: Option<String>,
    pub nutrient_name: Option<String>,
}

impl From<Recommendation> for RecommendationResponse {
    fn from(rec: Recommendation) -> Self {
        Self {
            recommendation_id: rec.id.get(),
            inspection_id: rec.inspection_id.get(),
            fertilizer_id: rec.fertilizer_id.map(|id| id.get()),
            nutrient_code: rec.nutrient_code,
            text: rec.text,
            rate_per_area: rec.rate_per_area,
            application_method: rec.application_method,
            status: rec.status,
            applied_date: rec.applied_date.map(|day| day.format("%Y-%m-%d").to_string()),
            created_at: rec.created_at.to_rfc3339(),
            fertilizer_name: rec.fertilizer_name,
            formulation: rec.formulation,
            nutrient_name: rec.nutrient_name,
        }
    }
}

/// One history bucket.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryBucketResponse {
    #[schema(example = "2025-03")]
    pub bucket: String,
    pub inspections: i64,
    pub findings: i64,
}

/// Nutrient with its finding count.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NutrientCountResponse {
    pub nutrient_code: String,
    pub count: i64,
}

/// Bucketed inspection history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(value_type = HistoryGroupingSchema)]
    pub group: HistoryGrouping,
    pub buckets: Vec<HistoryBucketResponse>,
    pub top_nutrients: Vec<NutrientCountResponse>,
}

impl From<InspectionHistory> for HistoryResponse {
    fn from(value: InspectionHistory) -> Self {
        Self {
            group: value.group,
            buckets: value
                .buckets
                .into_iter()
                .map(|b| HistoryBucketResponse {
                    bucket: b.bucket,
                    inspections: b.inspections,
                    findings: b.findings,
                })
                .collect(),
            top_nutrients: value
                .top_nutrients
                .into_iter()
                .map(|n| NutrientCountResponse {
                    nutrient_code: n.nutrient_code,
                    count: n.count,
                })
                .collect(),
        }
    }
}

/// Inspection list row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InspectionRowResponse {
    #[serde(flatten)]
    pub inspection: InspectionResponse,
    pub zone_name: String,
    pub field_name: String,
    pub images: i64,
    pub findings: i64,
    pub recommendations: i64,
}

impl From<InspectionSummary> for InspectionRowResponse {
    fn from(row: InspectionSummary) -> Self {
        Self {
            inspection: InspectionResponse::from(row.inspection),
            zone_name: row.zone_name,
            field_name: row.field_name,
            images: row.images,
            findings: row.findings,
            recommendations: row.recommendations,
        }
    }
}

/// One page of inspection rows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InspectionPageResponse {
    pub data: Vec<InspectionRowResponse>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

impl From<Paginated<InspectionSummary>> for InspectionPageResponse {
    fn from(page: Paginated<InspectionSummary>) -> Self {
        let page = page.map(InspectionRowResponse::from);
        Self {
            data: page.data,
            page: page.page,
            page_size: page.page_size,
            total: page.total,
        }
    }
}

/// Query parameters of the round list.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct InspectionListQuery {
    /// 1-based page, defaults to 1.
    pub page: Option<i64>,
    /// Rows per page, clamped to 1..=100 (default 20).
    pub page_size: Option<i64>,
    pub year: Option<i32>,
    /// Month 1..=12.
    pub month: Option<u32>,
    pub field_id: Option<i32>,
    pub zone_id: Option<i32>,
}

/// Query parameters of the history report.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct HistoryParams {
    /// `month` (default) or `year`; anything else falls back to `month`.
    pub group: Option<String>,
    /// First day included, `YYYY-MM-DD`.
    pub from: Option<String>,
    /// Last day included, `YYYY-MM-DD`.
    pub to: Option<String>,
    pub field_id: Option<i32>,
    pub zone_id: Option<i32>,
}

/// Body for opening a round.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartRoundRequest {
    #[schema(value_type = i32)]
    pub field_id: Option<Value>,
    #[schema(value_type = i32)]
    pub zone_id: Option<Value>,
    pub notes: Option<String>,
}

/// Query parameters of an image upload.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UploadParams {
    /// Client file name; its extension selects the stored type. Falls back to
    /// the `Content-Type` header when absent.
    pub filename: Option<String>,
}

/// Body for closing a round.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StatusRequest {
    #[schema(value_type = InspectionStatusSchema)]
    pub status: Option<String>,
}

/// Body for updating a recommendation.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RecommendationUpdateRequest {
    #[schema(value_type = RecommendationStatusSchema)]
    pub status: Option<String>,
    /// `YYYY-MM-DD`; defaults to today when applying.
    #[schema(format = "date")]
    pub applied_date: Option<String>,
}

fn inspection_id(raw: i32) -> ApiResult<InspectionId> {
    path_id(raw, "inspection")
}

fn required_id<T>(value: Option<&Value>, field: FieldName) -> ApiResult<T>
where
    T: TryFrom<i32, Error = crate::domain::InvalidId>,
{
    let raw = optional_i32(value, field)?.ok_or_else(|| missing_field_error(field))?;
    body_id(raw, field)
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/bmp" => Some("bmp"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn upload_filename(req: &HttpRequest, params: UploadParams) -> String {
    if let Some(name) = non_blank(params.filename.as_deref()) {
        return name.to_owned();
    }
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(extension_for)
        .map_or_else(|| "upload".to_owned(), |ext| format!("upload.{ext}"))
}

async fn read_image(mut payload: web::Payload) -> ApiResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk
            .map_err(|err| Error::invalid_request(format!("failed to read image body: {err}")))?;
        if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(Error::payload_too_large("image exceeds the size limit")
                .with_details(json!({ "code": "file_too_large", "maxBytes": MAX_IMAGE_BYTES })));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Page through the user's rounds, newest first.
#[utoipa::path(
    get,
    path = "/api/inspections",
    params(InspectionListQuery),
    responses(
        (status = 200, description = "Inspection rounds", body = InspectionPageResponse),
        (status = 400, description = "Invalid filter", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "listInspections"
)]
#[get("/inspections")]
pub async fn list_inspections(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<InspectionListQuery>,
) -> ApiResult<web::Json<InspectionPageResponse>> {
    let owner = session.require_user_id()?;
    let query = query.into_inner();
    if query.month.is_some_and(|m| !(1..=12).contains(&m)) {
        return Err(invalid_number_error(MONTH));
    }
    let filter = InspectionFilter {
        year: query.year,
        month: query.month,
        field_id: optional_id::<FieldId>(query.field_id, FIELD_ID)?,
        zone_id: optional_id::<ZoneId>(query.zone_id, ZONE_ID)?,
    };
    let page = PageRequest::clamped(query.page, query.page_size);
    let rows = state
        .inspections_query
        .list_inspections(owner, filter, page)
        .await?;
    Ok(web::Json(InspectionPageResponse::from(rows)))
}

/// Inspection and finding counts per month or year.
#[utoipa::path(
    get,
    path = "/api/inspections/history",
    params(HistoryParams),
    responses(
        (status = 200, description = "History buckets", body = HistoryResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "inspectionHistory"
)]
#[get("/inspections/history")]
pub async fn history(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<HistoryParams>,
) -> ApiResult<web::Json<HistoryResponse>> {
    let owner = session.require_user_id()?;
    let params = query.into_inner();
    let query = HistoryQuery {
        group: HistoryGrouping::parse_lenient(params.group.as_deref()),
        range: DateRange::from_days(params.from.as_deref(), params.to.as_deref()),
        field_id: optional_id(params.field_id, FIELD_ID)?,
        zone_id: optional_id(params.zone_id, ZONE_ID)?,
    };
    let report = state.inspections_query.history(owner, query).await?;
    Ok(web::Json(HistoryResponse::from(report)))
}

/// Open a round for a zone. A pending round is returned as-is with `200`.
#[utoipa::path(
    post,
    path = "/api/inspections/start",
    request_body = StartRoundRequest,
    responses(
        (status = 201, description = "Round opened", body = StartedRoundResponse),
        (status = 200, description = "Pending round returned", body = StartedRoundResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Field owned by another user", body = ErrorSchema),
        (status = 404, description = "Field or zone not found", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "startInspection"
)]
#[post("/inspections/start")]
pub async fn start_round(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<StartRoundRequest>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let payload = payload.into_inner();
    let field_id: FieldId = required_id(payload.field_id.as_ref(), FIELD_ID)?;
    let zone_id: ZoneId = required_id(payload.zone_id.as_ref(), ZONE_ID)?;
    let notes = non_blank(payload.notes.as_deref()).map(str::to_owned);
    let started = state
        .inspections
        .start_round(owner, field_id, zone_id, notes)
        .await?;
    let mut response = if started.idempotent {
        HttpResponse::Ok()
    } else {
        HttpResponse::Created()
    };
    Ok(response.json(StartedRoundResponse::from(started)))
}

/// Upload one leaf image to a pending round. The body is the raw image.
#[utoipa::path(
    post,
    path = "/api/inspections/{inspection_id}/images",
    params(
        ("inspection_id" = i32, Path, description = "Inspection identifier"),
        UploadParams
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Image stored", body = UploadedImageResponse),
        (status = 400, description = "Round closed or quota full", body = ErrorSchema),
        (status = 404, description = "Inspection not found", body = ErrorSchema),
        (status = 413, description = "Image too large", body = ErrorSchema),
        (status = 415, description = "Unsupported image type", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "uploadInspectionImage"
)]
#[post("/inspections/{inspection_id}/images")]
pub async fn upload_image(
    state: web::Data<HttpState>,
    session: SessionContext,
    req: HttpRequest,
    path: web::Path<i32>,
    params: web::Query<UploadParams>,
    payload: web::Payload,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let id = inspection_id(path.into_inner())?;
    let filename = upload_filename(&req, params.into_inner());
    let bytes = read_image(payload).await?;
    let uploaded = state
        .inspections
        .upload_image(owner, id, ImageUpload { filename, bytes })
        .await?;
    Ok(HttpResponse::Created().json(UploadedImageResponse::from(uploaded)))
}

/// Fetch a round with its images, findings and warnings.
#[utoipa::path(
    get,
    path = "/api/inspections/{inspection_id}",
    params(("inspection_id" = i32, Path, description = "Inspection identifier")),
    responses(
        (status = 200, description = "Inspection round", body = InspectionDetailResponse),
        (status = 403, description = "Round owned by another user", body = ErrorSchema),
        (status = 404, description = "Inspection not found", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "getInspection"
)]
#[get("/inspections/{inspection_id}")]
pub async fn get_inspection(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<web::Json<InspectionDetailResponse>> {
    let owner = session.require_user_id()?;
    let detail = state
        .inspections_query
        .get_inspection(owner, inspection_id(path.into_inner())?)
        .await?;
    Ok(web::Json(InspectionDetailResponse::from(detail)))
}

/// Run deficiency detection over every image of the round.
#[utoipa::path(
    post,
    path = "/api/inspections/{inspection_id}/analyze",
    params(("inspection_id" = i32, Path, description = "Inspection identifier")),
    responses(
        (status = 200, description = "Findings regenerated", body = AnalysisResponse),
        (status = 400, description = "No images uploaded", body = ErrorSchema),
        (status = 404, description = "Inspection not found", body = ErrorSchema),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "analyzeInspection"
)]
#[post("/inspections/{inspection_id}/analyze")]
pub async fn analyze(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<web::Json<AnalysisResponse>> {
    let owner = session.require_user_id()?;
    let outcome = state
        .inspections
        .analyze(owner, inspection_id(path.into_inner())?)
        .await?;
    Ok(web::Json(AnalysisResponse::from(outcome)))
}

/// Close a pending round as `completed` or `cancelled`.
#[utoipa::path(
    patch,
    path = "/api/inspections/{inspection_id}/status",
    params(("inspection_id" = i32, Path, description = "Inspection identifier")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Round closed", body = InspectionResponse),
        (status = 400, description = "Invalid status", body = ErrorSchema),
        (status = 404, description = "Inspection not found", body = ErrorSchema),
        (status = 409, description = "Round already closed", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "setInspectionStatus"
)]
#[patch("/inspections/{inspection_id}/status")]
pub async fn set_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<StatusRequest>,
) -> ApiResult<web::Json<InspectionResponse>> {
    let owner = session.require_user_id()?;
    let id = inspection_id(path.into_inner())?;
    let raw = non_blank(payload.status.as_deref()).ok_or_else(|| missing_field_error(STATUS))?;
    let status = raw
        .parse::<InspectionStatus>()
        .map_err(|_| invalid_status_error(STATUS, "completed, cancelled"))?;
    let inspection = state.inspections.set_status(owner, id, status).await?;
    Ok(web::Json(InspectionResponse::from(inspection)))
}

/// Recommendations of a round, ordered by id.
#[utoipa::path(
    get,
    path = "/api/inspections/{inspection_id}/recommendations",
    params(("inspection_id" = i32, Path, description = "Inspection identifier")),
    responses(
        (status = 200, description = "Recommendations", body = ListResponse<RecommendationResponse>),
        (status = 403, description = "Round owned by another user", body = ErrorSchema),
        (status = 404, description = "Inspection not found", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "listRecommendations"
)]
#[get("/inspections/{inspection_id}/recommendations")]
pub async fn list_recommendations(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<web::Json<ListResponse<RecommendationResponse>>> {
    let owner = session.require_user_id()?;
    let recommendations = state
        .inspections_query
        .list_recommendations(owner, inspection_id(path.into_inner())?)
        .await?;
    Ok(web::Json(ListResponse::from_rows(recommendations)))
}

/// Mark a recommendation as suggested, applied or skipped.
#[utoipa::path(
    method(patch, put),
    path = "/api/inspections/recommendations/{rec_id}",
    params(("rec_id" = i32, Path, description = "Recommendation identifier")),
    request_body = RecommendationUpdateRequest,
    responses(
        (status = 200, description = "Recommendation updated"),
        (status = 400, description = "Invalid status or date", body = ErrorSchema),
        (status = 403, description = "Recommendation owned by another user", body = ErrorSchema),
        (status = 404, description = "Recommendation not found", body = ErrorSchema)
    ),
    tags = ["inspections"],
    operation_id = "updateRecommendation"
)]
#[route("/inspections/recommendations/{rec_id}", method = "PATCH", method = "PUT")]
pub async fn update_recommendation(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<RecommendationUpdateRequest>,
) -> ApiResult<web::Json<Value>> {
    let owner = session.require_user_id()?;
    let id: RecommendationId = path_id(path.into_inner(), "recommendation")?;
    let payload = payload.into_inner();
    let change = RecommendationChange {
        status: payload.status.unwrap_or_default(),
        applied_date: payload.applied_date,
    };
    state
        .inspections
        .update_recommendation(owner, id, change)
        .await?;
    Ok(web::Json(json!({ "updated": true })))
}

/// Register every inspection route. Literal segments come before
/// `{inspection_id}` so they are not read as identifiers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_inspections)
        .service(history)
        .service(start_round)
        .service(update_recommendation)
        .service(upload_image)
        .service(analyze)
        .service(set_status)
        .service(list_recommendations)
        .service(get_inspection);
}

#[cfg(test)]
#[path = "inspections_tests.rs"]
mod tests;
